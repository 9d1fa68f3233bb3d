//! citedin Explorer
//!
//! Command line driver for the citation graph engine:
//! 1. Resolves the root paper from a PubMed URL or id
//! 2. Builds its cited-by graph to the initial depth
//! 3. Applies any further depth changes in order
//! 4. Writes renderings and network statistics as JSON

mod cli;
mod report;
mod telemetry;

use anyhow::Context;
use citedin_common::{
    config::AppConfig,
    fetcher::{CitationFetcher, EutilsFetcher, InMemoryFetcher},
    model::{AdjacencyMap, PaperId},
    paper_url::paper_id_from_url,
    VERSION,
};
use citedin_engine::{Explorer, ExplorerSettings, ForceLayout, ForceLayoutConfig};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    telemetry::init_tracing(&config.observability, cli.log_level.as_deref());
    info!(service = %config.observability.service_name, "Starting citedin Explorer v{}", VERSION);

    telemetry::install_metrics_exporter(config.observability.metrics_port)?;

    let root = match (&cli.url, &cli.paper_id) {
        (Some(url), _) => paper_id_from_url(url)?,
        (None, Some(id)) => PaperId::new(id.trim()),
        (None, None) => anyhow::bail!("either --url or --paper-id is required"),
    };

    let fetcher: Arc<dyn CitationFetcher> = match &cli.fixture {
        Some(path) => Arc::new(InMemoryFetcher::new(load_fixture(path)?)),
        None => Arc::new(EutilsFetcher::new(config.eutils.clone())?),
    };
    info!(fetcher = fetcher.name(), root = %root, "Citation source ready");

    let mut settings = ExplorerSettings::from(&config.explorer);
    if let Some(depth) = cli.depth {
        settings.initial_depth = depth;
    }
    let layout = Arc::new(ForceLayout::new(ForceLayoutConfig::from(&config.explorer)));

    let mut handle = Explorer::spawn(root.clone(), fetcher, layout, settings);

    let mut progress = handle.subscribe_progress();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let percent = *progress.borrow();
            debug!(percent, "Progress");
        }
    });

    let report = tokio::select! {
        report = report::drive(&mut handle, root.into_string(), &cli.then) => Some(report?),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
            None
        }
    };

    handle.shutdown().await?;
    let Some(report) = report else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} operation(s) failed: {}", report.failures.len(), report.failures.join("; "));
    }

    info!("citedin Explorer finished");
    Ok(())
}

/// Read a `{"cited": ["citing", ...]}` JSON fixture
fn load_fixture(path: &Path) -> anyhow::Result<AdjacencyMap> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read fixture {}", path.display()))?;
    let graph: AdjacencyMap = serde_json::from_str(&raw).context("fixture is not an adjacency map")?;
    Ok(graph)
}
