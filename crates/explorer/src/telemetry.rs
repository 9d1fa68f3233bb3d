//! Logging and metrics exporter setup

use anyhow::Context;
use citedin_common::config::ObservabilityConfig;
use citedin_common::metrics::{FETCH_BUCKETS, METRICS_PREFIX, SETTLE_BUCKETS};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins over `level`, which wins over the
/// configured filter.
pub fn init_tracing(config: &ObservabilityConfig, level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(&config.log_level)));

    // Logs go to stderr; stdout may carry the report
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on `port`; 0 leaves metrics unrecorded
pub fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let mut builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_fetch_duration_seconds", METRICS_PREFIX)),
            FETCH_BUCKETS,
        )?;
    for kind in ["layout", "stats"] {
        builder = builder.set_buckets_for_metric(
            Matcher::Full(format!("{}_{}_duration_seconds", METRICS_PREFIX, kind)),
            SETTLE_BUCKETS,
        )?;
    }
    builder
        .install()
        .context("failed to install Prometheus exporter")?;

    citedin_common::metrics::register_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}
