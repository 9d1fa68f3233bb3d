//! Command line arguments

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "citedin")]
#[command(version)]
#[command(about = "Build the cited-by graph of a PubMed paper", long_about = None)]
pub struct Cli {
    /// PubMed page of the root paper
    #[arg(long, conflicts_with = "paper_id", required_unless_present = "paper_id")]
    pub url: Option<String>,

    /// PubMed id of the root paper
    #[arg(long)]
    pub paper_id: Option<String>,

    /// Initial depth (defaults to explorer.initial_depth)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Depths to switch to after the initial build, in order
    #[arg(long, value_delimiter = ',')]
    pub then: Vec<usize>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (layered under APP__* environment overrides)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serve citations from a JSON adjacency map instead of E-utilities
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Log filter, overriding observability.log_level
    #[arg(short, long)]
    pub log_level: Option<String>,
}
