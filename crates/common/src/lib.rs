//! citedin Common Library
//!
//! Shared code for the citedin engine and its drivers:
//! - Citation graph data model (identifiers, adjacency maps, depth index)
//! - Citation fetcher abstraction and the E-utilities client
//! - Error types and handling
//! - Configuration management
//! - Paper URL parsing
//! - Metrics helpers

pub mod config;
pub mod errors;
pub mod fetcher;
pub mod metrics;
pub mod model;
pub mod paper_url;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use fetcher::{BatchProgress, CitationFetcher};
pub use model::{AdjacencyMap, DepthIndex, PaperId};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default E-utilities elink endpoint
pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/elink.fcgi";

/// Link name selecting "cited in" relations between PubMed records
pub const CITEDIN_LINKNAME: &str = "pubmed_pubmed_citedin";
