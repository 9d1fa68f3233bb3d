//! Paper identifier extraction from reference page URLs
//!
//! Only PubMed article pages name a paper: the legacy
//! `www.ncbi.nlm.nih.gov/pubmed/<id>` form and `pubmed.ncbi.nlm.nih.gov/<id>`.

use crate::errors::{AppError, Result};
use crate::model::PaperId;
use regex_lite::Regex;
use std::sync::OnceLock;

fn paper_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Legacy www.ncbi.nlm.nih.gov/pubmed/<id> and pubmed.ncbi.nlm.nih.gov/<id>
        Regex::new(
            r"^https?://(?:www\.ncbi\.nlm\.nih\.gov/pubmed|pubmed\.ncbi\.nlm\.nih\.gov)/([0-9]+)/?(?:[?#].*)?$",
        )
        .expect("paper URL pattern is valid")
    })
}

/// Extract the paper id (final path segment) from an article page URL
pub fn paper_id_from_url(url: &str) -> Result<PaperId> {
    paper_url_pattern()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|id| PaperId::from(id.as_str()))
        .ok_or_else(|| AppError::InvalidPaperUrl {
            url: url.to_string(),
        })
}
