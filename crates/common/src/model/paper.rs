//! Paper identifier

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque token naming a paper (a PubMed id such as `"31452104"`).
///
/// Equality is exact string equality; no normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaperId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PaperId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PaperId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PaperId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_exact_equality() {
        assert_eq!(PaperId::from("100"), PaperId::new(String::from("100")));
        assert_ne!(PaperId::from("100"), PaperId::from("0100"));
    }

    #[test]
    fn test_lookup_by_str() {
        let set: BTreeSet<PaperId> = ["1".into(), "2".into()].into_iter().collect();
        assert!(set.contains("2"));
        assert!(!set.contains("3"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&PaperId::from("42")).unwrap();
        assert_eq!(json, "\"42\"");
    }
}
