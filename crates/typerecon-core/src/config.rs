//! Reconstructor configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructorConfig {
    /// Read `@var`, `@return` and `@param` tags from doc comments
    pub use_doc_comments: bool,
    /// Cap on worklist rounds; `None` uses the number of operands
    pub max_rounds: Option<usize>,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            use_doc_comments: true,
            max_rounds: None,
        }
    }
}

impl ReconstructorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore doc-comment annotations; untyped declarations fall back to mixed.
    pub fn ignore_doc_comments(mut self) -> Self {
        self.use_doc_comments = false;
        self
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub(crate) fn round_limit(&self, operands: usize) -> usize {
        self.max_rounds.unwrap_or(operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconstructorConfig::default();
        assert!(config.use_doc_comments);
        assert_eq!(config.round_limit(42), 42);
    }

    #[test]
    fn test_builder() {
        let config = ReconstructorConfig::new().ignore_doc_comments().with_max_rounds(3);
        assert!(!config.use_doc_comments);
        assert_eq!(config.round_limit(42), 3);
    }

    #[test]
    fn test_partial_json() {
        let config: ReconstructorConfig = serde_json::from_str(r#"{"max_rounds": 5}"#).unwrap();
        assert!(config.use_doc_comments);
        assert_eq!(config.max_rounds, Some(5));
    }
}
