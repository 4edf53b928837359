use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// A term whose document frequency over the corpus size exceeds this is eliminated.
    pub elimination_threshold: f64,
    /// Factor applied to a document's importance score in importance-aware ranking.
    pub importance_multiplier: f64,
    /// Reject merges whose sources share document ids.
    pub strict_merge: bool,
    /// Distinct terms held in memory during ingestion before postings are written back.
    pub insert_buffer_terms: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            elimination_threshold: 0.9,
            importance_multiplier: 1.0,
            strict_merge: true,
            insert_buffer_terms: 50_000,
        }
    }
}

impl IndexConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| IndexError::Config(format!("{}: {e}", path.display())))?;
        let cfg: IndexConfig = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| IndexError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.elimination_threshold.is_finite() || self.elimination_threshold < 0.0 {
            return Err(IndexError::Config(format!(
                "elimination_threshold must be a non-negative number, got {}",
                self.elimination_threshold
            )));
        }
        if !self.importance_multiplier.is_finite() || self.importance_multiplier < 0.0 {
            return Err(IndexError::Config(format!(
                "importance_multiplier must be a non-negative number, got {}",
                self.importance_multiplier
            )));
        }
        if self.insert_buffer_terms == 0 {
            return Err(IndexError::Config("insert_buffer_terms must be at least 1".into()));
        }
        Ok(())
    }
}
