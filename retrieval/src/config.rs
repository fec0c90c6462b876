//! Configuration for corpus loading and retrieval.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::corpus::DocId;
use crate::error::{Result, RetrievalError};

/// Name of the optional title manifest inside the markdown directory.
pub const TITLE_MANIFEST: &str = "files.txt";

/// Extension of every document content file.
pub const CONTENT_EXTENSION: &str = "md";

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Manifest of `<docId>:<summary>` lines.
    pub summary_file: PathBuf,

    /// Directory holding `<docId>.md` files and the optional title manifest.
    pub markdown_dir: PathBuf,

    /// How many candidates the cosine stage keeps.
    pub top_emb: usize,

    /// How many candidates the rerank stage keeps.
    pub top_rerank: usize,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new(summary_file: impl Into<PathBuf>, markdown_dir: impl Into<PathBuf>) -> Self {
        Self {
            summary_file: summary_file.into(),
            markdown_dir: markdown_dir.into(),
            top_emb: 25,
            top_rerank: 5,
        }
    }

    /// Set the number of candidates kept by the cosine stage.
    pub fn with_top_emb(mut self, top_emb: usize) -> Self {
        self.top_emb = top_emb;
        self
    }

    /// Set the number of candidates kept by the rerank stage.
    pub fn with_top_rerank(mut self, top_rerank: usize) -> Self {
        self.top_rerank = top_rerank;
        self
    }

    /// Path of the title manifest.
    pub fn title_manifest_path(&self) -> PathBuf {
        self.markdown_dir.join(TITLE_MANIFEST)
    }

    /// Path of the content file for a document.
    pub fn content_path(&self, doc_id: DocId) -> PathBuf {
        self.markdown_dir
            .join(format!("{doc_id}.{CONTENT_EXTENSION}"))
    }

    /// Reject stage sizes that would always yield an empty context.
    pub fn validate(&self) -> Result<()> {
        if self.top_emb == 0 {
            return Err(RetrievalError::Config("top_emb must be at least 1".to_string()));
        }
        if self.top_rerank == 0 {
            return Err(RetrievalError::Config(
                "top_rerank must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new("./summary.txt", "./markdown")
    }
}
