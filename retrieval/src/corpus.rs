//! The immutable corpus index.
//!
//! A [`CorpusIndex`] is built once at startup from the summary manifest, the
//! optional title manifest and one markdown file per document, then shared
//! read-only across requests. `documents[i]` and `embeddings[i]` always
//! describe the same document.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use lento_embeddings::{Embedding, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};

/// Document identifier as written in the manifests.
pub type DocId = i64;

/// Source-file suffixes stripped, in this order, to turn a filename into a title.
const TITLE_SUFFIXES: [&str; 7] = [".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx"];

/// A document in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier from the manifest.
    pub doc_id: DocId,

    /// Title derived from the original filename; empty when unknown.
    pub title: String,

    /// Full markdown content.
    pub content: String,

    /// Short summary used for embedding and reranking.
    pub summary: String,
}

/// Documents and their summary embeddings, aligned by position.
pub struct CorpusIndex {
    documents: Vec<Document>,
    embeddings: Vec<Embedding>,
    positions: HashMap<DocId, usize>,
}

impl CorpusIndex {
    /// Load the documents named by `config` and embed their summaries.
    pub async fn build(config: &RetrievalConfig, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let documents = load_documents(config).await?;
        let summaries: Vec<String> = documents.iter().map(|d| d.summary.clone()).collect();

        info!(
            "Embedding {} document summaries with {}",
            summaries.len(),
            embedder.model()
        );
        let embeddings = embedder.embed(&summaries).await?;

        let index = Self::from_parts(documents, embeddings)?;
        info!("total {} documents", index.len());
        Ok(index)
    }

    /// Assemble an index from documents and their already computed embeddings.
    pub fn from_parts(documents: Vec<Document>, embeddings: Vec<Embedding>) -> Result<Self> {
        if documents.len() != embeddings.len() {
            return Err(RetrievalError::Misaligned {
                documents: documents.len(),
                embeddings: embeddings.len(),
            });
        }

        let mut positions = HashMap::with_capacity(documents.len());
        for (position, doc) in documents.iter().enumerate() {
            if positions.insert(doc.doc_id, position).is_some() {
                warn!(
                    "Duplicate document id {}; lookups resolve to position {position}",
                    doc.doc_id
                );
            }
        }

        Ok(Self {
            documents,
            embeddings,
            positions,
        })
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus has no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents in load order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// All summary embeddings, aligned with [`Self::documents`].
    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// Document at a position.
    pub fn document(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    /// Position of a document id.
    pub fn position_of(&self, doc_id: DocId) -> Option<usize> {
        self.positions.get(&doc_id).copied()
    }

    /// Document with the given id.
    pub fn get_by_id(&self, doc_id: DocId) -> Option<&Document> {
        self.position_of(doc_id).and_then(|p| self.document(p))
    }
}

/// Read the manifests and content files named by `config`.
///
/// Summary-manifest lines without a colon are skipped; a line whose id does
/// not parse aborts the load, as does a missing content file.
pub async fn load_documents(config: &RetrievalConfig) -> Result<Vec<Document>> {
    let titles = load_titles(&config.title_manifest_path()).await?;

    let manifest = fs::read_to_string(&config.summary_file)
        .await
        .map_err(|source| RetrievalError::Io {
            path: config.summary_file.clone(),
            source,
        })?;

    let mut documents = Vec::new();
    for (line_no, line) in manifest.lines().enumerate() {
        let Some((id, summary)) = line.split_once(':') else {
            continue;
        };

        let doc_id: DocId = id.parse().map_err(|_| RetrievalError::InvalidDocId {
            path: config.summary_file.clone(),
            line: line_no + 1,
            id: id.to_string(),
        })?;

        let path = config.content_path(doc_id);
        let content = fs::read(&path)
            .await
            .map_err(|source| RetrievalError::DocumentRead {
                doc_id,
                path,
                source,
            })?;

        let doc = Document {
            doc_id,
            title: titles.get(&doc_id).cloned().unwrap_or_default(),
            content: String::from_utf8_lossy(&content).into_owned(),
            summary: summary.to_string(),
        };
        debug!("doc {}: {}", doc.doc_id, doc.title);
        documents.push(doc);
    }

    Ok(documents)
}

/// Read the title manifest; a missing file means no titles.
async fn load_titles(path: &Path) -> Result<HashMap<DocId, String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(parse_title_manifest(&text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No title manifest at {}", path.display());
            Ok(HashMap::new())
        }
        Err(source) => Err(RetrievalError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse `<docId>:<filename>` lines. Malformed lines are skipped.
pub fn parse_title_manifest(text: &str) -> HashMap<DocId, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(id, filename)| {
            let doc_id = id.parse::<DocId>().ok()?;
            Some((doc_id, title_from_filename(filename)))
        })
        .collect()
}

/// Strip known document extensions from a filename.
pub fn title_from_filename(filename: &str) -> String {
    TITLE_SUFFIXES
        .iter()
        .fold(filename, |title, suffix| {
            title.strip_suffix(suffix).unwrap_or(title)
        })
        .to_string()
}
