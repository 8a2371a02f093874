//! In-memory vector store with JSON persistence.
//!
//! Cosine-similarity search over a small corpus (one entry per property plus
//! a handful of concept entries), with optional metadata-tag pre-filtering.
//! The persisted file carries an explicit index version and the embeddings
//! themselves, so a restart can tell "empty on purpose" from "not yet
//! populated" without re-embedding anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{RagError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: KnowledgeDocument,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    index_version: u32,
    dimension: usize,
    saved_at: DateTime<Utc>,
    documents: Vec<KnowledgeDocument>,
}

pub struct VectorStore {
    dimension: usize,
    index_version: u32,
    documents: Vec<KnowledgeDocument>,
}

impl VectorStore {
    pub fn new(dimension: usize, index_version: u32) -> Self {
        Self {
            dimension,
            index_version,
            documents: Vec::new(),
        }
    }

    /// Load from disk. Returns a fresh empty store when the file is absent
    /// or was written by a different index version (stale markers are not
    /// trusted — the caller re-hydrates).
    pub fn load_or_new(path: &Path, dimension: usize, index_version: u32) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::new(dimension, index_version);
        };
        match serde_json::from_str::<StoreFile>(&content) {
            Ok(file) if file.index_version == index_version && file.dimension == dimension => {
                tracing::info!(
                    documents = file.documents.len(),
                    version = index_version,
                    saved_at = %file.saved_at,
                    "Vector store loaded from disk"
                );
                Self {
                    dimension,
                    index_version,
                    documents: file.documents,
                }
            }
            Ok(file) => {
                tracing::warn!(
                    found_version = file.index_version,
                    expected_version = index_version,
                    "Vector store version mismatch, rebuilding"
                );
                Self::new(dimension, index_version)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Vector store file unreadable, rebuilding");
                Self::new(dimension, index_version)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let file = StoreFile {
            index_version: self.index_version,
            dimension: self.dimension,
            saved_at: Utc::now(),
            documents: self.documents.clone(),
        };
        let encoded = serde_json::to_string(&file)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    pub fn add(&mut self, document: KnowledgeDocument) -> Result<()> {
        if document.embedding.len() != self.dimension {
            return Err(RagError::Semantic(format!(
                "embedding dimension {} does not match store dimension {}",
                document.embedding.len(),
                self.dimension
            )));
        }
        self.documents.push(document);
        Ok(())
    }

    /// Top-k cosine search, optionally pre-filtered by metadata tag equality.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<SearchResult>> {
        if query_embedding.len() != self.dimension {
            return Err(RagError::Semantic(format!(
                "query dimension {} does not match store dimension {}",
                query_embedding.len(),
                self.dimension
            )));
        }

        let mut results: Vec<SearchResult> = self
            .documents
            .iter()
            .filter(|doc| match filter {
                Some((key, value)) => doc.metadata.get(key).map(|v| v.as_str()) == Some(value),
                None => true,
            })
            .map(|doc| SearchResult {
                score: cosine_similarity(query_embedding, &doc.embedding),
                document: doc.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    pub fn count_by_metadata(&self, key: &str, value: &str) -> usize {
        self.documents
            .iter()
            .filter(|doc| doc.metadata.get(key).map(|v| v.as_str()) == Some(value))
            .count()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
