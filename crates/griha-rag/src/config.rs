use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub data_dir: PathBuf,
    pub table: TableConfig,
    pub retrieval: RetrievalConfig,
    pub semantic: SemanticConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Finalized buy-vs-rent analysis CSV. Read fresh on every retrieval call.
    pub csv_path: PathBuf,
    /// The dataset's single implicit city. Never used as a location filter:
    /// every row is in this city and many address values omit it, so
    /// filtering by it would wrongly exclude valid rows.
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Row cap for FILTER results and for compiled queries without an
    /// explicit user-specified count.
    pub filter_limit: usize,
    /// Number of rows a COMPARE returns (top by wealth difference).
    pub compare_count: usize,
    /// When set, natural language is compiled to SQL by the LLM instead of
    /// going through the hand-written extraction rules. The extraction rules
    /// remain the fallback for compilation failures either way.
    pub use_sql_compiler: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Embedding dimension of the knowledge-base vector store.
    pub dimension: usize,
    /// Top-k for broad fallback retrieval (no source filter).
    pub broad_k: usize,
    /// Top-k for educational-tagged retrieval. Kept at 1 to avoid feeding
    /// the generator contradictory rule-of-thumb vs exact-methodology
    /// entries for the same concept.
    pub educational_k: usize,
    /// Optional JSON file of educational concept entries. Built-in defaults
    /// are used when absent.
    pub concepts_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat-completions endpoint base URL.
    pub base_url: String,
    pub model: String,
    /// Sampling temperature for response composition. Classification and
    /// SQL compilation always run at 0.0.
    pub temperature: f32,
    pub max_tokens: usize,
    /// Request timeout. A timed-out call takes the same failure branch as
    /// the corresponding provider error.
    pub timeout_secs: u64,
}

impl RagConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(RagError::Config(msg.to_string()));
        if self.retrieval.filter_limit == 0 {
            return fail("retrieval.filter_limit must be > 0");
        }
        if self.retrieval.compare_count < 2 {
            return fail("retrieval.compare_count must be >= 2");
        }
        if self.semantic.dimension == 0 {
            return fail("semantic.dimension must be > 0");
        }
        if self.semantic.broad_k == 0 || self.semantic.educational_k == 0 {
            return fail("semantic top-k values must be > 0");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return fail("llm.temperature must be in [0.0, 2.0]");
        }
        if self.llm.timeout_secs == 0 {
            return fail("llm.timeout_secs must be > 0");
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("failed to read config file: {}", e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RagError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("griha-rag");

        Self {
            data_dir,
            table: TableConfig {
                csv_path: PathBuf::from("kolkata_buy_vs_rent_full_analysis.csv"),
                city: "Kolkata".to_string(),
            },
            retrieval: RetrievalConfig {
                filter_limit: 5,
                compare_count: 2,
                use_sql_compiler: false,
            },
            semantic: SemanticConfig {
                dimension: 256,
                broad_k: 5,
                educational_k: 1,
                concepts_path: None,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: 0.2,
                max_tokens: 1024,
                timeout_secs: 60,
            },
        }
    }
}
