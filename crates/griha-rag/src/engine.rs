//! Top-level question-answering engine wiring the pipeline stages together.

use std::fs;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::llm::{build_provider, LlmProvider};
use crate::rag::{explanation, intent, Composer, QueryCompiler, StructuredRetriever};
use crate::semantic::{load_concepts, HashEmbedder, KnowledgeBase};
use crate::storage::{PropertyTable, SqlExecutor, TableStats};
use crate::types::{Intent, PropertyRecord};

/// Everything one question produced, for callers that want more than the
/// final prose (the CLI prints `answer`; tests inspect the rest).
#[derive(Debug)]
pub struct EngineResponse {
    pub intent: Intent,
    pub answer: String,
    pub context: String,
    pub sql: Option<String>,
    pub records: Vec<PropertyRecord>,
}

pub struct RagEngine {
    config: RagConfig,
    retriever: StructuredRetriever,
    compiler: QueryCompiler,
    composer: Composer,
    knowledge: KnowledgeBase,
    provider: Box<dyn LlmProvider>,
}

impl RagEngine {
    /// Build the engine and hydrate the knowledge index from the current
    /// table contents. The API key is resolved by the caller, never read
    /// from the config file.
    pub fn new(config: RagConfig, api_key: Option<String>) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let table = PropertyTable::new(&config.table.csv_path, &config.table.city);
        let embedder = Box::new(HashEmbedder::new(config.semantic.dimension));
        let knowledge = KnowledgeBase::open(&config.data_dir, embedder);

        let records = table.load()?;
        let concepts = load_concepts(config.semantic.concepts_path.as_deref());
        knowledge.hydrate(&records, &concepts)?;

        let provider = build_provider(&config.llm, api_key)?;

        Ok(Self {
            retriever: StructuredRetriever::new(
                table,
                config.retrieval.filter_limit,
                config.retrieval.compare_count,
            ),
            compiler: QueryCompiler::new(config.table.city.clone()),
            composer: Composer::new(
                config.semantic.broad_k,
                config.semantic.educational_k,
                config.llm.temperature,
            ),
            knowledge,
            provider,
            config,
        })
    }

    /// Answer one question. Retrieval failures surface as errors; model
    /// failures degrade inside the stages and still produce an answer.
    pub async fn answer(&self, query: &str) -> Result<EngineResponse> {
        let intent = intent::classify(query, self.provider.as_ref()).await;
        tracing::info!(query, intent = %intent, "answering");

        let mut sql = None;
        let records = match intent {
            Intent::Filter if self.config.retrieval.use_sql_compiler => {
                match self.sql_retrieve(query).await {
                    Ok((compiled, rows)) => {
                        sql = Some(compiled);
                        rows
                    }
                    Err(RagError::QueryRejected(msg)) => {
                        // The rejection message is the whole answer.
                        return Ok(EngineResponse {
                            intent,
                            answer: msg.clone(),
                            context: msg,
                            sql: None,
                            records: Vec::new(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "SQL retrieval failed, using structured path");
                        self.retriever.retrieve(query, intent)?
                    }
                }
            }
            _ => self.retriever.retrieve(query, intent)?,
        };

        let context = if intent == Intent::Educational {
            "User asked a general educational question.".to_string()
        } else {
            explanation::build(&records)
        };

        let answer = self
            .composer
            .compose(query, intent, &context, &self.knowledge, self.provider.as_ref())
            .await;

        Ok(EngineResponse {
            intent,
            answer,
            context,
            sql,
            records,
        })
    }

    async fn sql_retrieve(&self, query: &str) -> Result<(String, Vec<PropertyRecord>)> {
        let table = self.retriever.table();
        let sql = self
            .compiler
            .compile(query, table, self.provider.as_ref())
            .await;
        let executor = SqlExecutor::from_rows(&table.load()?)?;
        let rows = executor.execute(&sql)?;
        Ok((sql, rows))
    }

    pub fn stats(&self) -> Result<TableStats> {
        let rows = self.retriever.table().load()?;
        Ok(PropertyTable::stats(&rows))
    }

    pub fn knowledge_len(&self) -> usize {
        self.knowledge.len()
    }

    pub fn is_online(&self) -> bool {
        self.provider.is_enabled()
    }
}
