use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Table error: {0}")]
    Table(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQL error: {0}")]
    Sql(String),

    /// Compiled query refused by the mutating-keyword denylist.
    /// The message is the fixed user-facing string, verbatim.
    #[error("{0}")]
    QueryRejected(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Compilation error: {0}")]
    Compilation(String),

    #[error("Generation error: {0}")]
    Generation(String),

    /// API credits exhausted, or generation deliberately disabled.
    /// Callers map this to the offline-mode response.
    #[error("Generation quota exhausted")]
    QuotaExhausted,

    #[error("Semantic index error: {0}")]
    Semantic(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
