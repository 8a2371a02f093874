//! The question-answering pipeline: intent classification, structured and
//! SQL-backed retrieval, explanation context, and final composition.

pub mod composer;
pub mod explanation;
pub mod intent;
pub mod query_compiler;
pub mod retrieval;

pub use composer::Composer;
pub use explanation::NO_MATCH_SENTINEL;
pub use query_compiler::QueryCompiler;
pub use retrieval::StructuredRetriever;
