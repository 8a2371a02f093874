//! griha-rag: retrieval-augmented question answering over a residential
//! buy-vs-rent analysis table.
//!
//! The pipeline classifies each question into one of four intents, pulls
//! the relevant rows (deterministically, or through a compiled read-only
//! SELECT), renders them into an explanation context, augments that
//! context from a persistent semantic knowledge index, and composes the
//! final answer. Every model-dependent stage degrades gracefully when no
//! model is available.

pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod rag;
pub mod semantic;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use engine::{EngineResponse, RagEngine};
pub use error::{RagError, Result};
pub use types::{Decision, Intent, PropertyRecord};
