pub mod embedder;
pub mod knowledge;
pub mod vector_store;

pub use embedder::{EmbeddingModel, HashEmbedder};
pub use knowledge::{default_concepts, load_concepts, KnowledgeBase, INDEX_VERSION};
pub use vector_store::{KnowledgeDocument, SearchResult, VectorStore};
