//! Final answer composition.
//!
//! Takes the explanation context built from retrieved rows, augments it
//! from the knowledge index where the context alone cannot answer, and
//! asks the LLM to write grounded prose. Composition never returns an
//! error: an out-of-quota or disabled model yields a deterministic
//! offline rendering of the same context, and any other generation
//! failure yields a labeled error string.

use crate::error::RagError;
use crate::llm::LlmProvider;
use crate::rag::explanation::NO_MATCH_SENTINEL;
use crate::semantic::KnowledgeBase;
use crate::types::{Intent, KnowledgeSource};

const COMPOSER_SYSTEM_PROMPT: &str = "\
You are a knowledgeable real estate investment assistant.
Answer the user's question using ONLY the context provided below.
Strict rules:
1. Never invent properties, prices, or figures not present in the context.
2. Never perform new calculations; every figure was computed by the backend. \
If asked for a figure the context lacks, say it is not available.
3. Mention every property record present in the context. Do not cherry-pick.
4. When a record's decision is RENT, make clear the recommendation is to rent \
a comparable property in that area, not to rent the listed for-sale property.
5. When a record's decision is BUY, frame the upside around equity \
accumulation rather than speculation.
6. If the context says no properties matched, say so plainly and suggest \
relaxing the criteria.
7. Quote monetary figures exactly as they appear in the context.
8. Keep the answer concise and conversational. No markdown tables.";

const OFFLINE_PREFIX: &str =
    "The language model is currently unavailable, so here is the raw analysis context:";

pub struct Composer {
    broad_k: usize,
    educational_k: usize,
    temperature: f32,
}

impl Composer {
    pub fn new(broad_k: usize, educational_k: usize, temperature: f32) -> Self {
        Self {
            broad_k,
            educational_k,
            temperature,
        }
    }

    /// Compose the user-facing answer. `context` is the explanation text
    /// built from the retrieved rows (or the no-match sentinel).
    pub async fn compose(
        &self,
        query: &str,
        intent: Intent,
        context: &str,
        knowledge: &KnowledgeBase,
        provider: &dyn LlmProvider,
    ) -> String {
        let augmented = self.augment(query, intent, context, knowledge);

        if !provider.is_enabled() {
            return offline_message(&augmented);
        }

        let user = format!("Context:\n{augmented}\n\nQuestion: {query}");
        match provider
            .generate(COMPOSER_SYSTEM_PROMPT, &user, self.temperature)
            .await
        {
            Ok(answer) => answer,
            // Out of quota is the one failure where the deterministic
            // context is still the right answer, just unpolished.
            Err(RagError::QuotaExhausted) => {
                tracing::warn!(query, "generation quota exhausted, returning offline rendering");
                offline_message(&augmented)
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "generation failed");
                format!("Error generating response: {e}")
            }
        }
    }

    /// Augmentation policy: educational questions are answered from the
    /// concept index alone; a no-match context gets a broad search over
    /// the whole index so the answer can still say something useful.
    /// Contexts that already carry property records pass through as-is.
    fn augment(
        &self,
        query: &str,
        intent: Intent,
        context: &str,
        knowledge: &KnowledgeBase,
    ) -> String {
        if intent == Intent::Educational {
            match knowledge.search(
                query,
                self.educational_k,
                Some(KnowledgeSource::EducationalConcept),
            ) {
                Ok(text) if !text.is_empty() => return text,
                Ok(_) => return context.to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "concept lookup failed");
                    return context.to_string();
                }
            }
        }

        if context == NO_MATCH_SENTINEL {
            match knowledge.search(query, self.broad_k, None) {
                Ok(text) if !text.is_empty() => {
                    return format!("{context}\n\nRelated background:\n{text}");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "broad knowledge lookup failed"),
            }
        }

        context.to_string()
    }
}

/// Deterministic rendering used when no model is available. The context
/// is already human-readable, so it is surfaced behind a short notice.
pub fn offline_message(context: &str) -> String {
    format!("{OFFLINE_PREFIX}\n\n{context}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledProvider;
    use crate::semantic::{default_concepts, HashEmbedder, KnowledgeBase};

    /// Provider that is nominally online but fails every call with a
    /// non-quota error.
    struct BrokenProvider;

    #[async_trait::async_trait]
    impl LlmProvider for BrokenProvider {
        async fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> crate::error::Result<String> {
            Err(RagError::Generation("connection reset".to_string()))
        }
    }

    fn fixture_knowledge(dir: &tempfile::TempDir) -> KnowledgeBase {
        let kb = KnowledgeBase::open(dir.path(), Box::new(HashEmbedder::new(64)));
        kb.hydrate(&[], &default_concepts()).unwrap();
        kb
    }

    #[tokio::test]
    async fn test_offline_compose_surfaces_context() {
        let dir = tempfile::tempdir().unwrap();
        let kb = fixture_knowledge(&dir);
        let composer = Composer::new(5, 1, 0.2);
        let context = "--- PROPERTY RECORD 1 ---\nName: Sunrise Towers";
        let answer = composer
            .compose("show flats", Intent::Filter, context, &kb, &DisabledProvider)
            .await;
        assert!(answer.starts_with(OFFLINE_PREFIX));
        assert!(answer.contains("Sunrise Towers"));
    }

    #[tokio::test]
    async fn test_non_quota_generation_error_yields_error_string() {
        let dir = tempfile::tempdir().unwrap();
        let kb = fixture_knowledge(&dir);
        let composer = Composer::new(5, 1, 0.2);
        let context = "--- PROPERTY RECORD 1 ---\nName: Sunrise Towers";
        let answer = composer
            .compose("show flats", Intent::Filter, context, &kb, &BrokenProvider)
            .await;
        assert!(answer.starts_with("Error generating response:"), "got: {answer}");
        assert!(answer.contains("connection reset"));
        // The offline rendering is reserved for the quota branch.
        assert!(!answer.starts_with(OFFLINE_PREFIX));
    }

    #[tokio::test]
    async fn test_educational_pulls_from_concept_index() {
        let dir = tempfile::tempdir().unwrap();
        let kb = fixture_knowledge(&dir);
        let composer = Composer::new(5, 1, 0.2);
        let answer = composer
            .compose(
                "what is rental yield?",
                Intent::Educational,
                "User asked a general educational question.",
                &kb,
                &DisabledProvider,
            )
            .await;
        // Offline rendering of the single best-matching concept.
        assert!(answer.contains("yield"), "got: {answer}");
    }

    #[tokio::test]
    async fn test_no_match_context_gets_background() {
        let dir = tempfile::tempdir().unwrap();
        let kb = fixture_knowledge(&dir);
        let composer = Composer::new(5, 1, 0.2);
        let answer = composer
            .compose(
                "5 bhk under 10L",
                Intent::Filter,
                NO_MATCH_SENTINEL,
                &kb,
                &DisabledProvider,
            )
            .await;
        assert!(answer.contains(NO_MATCH_SENTINEL));
        assert!(answer.contains("Related background:"));
    }
}
