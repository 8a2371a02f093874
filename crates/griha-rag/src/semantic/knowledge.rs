//! Embedding-indexed knowledge base.
//!
//! Two entry populations with independent hydration checks: property
//! entries built from explanation-equivalent text (tag `csv_analysis`) and
//! static educational concept entries (tag `educational_concept`, each with
//! a `topic`). Hydration is idempotent and additive — a store holding
//! properties but missing concepts self-heals on the next startup — and
//! runs under a mutex so concurrent startup cannot double-insert. Callers
//! must treat every search failure as "no additional context", never fatal.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::rag::explanation;
use crate::semantic::embedder::EmbeddingModel;
use crate::semantic::vector_store::{KnowledgeDocument, VectorStore};
use crate::types::{ConceptEntry, KnowledgeSource, PropertyRecord};

/// Bump when the entry text format or embedder changes; persisted stores
/// from older versions are discarded and rebuilt.
pub const INDEX_VERSION: u32 = 1;

pub struct KnowledgeBase {
    store: Mutex<VectorStore>,
    embedder: Box<dyn EmbeddingModel>,
    store_path: PathBuf,
}

impl KnowledgeBase {
    /// The store dimension follows the embedder, so swapping in a model
    /// with a different output width invalidates the persisted index the
    /// same way a version bump does.
    pub fn open(data_dir: &Path, embedder: Box<dyn EmbeddingModel>) -> Self {
        let store_path = data_dir.join("knowledge_index.json");
        let store = VectorStore::load_or_new(&store_path, embedder.dimension(), INDEX_VERSION);
        Self {
            store: Mutex::new(store),
            embedder,
            store_path,
        }
    }

    /// Hydrate both entry populations. Safe to call on every startup.
    pub fn hydrate(&self, records: &[PropertyRecord], concepts: &[ConceptEntry]) -> Result<()> {
        let mut store = self.store.lock();
        let mut changed = false;

        let property_tag = KnowledgeSource::CsvAnalysis.tag();
        if store.count_by_metadata("source", property_tag) == 0 && !records.is_empty() {
            tracing::info!(count = records.len(), "Hydrating property knowledge entries");
            let texts: Vec<String> = records.iter().map(explanation::knowledge_text).collect();
            let embeddings = {
                let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                self.embedder.embed_documents(&refs)?
            };
            for (i, ((record, text), embedding)) in
                records.iter().zip(texts).zip(embeddings).enumerate()
            {
                let mut metadata = HashMap::new();
                metadata.insert("source".to_string(), property_tag.to_string());
                metadata.insert("name".to_string(), record.name.clone());
                metadata.insert("location".to_string(), record.address.clone());
                if let Some(decision) = record.decision {
                    metadata.insert("decision".to_string(), decision.as_str().to_string());
                }
                store.add(KnowledgeDocument {
                    id: format!("prop_{}", i),
                    text,
                    metadata,
                    embedding,
                })?;
            }
            changed = true;
        }

        // Concepts are probed independently of properties: the two populate
        // on different conditions, and a partial store must self-heal.
        let concept_tag = KnowledgeSource::EducationalConcept.tag();
        if store.count_by_metadata("source", concept_tag) == 0 && !concepts.is_empty() {
            tracing::info!(count = concepts.len(), "Hydrating educational concept entries");
            for concept in concepts {
                let embedding = self.embedder.embed_query(&concept.text)?;
                let mut metadata = HashMap::new();
                metadata.insert("source".to_string(), concept_tag.to_string());
                metadata.insert("topic".to_string(), concept.topic.clone());
                store.add(KnowledgeDocument {
                    id: format!("concept_{}", concept.topic),
                    text: concept.text.clone(),
                    metadata,
                    embedding,
                })?;
            }
            changed = true;
        }

        if changed {
            store.save(&self.store_path)?;
            tracing::info!(total = store.len(), "Knowledge base persisted");
        }
        Ok(())
    }

    /// Nearest-neighbor text lookup. Returns the top-k entry texts joined by
    /// blank lines, optionally restricted to one source tag.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        source: Option<KnowledgeSource>,
    ) -> Result<String> {
        let embedding = self.embedder.embed_query(query)?;
        let store = self.store.lock();
        let filter = source.map(|s| ("source", s.tag()));
        let results = store.search(&embedding, top_k, filter)?;
        Ok(results
            .into_iter()
            .map(|r| r.document.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    pub fn count_by_source(&self, source: KnowledgeSource) -> usize {
        self.store.lock().count_by_metadata("source", source.tag())
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

/// Built-in educational concept entries, used when no concepts file is
/// configured. Content mirrors the methodology the backend applies.
pub fn default_concepts() -> Vec<ConceptEntry> {
    let entries = [
        (
            "wealth_difference",
            "Wealth difference is the gap between simulated final net worth \
             under buying versus renting over a 20 year horizon. The backend \
             computes it per property; a positive value favors BUY and a \
             negative value favors RENT. It already accounts for EMI outflow, \
             rent outflow, investment of the monthly savings, and taxes.",
        ),
        (
            "rental_yield",
            "Rental yield is annual rent divided by property price, expressed \
             as a percentage. Residential yields in Indian metros typically \
             fall between 2% and 4%, which is why renting plus investing the \
             EMI-to-rent difference often beats buying in pure wealth terms.",
        ),
        (
            "emi",
            "An EMI (equated monthly installment) is the fixed monthly \
             payment on a home loan covering both principal and interest. The \
             backend computes each property's EMI from price, a standard \
             loan-to-value ratio, and prevailing rates; this system only \
             restates the computed value.",
        ),
        (
            "tax_regime",
            "India offers two income-tax regimes. The old regime allows \
             deductions such as Section 24(b) home-loan interest and 80C \
             principal repayment; the new regime has lower slab rates but \
             drops most deductions. The backend picks whichever regime \
             minimizes total tax for each scenario and reports it as the \
             chosen tax regime.",
        ),
        (
            "section_24b",
            "Section 24(b) of the Income Tax Act lets a borrower deduct \
             home-loan interest from taxable income, up to 2 lakh per year \
             for a self-occupied property under the old regime. It is one of \
             the main tax levers that can tilt a decision toward BUY.",
        ),
    ];
    entries
        .iter()
        .map(|(topic, text)| ConceptEntry {
            topic: (*topic).to_string(),
            text: (*text).to_string(),
        })
        .collect()
}

/// Load concept entries from a JSON file, or fall back to the built-ins.
pub fn load_concepts(path: Option<&Path>) -> Vec<ConceptEntry> {
    let Some(path) = path else {
        return default_concepts();
    };
    match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str::<Vec<ConceptEntry>>(&content).map_err(|e| e.to_string()))
    {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Concepts file unusable, using built-in concepts");
            default_concepts()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::embedder::HashEmbedder;
    use crate::types::Decision;

    fn sample_records() -> Vec<PropertyRecord> {
        vec![PropertyRecord {
            name: "Sunrise Towers".into(),
            address: "New Town".into(),
            bedrooms: Some(2),
            area: Some(950.0),
            price: Some(6_500_000.0),
            rent: Some(18_000.0),
            monthly_emi: Some(42_000.0),
            total_tax_paid: Some(310_000.0),
            chosen_tax_regime: Some("new".into()),
            decision: Some(Decision::Buy),
            wealth_difference: Some(1_200_000.0),
        }]
    }

    #[test]
    fn test_hydration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::open(dir.path(), Box::new(HashEmbedder::new(64)));

        let records = sample_records();
        let concepts = default_concepts();
        kb.hydrate(&records, &concepts).unwrap();
        let count_after_first = kb.len();
        kb.hydrate(&records, &concepts).unwrap();
        assert_eq!(kb.len(), count_after_first);
        assert_eq!(kb.count_by_source(KnowledgeSource::CsvAnalysis), 1);
        assert_eq!(
            kb.count_by_source(KnowledgeSource::EducationalConcept),
            concepts.len()
        );
    }

    #[test]
    fn test_partial_hydration_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::open(dir.path(), Box::new(HashEmbedder::new(64)));

        // First startup saw no concepts.
        kb.hydrate(&sample_records(), &[]).unwrap();
        assert_eq!(kb.count_by_source(KnowledgeSource::EducationalConcept), 0);

        // Second startup has them; properties are not duplicated.
        kb.hydrate(&sample_records(), &default_concepts()).unwrap();
        assert_eq!(kb.count_by_source(KnowledgeSource::CsvAnalysis), 1);
        assert!(kb.count_by_source(KnowledgeSource::EducationalConcept) > 0);
    }

    #[test]
    fn test_hydration_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let kb = KnowledgeBase::open(dir.path(), Box::new(HashEmbedder::new(64)));
            kb.hydrate(&sample_records(), &default_concepts()).unwrap();
        }
        let reopened = KnowledgeBase::open(dir.path(), Box::new(HashEmbedder::new(64)));
        assert_eq!(reopened.count_by_source(KnowledgeSource::CsvAnalysis), 1);
    }

    #[test]
    fn test_educational_filtered_search_only_returns_concepts() {
        let dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::open(dir.path(), Box::new(HashEmbedder::new(64)));
        kb.hydrate(&sample_records(), &default_concepts()).unwrap();

        let text = kb
            .search("what is section 24b", 1, Some(KnowledgeSource::EducationalConcept))
            .unwrap();
        assert!(!text.is_empty());
        assert!(!text.contains("Sunrise Towers"));
    }

    #[test]
    fn test_default_concepts_carry_topics() {
        let concepts = default_concepts();
        assert!(concepts.iter().any(|c| c.topic == "section_24b"));
        assert!(concepts.iter().all(|c| !c.text.is_empty()));
    }
}
