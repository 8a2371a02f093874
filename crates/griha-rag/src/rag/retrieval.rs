//! Deterministic structured retrieval over the property table.
//!
//! No model calls: bedroom counts come from a regex (digits and spelled-out
//! words), locations from matching known address terms, and the remaining
//! intents are row-level projections of those constraints.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::storage::PropertyTable;
use crate::types::{Intent, PropertyRecord};

static BEDROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*-?\s*(bhk|bedroom|bed)").expect("bedroom regex is valid")
});

/// Spelled-out bedroom counts. Checked as whole words after the digit
/// pattern fails, so "3 BHK" never reaches this table.
const WORD_NUMBERS: [(&str, i64); 6] = [
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
];

pub struct StructuredRetriever {
    table: PropertyTable,
    filter_limit: usize,
    compare_count: usize,
}

impl StructuredRetriever {
    pub fn new(table: PropertyTable, filter_limit: usize, compare_count: usize) -> Self {
        Self {
            table,
            filter_limit,
            compare_count,
        }
    }

    pub fn table(&self) -> &PropertyTable {
        &self.table
    }

    /// Retrieve the rows an intent needs. Always reads the table fresh so
    /// edits to the CSV between questions are visible immediately.
    pub fn retrieve(&self, query: &str, intent: Intent) -> Result<Vec<PropertyRecord>> {
        let records = self.table.load()?;

        let result = match intent {
            Intent::Filter => self.filter_rows(query, &records),
            Intent::Explain => self.explain_rows(query, &records),
            Intent::Compare => self.compare_rows(&records),
            // Concept questions are answered from the knowledge index, not rows.
            Intent::Educational => Vec::new(),
        };

        tracing::debug!(
            intent = %intent,
            matched = result.len(),
            total = records.len(),
            "structured retrieval"
        );
        Ok(result)
    }

    /// Conjunctive filtering: every extracted constraint must hold.
    /// With no constraints at all, every row matches (then truncated).
    fn filter_rows(&self, query: &str, records: &[PropertyRecord]) -> Vec<PropertyRecord> {
        let mut matched = self.matching_rows(query, records);
        matched.truncate(self.filter_limit);
        matched
    }

    /// The untruncated conjunctive match set, so EXPLAIN can tell a
    /// narrowing constraint from one that matched everything.
    fn matching_rows(&self, query: &str, records: &[PropertyRecord]) -> Vec<PropertyRecord> {
        let bedrooms = extract_bedrooms(query);
        let location = self.extract_location(query, records);

        records
            .iter()
            .filter(|r| {
                if let Some(n) = bedrooms {
                    if r.bedrooms != Some(n) {
                        return false;
                    }
                }
                if let Some(loc) = &location {
                    if !r.address.to_lowercase().contains(loc) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect()
    }

    /// EXPLAIN targets one property. A property name mentioned verbatim in
    /// the query wins; otherwise the filter constraints must narrow the set
    /// below the full table, and the first survivor is taken. A query whose
    /// constraints narrow nothing (none extracted, or every row matches) is
    /// ambiguous and yields no rows rather than an arbitrary one.
    fn explain_rows(&self, query: &str, records: &[PropertyRecord]) -> Vec<PropertyRecord> {
        let q = query.to_lowercase();

        if let Some(named) = records
            .iter()
            .find(|r| !r.name.is_empty() && q.contains(&r.name.to_lowercase()))
        {
            return vec![named.clone()];
        }

        let narrowed = self.matching_rows(query, records);
        if narrowed.len() == records.len() {
            return Vec::new();
        }
        narrowed.into_iter().take(1).collect()
    }

    /// COMPARE returns the top rows by wealth difference, descending, with
    /// missing values sorted last. The sort is stable so ties keep table
    /// order and repeated queries return identical output.
    fn compare_rows(&self, records: &[PropertyRecord]) -> Vec<PropertyRecord> {
        let mut rows: Vec<PropertyRecord> = records.to_vec();
        rows.sort_by(|a, b| {
            match (a.wealth_difference, b.wealth_difference) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        rows.truncate(self.compare_count);
        rows
    }

    /// Match the query against known location terms from the table,
    /// longest term first so "new town" beats "town".
    fn extract_location(&self, query: &str, records: &[PropertyRecord]) -> Option<String> {
        let q = query.to_lowercase();
        self.table
            .location_terms(records)
            .into_iter()
            .find(|t| q.contains(t.as_str()))
    }
}

/// Extract a bedroom count: "3 BHK", "2-bhk", "4 bedroom", "3bed", or a
/// spelled-out number followed by a bedroom word.
pub fn extract_bedrooms(query: &str) -> Option<i64> {
    let q = query.to_lowercase();

    if let Some(caps) = BEDROOM_RE.captures(&q) {
        if let Ok(n) = caps[1].parse::<i64>() {
            return Some(n);
        }
    }

    let has_bedroom_word = ["bhk", "bedroom", "bed"].iter().any(|w| q.contains(w));
    if has_bedroom_word {
        let words: Vec<&str> = q.split(|c: char| !c.is_ascii_alphanumeric()).collect();
        for (word, n) in WORD_NUMBERS {
            if words.contains(&word) {
                return Some(n);
            }
        }
    }

    None
}
