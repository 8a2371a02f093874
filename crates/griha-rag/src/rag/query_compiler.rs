//! LLM-backed compilation of natural language into a single SELECT.
//!
//! The prompt carries the live table schema so the model only references
//! real columns, and the output is scrubbed (code fences, prose preambles)
//! before the denylist gate. A heuristic fallback keeps the SQL path
//! usable when the model is unavailable or produces something unusable.

use std::sync::LazyLock;

use regex::Regex;

use crate::llm::LlmProvider;
use crate::rag::retrieval::extract_bedrooms;
use crate::storage::{violates_denylist, PropertyTable};

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:sql)?\s*(.*?)\s*```").expect("code fence regex is valid")
});

static SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bSELECT\b.*").expect("select regex is valid")
});

/// Indian shorthand amounts in WHERE clauses: "50L", "1.2 Cr", "75k".
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(cr|crore|l|lakh|lac|k)\b")
        .expect("amount regex is valid")
});

pub struct QueryCompiler {
    city: String,
}

impl QueryCompiler {
    pub fn new(city: impl Into<String>) -> Self {
        Self { city: city.into() }
    }

    fn system_prompt(&self, table: &PropertyTable) -> String {
        format!(
            "You are an expert SQLite query writer for a real estate analysis table.\n\
             {}\n\
             Rules:\n\
             1. Return ONLY the SQL query. No markdown, no explanation.\n\
             2. Use LIKE with wildcards for text matching (user spelling may be off): \
             WHERE address LIKE '%new town%'.\n\
             3. Never filter by the city name '{}' itself; every row is in that city. \
             Filter by the locality within it.\n\
             4. Amounts may use Indian shorthand: 1 Cr = 10000000, 1 L (lakh) = 100000, 1 k = 1000. \
             Strip currency symbols (Rs, INR) and expand to plain numbers.\n\
             5. 'worth buying' or 'should I buy' means decision = 'BUY'; \
             'better to rent' means decision = 'RENT'.\n\
             6. 'best' in a buying context means ORDER BY wealth_difference DESC; \
             'best' in a renting context means ORDER BY wealth_difference ASC \
             (or rent ASC when the user is budget-focused); \
             when the user asks for the cheapest, ORDER BY price ASC.\n\
             7. Always end with LIMIT 5, unless the user asked for a specific count.\n\
             8. SELECT only. Never modify data.",
            table.schema().describe(),
            self.city
        )
    }

    /// Compile the query, or fall back to a heuristic SELECT when the model
    /// is disabled, errors, or returns something that is not a clean SELECT.
    pub async fn compile(
        &self,
        query: &str,
        table: &PropertyTable,
        provider: &dyn LlmProvider,
    ) -> String {
        if !provider.is_enabled() {
            return self.fallback_query(query, table);
        }

        let system = self.system_prompt(table);
        match provider.generate(&system, query, 0.0).await {
            Ok(raw) => {
                let sql = clean_response(&raw);
                if sql.is_empty() || violates_denylist(&sql) {
                    tracing::warn!(query, raw, "Unusable compiled SQL, using heuristic fallback");
                    self.fallback_query(query, table)
                } else {
                    tracing::debug!(query, sql, "compiled SQL");
                    sql
                }
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "SQL compilation failed, using heuristic fallback");
                self.fallback_query(query, table)
            }
        }
    }

    /// Deterministic SELECT from the same extraction rules the structured
    /// retriever uses, so offline behavior matches the non-SQL path.
    pub fn fallback_query(&self, query: &str, table: &PropertyTable) -> String {
        let mut clauses: Vec<String> = Vec::new();

        if let Some(n) = extract_bedrooms(query) {
            clauses.push(format!("bedrooms = {n}"));
        }

        let q = query.to_lowercase();
        if let Ok(rows) = table.load() {
            let terms = table.location_terms(&rows);
            if let Some(term) = terms.into_iter().find(|t| q.contains(t.as_str())) {
                let escaped = term.replace('\'', "''");
                clauses.push(format!("address LIKE '%{escaped}%'"));
            }
        }

        let mut rent_context = false;
        if q.contains("buy") || q.contains("worth buying") {
            clauses.push("decision = 'BUY'".to_string());
        } else if q.contains("rent") {
            clauses.push("decision = 'RENT'".to_string());
            rent_context = true;
        }

        if let Some(cap) = AMOUNT_RE.captures(&q) {
            if let Ok(value) = cap[1].parse::<f64>() {
                let amount = normalize_amount(value, &cap[2]);
                let cmp = if q.contains("under") || q.contains("below") || q.contains("less than") {
                    "<="
                } else if q.contains("over") || q.contains("above") || q.contains("more than") {
                    ">="
                } else {
                    "<="
                };
                // A budget in rent context bounds the monthly rent, not
                // the purchase price.
                let column = if rent_context { "rent" } else { "price" };
                clauses.push(format!("{column} {cmp} {amount}"));
            }
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        format!("SELECT * FROM properties{where_clause} LIMIT 5")
    }
}

/// Expand Indian amount shorthand into a plain integer string.
pub fn normalize_amount(value: f64, unit: &str) -> String {
    let multiplier = match unit.to_lowercase().as_str() {
        "cr" | "crore" => 10_000_000.0,
        "l" | "lakh" | "lac" => 100_000.0,
        "k" => 1_000.0,
        _ => 1.0,
    };
    format!("{}", (value * multiplier).round() as i64)
}

/// Strip markdown fences and any prose before the first SELECT, then
/// drop a trailing semicolon.
pub fn clean_response(raw: &str) -> String {
    let body = match FENCE_RE.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    };
    let sql = match SELECT_RE.find(&body) {
        Some(m) => m.as_str().trim(),
        None => return String::new(),
    };
    sql.trim_end_matches(';').trim().to_string()
}
