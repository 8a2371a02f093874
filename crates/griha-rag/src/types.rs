use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of the backend `properties` table.
///
/// Every numeric field is optional: a missing or unparseable value becomes
/// `None` at load time and the row stays usable for any filter that does not
/// depend on that field. `wealth_difference` is computed upstream (final
/// wealth buying minus final wealth renting) and is never recomputed here;
/// its sign is assumed to agree with `decision` but not re-verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyRecord {
    pub name: String,
    pub address: String,
    pub bedrooms: Option<i64>,
    /// Built-up area in square feet.
    pub area: Option<f64>,
    pub price: Option<f64>,
    pub rent: Option<f64>,
    pub monthly_emi: Option<f64>,
    pub total_tax_paid: Option<f64>,
    pub chosen_tax_regime: Option<String>,
    pub decision: Option<Decision>,
    pub wealth_difference: Option<f64>,
}

/// Backend buy-vs-rent verdict for a property.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    Buy,
    Rent,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Buy => "BUY",
            Decision::Rent => "RENT",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Decision::Buy),
            "RENT" => Ok(Decision::Rent),
            _ => Err(()),
        }
    }
}

/// Classified purpose of a user query. Exactly one intent per query;
/// classification is stateless and looks at the query text only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Intent {
    /// Subset listing ("show me 3 BHKs in New Town").
    Filter,
    /// Reasoning about one identified property ("why is X a BUY?").
    Explain,
    /// Ranked multi-property comparison.
    Compare,
    /// General concept question with no property binding.
    Educational,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Filter => "FILTER",
            Intent::Explain => "EXPLAIN",
            Intent::Compare => "COMPARE",
            Intent::Educational => "EDUCATIONAL",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin tag carried by every knowledge-base entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KnowledgeSource {
    /// Property-sourced entry built from an explanation record.
    CsvAnalysis,
    /// Static educational concept entry (carries a `topic` tag).
    EducationalConcept,
}

impl KnowledgeSource {
    pub fn tag(&self) -> &'static str {
        match self {
            KnowledgeSource::CsvAnalysis => "csv_analysis",
            KnowledgeSource::EducationalConcept => "educational_concept",
        }
    }
}

/// Static educational concept entry loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub topic: String,
    pub text: String,
}

/// Declared column of the backing table, used to ground SQL compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

/// Textual schema description of the `properties` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Render the schema the way the SQL compiler prompt expects it.
    pub fn describe(&self) -> String {
        let mut out = format!("Table: {}\nColumns:\n", self.table_name);
        for col in &self.columns {
            out.push_str(&format!("- {} ({})\n", col.name, col.sql_type));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_round_trip() {
        assert_eq!("BUY".parse::<Decision>(), Ok(Decision::Buy));
        assert_eq!("rent".parse::<Decision>(), Ok(Decision::Rent));
        assert_eq!(Decision::Buy.to_string(), "BUY");
        assert_eq!(Decision::Rent.to_string().parse::<Decision>(), Ok(Decision::Rent));
        assert!("HOLD".parse::<Decision>().is_err());
    }

    #[test]
    fn test_schema_describe() {
        let schema = TableSchema {
            table_name: "properties".to_string(),
            columns: vec![
                ColumnDef { name: "name".into(), sql_type: "TEXT".into() },
                ColumnDef { name: "price".into(), sql_type: "REAL".into() },
            ],
        };
        let text = schema.describe();
        assert!(text.starts_with("Table: properties"));
        assert!(text.contains("- name (TEXT)"));
        assert!(text.contains("- price (REAL)"));
    }
}
