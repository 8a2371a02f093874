//! CSV-backed `properties` table.
//!
//! The table is read-only at this layer and read fresh on every retrieval
//! call, so table order is always preserve-as-loaded order. Column names are
//! lower-cased and underscore-normalized so the structured retriever and the
//! SQL compiler see one naming convention.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::types::{ColumnDef, Decision, PropertyRecord, TableSchema};

pub struct PropertyTable {
    csv_path: PathBuf,
    city: String,
}

/// Quick dataset stats for the CLI banner.
#[derive(Debug, Clone)]
pub struct TableStats {
    pub total: usize,
    pub avg_price: Option<f64>,
    pub avg_area: Option<f64>,
}

impl PropertyTable {
    pub fn new(csv_path: impl Into<PathBuf>, city: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            city: city.into().to_lowercase(),
        }
    }

    /// Load every row. Missing or unparseable numeric fields become `None`;
    /// a bad cell never fails the load.
    pub fn load(&self) -> Result<Vec<PropertyRecord>> {
        let mut reader = csv::Reader::from_path(&self.csv_path).map_err(|e| {
            RagError::Table(format!(
                "cannot open {}: {}",
                self.csv_path.display(),
                e
            ))
        })?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(normalize_column_name)
            .collect();
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(parse_row(&index, &record));
        }

        tracing::debug!(rows = rows.len(), path = %self.csv_path.display(), "Property table loaded");
        Ok(rows)
    }

    /// Textual schema description handed to the SQL compiler. Column names
    /// match the normalized CSV headers and the SQLite mirror exactly.
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            table_name: "properties".to_string(),
            columns: vec![
                col("name", "TEXT"),
                col("address", "TEXT"),
                col("bedrooms", "INTEGER"),
                col("area", "REAL"),
                col("price", "REAL"),
                col("rent", "REAL"),
                col("monthly_emi", "REAL"),
                col("total_tax_paid", "REAL"),
                col("chosen_tax_regime", "TEXT"),
                col("decision", "TEXT"),
                col("wealth_difference", "REAL"),
            ],
        }
    }

    /// Candidate location terms for query matching: every distinct address
    /// value plus its comma-separated segments, lowered, longest first so a
    /// specific sub-area wins over a generic one. The implicit city is
    /// excluded — filtering by it would drop rows whose address omits it.
    pub fn location_terms(&self, rows: &[PropertyRecord]) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for row in rows {
            let full = row.address.trim().to_lowercase();
            if full.is_empty() {
                continue;
            }
            for candidate in std::iter::once(full.as_str()).chain(full.split(',')) {
                let term = candidate.trim().to_string();
                if term.len() < 3 || term == self.city || terms.contains(&term) {
                    continue;
                }
                terms.push(term);
            }
        }
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms
    }

    pub fn stats(rows: &[PropertyRecord]) -> TableStats {
        TableStats {
            total: rows.len(),
            avg_price: mean(rows.iter().filter_map(|r| r.price)),
            avg_area: mean(rows.iter().filter_map(|r| r.area)),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        None
    } else {
        Some(collected.iter().sum::<f64>() / collected.len() as f64)
    }
}

fn col(name: &str, sql_type: &str) -> ColumnDef {
    ColumnDef {
        name: name.to_string(),
        sql_type: sql_type.to_string(),
    }
}

/// Lower-case, drop parentheses, replace spaces with underscores.
/// "Monthly EMI" -> "monthly_emi", "Area (sqft)" -> "area_sqft".
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .collect::<String>()
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn parse_row(index: &HashMap<&str, usize>, record: &csv::StringRecord) -> PropertyRecord {
    let text = |name: &str| -> String {
        index
            .get(name)
            .and_then(|i| record.get(*i))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let opt_text = |name: &str| -> Option<String> {
        let value = text(name);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    };

    PropertyRecord {
        name: text("name"),
        address: text("address"),
        bedrooms: parse_num::<i64>(&text("bedrooms")),
        area: parse_num::<f64>(&text("area")),
        price: parse_num::<f64>(&text("price")),
        rent: parse_num::<f64>(&text("rent")),
        monthly_emi: parse_num::<f64>(&text("monthly_emi")),
        total_tax_paid: parse_num::<f64>(&text("total_tax_paid")),
        chosen_tax_regime: opt_text("chosen_tax_regime"),
        decision: text("decision").parse::<Decision>().ok(),
        wealth_difference: parse_num::<f64>(&text("wealth_difference")),
    }
}

/// Parse a numeric cell, tolerating thousands separators and currency noise.
fn parse_num<T: FromStr>(raw: &str) -> Option<T> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "Name,Address,Bedrooms,Area,Price,Rent,Monthly EMI,Total Tax Paid,Chosen Tax Regime,Decision,Wealth Difference"
        )
        .unwrap();
        writeln!(
            file,
            "Sunrise Towers,\"Action Area I, New Town\",2,950,6500000,18000,42000,310000,new,BUY,1200000"
        )
        .unwrap();
        writeln!(
            file,
            "Garia Green Residency,Garia,3,1250,,22000,55000,,old,RENT,-800000"
        )
        .unwrap();
        file
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Monthly EMI"), "monthly_emi");
        assert_eq!(normalize_column_name("Area (sqft)"), "area_sqft");
        assert_eq!(normalize_column_name("  Wealth Difference "), "wealth_difference");
    }

    #[test]
    fn test_load_coerces_missing_numerics_to_none() {
        let file = fixture_csv();
        let table = PropertyTable::new(file.path(), "Kolkata");
        let rows = table.load().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bedrooms, Some(2));
        assert_eq!(rows[0].decision, Some(Decision::Buy));
        assert_eq!(rows[1].price, None);
        assert_eq!(rows[1].total_tax_paid, None);
        assert_eq!(rows[1].wealth_difference, Some(-800000.0));
    }

    #[test]
    fn test_location_terms_longest_first_and_city_excluded() {
        let file = fixture_csv();
        let table = PropertyTable::new(file.path(), "Kolkata");
        let rows = table.load().unwrap();
        let terms = table.location_terms(&rows);
        assert!(terms.contains(&"new town".to_string()));
        assert!(terms.contains(&"garia".to_string()));
        assert!(!terms.contains(&"kolkata".to_string()));
        // Full address sorts before its shorter segments.
        let full_pos = terms.iter().position(|t| t == "action area i, new town").unwrap();
        let seg_pos = terms.iter().position(|t| t == "new town").unwrap();
        assert!(full_pos < seg_pos);
    }

    #[test]
    fn test_stats() {
        let file = fixture_csv();
        let table = PropertyTable::new(file.path(), "Kolkata");
        let rows = table.load().unwrap();
        let stats = PropertyTable::stats(&rows);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.avg_price, Some(6500000.0));
    }
}
