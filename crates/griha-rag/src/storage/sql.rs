//! In-memory SQLite mirror of the property table for the compiled-query path.
//!
//! The mirror is rebuilt from the CSV rows on construction; the SQL layer
//! never writes back. Execution refuses anything that is not a plain SELECT:
//! a case-insensitive substring scan against a fixed denylist of mutating
//! keywords runs before the statement ever reaches SQLite. The scan is
//! deliberately conservative — a location literally named "INSERT Town"
//! would be rejected too, an acceptable tradeoff given no such data exists.

use rusqlite::Connection;
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::types::{Decision, PropertyRecord};

/// Mutating keywords that cause execution refusal.
pub const SQL_DENYLIST: [&str; 5] = ["DROP", "DELETE", "INSERT", "UPDATE", "ALTER"];

/// Fixed user-facing rejection message, verbatim.
pub const READ_ONLY_ERROR: &str = "Error: Only SELECT queries are permitted.";

pub struct SqlExecutor {
    conn: Connection,
}

impl SqlExecutor {
    /// Build the in-memory `properties` table from loaded rows.
    pub fn from_rows(rows: &[PropertyRecord]) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE properties (
                name TEXT,
                address TEXT,
                bedrooms INTEGER,
                area REAL,
                price REAL,
                rent REAL,
                monthly_emi REAL,
                total_tax_paid REAL,
                chosen_tax_regime TEXT,
                decision TEXT,
                wealth_difference REAL
            )",
            [],
        )?;

        {
            let mut stmt = conn.prepare(
                "INSERT INTO properties VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.name,
                    row.address,
                    row.bedrooms,
                    row.area,
                    row.price,
                    row.rent,
                    row.monthly_emi,
                    row.total_tax_paid,
                    row.chosen_tax_regime,
                    row.decision.map(|d| d.as_str().to_string()),
                    row.wealth_difference,
                ])?;
            }
        }

        Ok(Self { conn })
    }

    /// Execute a read-only query and return matching rows.
    ///
    /// Rejected queries (denylisted keyword, or not starting with SELECT)
    /// return [`RagError::QueryRejected`] carrying the fixed message and are
    /// never handed to SQLite.
    pub fn execute(&self, query: &str) -> Result<Vec<PropertyRecord>> {
        if violates_denylist(query) || !query.trim_start().to_uppercase().starts_with("SELECT") {
            return Err(RagError::QueryRejected(READ_ONLY_ERROR.to_string()));
        }

        let mut stmt = self
            .conn
            .prepare(query)
            .map_err(|e| RagError::Sql(e.to_string()))?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(|c| c.to_string()).collect();

        let rows = stmt
            .query_map([], |row| Ok(read_record(&column_names, row)))
            .map_err(|e| RagError::Sql(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RagError::Sql(e.to_string()))?;

        Ok(rows)
    }
}

/// Case-insensitive substring scan against the mutating-keyword denylist.
pub fn violates_denylist(query: &str) -> bool {
    let upper = query.to_uppercase();
    SQL_DENYLIST.iter().any(|kw| upper.contains(kw))
}

fn read_record(columns: &[String], row: &rusqlite::Row<'_>) -> PropertyRecord {
    let text = |name: &str| -> String {
        columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| row.get::<_, Option<String>>(i).ok().flatten())
            .unwrap_or_default()
    };
    let real = |name: &str| -> Option<f64> {
        columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| row.get::<_, Option<f64>>(i).ok().flatten())
    };
    let int = |name: &str| -> Option<i64> {
        columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| row.get::<_, Option<i64>>(i).ok().flatten())
    };

    let regime = text("chosen_tax_regime");
    PropertyRecord {
        name: text("name"),
        address: text("address"),
        bedrooms: int("bedrooms"),
        area: real("area"),
        price: real("price"),
        rent: real("rent"),
        monthly_emi: real("monthly_emi"),
        total_tax_paid: real("total_tax_paid"),
        chosen_tax_regime: if regime.is_empty() { None } else { Some(regime) },
        decision: Decision::from_str(&text("decision")).ok(),
        wealth_difference: real("wealth_difference"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<PropertyRecord> {
        vec![
            PropertyRecord {
                name: "Sunrise Towers".into(),
                address: "Action Area I, New Town".into(),
                bedrooms: Some(2),
                area: Some(950.0),
                price: Some(6_500_000.0),
                rent: Some(18_000.0),
                monthly_emi: Some(42_000.0),
                total_tax_paid: Some(310_000.0),
                chosen_tax_regime: Some("new".into()),
                decision: Some(Decision::Buy),
                wealth_difference: Some(1_200_000.0),
            },
            PropertyRecord {
                name: "Garia Green Residency".into(),
                address: "Garia".into(),
                bedrooms: Some(3),
                area: Some(1250.0),
                price: Some(8_200_000.0),
                rent: Some(22_000.0),
                monthly_emi: Some(55_000.0),
                total_tax_paid: None,
                chosen_tax_regime: Some("old".into()),
                decision: Some(Decision::Rent),
                wealth_difference: Some(-800_000.0),
            },
        ]
    }

    #[test]
    fn test_select_round_trips_rows() {
        let executor = SqlExecutor::from_rows(&sample_rows()).unwrap();
        let rows = executor
            .execute("SELECT * FROM properties WHERE bedrooms = 2")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Sunrise Towers");
        assert_eq!(rows[0].decision, Some(Decision::Buy));
        assert_eq!(rows[0].total_tax_paid, Some(310_000.0));
    }

    #[test]
    fn test_drop_rejected_any_case() {
        let executor = SqlExecutor::from_rows(&sample_rows()).unwrap();
        for query in ["DROP TABLE properties", "drop table properties", "SELECT 1; dRoP TABLE properties"] {
            let err = executor.execute(query).unwrap_err();
            assert_eq!(err.to_string(), READ_ONLY_ERROR);
        }
    }

    #[test]
    fn test_non_select_rejected() {
        let executor = SqlExecutor::from_rows(&sample_rows()).unwrap();
        let err = executor.execute("PRAGMA table_info(properties)").unwrap_err();
        assert_eq!(err.to_string(), READ_ONLY_ERROR);
    }

    #[test]
    fn test_null_columns_come_back_as_none() {
        let executor = SqlExecutor::from_rows(&sample_rows()).unwrap();
        let rows = executor
            .execute("SELECT * FROM properties WHERE name = 'Garia Green Residency'")
            .unwrap();
        assert_eq!(rows[0].total_tax_paid, None);
    }
}
