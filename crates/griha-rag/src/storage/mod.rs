pub mod property_table;
pub mod sql;

pub use property_table::{PropertyTable, TableStats};
pub use sql::{violates_denylist, SqlExecutor, READ_ONLY_ERROR, SQL_DENYLIST};
