//! Database row structs and their conversions into domain types.
//!
//! Rows keep the raw column encodings (status ids, format names). Each row
//! converts into its `shelfmark-core` counterpart with `TryFrom`, rejecting
//! values the schema constraints should have made impossible.

pub mod assignment;
pub mod campaign;
pub mod reader;

use shelfmark_core::error::CoreError;

/// A stored value that does not decode into its domain type.
pub(crate) fn corrupt_row(table: &str, id: i64, detail: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("Corrupt {table} row {id}: {detail}"))
}
