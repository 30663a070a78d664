//! Tabular input handling
//!
//! Turns the request's JSON records into typed columns and computes the
//! statistics the specialists build on.

pub mod stats;
pub mod table;

pub use stats::{correlation, describe, missing_values, value_counts, ColumnSummary, CorrelationMatrix, ValueCount};
pub use table::{Cell, Column, ColumnKind, TabularDataset};
