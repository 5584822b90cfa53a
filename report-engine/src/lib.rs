//! FILENAME: report-engine/src/lib.rs
//! Report composition subsystem for crosstab results.
//!
//! This crate post-processes the tables the crosstab engine assembles. It
//! depends on `crosstab-engine` for the view structures and on `model` for
//! shared types.
//!
//! Layers:
//! - `compose`: Empty-column removal and the composition entry point
//! - `merge`: Dual-entity sub-table merges (flat and nested)

pub mod compose;
pub mod merge;

pub use compose::{compose_report, remove_empty_columns, run_crosstab};
pub use merge::{merge_flat, merge_nested};

#[cfg(test)]
mod tests;
