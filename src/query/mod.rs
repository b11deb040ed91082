#![forbid(unsafe_code)]

//! Predicate model, key topology and access-path planning.
//!
//! Qualifiers and a table's key topology go in; a scored
//! [`RowProvider`](crate::provider::RowProvider) comes out.

/// Store-native values and records.
pub mod value;

/// Relational filter qualifiers supplied per fetch.
pub mod qualifier;

/// Partition/sort keys and secondary indexes of a table.
///
/// Bound once per table, programmatically or from column options.
pub mod topology;

/// Native key-condition vocabulary and Query parameters.
pub mod condition;

/// Translation of sort-side qualifiers into native range conditions.
pub mod sort_key;

/// Candidate enumeration, scoring and selection.
pub mod planner;

pub use condition::{ComparisonOperator, KeyCondition, QueryParams};
pub use planner::{AccessPathPlanner, CandidatePlan};
pub use qualifier::{Operator, QualValue, Qualifier};
pub use topology::{ColumnDefinition, GlobalIndex, KeyField, KeyTopology, LocalIndex};
pub use value::{Record, Value};
