//! Access-path planning and row providers for a partitioned, sort-key-indexed
//! key/document store exposed as a relational foreign table.
//!
//! A fetch flows through three layers:
//! - [`query`]: qualifiers plus the table's [`KeyTopology`](query::KeyTopology)
//!   are scored into candidate plans by the
//!   [`AccessPathPlanner`](query::AccessPathPlanner);
//! - [`provider`]: the winning [`RowProvider`](provider::RowProvider) pages
//!   through Query/Scan results, fans out per partition value, or runs a
//!   segmented parallel scan;
//! - [`table`]: [`ForeignTable`](table::ForeignTable) glues options, planner
//!   and a [`StorageClient`](provider::client::StorageClient) together.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod query;
pub mod table;

pub use config::{ScanOptions, TableOptions};
pub use error::{FdwError, Result};
pub use provider::client::{Page, QueryRequest, ScanRequest, Segment, StorageClient};
pub use provider::counters::Counters;
pub use provider::{ExplainContext, ProviderKind, RowProvider, RowStream};
pub use table::{FetchStream, ForeignTable, TableDefinition};
