//! Per-table facade tying options, key topology and a storage client together.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TableOptions;
use crate::error::Result;
use crate::provider::client::StorageClient;
use crate::provider::counters::Counters;
use crate::provider::{ExplainContext, ProviderKind, RowProvider, RowStream};
use crate::query::planner::{AccessPathPlanner, CandidatePlan};
use crate::query::qualifier::Qualifier;
use crate::query::topology::{ColumnDefinition, KeyTopology};
use crate::query::value::Record;

/// Declarative table description: host options, columns, and optionally
/// the qualifiers of one fetch. Read by the CLI from TOML.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TableDefinition {
    /// Foreign-table options (`aws_region`, `table_name`, ...).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Column declarations with their key options.
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    /// Qualifiers for the fetch being described.
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
}

impl TableDefinition {
    /// Parses a TOML description.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Binds options and topology.
    pub fn bind(&self) -> Result<(TableOptions, KeyTopology)> {
        let options = TableOptions::from_options(&self.options)?;
        let topology = KeyTopology::from_columns(&self.columns)?;
        Ok((options, topology))
    }
}

/// One remote table as seen by the host.
pub struct ForeignTable {
    options: TableOptions,
    topology: KeyTopology,
    client: Arc<dyn StorageClient>,
}

impl ForeignTable {
    /// Creates a table over an already bound topology.
    pub fn new(options: TableOptions, topology: KeyTopology, client: Arc<dyn StorageClient>) -> Self {
        Self {
            options,
            topology,
            client,
        }
    }

    /// Binds a table from host option maps.
    pub fn bind(
        options: &BTreeMap<String, String>,
        columns: &[ColumnDefinition],
        client: Arc<dyn StorageClient>,
    ) -> Result<Self> {
        let options = TableOptions::from_options(options)?;
        let topology = KeyTopology::from_columns(columns)?;
        Ok(Self::new(options, topology, client))
    }

    /// Table options.
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Key topology.
    pub fn topology(&self) -> &KeyTopology {
        &self.topology
    }

    /// Best plan for `quals`.
    pub fn plan(&self, quals: &[Qualifier]) -> CandidatePlan {
        AccessPathPlanner::new(&self.topology, &self.options).plan(quals)
    }

    /// Plan trace for `quals`.
    pub fn explain(&self, quals: &[Qualifier], verbose: bool) -> Vec<String> {
        let ctx = ExplainContext::new(&self.options.region, &self.options.table_name)
            .verbose(verbose);
        self.plan(quals).explain(&ctx)
    }

    /// Plans and starts a fetch.
    pub fn execute(&self, quals: &[Qualifier]) -> Result<FetchStream> {
        debug!(
            table = %self.options.table_name,
            quals = quals.len(),
            "fetch.execute"
        );
        let plan = self.plan(quals);
        let rows = plan.provider.rows(&self.client)?;
        Ok(FetchStream {
            rows,
            provider: plan.provider,
            table_name: self.options.table_name.clone(),
        })
    }
}

impl fmt::Debug for ForeignTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignTable")
            .field("options", &self.options)
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

/// Records of one fetch. Logs the final counters when dropped, whether it
/// was drained or abandoned.
pub struct FetchStream {
    rows: RowStream,
    provider: RowProvider,
    table_name: String,
}

impl FetchStream {
    /// Live counters of the running provider.
    pub fn counters(&self) -> Counters {
        self.provider.counters()
    }

    /// Variant of the running provider.
    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// The running provider.
    pub fn provider(&self) -> &RowProvider {
        &self.provider
    }

    /// Stops the fetch early.
    pub fn cancel(&mut self) {
        self.rows.cancel();
    }
}

impl Iterator for FetchStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl FusedIterator for FetchStream {}

impl Drop for FetchStream {
    fn drop(&mut self) {
        self.rows.cancel();
        let counters = self.provider.counters();
        info!(
            table = %self.table_name,
            pages = counters.page_count,
            records = counters.returned_count,
            scanned = counters.scanned_count,
            "fetch.finished"
        );
    }
}

impl fmt::Debug for FetchStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStream")
            .field("table_name", &self.table_name)
            .field("kind", &self.provider.kind())
            .field("counters", &self.counters())
            .finish()
    }
}
