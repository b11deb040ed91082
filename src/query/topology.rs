//! Static key topology of one logical table: primary partition/sort key,
//! local secondary indexes, and global secondary indexes.
//!
//! A topology is bound once per table, either programmatically through the
//! `with_*` builders or from the host's per-column options via
//! [`KeyTopology::from_columns`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FdwError, Result};

/// One-to-one mapping between a relational column and a store attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyField {
    /// Column name used by qualifiers.
    pub logical_name: String,
    /// Attribute name used in key conditions.
    pub physical_attr: String,
}

impl KeyField {
    /// Creates a mapping.
    pub fn new(logical_name: impl Into<String>, physical_attr: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            physical_attr: physical_attr.into(),
        }
    }

    /// Column and attribute share a name.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }
}

/// Local secondary index: the table's partition key plus an alternate sort attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalIndex {
    /// Index name sent with queries that use it.
    pub index_id: String,
    /// Alternate sort attribute.
    pub sort_key: KeyField,
}

/// Global secondary index: an independent partition (+ optional sort) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalIndex {
    /// Index name sent with queries that use it.
    pub index_id: String,
    /// Index partition attribute.
    pub partition_key: KeyField,
    /// Index sort attribute, if the index has one.
    pub sort_key: Option<KeyField>,
}

/// Key topology for a logical table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyTopology {
    /// Primary partition key.
    pub partition_key: KeyField,
    /// Primary sort key, if the table has one.
    pub sort_key: Option<KeyField>,
    /// Local secondary indexes in declaration order.
    pub local_indexes: Vec<LocalIndex>,
    /// Global secondary indexes in declaration order.
    pub global_indexes: Vec<GlobalIndex>,
}

impl KeyTopology {
    /// Topology with only a partition key.
    pub fn new(partition_key: KeyField) -> Self {
        Self {
            partition_key,
            sort_key: None,
            local_indexes: Vec::new(),
            global_indexes: Vec::new(),
        }
    }

    /// Adds the primary sort key.
    pub fn with_sort_key(mut self, sort_key: KeyField) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    /// Adds a local secondary index.
    pub fn with_local_index(mut self, index_id: impl Into<String>, sort_key: KeyField) -> Self {
        self.local_indexes.push(LocalIndex {
            index_id: index_id.into(),
            sort_key,
        });
        self
    }

    /// Adds a global secondary index.
    pub fn with_global_index(
        mut self,
        index_id: impl Into<String>,
        partition_key: KeyField,
        sort_key: Option<KeyField>,
    ) -> Self {
        self.global_indexes.push(GlobalIndex {
            index_id: index_id.into(),
            partition_key,
            sort_key,
        });
        self
    }

    /// Binds a topology from per-column option maps.
    ///
    /// Recognised options: `partition_key`, `sort_key`, `lsi_name` + `lsi_key`,
    /// `gsi_name` + `gsi_partition_key` / `gsi_sort_key`. Key options carry
    /// the attribute name, or `'true'` to use `mapped_attr` (or the column
    /// name when that is absent).
    pub fn from_columns(columns: &[ColumnDefinition]) -> Result<Self> {
        let mut partition_key: Option<KeyField> = None;
        let mut sort_key: Option<KeyField> = None;
        let mut local_indexes = Vec::new();
        let mut globals: BTreeMap<String, GlobalBinding> = BTreeMap::new();
        let mut global_order: Vec<String> = Vec::new();

        for column in columns {
            if let Some(field) = column.key_field("partition_key") {
                if let Some(existing) = &partition_key {
                    return Err(FdwError::InvalidTopology(format!(
                        "columns '{}' and '{}' both declare partition_key",
                        existing.logical_name, column.name
                    )));
                }
                partition_key = Some(field);
            }
            if let Some(field) = column.key_field("sort_key") {
                if let Some(existing) = &sort_key {
                    return Err(FdwError::InvalidTopology(format!(
                        "columns '{}' and '{}' both declare sort_key",
                        existing.logical_name, column.name
                    )));
                }
                sort_key = Some(field);
            }

            match (column.option("lsi_name"), column.option("lsi_key")) {
                (Some(name), Some(attr)) => local_indexes.push(LocalIndex {
                    index_id: name.to_owned(),
                    sort_key: KeyField::new(column.name.clone(), attr),
                }),
                (None, None) => {}
                _ => {
                    return Err(FdwError::InvalidTopology(format!(
                        "column '{}' must have both lsi_name and lsi_key",
                        column.name
                    )))
                }
            }

            let gsi_partition = column.key_field("gsi_partition_key");
            let gsi_sort = column.key_field("gsi_sort_key");
            match column.option("gsi_name") {
                Some(name) => {
                    if gsi_partition.is_none() && gsi_sort.is_none() {
                        return Err(FdwError::InvalidTopology(format!(
                            "column '{}' names gsi '{name}' without gsi_partition_key or gsi_sort_key",
                            column.name
                        )));
                    }
                    if !globals.contains_key(name) {
                        global_order.push(name.to_owned());
                    }
                    let binding = globals.entry(name.to_owned()).or_default();
                    if let Some(field) = gsi_partition {
                        if binding.partition_key.replace(field).is_some() {
                            return Err(FdwError::InvalidTopology(format!(
                                "gsi '{name}' declares more than one partition key"
                            )));
                        }
                    }
                    if let Some(field) = gsi_sort {
                        if binding.sort_key.replace(field).is_some() {
                            return Err(FdwError::InvalidTopology(format!(
                                "gsi '{name}' declares more than one sort key"
                            )));
                        }
                    }
                }
                None if gsi_partition.is_some() || gsi_sort.is_some() => {
                    return Err(FdwError::InvalidTopology(format!(
                        "column '{}' declares a gsi key without gsi_name",
                        column.name
                    )))
                }
                None => {}
            }
        }

        let partition_key = partition_key.ok_or_else(|| {
            FdwError::InvalidTopology("table must have a column with the partition_key option".into())
        })?;

        let mut global_indexes = Vec::with_capacity(global_order.len());
        for name in global_order {
            let Some(binding) = globals.remove(&name) else {
                continue;
            };
            let Some(gsi_partition) = binding.partition_key else {
                return Err(FdwError::InvalidTopology(format!(
                    "gsi '{name}' has no gsi_partition_key column"
                )));
            };
            global_indexes.push(GlobalIndex {
                index_id: name,
                partition_key: gsi_partition,
                sort_key: binding.sort_key,
            });
        }

        Ok(Self {
            partition_key,
            sort_key,
            local_indexes,
            global_indexes,
        })
    }
}

#[derive(Default)]
struct GlobalBinding {
    partition_key: Option<KeyField>,
    sort_key: Option<KeyField>,
}

/// Column declaration as supplied by the host schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Column options (`partition_key`, `lsi_name`, ...).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ColumnDefinition {
    /// Creates a column without options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Adds an option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    fn key_field(&self, key: &str) -> Option<KeyField> {
        let value = self.option(key)?;
        let attr = if value.eq_ignore_ascii_case("true") {
            self.option("mapped_attr").unwrap_or(&self.name)
        } else {
            value
        };
        Some(KeyField::new(self.name.clone(), attr))
    }
}
