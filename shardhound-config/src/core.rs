//! Top-level configuration.

use std::collections::{HashMap, HashSet};
use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::general::General;
use crate::sharding::ShardedTable;

/// A named physical storage unit. Connection details live
/// in the execution layer, not here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct DataSource {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: General,

    #[serde(default)]
    pub data_sources: Vec<DataSource>,

    #[serde(default)]
    pub sharded_tables: Vec<ShardedTable>,

    /// Groups of logical tables whose shard ordinals stay aligned.
    #[serde(default)]
    pub binding_tables: Vec<Vec<String>>,

    /// Tables present identically on every data source.
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = read_to_string(path).map_err(|err| Error::Io(path.to_path_buf(), err))?;
        let config = Self::from_str(&text)?;
        info!(
            "loaded config [{}] ({} data sources, {} sharded tables)",
            path.display(),
            config.data_sources.len(),
            config.sharded_tables.len(),
        );
        Ok(config)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Validate cross-references between sections.
    pub fn check(&self) -> Result<(), Error> {
        if self.data_sources.is_empty() {
            return Err(Error::NoDataSources);
        }

        let mut names = HashSet::new();
        for source in &self.data_sources {
            if !names.insert(source.name.as_str()) {
                return Err(Error::DuplicateDataSource(source.name.clone()));
            }
        }

        // node counts per (table, data source), for binding group checks
        let mut node_counts: HashMap<&str, HashMap<String, usize>> = HashMap::new();
        // every data node belongs to exactly one logical table
        let mut all_nodes = HashSet::new();

        for table in &self.sharded_tables {
            if self.broadcast_tables.iter().any(|b| b == &table.name) {
                return Err(Error::BroadcastConflict(table.name.clone()));
            }
            let nodes = table.expanded_data_nodes()?;
            let counts = node_counts.entry(table.name.as_str()).or_default();
            for (data_source, actual_table) in &nodes {
                if !names.contains(data_source.as_str()) {
                    return Err(Error::UnknownDataSource(
                        table.name.clone(),
                        data_source.clone(),
                    ));
                }
                if !all_nodes.insert((data_source.clone(), actual_table.clone())) {
                    return Err(Error::DuplicateDataNode(
                        data_source.clone(),
                        actual_table.clone(),
                    ));
                }
                *counts.entry(data_source.clone()).or_default() += 1;
            }
        }

        for group in &self.binding_tables {
            let mut tables = group.iter();
            let first = match tables.next() {
                Some(first) => first,
                None => continue,
            };
            let first_counts = node_counts
                .get(first.as_str())
                .ok_or_else(|| Error::UnknownBindingTable(first.clone()))?;
            for table in tables {
                let counts = node_counts
                    .get(table.as_str())
                    .ok_or_else(|| Error::UnknownBindingTable(table.clone()))?;
                if counts != first_counts {
                    return Err(Error::UnevenBindingGroup(first.clone(), table.clone()));
                }
            }
        }

        Ok(())
    }
}
