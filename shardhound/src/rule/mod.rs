//! Sharding rule model.
//!
//! Immutable description of how logical tables map to actual tables
//! and data sources. Built once from config, shared read-only across
//! all in-flight statements, and replaced wholesale on reconfiguration.

pub mod binding;
pub mod context;
pub mod error;
pub mod keygen;
pub mod strategy;
pub mod table;

pub use binding::BindingTableRule;
pub use context::SchemaContext;
pub use error::Error;
pub use keygen::{IncrementKeyGenerator, KeyGenerator, SnowflakeKeyGenerator};
pub use strategy::ShardingStrategy;
pub use table::{DataNode, TableRule};

use std::collections::HashSet;
use std::sync::Arc;

use fnv::FnvHashMap;
use shardhound_config::Config;

pub struct ShardingRule {
    tables: FnvHashMap<String, TableRule>,
    binding: Vec<BindingTableRule>,
    broadcast: HashSet<String>,
    data_sources: Vec<String>,
    default_data_source: Option<String>,
    key_generator: Arc<dyn KeyGenerator>,
}

impl std::fmt::Debug for ShardingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardingRule")
            .field("tables", &self.tables.keys())
            .field("data_sources", &self.data_sources)
            .finish()
    }
}

impl ShardingRule {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let key_generator: Arc<dyn KeyGenerator> =
            Arc::new(SnowflakeKeyGenerator::new(config.general.worker_id));
        Self::with_key_generator(config, key_generator)
    }

    /// Build the rule with a caller-supplied key generator.
    pub fn with_key_generator(
        config: &Config,
        key_generator: Arc<dyn KeyGenerator>,
    ) -> Result<Self, Error> {
        config.check()?;

        let mut tables = FnvHashMap::default();
        for sharded in &config.sharded_tables {
            let rule = TableRule::new(sharded)?;
            tables.insert(sharded.name.to_lowercase(), rule);
        }

        let mut binding = vec![];
        for group in &config.binding_tables {
            let mut rules = vec![];
            for name in group {
                let rule = tables
                    .get(&name.to_lowercase())
                    .ok_or_else(|| Error::MissingTableRule(name.clone()))?;
                rules.push(rule.clone());
            }
            binding.push(BindingTableRule::new(rules));
        }

        let data_sources = config
            .data_sources
            .iter()
            .map(|source| source.name.clone())
            .collect::<Vec<_>>();

        let default_data_source = config.general.default_data_source.clone();
        if let Some(ref name) = default_data_source {
            if !data_sources.contains(name) {
                return Err(Error::MissingDefaultDataSource(name.clone()));
            }
        }

        Ok(Self {
            tables,
            binding,
            broadcast: config
                .broadcast_tables
                .iter()
                .map(|table| table.to_lowercase())
                .collect(),
            data_sources,
            default_data_source,
            key_generator,
        })
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.tables.get(&logic_table.to_lowercase())
    }

    pub fn table_rule(&self, logic_table: &str) -> Result<&TableRule, Error> {
        self.find_table_rule(logic_table)
            .ok_or_else(|| Error::MissingTableRule(logic_table.to_string()))
    }

    pub fn is_sharded(&self, logic_table: &str) -> bool {
        self.find_table_rule(logic_table).is_some()
    }

    pub fn is_broadcast(&self, logic_table: &str) -> bool {
        self.broadcast.contains(&logic_table.to_lowercase())
    }

    /// Is this column a database- or table-sharding column of the table?
    pub fn is_sharding_column(&self, logic_table: &str, column: &str) -> bool {
        self.find_table_rule(logic_table)
            .map(|rule| {
                [rule.database_strategy(), rule.table_strategy()]
                    .iter()
                    .flatten()
                    .any(|strategy| strategy.column().eq_ignore_ascii_case(column))
            })
            .unwrap_or(false)
    }

    /// The binding group containing this table, if any.
    pub fn binding_rule(&self, logic_table: &str) -> Option<&BindingTableRule> {
        self.binding.iter().find(|rule| rule.has_table(logic_table))
    }

    /// All tables either bound to the driving table or broadcast/unsharded?
    ///
    /// Used to decide whether a multi-table statement is still
    /// routable by the standard engine.
    pub fn all_joinable_with(&self, driving: &str, tables: &[String]) -> bool {
        tables.iter().all(|table| {
            if table.eq_ignore_ascii_case(driving) || !self.is_sharded(table) {
                return true;
            }
            self.binding_rule(driving)
                .map(|rule| rule.has_table(table))
                .unwrap_or(false)
        })
    }

    pub fn data_sources(&self) -> &[String] {
        &self.data_sources
    }

    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source.as_deref()
    }

    pub fn key_generator(&self) -> &Arc<dyn KeyGenerator> {
        &self.key_generator
    }

    /// Generated-key column of a table, if one is configured.
    pub fn key_column(&self, logic_table: &str) -> Option<&str> {
        self.find_table_rule(logic_table)
            .and_then(|rule| rule.key_column())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use shardhound_config::Config;

    /// 2 data sources x 2 table shards, modulo on user_id/order_id,
    /// t_order_item bound to t_order, one broadcast table.
    pub(crate) fn order_rule() -> ShardingRule {
        let config = Config::from_str(
            r#"
binding_tables = [["t_order", "t_order_item"]]
broadcast_tables = ["t_config"]

[[data_sources]]
name = "ds_0"

[[data_sources]]
name = "ds_1"

[[sharded_tables]]
name = "t_order"
data_nodes = ["ds_${0..1}.t_order_${0..1}"]
key_column = "order_id"

[sharded_tables.database_strategy]
column = "user_id"

[sharded_tables.table_strategy]
column = "order_id"

[[sharded_tables]]
name = "t_order_item"
data_nodes = ["ds_${0..1}.t_order_item_${0..1}"]

[sharded_tables.database_strategy]
column = "user_id"

[sharded_tables.table_strategy]
column = "order_id"
"#,
        )
        .unwrap();

        ShardingRule::with_key_generator(&config, Arc::new(IncrementKeyGenerator::default()))
            .unwrap()
    }

    #[test]
    fn test_lookups() {
        let rule = order_rule();

        assert!(rule.is_sharded("t_order"));
        assert!(rule.is_sharded("T_ORDER"));
        assert!(!rule.is_sharded("t_config"));
        assert!(rule.is_broadcast("t_config"));
        assert!(rule.is_sharding_column("t_order", "user_id"));
        assert!(rule.is_sharding_column("t_order", "ORDER_ID"));
        assert!(!rule.is_sharding_column("t_order", "status"));
        assert_eq!(rule.key_column("t_order"), Some("order_id"));
        assert_eq!(rule.key_column("t_order_item"), None);
    }

    #[test]
    fn test_binding_lookup() {
        let rule = order_rule();

        assert!(rule.binding_rule("t_order").is_some());
        assert!(rule.binding_rule("t_order_item").is_some());
        assert!(rule.binding_rule("t_config").is_none());
        assert!(rule.all_joinable_with(
            "t_order",
            &["t_order".into(), "t_order_item".into(), "t_config".into()]
        ));
    }

    #[test]
    fn test_unknown_default_data_source() {
        let mut config = Config::from_str(
            r#"
[[data_sources]]
name = "ds_0"
"#,
        )
        .unwrap();
        config.general.default_data_source = Some("ds_9".into());

        assert!(matches!(
            ShardingRule::new(&config),
            Err(Error::MissingDefaultDataSource(_))
        ));
    }
}
