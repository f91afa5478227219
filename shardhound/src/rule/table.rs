use shardhound_config::ShardedTable;

use super::{Error, ShardingStrategy};

/// One physical table instance of a logical table.
#[derive(Debug, Clone, PartialEq)]
pub struct DataNode {
    pub data_source: String,
    pub table: String,
}

/// Per-logical-table sharding rule.
#[derive(Debug, Clone)]
pub struct TableRule {
    logic_table: String,
    nodes: Vec<DataNode>,
    // actual tables grouped per data source, declaration order
    tables_by_source: Vec<(String, Vec<String>)>,
    database_strategy: Option<ShardingStrategy>,
    table_strategy: Option<ShardingStrategy>,
    key_column: Option<String>,
}

impl TableRule {
    pub fn new(config: &ShardedTable) -> Result<Self, Error> {
        let nodes = config
            .expanded_data_nodes()?
            .into_iter()
            .map(|(data_source, table)| DataNode { data_source, table })
            .collect::<Vec<_>>();

        let mut tables_by_source: Vec<(String, Vec<String>)> = vec![];
        for node in &nodes {
            match tables_by_source
                .iter_mut()
                .find(|(source, _)| source == &node.data_source)
            {
                Some((_, tables)) => tables.push(node.table.clone()),
                None => tables_by_source.push((node.data_source.clone(), vec![node.table.clone()])),
            }
        }

        Ok(Self {
            logic_table: config.name.clone(),
            nodes,
            tables_by_source,
            database_strategy: config.database_strategy.as_ref().map(ShardingStrategy::new),
            table_strategy: config.table_strategy.as_ref().map(ShardingStrategy::new),
            key_column: config.key_column.clone(),
        })
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn nodes(&self) -> &[DataNode] {
        &self.nodes
    }

    /// Data sources holding at least one shard of this table.
    pub fn data_sources(&self) -> Vec<&String> {
        self.tables_by_source.iter().map(|(source, _)| source).collect()
    }

    /// Same, as an owned list usable as strategy targets.
    pub fn data_source_targets(&self) -> Vec<String> {
        self.tables_by_source
            .iter()
            .map(|(source, _)| source.clone())
            .collect()
    }

    /// Actual tables on one data source, in node declaration order.
    pub fn actual_tables(&self, data_source: &str) -> &[String] {
        self.tables_by_source
            .iter()
            .find(|(source, _)| source == data_source)
            .map(|(_, tables)| tables.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_actual_table(&self, actual_table: &str) -> bool {
        self.nodes.iter().any(|node| node.table == actual_table)
    }

    /// All actual table names, across every data source.
    pub fn all_actual_tables(&self) -> Vec<&String> {
        self.nodes.iter().map(|node| &node.table).collect()
    }

    pub fn database_strategy(&self) -> Option<&ShardingStrategy> {
        self.database_strategy.as_ref()
    }

    pub fn table_strategy(&self) -> Option<&ShardingStrategy> {
        self.table_strategy.as_ref()
    }

    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_node_expansion_order() {
        let rule = TableRule::new(&ShardedTable {
            name: "t_order".into(),
            data_nodes: vec!["ds_${0..1}.t_order_${0..1}".into()],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(rule.nodes().len(), 4);
        assert_eq!(rule.data_sources(), [&"ds_0".to_string(), &"ds_1".to_string()]);
        assert_eq!(rule.actual_tables("ds_1"), ["t_order_0", "t_order_1"]);
        assert_eq!(rule.actual_tables("ds_9"), [] as [&str; 0]);
        assert!(rule.has_actual_table("t_order_1"));
        assert!(!rule.has_actual_table("t_order_2"));
    }
}
