use super::{Error, TableRule};

/// A group of logical tables whose shard ordinals stay aligned.
///
/// A bound table's actual table is always resolved from the driving
/// table's actual table by position, never re-sharded independently,
/// so joins inside the group stay on one shard.
#[derive(Debug, Clone)]
pub struct BindingTableRule {
    table_rules: Vec<TableRule>,
}

impl BindingTableRule {
    pub fn new(table_rules: Vec<TableRule>) -> Self {
        Self { table_rules }
    }

    /// Logical tables in the group.
    pub fn tables(&self) -> Vec<&str> {
        self.table_rules
            .iter()
            .map(|rule| rule.logic_table())
            .collect()
    }

    pub fn has_table(&self, logic_table: &str) -> bool {
        self.table_rules
            .iter()
            .any(|rule| rule.logic_table().eq_ignore_ascii_case(logic_table))
    }

    /// Actual table of `logic_table` aligned with the driving table's
    /// actual table on one data source.
    pub fn actual_table(
        &self,
        data_source: &str,
        logic_table: &str,
        driving_actual: &str,
    ) -> Result<String, Error> {
        let mismatch = || Error::BindingMismatch {
            table: logic_table.to_string(),
            data_source: data_source.to_string(),
            driving_actual: driving_actual.to_string(),
        };

        let driving = self
            .table_rules
            .iter()
            .find(|rule| rule.has_actual_table(driving_actual))
            .ok_or_else(mismatch)?;

        let ordinal = driving
            .actual_tables(data_source)
            .iter()
            .position(|table| *table == driving_actual)
            .ok_or_else(mismatch)?;

        let bound = self
            .table_rules
            .iter()
            .find(|rule| rule.logic_table().eq_ignore_ascii_case(logic_table))
            .ok_or_else(mismatch)?;

        bound
            .actual_tables(data_source)
            .get(ordinal)
            .map(|table| table.to_string())
            .ok_or_else(mismatch)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use shardhound_config::ShardedTable;

    fn binding() -> BindingTableRule {
        let order = TableRule::new(&ShardedTable {
            name: "t_order".into(),
            data_nodes: vec!["ds_${0..1}.t_order_${0..1}".into()],
            ..Default::default()
        })
        .unwrap();
        let item = TableRule::new(&ShardedTable {
            name: "t_order_item".into(),
            data_nodes: vec!["ds_${0..1}.t_order_item_${0..1}".into()],
            ..Default::default()
        })
        .unwrap();

        BindingTableRule::new(vec![order, item])
    }

    #[test]
    fn test_ordinal_alignment() {
        let binding = binding();

        let actual = binding
            .actual_table("ds_0", "t_order_item", "t_order_1")
            .unwrap();
        assert_eq!(actual, "t_order_item_1");

        let actual = binding
            .actual_table("ds_1", "t_order_item", "t_order_0")
            .unwrap();
        assert_eq!(actual, "t_order_item_0");
    }

    #[test]
    fn test_mismatch() {
        let binding = binding();

        assert!(matches!(
            binding.actual_table("ds_0", "t_order_item", "t_order_9"),
            Err(Error::BindingMismatch { .. })
        ));
        assert!(matches!(
            binding.actual_table("ds_0", "t_unknown", "t_order_0"),
            Err(Error::BindingMismatch { .. })
        ));
    }
}
