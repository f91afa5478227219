//! Standard routing: one sharded driving table, optionally joined
//! to binding, broadcast and unsharded tables.

use shardhound_config::ShardValue;
use tracing::debug;

use crate::rule::{ShardingRule, ShardingStrategy, TableRule};
use crate::statement::StatementContext;

use super::{ConditionValue, Error, HintContext, RouteResult, RouteUnit, ShardingCondition};

pub(super) struct StandardRoutingEngine<'a> {
    rule: &'a ShardingRule,
    table_rule: &'a TableRule,
    conditions: &'a [ShardingCondition],
    hints: &'a HintContext,
}

impl<'a> StandardRoutingEngine<'a> {
    pub(super) fn new(
        rule: &'a ShardingRule,
        table_rule: &'a TableRule,
        conditions: &'a [ShardingCondition],
        hints: &'a HintContext,
    ) -> Self {
        Self {
            rule,
            table_rule,
            conditions,
            hints,
        }
    }

    pub(super) fn route(&self, stmt: &StatementContext) -> Result<RouteResult, Error> {
        let logic_table = self.table_rule.logic_table();
        let data_source_targets = self.table_rule.data_source_targets();

        let data_sources = self.dimension(
            &data_source_targets,
            self.table_rule.database_strategy(),
            self.hints.database_values(logic_table),
        )?;

        let mut result = RouteResult::default();
        for data_source in data_sources {
            let table_targets = self.table_rule.actual_tables(&data_source);
            let actual_tables = self.dimension(
                table_targets,
                self.table_rule.table_strategy(),
                self.hints.table_values(logic_table),
            )?;

            for actual_table in actual_tables {
                let mut unit = RouteUnit::new(&data_source);
                unit.map_table(logic_table, &actual_table);
                self.map_bound_tables(&mut unit, stmt, &actual_table)?;
                result.push(unit);
            }
        }

        debug!(
            "standard route of \"{}\": {} units",
            logic_table,
            result.len()
        );
        Ok(result)
    }

    /// Resolve one dimension to its targets: hint values win over
    /// extracted conditions; neither means every target.
    fn dimension(
        &self,
        targets: &[String],
        strategy: Option<&ShardingStrategy>,
        hint_values: &[ShardValue],
    ) -> Result<Vec<String>, Error> {
        let strategy = match strategy {
            Some(strategy) => strategy,
            None => return Ok(targets.to_vec()),
        };

        if !hint_values.is_empty() {
            let routed = strategy.route_precise(targets, hint_values)?;
            return Ok(routed.into_iter().cloned().collect());
        }

        let condition = self.conditions.iter().find(|condition| {
            condition
                .table
                .eq_ignore_ascii_case(self.table_rule.logic_table())
                && condition.column.eq_ignore_ascii_case(strategy.column())
        });

        let routed = match condition {
            Some(condition) => match &condition.value {
                ConditionValue::Precise(values) => strategy.route_precise(targets, values)?,
                ConditionValue::Range { start, end } => {
                    strategy.route_range(targets, start.as_ref(), end.as_ref())?
                }
            },
            None => return Ok(targets.to_vec()),
        };

        Ok(routed.into_iter().cloned().collect())
    }

    /// Tables bound to the driving table land on the same shard
    /// ordinal; joins between them stay local.
    fn map_bound_tables(
        &self,
        unit: &mut RouteUnit,
        stmt: &StatementContext,
        driving_actual: &str,
    ) -> Result<(), Error> {
        let binding = match self.rule.binding_rule(self.table_rule.logic_table()) {
            Some(binding) => binding,
            None => return Ok(()),
        };

        for table in &stmt.tables {
            if table.eq_ignore_ascii_case(self.table_rule.logic_table()) {
                continue;
            }
            if binding.has_table(table) {
                let actual = binding.actual_table(unit.data_source(), table, driving_actual)?;
                unit.map_table(table, &actual);
            }
        }

        Ok(())
    }
}
