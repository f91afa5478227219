//! Routing engine.
//!
//! Maps a bound statement plus extracted sharding conditions (and
//! caller hints) to the set of physical execution targets. Pure
//! computation over the immutable rule; safe on any worker.

pub mod condition;
pub mod error;
pub mod hint;
mod standard;

pub use condition::{extract, ConditionValue, ShardingCondition};
pub use error::Error;
pub use hint::HintContext;

use indexmap::IndexMap;
use rand::Rng;
use tracing::debug;

use crate::rule::ShardingRule;
use crate::statement::{StatementContext, StatementKind};
use standard::StandardRoutingEngine;

/// One physical execution target: a data source plus the
/// logical-to-actual table mapping used there.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUnit {
    data_source: String,
    tables: IndexMap<String, String>,
}

impl RouteUnit {
    pub fn new(data_source: impl ToString) -> Self {
        Self {
            data_source: data_source.to_string(),
            tables: IndexMap::new(),
        }
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn map_table(&mut self, logic_table: &str, actual_table: &str) {
        self.tables
            .insert(logic_table.to_lowercase(), actual_table.to_string());
    }

    /// Actual table for a logical table, if this unit renames it.
    pub fn actual_table(&self, logic_table: &str) -> Option<&str> {
        self.tables
            .get(&logic_table.to_lowercase())
            .map(|table| table.as_str())
    }

    pub fn tables(&self) -> &IndexMap<String, String> {
        &self.tables
    }
}

/// The set of routing units for one statement, deduplicated,
/// in routing order.
#[derive(Debug, Clone, Default)]
pub struct RouteResult {
    units: Vec<RouteUnit>,
}

impl RouteResult {
    /// Add a unit unless an identical one is already present.
    pub fn push(&mut self, unit: RouteUnit) {
        if !self.units.contains(&unit) {
            self.units.push(unit);
        }
    }

    pub fn units(&self) -> &[RouteUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// More than one physical target?
    pub fn is_cross_shard(&self) -> bool {
        self.units.len() > 1
    }
}

/// Route a statement. Hint overrides win over extracted conditions;
/// a dimension with neither broadcasts to all its targets.
pub fn route(
    rule: &ShardingRule,
    stmt: &StatementContext,
    conditions: &[ShardingCondition],
    hints: &HintContext,
) -> Result<RouteResult, Error> {
    if rule.data_sources().is_empty() {
        return Err(Error::NoDataSources);
    }

    let sharded = stmt
        .tables
        .iter()
        .filter(|table| rule.is_sharded(table))
        .collect::<Vec<_>>();

    if stmt.kind == StatementKind::Insert && stmt.tables.len() != 1 {
        return Err(Error::UnsupportedRouting(format!(
            "INSERT must target exactly one logical table, got {}",
            stmt.tables.len()
        )));
    }

    if stmt.kind == StatementKind::Ddl {
        return ddl_route(rule, stmt, &sharded);
    }

    let driving = match sharded.first() {
        Some(driving) => driving.as_str(),
        None => return unsharded_route(rule, stmt),
    };

    if !rule.all_joinable_with(driving, &stmt.tables) {
        return Err(Error::UnsupportedRouting(format!(
            "tables {:?} are not bound to \"{}\" and cannot be routed together",
            stmt.tables, driving
        )));
    }

    let table_rule = rule.table_rule(driving)?;
    let result = StandardRoutingEngine::new(rule, table_rule, conditions, hints).route(stmt)?;

    if result.is_empty() {
        return Err(Error::UnsupportedRouting(format!(
            "no routing target for \"{}\"",
            driving
        )));
    }

    Ok(result)
}

/// DDL broadcasts: to every data node of a sharded table, or to
/// every data source for config/admin statements.
fn ddl_route(
    rule: &ShardingRule,
    stmt: &StatementContext,
    sharded: &[&String],
) -> Result<RouteResult, Error> {
    let mut result = RouteResult::default();

    match sharded.first() {
        Some(driving) => {
            if sharded.len() > 1 {
                return Err(Error::UnsupportedRouting(
                    "DDL over multiple sharded tables".into(),
                ));
            }
            let table_rule = rule.table_rule(driving)?;
            for node in table_rule.nodes() {
                let mut unit = RouteUnit::new(&node.data_source);
                unit.map_table(driving, &node.table);
                result.push(unit);
            }
        }
        None => {
            for data_source in rule.data_sources() {
                let mut unit = RouteUnit::new(data_source);
                for table in &stmt.tables {
                    unit.map_table(table, table);
                }
                result.push(unit);
            }
        }
    }

    debug!("ddl route: {} units", result.len());
    Ok(result)
}

/// No sharded table in the statement: broadcast tables (and
/// table-less statements) go to one random source, the rest to the
/// default data source.
fn unsharded_route(rule: &ShardingRule, stmt: &StatementContext) -> Result<RouteResult, Error> {
    let all_broadcast = stmt.tables.iter().all(|table| rule.is_broadcast(table));

    let data_source = if all_broadcast {
        let index = rand::rng().random_range(0..rule.data_sources().len());
        rule.data_sources()[index].clone()
    } else {
        match rule.default_data_source() {
            Some(data_source) => data_source.to_string(),
            None => {
                let table = stmt
                    .tables
                    .iter()
                    .find(|table| !rule.is_broadcast(table))
                    .cloned()
                    .unwrap_or_default();
                return Err(crate::rule::Error::MissingTableRule(table).into());
            }
        }
    };

    let mut unit = RouteUnit::new(data_source);
    for table in &stmt.tables {
        unit.map_table(table, table);
    }

    let mut result = RouteResult::default();
    result.push(unit);
    debug!("unicast route to {}", result.units()[0].data_source());
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datum::Datum;
    use crate::rule::test::order_rule;
    use crate::statement::{Predicate, PredicateOp, PredicateValue};

    fn select(tables: &[&str]) -> StatementContext {
        StatementContext::new(StatementKind::Select, tables.iter().copied())
    }

    fn eq_predicate(column: &str, value: i64) -> Predicate {
        Predicate {
            table: "t_order".into(),
            column: column.into(),
            op: PredicateOp::Eq,
            values: vec![PredicateValue::Literal(Datum::Bigint(value))],
        }
    }

    #[test]
    fn test_no_condition_routes_all_nodes() {
        let rule = order_rule();
        let stmt = select(&["t_order"]);

        let result = route(&rule, &stmt, &[], &HintContext::new()).unwrap();
        assert_eq!(result.len(), 4);

        let mut pairs = result
            .units()
            .iter()
            .map(|unit| {
                (
                    unit.data_source().to_string(),
                    unit.actual_table("t_order").unwrap().to_string(),
                )
            })
            .collect::<Vec<_>>();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("ds_0".to_string(), "t_order_0".to_string()),
                ("ds_0".to_string(), "t_order_1".to_string()),
                ("ds_1".to_string(), "t_order_0".to_string()),
                ("ds_1".to_string(), "t_order_1".to_string()),
            ]
        );
    }

    #[test]
    fn test_precise_condition_routes_one_unit() {
        let rule = order_rule();
        let stmt = select(&["t_order"])
            .with_predicate(eq_predicate("user_id", 1))
            .with_predicate(eq_predicate("order_id", 1));
        let conditions = extract(&rule, &stmt, &[]).unwrap();

        let result = route(&rule, &stmt, &conditions, &HintContext::new()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.units()[0].data_source(), "ds_1");
        assert_eq!(result.units()[0].actual_table("t_order"), Some("t_order_1"));
    }

    #[test]
    fn test_route_deterministic() {
        let rule = order_rule();
        let stmt = select(&["t_order"]).with_predicate(eq_predicate("user_id", 1));
        let conditions = extract(&rule, &stmt, &[]).unwrap();
        let hints = HintContext::new();

        let first = route(&rule, &stmt, &conditions, &hints).unwrap();
        let second = route(&rule, &stmt, &conditions, &hints).unwrap();
        assert_eq!(first.units(), second.units());
    }

    #[test]
    fn test_binding_table_same_ordinal() {
        let rule = order_rule();
        let stmt = select(&["t_order", "t_order_item"])
            .with_predicate(eq_predicate("user_id", 0))
            .with_predicate(eq_predicate("order_id", 1));
        let conditions = extract(&rule, &stmt, &[]).unwrap();

        let result = route(&rule, &stmt, &conditions, &HintContext::new()).unwrap();
        assert_eq!(result.len(), 1);

        let unit = &result.units()[0];
        assert_eq!(unit.data_source(), "ds_0");
        assert_eq!(unit.actual_table("t_order"), Some("t_order_1"));
        assert_eq!(unit.actual_table("t_order_item"), Some("t_order_item_1"));
    }

    #[test]
    fn test_hint_beats_condition() {
        let rule = order_rule();
        let stmt = select(&["t_order"])
            .with_predicate(eq_predicate("user_id", 0))
            .with_predicate(eq_predicate("order_id", 0));
        let conditions = extract(&rule, &stmt, &[]).unwrap();

        let mut hints = HintContext::new();
        hints.add_database_value("t_order", 1i64);
        hints.add_table_value("t_order", 1i64);

        let result = route(&rule, &stmt, &conditions, &hints).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.units()[0].data_source(), "ds_1");
        assert_eq!(result.units()[0].actual_table("t_order"), Some("t_order_1"));
    }

    #[test]
    fn test_broadcast_unicast() {
        let rule = order_rule();
        let stmt = select(&["t_config"]);

        let result = route(&rule, &stmt, &[], &HintContext::new()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.units()[0].actual_table("t_config"), Some("t_config"));
        assert!(["ds_0", "ds_1"].contains(&result.units()[0].data_source()));
    }

    #[test]
    fn test_unsharded_without_default_source_fails() {
        let rule = order_rule();
        let stmt = select(&["t_unknown"]);

        assert!(matches!(
            route(&rule, &stmt, &[], &HintContext::new()),
            Err(Error::Rule(crate::rule::Error::MissingTableRule(_)))
        ));
    }

    #[test]
    fn test_multi_table_insert_unsupported() {
        let rule = order_rule();
        let stmt = StatementContext::new(StatementKind::Insert, ["t_order", "t_order_item"]);

        assert!(matches!(
            route(&rule, &stmt, &[], &HintContext::new()),
            Err(Error::UnsupportedRouting(_))
        ));
    }

    #[test]
    fn test_unrelated_sharded_tables_unsupported() {
        // two sharded tables, not in one binding group
        let config = shardhound_config::Config::from_str(
            r#"
[[data_sources]]
name = "ds_0"

[[sharded_tables]]
name = "t_order"
data_nodes = ["ds_0.t_order_${0..1}"]

[[sharded_tables]]
name = "t_user"
data_nodes = ["ds_0.t_user_${0..1}"]
"#,
        )
        .unwrap();
        let rule = crate::rule::ShardingRule::new(&config).unwrap();

        let stmt = select(&["t_order", "t_user"]);
        assert!(matches!(
            route(&rule, &stmt, &[], &HintContext::new()),
            Err(Error::UnsupportedRouting(_))
        ));
    }

    #[test]
    fn test_ddl_broadcast_per_node() {
        let rule = order_rule();
        let stmt = StatementContext::new(StatementKind::Ddl, ["t_order"]);

        let result = route(&rule, &stmt, &[], &HintContext::new()).unwrap();
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_range_condition_subset() {
        let rule = order_rule();
        let stmt = select(&["t_order"]).with_predicate(Predicate {
            table: "t_order".into(),
            column: "order_id".into(),
            op: PredicateOp::Between,
            values: vec![
                PredicateValue::Literal(Datum::Bigint(2)),
                PredicateValue::Literal(Datum::Bigint(2)),
            ],
        });
        let conditions = extract(&rule, &stmt, &[]).unwrap();

        let result = route(&rule, &stmt, &conditions, &HintContext::new()).unwrap();
        // order_id 2 -> table ordinal 0 on both data sources
        assert_eq!(result.len(), 2);
        for unit in result.units() {
            assert_eq!(unit.actual_table("t_order"), Some("t_order_0"));
        }
    }
}
