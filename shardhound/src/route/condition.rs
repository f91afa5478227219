//! Sharding condition extraction.
//!
//! Derives, from the bound statement and runtime parameters, the
//! sharding-column values the routing engine can act on. A statement
//! with no extractable condition routes to every shard.

use shardhound_config::ShardValue;
use tracing::debug;

use crate::datum::Datum;
use crate::rule::ShardingRule;
use crate::statement::{PredicateOp, PredicateValue, StatementContext};

use super::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// One or more exact values (`=`, `IN`).
    Precise(Vec<ShardValue>),
    /// A value range (`BETWEEN`, comparisons), bounds inclusive
    /// where present.
    Range {
        start: Option<ShardValue>,
        end: Option<ShardValue>,
    },
}

/// Extracted predicate info for one sharding column.
#[derive(Debug, Clone)]
pub struct ShardingCondition {
    pub table: String,
    pub column: String,
    pub value: ConditionValue,
}

fn shard_value(datum: &Datum) -> Option<ShardValue> {
    match datum {
        Datum::Bigint(value) => Some(ShardValue::Integer(*value)),
        Datum::Text(value) => Some(ShardValue::String(value.clone())),
        Datum::Decimal(_) | Datum::Double(_) => datum.as_i64().map(ShardValue::Integer),
        Datum::Null | Datum::Bool(_) => None,
    }
}

/// Extract sharding conditions from the statement's predicates,
/// resolving `?` markers against the runtime parameters.
pub fn extract(
    rule: &ShardingRule,
    stmt: &StatementContext,
    params: &[Datum],
) -> Result<Vec<ShardingCondition>, Error> {
    let mut conditions = vec![];

    'predicates: for predicate in &stmt.predicates {
        if !rule.is_sharding_column(&predicate.table, &predicate.column) {
            continue;
        }

        let mut values = vec![];
        for value in &predicate.values {
            let datum = match value {
                PredicateValue::Literal(datum) => datum.clone(),
                PredicateValue::Parameter(index) => params
                    .get(*index)
                    .cloned()
                    .ok_or(Error::MissingParameter(*index))?,
            };
            match shard_value(&datum) {
                Some(value) => values.push(value),
                None => {
                    // NULL never matches a sharding value
                    debug!(
                        "skipping unshardable predicate on {}.{}",
                        predicate.table, predicate.column
                    );
                    continue 'predicates;
                }
            }
        }

        let value = match predicate.op {
            PredicateOp::Eq | PredicateOp::In => ConditionValue::Precise(values),
            PredicateOp::Between => {
                let mut values = values.into_iter();
                ConditionValue::Range {
                    start: values.next(),
                    end: values.next(),
                }
            }
            PredicateOp::Gt | PredicateOp::GtEq => ConditionValue::Range {
                start: values.into_iter().next(),
                end: None,
            },
            PredicateOp::Lt | PredicateOp::LtEq => ConditionValue::Range {
                start: None,
                end: values.into_iter().next(),
            },
        };

        conditions.push(ShardingCondition {
            table: predicate.table.clone(),
            column: predicate.column.clone(),
            value,
        });
    }

    Ok(conditions)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::test::order_rule;
    use crate::statement::{Predicate, StatementKind};

    fn select(predicate: Predicate) -> StatementContext {
        StatementContext::new(StatementKind::Select, ["t_order"]).with_predicate(predicate)
    }

    #[test]
    fn test_extract_parameter() {
        let rule = order_rule();
        let stmt = select(Predicate {
            table: "t_order".into(),
            column: "user_id".into(),
            op: PredicateOp::Eq,
            values: vec![PredicateValue::Parameter(0)],
        });

        let conditions = extract(&rule, &stmt, &[Datum::Bigint(7)]).unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].value,
            ConditionValue::Precise(vec![ShardValue::Integer(7)])
        );
    }

    #[test]
    fn test_missing_parameter() {
        let rule = order_rule();
        let stmt = select(Predicate {
            table: "t_order".into(),
            column: "user_id".into(),
            op: PredicateOp::Eq,
            values: vec![PredicateValue::Parameter(3)],
        });

        assert!(matches!(
            extract(&rule, &stmt, &[]),
            Err(Error::MissingParameter(3))
        ));
    }

    #[test]
    fn test_non_sharding_column_skipped() {
        let rule = order_rule();
        let stmt = select(Predicate {
            table: "t_order".into(),
            column: "status".into(),
            op: PredicateOp::Eq,
            values: vec![PredicateValue::Literal(Datum::Text("open".into()))],
        });

        assert!(extract(&rule, &stmt, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_between_becomes_range() {
        let rule = order_rule();
        let stmt = select(Predicate {
            table: "t_order".into(),
            column: "order_id".into(),
            op: PredicateOp::Between,
            values: vec![
                PredicateValue::Literal(Datum::Bigint(10)),
                PredicateValue::Literal(Datum::Bigint(20)),
            ],
        });

        let conditions = extract(&rule, &stmt, &[]).unwrap();
        assert_eq!(
            conditions[0].value,
            ConditionValue::Range {
                start: Some(ShardValue::Integer(10)),
                end: Some(ShardValue::Integer(20)),
            }
        );
    }

    #[test]
    fn test_null_skipped() {
        let rule = order_rule();
        let stmt = select(Predicate {
            table: "t_order".into(),
            column: "user_id".into(),
            op: PredicateOp::Eq,
            values: vec![PredicateValue::Literal(Datum::Null)],
        });

        assert!(extract(&rule, &stmt, &[]).unwrap().is_empty());
    }
}
