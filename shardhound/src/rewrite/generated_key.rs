//! Generated keys for INSERT statements.

use shardhound_config::ShardValue;
use tracing::debug;

use crate::datum::Datum;
use crate::route::{ConditionValue, ShardingCondition};
use crate::rule::ShardingRule;
use crate::statement::{StatementContext, StatementKind};

use super::SqlToken;

/// Keys drawn for an auto-increment column the INSERT didn't supply,
/// plus the tokens and parameters that inject them.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub column: String,
    /// One key per inserted row, returned to the caller per the
    /// generated-keys contract.
    pub keys: Vec<i64>,
    pub tokens: Vec<SqlToken>,
    /// Appended after the last existing parameter when the
    /// statement is parameterized.
    pub parameters: Vec<Datum>,
    /// Present when the key column is itself a sharding column,
    /// so the statement's own routing reflects the generated value.
    pub condition: Option<ShardingCondition>,
}

/// Draw keys for an INSERT missing its configured key column.
/// Returns `None` when nothing needs generating.
pub fn generate(rule: &ShardingRule, stmt: &StatementContext) -> Option<GeneratedKey> {
    if stmt.kind != StatementKind::Insert {
        return None;
    }
    let insert = stmt.insert.as_ref()?;
    let table = stmt.tables.first()?;
    let column = rule.key_column(table)?.to_string();

    if insert
        .columns
        .iter()
        .any(|c| c.eq_ignore_ascii_case(&column))
    {
        return None;
    }

    let rows = insert.values_stops.len().max(1);
    let generator = rule.key_generator();
    let keys = (0..rows).map(|_| generator.next_key()).collect::<Vec<_>>();
    debug!("generated {} key(s) for \"{}\".{}", keys.len(), table, column);

    let mut tokens = vec![SqlToken::InsertColumns {
        start: insert.columns_stop,
        columns: vec![column.clone()],
    }];
    let mut parameters = vec![];

    for (row, stop) in insert.values_stops.iter().enumerate() {
        let value = if insert.parameterized {
            parameters.push(Datum::Bigint(keys[row]));
            "?".to_string()
        } else {
            keys[row].to_string()
        };
        tokens.push(SqlToken::InsertValues {
            start: *stop,
            values: vec![value],
        });
    }

    let condition = if rule.is_sharding_column(table, &column) {
        Some(ShardingCondition {
            table: table.clone(),
            column: column.clone(),
            value: ConditionValue::Precise(
                keys.iter().map(|key| ShardValue::Integer(*key)).collect(),
            ),
        })
    } else {
        None
    };

    Some(GeneratedKey {
        column,
        keys,
        tokens,
        parameters,
        condition,
    })
}
