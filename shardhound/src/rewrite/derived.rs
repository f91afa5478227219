//! Derived select items.
//!
//! Columns the client never wrote but the merge engine needs:
//! COUNT/SUM pairs standing in for AVG, and ORDER BY/GROUP BY
//! expressions missing from the select list. Runs once per
//! statement, before token sorting.

use crate::statement::{AggregationKind, Direction, SelectItem, StatementContext};

use super::SqlToken;

/// Derived COUNT/SUM labels backing one AVG select item.
#[derive(Debug, Clone, PartialEq)]
pub struct AvgColumns {
    /// Index of the AVG item in the caller's select list.
    pub item_index: usize,
    pub count_label: String,
    pub sum_label: String,
}

/// What the derived pass added, for the merge engine to consume.
#[derive(Debug, Clone, Default)]
pub struct DerivedPlan {
    pub avg: Vec<AvgColumns>,
    /// Merge-time sort keys: resolved column label + direction.
    pub sort_labels: Vec<(String, Direction)>,
    /// Merge-time grouping column labels.
    pub group_labels: Vec<String>,
    /// Hidden items appended to the select list, in order.
    pub derived_items: Vec<String>,
}

impl DerivedPlan {
    /// Number of trailing physical columns the caller must not see.
    pub fn derived_count(&self) -> usize {
        self.derived_items.len()
    }
}

/// The expression inside an aggregation call: `AVG(price)` -> `price`.
fn inner_expr(expr: &str) -> &str {
    match (expr.find('('), expr.rfind(')')) {
        (Some(open), Some(close)) if open < close => &expr[open + 1..close],
        _ => expr,
    }
}

fn find_label(items: &[SelectItem], expr: &str) -> Option<String> {
    items
        .iter()
        .find(|item| {
            item.expr.eq_ignore_ascii_case(expr)
                || item
                    .alias
                    .as_deref()
                    .map(|alias| alias.eq_ignore_ascii_case(expr))
                    .unwrap_or(false)
        })
        .map(|item| item.label().to_string())
}

/// Derive hidden select items for the statement. Returns the items
/// token to append (if anything was derived) and the plan the merge
/// engine reads.
pub fn derive(stmt: &StatementContext) -> (Option<SqlToken>, DerivedPlan) {
    let select = match stmt.select.as_ref() {
        Some(select) => select,
        None => return (None, DerivedPlan::default()),
    };

    let mut plan = DerivedPlan::default();

    let mut avg_ordinal = 0;
    for (index, item) in select.items.iter().enumerate() {
        if item.aggregation == Some(AggregationKind::Avg) {
            let inner = inner_expr(&item.expr);
            let count_label = format!("AVG_DERIVED_COUNT_{}", avg_ordinal);
            let sum_label = format!("AVG_DERIVED_SUM_{}", avg_ordinal);
            plan.derived_items
                .push(format!("COUNT({}) AS {}", inner, count_label));
            plan.derived_items
                .push(format!("SUM({}) AS {}", inner, sum_label));
            plan.avg.push(AvgColumns {
                item_index: index,
                count_label,
                sum_label,
            });
            avg_ordinal += 1;
        }
    }

    for (ordinal, item) in select.order_by.iter().enumerate() {
        let label = match find_label(&select.items, &item.expr) {
            Some(label) => label,
            None => {
                let alias = format!("ORDER_BY_DERIVED_{}", ordinal);
                plan.derived_items.push(format!("{} AS {}", item.expr, alias));
                alias
            }
        };
        plan.sort_labels.push((label, item.direction));
    }

    for (ordinal, item) in select.group_by.iter().enumerate() {
        let label = match find_label(&select.items, &item.expr) {
            Some(label) => label,
            None => {
                let alias = format!("GROUP_BY_DERIVED_{}", ordinal);
                plan.derived_items.push(format!("{} AS {}", item.expr, alias));
                alias
            }
        };
        plan.group_labels.push(label);
    }

    let token = if plan.derived_items.is_empty() {
        None
    } else {
        Some(SqlToken::Items {
            start: select.items_stop,
            items: plan.derived_items.clone(),
        })
    };

    (token, plan)
}
