//! Result merge engine.
//!
//! Recombines per-shard result sets into one logical cursor. The
//! merge strategy is a closed set, selected once at construction
//! from the statement shape; every strategy implements the same
//! narrow cursor contract.

pub mod error;
pub mod group_by;
pub mod identity;
pub mod iterator;
pub mod limit;
pub mod memory;
pub mod ordered;
pub mod status;

pub use error::Error;
pub use group_by::GroupByMemoryMergedResult;
pub use identity::IdentityMergedResult;
pub use iterator::IteratorMergedResult;
pub use limit::LimitDecorator;
pub use memory::MemoryQueryResult;
pub use ordered::OrderByStreamMergedResult;
pub use status::TableStatusMergedResult;

use tracing::debug;

use crate::datum::Datum;
use crate::rewrite::{DerivedPlan, PaginationWindow};
use crate::rule::ShardingRule;
use crate::statement::{StatementContext, StatementKind};

/// One shard's result set, pulled row by row. Implemented by the
/// execution layer; [`MemoryQueryResult`] is the in-process version.
pub trait QueryResult: Send {
    /// Advance to the next row. False once exhausted.
    fn next(&mut self) -> Result<bool, Error>;

    /// Value of a column in the current row.
    fn value(&self, column: usize) -> Result<Datum, Error>;

    fn column_count(&self) -> usize;

    fn column_label(&self, column: usize) -> Option<&str>;
}

/// The single logical cursor over all shards.
///
/// `next()` is monotonic: once it returns false, it stays false.
pub trait MergedResult: Send {
    fn next(&mut self) -> Result<bool, Error>;

    fn value(&mut self, column: usize) -> Result<Datum, Error>;

    /// Was the last value read NULL?
    fn was_null(&self) -> bool;
}

/// Current-row buffer shared by the merge strategies.
#[derive(Debug, Default)]
pub(crate) struct Cursor {
    row: Option<Vec<Datum>>,
    visible: usize,
    was_null: bool,
}

impl Cursor {
    pub(crate) fn with_visible(visible: usize) -> Self {
        Self {
            row: None,
            visible,
            was_null: false,
        }
    }

    pub(crate) fn set(&mut self, row: Option<Vec<Datum>>) {
        if self.visible == 0 {
            self.visible = row.as_ref().map(|row| row.len()).unwrap_or(0);
        }
        self.row = row;
    }

    pub(crate) fn value(&mut self, column: usize) -> Result<Datum, Error> {
        if column >= self.visible {
            return Err(Error::ColumnOutOfBounds {
                index: column,
                count: self.visible,
            });
        }
        let datum = self
            .row
            .as_ref()
            .and_then(|row| row.get(column))
            .cloned()
            .unwrap_or(Datum::Null);
        self.was_null = datum.is_null();
        Ok(datum)
    }

    pub(crate) fn was_null(&self) -> bool {
        self.was_null
    }
}

/// Read the current row of a shard result into an owned buffer.
pub(crate) fn read_row(result: &dyn QueryResult) -> Result<Vec<Datum>, Error> {
    (0..result.column_count())
        .map(|column| result.value(column))
        .collect()
}

/// Case-insensitive column label lookup.
pub(crate) fn column_index(result: &dyn QueryResult, label: &str) -> Result<usize, Error> {
    (0..result.column_count())
        .find(|column| {
            result
                .column_label(*column)
                .map(|l| l.eq_ignore_ascii_case(label))
                .unwrap_or(false)
        })
        .ok_or_else(|| Error::MissingColumn(label.to_string()))
}

/// Builds the merged cursor for a statement, selecting the strategy
/// once from statement metadata.
pub struct DqlMerger<'a> {
    rule: &'a ShardingRule,
    stmt: &'a StatementContext,
    plan: &'a DerivedPlan,
    window: Option<PaginationWindow>,
}

impl<'a> DqlMerger<'a> {
    pub fn new(
        rule: &'a ShardingRule,
        stmt: &'a StatementContext,
        plan: &'a DerivedPlan,
        window: Option<PaginationWindow>,
    ) -> Self {
        Self {
            rule,
            stmt,
            plan,
            window,
        }
    }

    /// Logical tables of the statement with every actual table
    /// name that may leak into returned text. DDL text can reference
    /// bound and foreign tables, so binding group members count too.
    fn renamed_tables(&self) -> Vec<(String, Vec<String>)> {
        let mut tables: Vec<String> = vec![];
        for table in &self.stmt.tables {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                tables.push(table.clone());
            }
            if let Some(binding) = self.rule.binding_rule(table) {
                for member in binding.tables() {
                    if !tables.iter().any(|t| t.eq_ignore_ascii_case(member)) {
                        tables.push(member.to_string());
                    }
                }
            }
        }

        tables
            .into_iter()
            .filter_map(|table| {
                self.rule.find_table_rule(&table).map(|rule| {
                    (
                        table.clone(),
                        rule.all_actual_tables().into_iter().cloned().collect(),
                    )
                })
            })
            .collect()
    }

    pub fn merge(
        &self,
        results: Vec<Box<dyn QueryResult>>,
    ) -> Result<Box<dyn MergedResult>, Error> {
        let merged: Box<dyn MergedResult> = match self.stmt.kind {
            StatementKind::ShowCreateTable | StatementKind::ShowIndex => {
                debug!("identity merge");
                Box::new(IdentityMergedResult::new(results, self.renamed_tables())?)
            }

            StatementKind::ShowTables | StatementKind::ShowTableStatus => {
                debug!("table status merge");
                Box::new(TableStatusMergedResult::new(
                    results,
                    self.renamed_tables(),
                )?)
            }

            _ => {
                let derived = self.plan.derived_count();
                let merged: Box<dyn MergedResult> = if self.stmt.has_aggregation()
                    || !self.plan.group_labels.is_empty()
                {
                    debug!("group-by/aggregation merge");
                    Box::new(GroupByMemoryMergedResult::new(
                        results, self.stmt, self.plan,
                    )?)
                } else if !self.plan.sort_labels.is_empty() {
                    debug!("ordered k-way merge");
                    Box::new(OrderByStreamMergedResult::new(
                        results,
                        &self.plan.sort_labels,
                        derived,
                    )?)
                } else {
                    debug!("iterator merge");
                    Box::new(IteratorMergedResult::new(results, derived))
                };

                match self.window {
                    Some(window) => Box::new(LimitDecorator::new(merged, window)),
                    None => merged,
                }
            }
        };

        Ok(merged)
    }
}
