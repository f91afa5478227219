//! Group-by and aggregation merge.

use std::cmp::Ordering;
use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::datum::Datum;
use crate::rewrite::DerivedPlan;
use crate::statement::{AggregationKind, Direction, StatementContext};

use super::{column_index, read_row, Cursor, Error, MergedResult, QueryResult};

/// Recombines partial per-shard aggregates in memory: rows are
/// grouped on the grouping columns, aggregate columns folded
/// (COUNT and SUM add up, MAX/MIN take the extremum, AVG divides
/// the summed partial sums by the summed partial counts), then the
/// groups are sorted and the derived columns hidden.
pub struct GroupByMemoryMergedResult {
    rows: VecDeque<Vec<Datum>>,
    cursor: Cursor,
}

#[derive(Debug, Clone)]
enum AggregationUnit {
    Count {
        column: usize,
        total: Datum,
    },
    Sum {
        column: usize,
        total: Datum,
    },
    Max {
        column: usize,
        value: Datum,
    },
    Min {
        column: usize,
        value: Datum,
    },
    /// avg(avg) is wrong under uneven shard row counts; the true
    /// average is total sum over total count of the derived pair.
    Avg {
        column: usize,
        count_column: usize,
        sum_column: usize,
        total_count: Datum,
        total_sum: Datum,
    },
}

impl AggregationUnit {
    fn add(&mut self, row: &[Datum]) {
        match self {
            AggregationUnit::Count { column, total }
            | AggregationUnit::Sum { column, total } => {
                *total = total.clone() + row[*column].clone();
            }
            AggregationUnit::Max { column, value } => {
                let candidate = &row[*column];
                if value.is_null() || (*value).partial_cmp(candidate) == Some(Ordering::Less) {
                    *value = candidate.clone();
                }
            }
            AggregationUnit::Min { column, value } => {
                let candidate = &row[*column];
                if candidate.is_null() {
                    return;
                }
                if value.is_null() || (*value).partial_cmp(candidate) == Some(Ordering::Greater) {
                    *value = candidate.clone();
                }
            }
            AggregationUnit::Avg {
                count_column,
                sum_column,
                total_count,
                total_sum,
                ..
            } => {
                *total_count = total_count.clone() + row[*count_column].clone();
                *total_sum = total_sum.clone() + row[*sum_column].clone();
            }
        }
    }

    fn finalize(&self, row: &mut [Datum]) {
        match self {
            AggregationUnit::Count { column, total }
            | AggregationUnit::Sum { column, total } => {
                row[*column] = total.clone();
            }
            AggregationUnit::Max { column, value } | AggregationUnit::Min { column, value } => {
                row[*column] = value.clone();
            }
            AggregationUnit::Avg {
                column,
                total_count,
                total_sum,
                ..
            } => {
                row[*column] = match (total_sum.as_decimal(), total_count.as_decimal()) {
                    (Some(sum), Some(count)) if count != Decimal::ZERO => {
                        Datum::Decimal(sum / count)
                    }
                    _ => Datum::Null,
                };
            }
        }
    }
}

struct Group {
    key: Vec<Datum>,
    base_row: Vec<Datum>,
    units: Vec<AggregationUnit>,
}

impl GroupByMemoryMergedResult {
    pub fn new(
        mut results: Vec<Box<dyn QueryResult>>,
        stmt: &StatementContext,
        plan: &DerivedPlan,
    ) -> Result<Self, Error> {
        let first = match results.first() {
            Some(first) => first,
            None => {
                return Ok(Self {
                    rows: VecDeque::new(),
                    cursor: Cursor::default(),
                })
            }
        };
        let visible = first.column_count().saturating_sub(plan.derived_count());

        let group_indexes = plan
            .group_labels
            .iter()
            .map(|label| column_index(first.as_ref(), label))
            .collect::<Result<Vec<_>, _>>()?;

        let sort = if plan.sort_labels.is_empty() {
            group_indexes
                .iter()
                .map(|index| (*index, Direction::Asc))
                .collect::<Vec<_>>()
        } else {
            plan.sort_labels
                .iter()
                .map(|(label, direction)| {
                    column_index(first.as_ref(), label).map(|index| (index, *direction))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let units = Self::units(first.as_ref(), stmt, plan)?;

        let mut groups: Vec<Group> = vec![];
        for result in &mut results {
            while result.next()? {
                let row = read_row(result.as_ref())?;
                let key = group_indexes
                    .iter()
                    .map(|index| row[*index].clone())
                    .collect::<Vec<_>>();

                let group = match groups.iter_mut().find(|group| group.key == key) {
                    Some(group) => group,
                    None => {
                        groups.push(Group {
                            key,
                            base_row: row.clone(),
                            units: units.clone(),
                        });
                        groups.last_mut().expect("just pushed")
                    }
                };
                for unit in &mut group.units {
                    unit.add(&row);
                }
            }
        }

        let mut rows = groups
            .into_iter()
            .map(|mut group| {
                for unit in &group.units {
                    unit.finalize(&mut group.base_row);
                }
                group.base_row.truncate(visible);
                group.base_row
            })
            .collect::<Vec<_>>();

        rows.sort_by(|a, b| compare(a, b, &sort));

        Ok(Self {
            rows: rows.into(),
            cursor: Cursor::with_visible(visible),
        })
    }

    /// One empty accumulator per aggregate select item, cloned
    /// into each new group.
    fn units(
        first: &dyn QueryResult,
        stmt: &StatementContext,
        plan: &DerivedPlan,
    ) -> Result<Vec<AggregationUnit>, Error> {
        let select = match stmt.select.as_ref() {
            Some(select) => select,
            None => return Ok(vec![]),
        };

        let mut units = vec![];
        for (column, item) in select.items.iter().enumerate() {
            let kind = match item.aggregation {
                Some(kind) => kind,
                None => continue,
            };
            units.push(match kind {
                AggregationKind::Count => AggregationUnit::Count {
                    column,
                    total: Datum::Null,
                },
                AggregationKind::Sum => AggregationUnit::Sum {
                    column,
                    total: Datum::Null,
                },
                AggregationKind::Max => AggregationUnit::Max {
                    column,
                    value: Datum::Null,
                },
                AggregationKind::Min => AggregationUnit::Min {
                    column,
                    value: Datum::Null,
                },
                AggregationKind::Avg => {
                    let pair = plan
                        .avg
                        .iter()
                        .find(|avg| avg.item_index == column)
                        .ok_or_else(|| Error::MissingColumn(item.label().to_string()))?;
                    AggregationUnit::Avg {
                        column,
                        count_column: column_index(first, &pair.count_label)?,
                        sum_column: column_index(first, &pair.sum_label)?,
                        total_count: Datum::Null,
                        total_sum: Datum::Null,
                    }
                }
            });
        }

        Ok(units)
    }
}

fn compare(a: &[Datum], b: &[Datum], sort: &[(usize, Direction)]) -> Ordering {
    for (index, direction) in sort {
        let ordering = match (a.get(*index), b.get(*index)) {
            (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        let ordering = match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl MergedResult for GroupByMemoryMergedResult {
    fn next(&mut self) -> Result<bool, Error> {
        match self.rows.pop_front() {
            Some(row) => {
                self.cursor.set(Some(row));
                Ok(true)
            }
            None => {
                self.cursor.set(None);
                Ok(false)
            }
        }
    }

    fn value(&mut self, column: usize) -> Result<Datum, Error> {
        self.cursor.value(column)
    }

    fn was_null(&self) -> bool {
        self.cursor.was_null()
    }
}
