//! Ordered k-way merge.

use std::cmp::Ordering;

use crate::datum::Datum;
use crate::statement::Direction;

use super::{column_index, read_row, Cursor, Error, MergedResult, QueryResult};

/// K-way merge over per-shard cursors already sorted by the same
/// ORDER BY. Keeps one buffered head row per shard and emits the
/// smallest by comparator; ties go to the earlier routing unit.
pub struct OrderByStreamMergedResult {
    results: Vec<Box<dyn QueryResult>>,
    heads: Vec<Option<Vec<Datum>>>,
    sort: Vec<(usize, Direction)>,
    cursor: Cursor,
}

impl OrderByStreamMergedResult {
    pub fn new(
        results: Vec<Box<dyn QueryResult>>,
        sort_labels: &[(String, Direction)],
        derived: usize,
    ) -> Result<Self, Error> {
        let sort = match results.first() {
            Some(first) => sort_labels
                .iter()
                .map(|(label, direction)| {
                    column_index(first.as_ref(), label).map(|index| (index, *direction))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![],
        };

        let visible = results
            .first()
            .map(|result| result.column_count().saturating_sub(derived))
            .unwrap_or(0);

        let mut merged = Self {
            results,
            heads: vec![],
            sort,
            cursor: Cursor::with_visible(visible),
        };

        // prime one head per shard
        for index in 0..merged.results.len() {
            let head = merged.advance(index)?;
            merged.heads.push(head);
        }

        Ok(merged)
    }

    fn advance(&mut self, index: usize) -> Result<Option<Vec<Datum>>, Error> {
        let result = &mut self.results[index];
        if result.next()? {
            Ok(Some(read_row(result.as_ref())?))
        } else {
            Ok(None)
        }
    }

    fn compare(&self, a: &[Datum], b: &[Datum]) -> Ordering {
        for (index, direction) in &self.sort {
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
}

impl MergedResult for OrderByStreamMergedResult {
    fn next(&mut self) -> Result<bool, Error> {
        let mut winner: Option<usize> = None;
        for (index, head) in self.heads.iter().enumerate() {
            let head = match head {
                Some(head) => head,
                None => continue,
            };
            winner = match winner {
                None => Some(index),
                Some(current)
                    if self.compare(head, self.heads[current].as_ref().expect("head"))
                        == Ordering::Less =>
                {
                    Some(index)
                }
                Some(current) => Some(current),
            };
        }

        match winner {
            Some(index) => {
                let row = self.heads[index].take().expect("winner head");
                self.heads[index] = self.advance(index)?;
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::merge::MemoryQueryResult;

    fn shard(values: &[i64]) -> Box<dyn QueryResult> {
        Box::new(MemoryQueryResult::new(
            ["order_id"],
            values.iter().map(|v| vec![Datum::Bigint(*v)]),
        ))
    }

    fn drain(merged: &mut dyn MergedResult) -> Vec<i64> {
        let mut seen = vec![];
        while merged.next().unwrap() {
            seen.push(merged.value(0).unwrap().as_i64().unwrap());
        }
        seen
    }

    #[test]
    fn test_three_way_interleave() {
        let mut merged = OrderByStreamMergedResult::new(
            vec![shard(&[1, 4, 7]), shard(&[2, 5]), shard(&[3, 6, 9])],
            &[("order_id".to_string(), Direction::Asc)],
            0,
        )
        .unwrap();

        assert_eq!(drain(&mut merged), vec![1, 2, 3, 4, 5, 6, 7, 9]);
        assert!(!merged.next().unwrap());
    }

    #[test]
    fn test_descending() {
        let mut merged = OrderByStreamMergedResult::new(
            vec![shard(&[9, 5]), shard(&[8, 2])],
            &[("order_id".to_string(), Direction::Desc)],
            0,
        )
        .unwrap();

        assert_eq!(drain(&mut merged), vec![9, 8, 5, 2]);
    }

    #[test]
    fn test_empty_results() {
        let mut merged = OrderByStreamMergedResult::new(
            vec![],
            &[("order_id".to_string(), Direction::Asc)],
            0,
        )
        .unwrap();
        assert!(!merged.next().unwrap());
    }

    #[test]
    fn test_missing_sort_column() {
        let result = OrderByStreamMergedResult::new(
            vec![shard(&[1])],
            &[("nonexistent".to_string(), Direction::Asc)],
            0,
        );
        assert!(matches!(result, Err(Error::MissingColumn(_))));
    }
}
