//! In-memory query result.

use std::collections::VecDeque;

use crate::datum::Datum;

use super::{Error, QueryResult};

/// A fully materialized shard result. Used by tests and by
/// adapters that buffer rows before merging.
#[derive(Debug, Default)]
pub struct MemoryQueryResult {
    labels: Vec<String>,
    rows: VecDeque<Vec<Datum>>,
    current: Option<Vec<Datum>>,
}

impl MemoryQueryResult {
    pub fn new(
        labels: impl IntoIterator<Item = impl ToString>,
        rows: impl IntoIterator<Item = Vec<Datum>>,
    ) -> Self {
        Self {
            labels: labels.into_iter().map(|label| label.to_string()).collect(),
            rows: rows.into_iter().collect(),
            current: None,
        }
    }
}

impl QueryResult for MemoryQueryResult {
    fn next(&mut self) -> Result<bool, Error> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn value(&self, column: usize) -> Result<Datum, Error> {
        let row = match self.current.as_ref() {
            Some(row) => row,
            None => {
                return Err(Error::ColumnOutOfBounds {
                    index: column,
                    count: 0,
                })
            }
        };
        row.get(column).cloned().ok_or(Error::ColumnOutOfBounds {
            index: column,
            count: row.len(),
        })
    }

    fn column_count(&self) -> usize {
        self.labels.len()
    }

    fn column_label(&self, column: usize) -> Option<&str> {
        self.labels.get(column).map(|label| label.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut result = MemoryQueryResult::new(
            ["id", "name"],
            vec![
                vec![Datum::Bigint(1), Datum::Text("a".into())],
                vec![Datum::Bigint(2), Datum::Text("b".into())],
            ],
        );

        assert!(result.next().unwrap());
        assert_eq!(result.value(0).unwrap(), Datum::Bigint(1));
        assert!(result.next().unwrap());
        assert_eq!(result.value(1).unwrap(), Datum::Text("b".into()));
        assert!(!result.next().unwrap());
    }
}
