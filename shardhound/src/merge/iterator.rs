//! Iterator merge: shard results concatenated in routing order.

use super::{read_row, Cursor, Error, MergedResult, QueryResult};

use crate::datum::Datum;

/// Streams rows shard by shard, falling through to the next
/// shard's result on exhaustion. Can start consuming the first
/// shard before later shards finish, since no cross-shard
/// ordering is required.
pub struct IteratorMergedResult {
    results: Vec<Box<dyn QueryResult>>,
    index: usize,
    cursor: Cursor,
}

impl IteratorMergedResult {
    pub fn new(results: Vec<Box<dyn QueryResult>>, derived: usize) -> Self {
        let visible = results
            .first()
            .map(|result| result.column_count().saturating_sub(derived))
            .unwrap_or(0);
        Self {
            results,
            index: 0,
            cursor: Cursor::with_visible(visible),
        }
    }
}

impl MergedResult for IteratorMergedResult {
    fn next(&mut self) -> Result<bool, Error> {
        while let Some(result) = self.results.get_mut(self.index) {
            if result.next()? {
                let row = read_row(result.as_ref())?;
                self.cursor.set(Some(row));
                return Ok(true);
            }
            self.index += 1;
        }
        self.cursor.set(None);
        Ok(false)
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
            ["id"],
            values.iter().map(|v| vec![Datum::Bigint(*v)]),
        ))
    }

    #[test]
    fn test_concatenates_in_order() {
        let mut merged =
            IteratorMergedResult::new(vec![shard(&[1, 2]), shard(&[]), shard(&[3])], 0);

        let mut seen = vec![];
        while merged.next().unwrap() {
            seen.push(merged.value(0).unwrap());
        }
        assert_eq!(
            seen,
            vec![Datum::Bigint(1), Datum::Bigint(2), Datum::Bigint(3)]
        );

        // terminal state
        assert!(!merged.next().unwrap());
    }

    #[test]
    fn test_empty_input() {
        let mut merged = IteratorMergedResult::new(vec![], 0);
        assert!(!merged.next().unwrap());
        assert!(!merged.next().unwrap());
    }

    #[test]
    fn test_column_out_of_bounds() {
        let mut merged = IteratorMergedResult::new(vec![shard(&[1])], 0);
        assert!(merged.next().unwrap());
        assert!(matches!(
            merged.value(5),
            Err(Error::ColumnOutOfBounds { index: 5, .. })
        ));
    }
}
