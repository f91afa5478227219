//! Table listing and status merge.
//!
//! SHOW TABLES and SHOW TABLE STATUS return one row per actual
//! table; the logical view has one row per logical table, so after
//! renaming, duplicate rows are suppressed.

use std::collections::{HashSet, VecDeque};

use crate::datum::Datum;

use super::identity::rename_tables;
use super::{read_row, Cursor, Error, MergedResult, QueryResult};

pub struct TableStatusMergedResult {
    rows: VecDeque<Vec<Datum>>,
    cursor: Cursor,
}

impl TableStatusMergedResult {
    pub fn new(
        mut results: Vec<Box<dyn QueryResult>>,
        tables: Vec<(String, Vec<String>)>,
    ) -> Result<Self, Error> {
        let mut rows = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();

        for result in &mut results {
            while result.next()? {
                let mut row = read_row(result.as_ref())?;

                // first column carries the table name
                let name = match row.first() {
                    Some(Datum::Text(name)) => rename_tables(name, &tables),
                    _ => continue,
                };
                if !seen.insert(name.to_lowercase()) {
                    continue;
                }
                row[0] = Datum::Text(name);
                rows.push_back(row);
            }
        }

        Ok(Self {
            rows,
            cursor: Cursor::default(),
        })
    }
}

impl MergedResult for TableStatusMergedResult {
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
