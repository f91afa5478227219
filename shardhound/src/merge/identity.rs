//! Logical-table-identity merge.
//!
//! SHOW CREATE TABLE and SHOW INDEX return the same DDL shape on
//! every shard of a logical table, so only the first non-empty
//! shard is consumed. Actual table names inside returned text are
//! rewritten back to logical names; that takes a scan for every
//! known actual-table substring, because DDL text also embeds them
//! in constraint names and bound-table references.

use std::collections::VecDeque;

use memchr::memmem;

use crate::datum::Datum;

use super::{read_row, Cursor, Error, MergedResult, QueryResult};

fn is_ident(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Replace whole-identifier occurrences of one actual table name.
///
/// A standalone identifier becomes the logical name. An occurrence
/// embedded at the tail of a longer identifier (a constraint named
/// after the actual table, `foo_tbl_foreign_key_foo_tbl_0`) drops
/// the `_<actual>` suffix, leaving the logical constraint name.
fn rename_one(value: &str, actual: &str, logic: &str) -> String {
    let bytes = value.as_bytes();
    let mut result = String::with_capacity(value.len());
    let mut cursor = 0;

    for found in memmem::find_iter(bytes, actual.as_bytes()) {
        if found < cursor {
            continue;
        }
        let end = found + actual.len();
        if end < bytes.len() && is_ident(bytes[end]) {
            // longer identifier, not this table
            continue;
        }

        if found > 0 && bytes[found - 1] == b'_' {
            result.push_str(&value[cursor..found - 1]);
        } else if found > 0 && is_ident(bytes[found - 1]) {
            continue;
        } else {
            result.push_str(&value[cursor..found]);
            result.push_str(logic);
        }
        cursor = end;
    }

    result.push_str(&value[cursor..]);
    result
}

/// Rewrite every known actual table name in a text value back to
/// its logical name. Longer names first, so one table's actual
/// name can't shadow another's.
pub(super) fn rename_tables(value: &str, tables: &[(String, Vec<String>)]) -> String {
    let mut pairs = tables
        .iter()
        .flat_map(|(logic, actuals)| actuals.iter().map(move |actual| (logic, actual)))
        .collect::<Vec<_>>();
    pairs.sort_by_key(|(_, actual)| std::cmp::Reverse(actual.len()));

    let mut result = value.to_string();
    for (logic, actual) in pairs {
        if result.contains(actual.as_str()) {
            result = rename_one(&result, actual, logic);
        }
    }
    result
}

/// First non-empty shard's rows, with text columns renamed.
pub struct IdentityMergedResult {
    rows: VecDeque<Vec<Datum>>,
    cursor: Cursor,
}

impl IdentityMergedResult {
    pub fn new(
        mut results: Vec<Box<dyn QueryResult>>,
        tables: Vec<(String, Vec<String>)>,
    ) -> Result<Self, Error> {
        let mut rows = VecDeque::new();

        'results: for result in &mut results {
            while result.next()? {
                let mut row = read_row(result.as_ref())?;
                for datum in &mut row {
                    if let Datum::Text(text) = datum {
                        *datum = Datum::Text(rename_tables(text, &tables));
                    }
                }
                rows.push_back(row);
            }
            if !rows.is_empty() {
                break 'results;
            }
        }

        Ok(Self {
            rows,
            cursor: Cursor::default(),
        })
    }
}

impl MergedResult for IdentityMergedResult {
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
