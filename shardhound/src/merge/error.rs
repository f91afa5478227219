//! Merge errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("column {index} out of bounds ({count} columns)")]
    ColumnOutOfBounds { index: usize, count: usize },

    #[error("no column labeled \"{0}\" in the result set")]
    MissingColumn(String),

    #[error("cannot aggregate non-numeric value in column {0}")]
    NotNumeric(usize),
}
