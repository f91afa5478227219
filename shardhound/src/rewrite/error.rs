//! Rewrite errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Pagination resolved to something inexpressible; surfaced
    /// before any shard is contacted.
    #[error("SQL parsing error: {0}")]
    SqlParsing(String),

    #[error("token at offset {0} is outside the original SQL")]
    TokenPosition(usize),

    #[error("missing parameter: ?{0}")]
    MissingParameter(usize),
}
