//! Routing errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("statement cannot be routed: {0}")]
    UnsupportedRouting(String),

    #[error("{0}")]
    Rule(#[from] crate::rule::Error),

    #[error("missing parameter: ?{0}")]
    MissingParameter(usize),

    #[error("no data sources to route to")]
    NoDataSources,
}
