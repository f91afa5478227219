//! Top-level error.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] shardhound_config::Error),

    #[error("{0}")]
    Rule(#[from] crate::rule::Error),

    #[error("{0}")]
    Route(#[from] crate::route::Error),

    #[error("{0}")]
    Rewrite(#[from] crate::rewrite::Error),

    #[error("{0}")]
    Merge(#[from] crate::merge::Error),

    #[error("{0}")]
    Execute(#[from] crate::executor::Error),
}
