//! Rule model errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] shardhound_config::Error),

    #[error("no table rule for logical table \"{0}\"")]
    MissingTableRule(String),

    #[error("default data source \"{0}\" is not declared")]
    MissingDefaultDataSource(String),

    #[error("sharding value {value} for column \"{column}\" cannot be routed")]
    UnshardableValue { column: String, value: String },

    #[error("mapping index {index} out of bounds for {targets} targets")]
    MappingIndex { index: usize, targets: usize },

    #[error("binding table \"{table}\" has no shard aligned with \"{driving_actual}\" on \"{data_source}\"")]
    BindingMismatch {
        table: String,
        data_source: String,
        driving_actual: String,
    },
}
