//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config file \"{0}\" could not be read: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("no data sources declared")]
    NoDataSources,

    #[error("duplicate data source \"{0}\"")]
    DuplicateDataSource(String),

    #[error("sharded table \"{0}\" has no data nodes")]
    NoDataNodes(String),

    #[error("data node \"{0}\" is not of the form <data_source>.<table>")]
    MalformedDataNode(String),

    #[error("table \"{0}\" references undeclared data source \"{1}\"")]
    UnknownDataSource(String, String),

    #[error("invalid data node expression \"{0}\"")]
    BadNodeExpression(String),

    #[error("data node \"{0}.{1}\" belongs to more than one sharded table")]
    DuplicateDataNode(String, String),

    #[error("binding group references undeclared table \"{0}\"")]
    UnknownBindingTable(String),

    #[error("binding group tables \"{0}\" and \"{1}\" have mismatched data nodes")]
    UnevenBindingGroup(String, String),

    #[error("table \"{0}\" is declared both sharded and broadcast")]
    BroadcastConflict(String),
}
