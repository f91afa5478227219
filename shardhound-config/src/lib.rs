// Submodules
pub mod core;
pub mod error;
pub mod general;
pub mod sharding;

pub use crate::core::{Config, DataSource};
pub use crate::error::Error;
pub use crate::general::General;
pub use crate::sharding::{
    AlgorithmKind, MappingKind, ShardMapping, ShardValue, ShardedTable, Strategy,
};
