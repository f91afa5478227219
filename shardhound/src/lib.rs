//! Database-sharding middleware core.
//!
//! Accepts a bound SQL statement addressed to a virtual schema,
//! decides which physical data sources and actual tables must run
//! it, produces one rewritten SQL + parameter pair per target, and
//! recombines the per-target result sets into a single logical
//! cursor.
//!
//! The pipeline has three stages:
//!
//! * [`route`] — maps the statement plus extracted sharding
//!   conditions (and caller hints) to routing units;
//! * [`rewrite`] — applies positional tokens to the original SQL
//!   text, once per unit: table names, derived columns, pagination
//!   over-fetch, generated keys;
//! * [`merge`] — exposes one cursor over all shard results:
//!   concatenation, ordered k-way, aggregation recombination, or
//!   logical-table-identity rewriting for metadata statements.
//!
//! Parsing/binding, wire protocols and physical connections are
//! external; [`statement`], [`rewrite::SqlToken`] and
//! [`merge::QueryResult`] are their interfaces.

pub mod datum;
pub mod error;
pub mod executor;
pub mod merge;
pub mod plan;
pub mod rewrite;
pub mod route;
pub mod rule;
pub mod statement;

pub use datum::Datum;
pub use error::Error;
pub use plan::{QueryPlan, QueryPlanner};
pub use rule::{SchemaContext, ShardingRule};

pub use shardhound_config as config;
