//! Sharded table declarations.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A sharding value, as written in config mappings
/// or extracted from a statement at runtime.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ShardValue {
    Integer(i64),
    String(String),
}

impl ShardValue {
    pub fn integer(&self) -> Option<i64> {
        match self {
            ShardValue::Integer(value) => Some(*value),
            ShardValue::String(_) => None,
        }
    }

    /// Comparable only within the same type.
    pub fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (ShardValue::Integer(a), ShardValue::Integer(b)) => Some(a.cmp(b)),
            (ShardValue::String(a), ShardValue::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShardValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardValue::Integer(value) => write!(f, "{}", value),
            ShardValue::String(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for ShardValue {
    fn from(value: i64) -> Self {
        ShardValue::Integer(value)
    }
}

impl From<&str> for ShardValue {
    fn from(value: &str) -> Self {
        ShardValue::String(value.to_string())
    }
}

/// How a sharding column value picks a target ordinal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    /// Integer value modulo the number of targets.
    #[default]
    Modulo,
    /// FNV-1a hash of the value modulo the number of targets.
    Hash,
    /// Explicit value lists, one per target ordinal.
    List,
    /// Explicit half-open ranges, one per target ordinal.
    Range,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    List,
    Range,
}

/// One list or range entry of an explicit mapping.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ShardMapping {
    pub kind: MappingKind,

    /// List values routed to `index`.
    #[serde(default)]
    pub values: Vec<ShardValue>,

    /// Range start, inclusive. Open-ended if absent.
    #[serde(default)]
    pub start: Option<ShardValue>,

    /// Range end, exclusive. Open-ended if absent.
    #[serde(default)]
    pub end: Option<ShardValue>,

    /// Target ordinal within the dimension this mapping shards.
    pub index: usize,
}

/// Sharding strategy for one dimension (data source or table).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Strategy {
    /// Sharding column.
    pub column: String,

    #[serde(default)]
    pub algorithm: AlgorithmKind,

    /// Explicit routing rules for list/range algorithms.
    #[serde(default)]
    pub mappings: Vec<ShardMapping>,
}

/// Sharded table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ShardedTable {
    /// Logical table name, as written in client SQL.
    pub name: String,

    /// Actual data nodes, either explicit (`"ds_0.t_order_0"`) or
    /// an expression (`"ds_${0..1}.t_order_${0..1}"`).
    pub data_nodes: Vec<String>,

    #[serde(default)]
    pub database_strategy: Option<Strategy>,

    #[serde(default)]
    pub table_strategy: Option<Strategy>,

    /// Auto-generated key column, filled in when an INSERT omits it.
    #[serde(default)]
    pub key_column: Option<String>,
}

static RANGE_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\d+)\.\.(\d+)\}").expect("range expression regex"));

/// Expand `${lo..hi}` segments, leftmost varying slowest.
fn expand(expr: &str) -> Result<Vec<String>, Error> {
    let captures = match RANGE_EXPR.captures(expr) {
        Some(captures) => captures,
        None => return Ok(vec![expr.to_string()]),
    };

    let whole = captures.get(0).expect("capture 0");
    let lo: u64 = captures[1]
        .parse()
        .map_err(|_| Error::BadNodeExpression(expr.to_string()))?;
    let hi: u64 = captures[2]
        .parse()
        .map_err(|_| Error::BadNodeExpression(expr.to_string()))?;

    if lo > hi {
        return Err(Error::BadNodeExpression(expr.to_string()));
    }

    let mut result = vec![];
    for n in lo..=hi {
        let expanded = format!("{}{}{}", &expr[..whole.start()], n, &expr[whole.end()..]);
        result.extend(expand(&expanded)?);
    }

    Ok(result)
}

impl ShardedTable {
    /// Expanded `(data_source, table)` pairs, in declaration order.
    pub fn expanded_data_nodes(&self) -> Result<Vec<(String, String)>, Error> {
        let mut result = vec![];
        for node in &self.data_nodes {
            for expanded in expand(node)? {
                let (data_source, table) = expanded
                    .split_once('.')
                    .ok_or_else(|| Error::MalformedDataNode(expanded.clone()))?;
                if data_source.is_empty() || table.is_empty() || table.contains('.') {
                    return Err(Error::MalformedDataNode(expanded.clone()));
                }
                result.push((data_source.to_string(), table.to_string()));
            }
        }
        if result.is_empty() {
            return Err(Error::NoDataNodes(self.name.clone()));
        }
        Ok(result)
    }
}
