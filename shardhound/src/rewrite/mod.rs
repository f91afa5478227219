//! SQL rewrite engine.
//!
//! Turns the original SQL text plus its token list into one
//! executable statement per routing unit. The rewriter never
//! re-serializes from an AST: it walks the original string once,
//! copying verbatim spans and substituting at token offsets.

pub mod derived;
pub mod error;
pub mod generated_key;
pub mod token;

pub use derived::{derive, AvgColumns, DerivedPlan};
pub use error::Error;
pub use generated_key::{generate, GeneratedKey};
pub use token::SqlToken;

use crate::datum::Datum;
use crate::route::RouteUnit;
use crate::statement::{Pagination, PaginationValue, StatementContext};

/// One rewritten statement, directly executable against the
/// routing unit it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRewriteResult {
    pub sql: String,
    pub parameters: Vec<Datum>,
}

/// The true pagination window, re-applied by the merge engine
/// after every shard over-fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaginationWindow {
    pub offset: u64,
    pub row_count: Option<u64>,
}

impl PaginationWindow {
    /// Rows each shard is asked for: the global order is unknown
    /// until merge time, so every shard over-fetches.
    pub fn over_fetch(&self) -> u64 {
        self.offset + self.row_count.unwrap_or(0)
    }
}

fn resolve_value(value: &PaginationValue, params: &[Datum]) -> Result<u64, Error> {
    match value {
        PaginationValue::Literal { value, .. } => Ok(*value),
        PaginationValue::Parameter(index) => {
            let datum = params
                .get(*index)
                .ok_or(Error::MissingParameter(*index))?;
            let value = datum.as_i64().ok_or_else(|| {
                Error::SqlParsing(format!("LIMIT value ?{} is not an integer", index))
            })?;
            if value < 0 {
                return Err(Error::SqlParsing(format!("negative LIMIT value {}", value)));
            }
            Ok(value as u64)
        }
    }
}

/// Resolve literal or parameter-bound pagination values.
pub fn resolve_pagination(
    pagination: &Pagination,
    params: &[Datum],
) -> Result<PaginationWindow, Error> {
    let offset = match &pagination.offset {
        Some(value) => resolve_value(value, params)?,
        None => 0,
    };
    let row_count = match &pagination.row_count {
        Some(value) => Some(resolve_value(value, params)?),
        None => None,
    };
    Ok(PaginationWindow { offset, row_count })
}

/// Per-statement rewriter, invoked once per routing unit.
pub struct SqlRewriteEngine<'a> {
    sql: &'a str,
    parameters: &'a [Datum],
    tokens: Vec<SqlToken>,
    window: Option<PaginationWindow>,
    // parameter ordinals replaced by pagination literals
    dropped_params: Vec<usize>,
    extra_params: Vec<Datum>,
}

impl<'a> SqlRewriteEngine<'a> {
    /// Build the rewriter. Pagination is resolved here, so a bad
    /// LIMIT fails before any shard is contacted.
    pub fn new(
        sql: &'a str,
        parameters: &'a [Datum],
        mut tokens: Vec<SqlToken>,
        stmt: &StatementContext,
    ) -> Result<Self, Error> {
        let mut window = None;
        let mut dropped_params = vec![];

        if let Some(pagination) = stmt.pagination() {
            window = Some(resolve_pagination(pagination, parameters)?);
            for value in [&pagination.offset, &pagination.row_count]
                .into_iter()
                .flatten()
            {
                if let PaginationValue::Parameter(index) = value {
                    dropped_params.push(*index);
                }
            }
        }

        // stable: ties keep insertion order
        tokens.sort_by_key(SqlToken::start);

        Ok(Self {
            sql,
            parameters,
            tokens,
            window,
            dropped_params,
            extra_params: vec![],
        })
    }

    /// Parameters appended by the generated-key pass.
    pub fn with_parameters(mut self, extra: Vec<Datum>) -> Self {
        self.extra_params.extend(extra);
        self
    }

    pub fn window(&self) -> Option<PaginationWindow> {
        self.window
    }

    /// Rewrite for one routing unit.
    pub fn rewrite(&self, unit: &RouteUnit) -> Result<SqlRewriteResult, Error> {
        let mut sql = String::with_capacity(self.sql.len() + 32);
        let mut cursor = 0;

        for token in &self.tokens {
            let start = token.start();
            if start < cursor || start + token.len() > self.sql.len() {
                return Err(Error::TokenPosition(start));
            }
            sql.push_str(&self.sql[cursor..start]);

            match token {
                SqlToken::Table { len, table, .. } => {
                    match unit.actual_table(table) {
                        Some(actual) => sql.push_str(actual),
                        // not mapped by this unit: broadcast or unsharded
                        None => sql.push_str(&self.sql[start..start + len]),
                    }
                    cursor = start + len;
                }

                SqlToken::Items { items, .. }
                | SqlToken::InsertColumns { columns: items, .. }
                | SqlToken::InsertValues { values: items, .. } => {
                    for item in items {
                        sql.push_str(", ");
                        sql.push_str(item);
                    }
                    cursor = start;
                }

                SqlToken::Offset { len, .. } => {
                    sql.push('0');
                    cursor = start + len;
                }

                SqlToken::RowCount { len, .. } => {
                    let over_fetch = self.window.unwrap_or_default().over_fetch();
                    sql.push_str(&over_fetch.to_string());
                    cursor = start + len;
                }
            }
        }
        sql.push_str(&self.sql[cursor..]);

        let mut parameters = self
            .parameters
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.dropped_params.contains(index))
            .map(|(_, datum)| datum.clone())
            .collect::<Vec<_>>();
        parameters.extend(self.extra_params.iter().cloned());

        Ok(SqlRewriteResult { sql, parameters })
    }
}
