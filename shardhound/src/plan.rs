//! Statement planning facade.
//!
//! Ties the pipeline together for one statement: generated keys,
//! condition extraction, routing, derived columns, and one rewrite
//! per routing unit. The execution layer runs the plan; the merger
//! built here recombines what comes back.

use tracing::debug;

use crate::datum::Datum;
use crate::error::Error;
use crate::merge::{DqlMerger, MergedResult, QueryResult};
use crate::rewrite::{
    self, DerivedPlan, PaginationWindow, SqlRewriteEngine, SqlRewriteResult, SqlToken,
};
use crate::route::{self, HintContext, RouteResult, RouteUnit};
use crate::rule::ShardingRule;
use crate::statement::StatementContext;

/// Everything the execution layer needs for one statement.
#[derive(Debug)]
pub struct QueryPlan {
    pub route: RouteResult,
    /// One rewritten statement per routing unit, in routing order.
    pub executions: Vec<(RouteUnit, SqlRewriteResult)>,
    pub derived: DerivedPlan,
    pub window: Option<PaginationWindow>,
    /// Generated-keys contract: keys drawn for the INSERT, if any.
    pub generated_keys: Vec<i64>,
    pub generated_key_column: Option<String>,
}

pub struct QueryPlanner<'a> {
    rule: &'a ShardingRule,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(rule: &'a ShardingRule) -> Self {
        Self { rule }
    }

    /// Plan one statement end to end.
    pub fn plan(
        &self,
        stmt: &StatementContext,
        sql: &str,
        parameters: &[Datum],
        tokens: Vec<SqlToken>,
        hints: &HintContext,
    ) -> Result<QueryPlan, Error> {
        // Keys first: a generated key on a sharding column must
        // steer this statement's own routing.
        let generated = rewrite::generate(self.rule, stmt);

        let mut conditions = route::extract(self.rule, stmt, parameters)?;
        if let Some(key) = generated.as_ref() {
            if let Some(condition) = key.condition.as_ref() {
                conditions.push(condition.clone());
            }
        }

        let route = route::route(self.rule, stmt, &conditions, hints)?;

        let (items_token, derived) = rewrite::derive(stmt);

        let mut tokens = tokens;
        if let Some(token) = items_token {
            tokens.push(token);
        }
        let mut extra_parameters = vec![];
        if let Some(key) = generated.as_ref() {
            tokens.extend(key.tokens.iter().cloned());
            extra_parameters.extend(key.parameters.iter().cloned());
        }

        let engine = SqlRewriteEngine::new(sql, parameters, tokens, stmt)?
            .with_parameters(extra_parameters);
        let window = engine.window();

        let executions = route
            .units()
            .iter()
            .map(|unit| engine.rewrite(unit).map(|result| (unit.clone(), result)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "planned statement: {} unit(s), {} derived column(s)",
            executions.len(),
            derived.derived_count(),
        );

        Ok(QueryPlan {
            route,
            executions,
            derived,
            window,
            generated_keys: generated
                .as_ref()
                .map(|key| key.keys.clone())
                .unwrap_or_default(),
            generated_key_column: generated.map(|key| key.column),
        })
    }

    /// Build the merged cursor over the per-shard results of a plan.
    pub fn merge(
        &self,
        stmt: &StatementContext,
        plan: &QueryPlan,
        results: Vec<Box<dyn QueryResult>>,
    ) -> Result<Box<dyn MergedResult>, Error> {
        Ok(DqlMerger::new(self.rule, stmt, &plan.derived, plan.window).merge(results)?)
    }
}
