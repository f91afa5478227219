//! Concurrent statement fan-out.
//!
//! Each routing unit's rewritten statement runs against its data
//! source independently; shards are separate databases with
//! independent latency, so executions are concurrent. The merge
//! engine is the synchronization point downstream.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error as ThisError;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::datum::Datum;
use crate::merge::QueryResult;
use crate::rewrite::SqlRewriteResult;
use crate::route::RouteUnit;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("data source \"{0}\": {1}")]
    DataSource(String, String),

    #[error("execution task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Executes one rewritten statement against one physical data
/// source. Implemented by the connection layer.
#[async_trait]
pub trait ShardExecutor: Send + Sync {
    async fn execute(
        &self,
        unit: &RouteUnit,
        sql: &str,
        parameters: &[Datum],
    ) -> Result<Box<dyn QueryResult>, Error>;
}

/// Run every unit's statement concurrently. Results come back in
/// routing-unit order. Fail-fast: the first error aborts the
/// outstanding siblings and is surfaced; partial results are
/// discarded. No retry happens here.
pub async fn execute_all(
    executor: Arc<dyn ShardExecutor>,
    executions: &[(RouteUnit, SqlRewriteResult)],
) -> Result<Vec<Box<dyn QueryResult>>, Error> {
    let mut set = JoinSet::new();
    for (index, (unit, rewrite)) in executions.iter().enumerate() {
        let executor = executor.clone();
        let unit = unit.clone();
        let sql = rewrite.sql.clone();
        let parameters = rewrite.parameters.clone();
        set.spawn(async move {
            let result = executor.execute(&unit, &sql, &parameters).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<Box<dyn QueryResult>>> =
        (0..executions.len()).map(|_| None).collect();

    while let Some(joined) = set.join_next().await {
        let (index, result) = joined?;
        match result {
            Ok(result) => results[index] = Some(result),
            Err(err) => {
                warn!("shard execution failed, aborting siblings: {}", err);
                set.abort_all();
                return Err(err);
            }
        }
    }

    debug!("{} shard execution(s) complete", results.len());
    Ok(results
        .into_iter()
        .map(|result| result.expect("every unit joined"))
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::merge::MemoryQueryResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockExecutor {
        fail_on: Option<&'static str>,
        started: AtomicUsize,
    }

    #[async_trait]
    impl ShardExecutor for MockExecutor {
        async fn execute(
            &self,
            unit: &RouteUnit,
            _sql: &str,
            _parameters: &[Datum],
        ) -> Result<Box<dyn QueryResult>, Error> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(unit.data_source()) {
                return Err(Error::DataSource(
                    unit.data_source().to_string(),
                    "connection refused".into(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Box::new(MemoryQueryResult::new(
                ["source"],
                vec![vec![Datum::Text(unit.data_source().into())]],
            )))
        }
    }

    fn executions(sources: &[&str]) -> Vec<(RouteUnit, SqlRewriteResult)> {
        sources
            .iter()
            .map(|source| {
                (
                    RouteUnit::new(source),
                    SqlRewriteResult {
                        sql: "SELECT 1".into(),
                        parameters: vec![],
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_results_in_unit_order() {
        let executor = Arc::new(MockExecutor {
            fail_on: None,
            started: AtomicUsize::new(0),
        });

        let executions = executions(&["ds_0", "ds_1", "ds_2"]);
        let mut results = execute_all(executor, &executions).await.unwrap();

        let mut seen = vec![];
        for result in &mut results {
            assert!(result.next().unwrap());
            seen.push(result.value(0).unwrap());
        }
        assert_eq!(
            seen,
            vec![
                Datum::Text("ds_0".into()),
                Datum::Text("ds_1".into()),
                Datum::Text("ds_2".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_surfaces_first_error() {
        let executor = Arc::new(MockExecutor {
            fail_on: Some("ds_1"),
            started: AtomicUsize::new(0),
        });

        let executions = executions(&["ds_0", "ds_1", "ds_2"]);
        let result = execute_all(executor, &executions).await;

        match result {
            Err(Error::DataSource(source, _)) => assert_eq!(source, "ds_1"),
            other => panic!("expected data source error, got {:?}", other.map(|_| ())),
        }
    }
}
