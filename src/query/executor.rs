//! Query execution against a remote engine.
//!
//! Submits composed SQL, polls the execution with bounded exponential backoff
//! until it reaches a terminal state, and fetches the rows of a successful run.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::builder::{assemble, strip_unresolved, StatementComposer};
use crate::config::QueryDefinition;
use crate::engine::{QueryEngine, QueryExecution, QueryState, StartQuery};
use crate::error::{AthqError, Result};
use crate::params::ParameterStore;
use crate::template::resolve_str;

/// Delay before the first status poll.
const DEFAULT_INITIAL_INTERVAL_MS: u64 = 200;

/// Upper bound for the delay between polls.
const DEFAULT_MAX_INTERVAL_MS: u64 = 2_000;

/// Longest time to wait for a terminal state.
const DEFAULT_TIMEOUT_SECS: u64 = 30 * 60;

/// Polling schedule for [`QueryExecutor::await_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(DEFAULT_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_MAX_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PollConfig {
    /// Sets the maximum wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the first and largest delay between polls.
    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max.max(initial);
        self
    }
}

/// Where a query runs and writes its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub database: String,
    pub output_location: String,
}

/// Drives a query through submit, poll and fetch.
pub struct QueryExecutor<'a> {
    engine: &'a dyn QueryEngine,
    poll: PollConfig,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new executor with the default polling schedule.
    pub fn new(engine: &'a dyn QueryEngine) -> Self {
        Self {
            engine,
            poll: PollConfig::default(),
        }
    }

    /// Replaces the polling schedule.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Submits `sql` and returns the engine's execution id.
    ///
    /// The submission carries one idempotency token for all of its attempts.
    pub async fn submit(&self, sql: &str, database: &str, output_location: &str) -> Result<String> {
        let request = StartQuery::new(sql, database, output_location);
        debug!(
            "submitting with request token {}",
            request.client_request_token
        );
        let id = self.engine.start_query(&request).await?;
        info!("Submitted query {} to database {}", id, database);
        Ok(id)
    }

    /// Polls an execution until it finishes.
    ///
    /// On SUCCEEDED the rows are fetched; on FAILED or CANCELLED the
    /// execution is returned with its failure reason. Exceeding the
    /// configured timeout yields [`AthqError::QueryTimeout`].
    pub async fn await_completion(&self, execution_id: &str) -> Result<QueryExecution> {
        let mut execution = QueryExecution::submitted(execution_id);
        let started = Instant::now();
        let mut delay = self.poll.initial_interval;

        loop {
            let status = self.engine.query_status(execution_id).await?;

            if status.state != execution.state {
                if execution.state.can_advance_to(status.state) {
                    info!("Query {} is {}", execution_id, status.state);
                    execution.state = status.state;
                } else {
                    debug!(
                        "ignoring out-of-order state {} for {} (currently {})",
                        status.state, execution_id, execution.state
                    );
                }
            }
            execution.statistics = status.statistics;

            if execution.state.is_terminal() {
                if execution.state != QueryState::Succeeded {
                    execution.failure_reason = Some(
                        status
                            .state_change_reason
                            .filter(|r| !r.trim().is_empty())
                            .unwrap_or_else(|| format!("query {}", execution.state.as_str().to_lowercase())),
                    );
                }
                break;
            }

            let waited = started.elapsed();
            if waited >= self.poll.timeout {
                return Err(AthqError::QueryTimeout {
                    id: execution_id.to_string(),
                    waited,
                });
            }

            let remaining = self.poll.timeout - waited;
            tokio::time::sleep(delay.min(remaining)).await;
            delay = (delay * 2).min(self.poll.max_interval);
        }

        if execution.is_succeeded() {
            let results = self.engine.query_results(execution_id).await?;
            info!(
                "Query {} returned {} rows",
                execution_id,
                results.row_count()
            );
            execution.results = Some(results);
        }

        Ok(execution)
    }

    /// Submits `sql` and waits for it to finish.
    pub async fn run(&self, sql: &str, target: &QueryTarget) -> Result<QueryExecution> {
        let id = self
            .submit(sql, &target.database, &target.output_location)
            .await?;
        self.await_completion(&id).await
    }
}

/// Builds the final SQL for a query definition.
///
/// Parameters are substituted first, then clause groups fill their
/// placeholders, and whatever placeholders remain are dropped.
pub fn compose_sql(
    definition: &QueryDefinition,
    params: &ParameterStore,
    composer: &StatementComposer,
) -> String {
    let resolved = resolve_str(&definition.template, params);
    let assembled = assemble(&resolved, composer.current_groups());
    let sql = strip_unresolved(&assembled);
    debug!("composed SQL for {}: {}", definition.name, sql);
    sql
}

/// Composes a query definition and runs it. Returns the SQL with the execution.
pub async fn compose_and_run(
    executor: &QueryExecutor<'_>,
    target: &QueryTarget,
    definition: &QueryDefinition,
    params: &ParameterStore,
    composer: &StatementComposer,
) -> Result<(String, QueryExecution)> {
    let sql = compose_sql(definition, params, composer);
    let execution = executor.run(&sql, target).await?;
    Ok((sql, execution))
}
