//! Athena client implementation.
//!
//! Implements the QueryEngine trait over `aws-sdk-athena`, configured from
//! the session's resolved AWS settings.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_athena::config::retry::RetryConfig;
use aws_sdk_athena::config::timeout::TimeoutConfig;
use aws_sdk_athena::types::{self as athena, QueryExecutionContext, ResultConfiguration};
use aws_sdk_athena::Client;
use tracing::debug;

use super::{ExecutionStatistics, ExecutionStatus, QueryEngine, QueryState, ResultSet, StartQuery};
use crate::error::{AthqError, Result};
use crate::session::{sdk_error, Session};

/// Default timeout for one API request attempt.
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient errors.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Page size for GetQueryResults.
const RESULT_PAGE_SIZE: i32 = 1000;

/// Catalog used for database and table listings.
const DEFAULT_CATALOG: &str = "AwsDataCatalog";

/// Athena client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AthenaConfig {
    /// Attempts per API call, including the first.
    pub max_attempts: u32,
    /// Timeout for a single attempt in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
        }
    }
}

impl AthenaConfig {
    /// Sets the number of attempts per call.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, secs: u64) -> Self {
        self.attempt_timeout_secs = secs;
        self
    }
}

/// Athena query engine client.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    client: Client,
}

impl AthenaClient {
    /// Creates a new Athena client for the session's region and credentials.
    pub fn new(session: &Session, config: AthenaConfig) -> Self {
        let athena_config = aws_sdk_athena::config::Builder::from(&session.sdk_config)
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(Duration::from_secs(config.attempt_timeout_secs))
                    .build(),
            )
            .build();
        Self::from_client(Client::from_conf(athena_config))
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryEngine for AthenaClient {
    async fn start_query(&self, request: &StartQuery) -> Result<String> {
        let output = self
            .client
            .start_query_execution()
            .query_string(&request.sql)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&request.database)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.output_location)
                    .build(),
            )
            .client_request_token(&request.client_request_token)
            .send()
            .await
            .map_err(|e| sdk_error("StartQueryExecution", e))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| AthqError::engine("StartQueryExecution returned no execution id"))
    }

    async fn query_status(&self, execution_id: &str) -> Result<ExecutionStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| sdk_error("GetQueryExecution", e))?;

        let execution = output.query_execution().ok_or_else(|| {
            AthqError::engine(format!("No execution returned for {}", execution_id))
        })?;
        let status = execution.status();

        let mut result = ExecutionStatus::new(parse_state(
            status.and_then(|s| s.state()).map(|s| s.as_str()),
        )?);
        result.state_change_reason = status
            .and_then(|s| s.state_change_reason())
            .map(str::to_string);
        if let Some(stats) = execution.statistics() {
            result.statistics = ExecutionStatistics {
                engine_execution_ms: non_negative(stats.engine_execution_time_in_millis()),
                data_scanned_bytes: non_negative(stats.data_scanned_in_bytes()),
            };
        }
        Ok(result)
    }

    async fn query_results(&self, execution_id: &str) -> Result<ResultSet> {
        let mut results = ResultSet::default();
        let mut next_token: Option<String> = None;
        let mut first_page = true;

        loop {
            let page = self
                .client
                .get_query_results()
                .query_execution_id(execution_id)
                .max_results(RESULT_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("GetQueryResults", e))?;

            if let Some(set) = page.result_set() {
                append_page(&mut results, page_labels(set), page_rows(set), first_page);
            }
            first_page = false;

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!("fetched {} rows for {}", results.row_count(), execution_id);
        Ok(results)
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_databases()
                .catalog_name(DEFAULT_CATALOG)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListDatabases", e))?;
            names.extend(page.database_list().iter().map(|d| d.name().to_string()));

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_table_metadata()
                .catalog_name(DEFAULT_CATALOG)
                .database_name(database)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListTableMetadata", e))?;
            names.extend(
                page.table_metadata_list()
                    .iter()
                    .map(|t| t.name().to_string()),
            );

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(names)
    }
}

fn parse_state(state: Option<&str>) -> Result<QueryState> {
    state
        .ok_or_else(|| AthqError::engine("Execution status has no state"))?
        .parse()
        .map_err(AthqError::engine)
}

fn non_negative(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

fn page_labels(set: &athena::ResultSet) -> Vec<String> {
    set.result_set_metadata()
        .map(|metadata| {
            metadata
                .column_info()
                .iter()
                .map(|c| c.label().unwrap_or(c.name()).to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn page_rows(set: &athena::ResultSet) -> Vec<Vec<Option<String>>> {
    set.rows()
        .iter()
        .map(|row| {
            row.data()
                .iter()
                .map(|d| d.var_char_value().map(str::to_string))
                .collect()
        })
        .collect()
}

/// Appends one result page to `results`.
///
/// Athena repeats the column labels as the first row of the first page for
/// SELECT queries; that row is dropped when it matches the labels.
fn append_page(
    results: &mut ResultSet,
    labels: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    first_page: bool,
) {
    if results.column_labels.is_empty() {
        results.column_labels = labels;
    }

    let mut rows = rows.into_iter().peekable();
    if first_page {
        let is_header = rows.peek().is_some_and(|row| {
            row.len() == results.column_labels.len()
                && row
                    .iter()
                    .zip(&results.column_labels)
                    .all(|(cell, label)| cell.as_deref() == Some(label.as_str()))
        });
        if is_header {
            rows.next();
        }
    }
    results.rows.extend(rows);
}
