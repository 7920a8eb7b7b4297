//! Mock query engine for testing.
//!
//! Replays a scripted sequence of status polls and records every call, so
//! tests can assert how the executor drove the engine.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ExecutionStatus, QueryEngine, QueryState, ResultSet, StartQuery};
use crate::error::{AthqError, Result};

/// A query engine that returns predefined statuses and results.
///
/// Statuses are consumed one per poll; once the script runs out the last
/// status is repeated.
#[derive(Debug, Default)]
pub struct MockQueryEngine {
    statuses: Mutex<VecDeque<ExecutionStatus>>,
    last_status: Mutex<Option<ExecutionStatus>>,
    results: ResultSet,
    catalog: BTreeMap<String, Vec<String>>,
    submitted: Mutex<Vec<StartQuery>>,
    status_calls: Mutex<usize>,
    result_calls: Mutex<usize>,
}

impl MockQueryEngine {
    /// Creates a mock whose first poll reports SUCCEEDED with empty results.
    pub fn new() -> Self {
        Self::with_states([QueryState::Succeeded])
    }

    /// Creates a mock that reports the given states in order.
    pub fn with_states(states: impl IntoIterator<Item = QueryState>) -> Self {
        Self::with_statuses(states.into_iter().map(ExecutionStatus::new))
    }

    /// Creates a mock that reports the given statuses in order.
    pub fn with_statuses(statuses: impl IntoIterator<Item = ExecutionStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Sets the results returned after success.
    pub fn with_results(mut self, results: ResultSet) -> Self {
        self.results = results;
        self
    }

    /// Adds a database and its tables to the mock catalog.
    pub fn with_database(mut self, database: impl Into<String>, tables: &[&str]) -> Self {
        self.catalog.insert(
            database.into(),
            tables.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Returns every submission received so far.
    pub fn submitted(&self) -> Vec<StartQuery> {
        lock(&self.submitted).clone()
    }

    /// Returns how many times the status was polled.
    pub fn status_calls(&self) -> usize {
        *lock(&self.status_calls)
    }

    /// Returns how many times results were fetched.
    pub fn result_calls(&self) -> usize {
        *lock(&self.result_calls)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn start_query(&self, request: &StartQuery) -> Result<String> {
        let mut submitted = lock(&self.submitted);
        submitted.push(request.clone());
        Ok(format!("mock-execution-{}", submitted.len()))
    }

    async fn query_status(&self, _execution_id: &str) -> Result<ExecutionStatus> {
        *lock(&self.status_calls) += 1;

        let mut last = lock(&self.last_status);
        if let Some(next) = lock(&self.statuses).pop_front() {
            *last = Some(next);
        }
        last.clone()
            .ok_or_else(|| AthqError::engine("mock engine has no scripted status"))
    }

    async fn query_results(&self, _execution_id: &str) -> Result<ResultSet> {
        *lock(&self.result_calls) += 1;
        Ok(self.results.clone())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.catalog.keys().cloned().collect())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        self.catalog
            .get(database)
            .cloned()
            .ok_or_else(|| AthqError::engine(format!("Database {database} not found")))
    }
}
