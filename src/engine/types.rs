//! Execution and result types shared by query engines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AthqError, Result};

/// Lifecycle state of a remote query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryState {
    /// Accepted but not yet running.
    Queued,
    /// Running on the engine.
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    /// Returns true for states from which no further transition happens.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns the state as the engine spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if moving from `self` to `next` goes forward.
    ///
    /// Terminal states never move; QUEUED may not be re-entered from RUNNING.
    pub fn can_advance_to(&self, next: QueryState) -> bool {
        match self {
            Self::Queued => true,
            Self::Running => next != Self::Queued,
            _ => false,
        }
    }
}

impl FromStr for QueryState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown query state: {}", s)),
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-side statistics for an execution, when reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    pub engine_execution_ms: Option<u64>,
    pub data_scanned_bytes: Option<u64>,
}

/// One status poll of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub state: QueryState,
    /// Engine explanation of the last state change (set on failures).
    pub state_change_reason: Option<String>,
    pub statistics: ExecutionStatistics,
}

impl ExecutionStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            state_change_reason: None,
            statistics: ExecutionStatistics::default(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.state_change_reason = Some(reason.into());
        self
    }

    pub fn with_statistics(mut self, statistics: ExecutionStatistics) -> Self {
        self.statistics = statistics;
        self
    }
}

/// Rows returned by a successful execution.
///
/// A cell the engine did not return is `None`, which is distinct from an
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub column_labels: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(column_labels: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            column_labels,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parameters of a query submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartQuery {
    pub sql: String,
    pub database: String,
    /// Where the engine writes result files (e.g. `s3://bucket/prefix/`).
    pub output_location: String,
    /// Idempotency token. Every attempt of one submission carries the same
    /// token, so the engine starts at most one execution for it.
    pub client_request_token: String,
}

impl StartQuery {
    /// Creates a submission with a fresh idempotency token.
    pub fn new(
        sql: impl Into<String>,
        database: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            sql: sql.into(),
            database: database.into(),
            output_location: output_location.into(),
            client_request_token: Uuid::new_v4().to_string(),
        }
    }
}

/// A submitted query as observed by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecution {
    pub id: String,
    pub state: QueryState,
    pub failure_reason: Option<String>,
    pub results: Option<ResultSet>,
    pub statistics: ExecutionStatistics,
}

impl QueryExecution {
    /// Creates the record for a freshly submitted query.
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: QueryState::Queued,
            failure_reason: None,
            results: None,
            statistics: ExecutionStatistics::default(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.state == QueryState::Succeeded
    }

    /// Converts FAILED and CANCELLED executions into typed errors.
    pub fn into_outcome(self) -> Result<QueryExecution> {
        match self.state {
            QueryState::Failed => Err(AthqError::QueryFailed {
                reason: reason_or_default(self.failure_reason),
                id: self.id,
            }),
            QueryState::Cancelled => Err(AthqError::QueryCancelled {
                reason: reason_or_default(self.failure_reason),
                id: self.id,
            }),
            _ => Ok(self),
        }
    }
}

fn reason_or_default(reason: Option<String>) -> String {
    reason.unwrap_or_else(|| "no reason given".to_string())
}
