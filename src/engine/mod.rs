//! Remote query engine abstraction.
//!
//! Provides a trait-based interface over the engine that runs submitted SQL,
//! so the polling logic can be driven by the Athena client or by a scripted
//! mock in tests.

mod athena;
mod mock;
mod types;

pub use athena::{AthenaClient, AthenaConfig};
pub use mock::MockQueryEngine;
pub use types::{
    ExecutionStatistics, ExecutionStatus, QueryExecution, QueryState, ResultSet, StartQuery,
};

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the operations athq needs from a query engine.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submits a query and returns the engine's execution id.
    async fn start_query(&self, request: &StartQuery) -> Result<String>;

    /// Reads the current status of an execution.
    async fn query_status(&self, execution_id: &str) -> Result<ExecutionStatus>;

    /// Fetches every result row of a succeeded execution.
    async fn query_results(&self, execution_id: &str) -> Result<ResultSet>;

    /// Lists the databases of the default catalog.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Lists the tables of a database.
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;
}
