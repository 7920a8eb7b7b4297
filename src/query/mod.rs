//! Query composition and execution.
//!
//! Turns a query definition plus parameters and clause groups into final SQL
//! and drives it to completion on a [`crate::engine::QueryEngine`].

pub mod executor;

pub use executor::{
    compose_and_run, compose_sql, PollConfig, QueryExecutor, QueryTarget,
};
