//! Integration tests for athq.
//!
//! The full pipeline runs against the scripted mock engine, so no AWS
//! account or network access is needed.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
