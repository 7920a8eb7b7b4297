//! Integration tests for athq.
//!
//! Config files are written to temporary directories and queries run on
//! `MockQueryEngine`.

pub mod config_test;
pub mod pipeline_test;
