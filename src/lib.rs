//! athq - compose SQL from named templates and run it on Athena.
//!
//! This library exposes the core modules for use in integration tests.

pub mod app;
pub mod builder;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod params;
pub mod query;
pub mod render;
pub mod session;
pub mod template;
