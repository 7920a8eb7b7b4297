//! Command-line argument parsing for athq.
//!
//! Uses clap derive; config path, profile and region fall back to the
//! environment.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DEFAULT_QUERY_NAME;

/// Default query timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30 * 60;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table with colored rows.
    #[default]
    Table,
    /// RFC 4180 CSV.
    Csv,
}

/// Run named SQL templates against Athena.
#[derive(Parser, Debug)]
#[command(name = "athq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Name of the query to run
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Template parameters (repeatable)
    #[arg(short = 'p', long = "param", value_name = "K=V[,K=V]")]
    pub params: Vec<String>,

    /// Condition joined with AND: key=value, key~value or key^value (repeatable)
    #[arg(long = "and", value_name = "COND", action = ArgAction::Append)]
    pub and: Vec<String>,

    /// Condition joined with OR: key=value, key~value or key^value (repeatable)
    #[arg(long = "or", value_name = "COND", action = ArgAction::Append)]
    pub or: Vec<String>,

    /// Replace clause groups defined by the query instead of appending to them
    #[arg(long = "override")]
    pub override_clauses: bool,

    /// Database to run against (defaults to the config value)
    #[arg(long, value_name = "DB")]
    pub database: Option<String>,

    /// S3 location for result files (defaults to the config value)
    #[arg(long, value_name = "S3_URI")]
    pub output_location: Option<String>,

    /// Maximum seconds to wait for the query
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Write results as CSV
    #[arg(long)]
    pub csv: bool,

    /// Print the composed SQL without running it
    #[arg(long)]
    pub dry_run: bool,

    /// List configured query names
    #[arg(long)]
    pub list_queries: bool,

    /// List databases and their tables
    #[arg(long)]
    pub list_databases: bool,

    /// Config file path
    #[arg(long, value_name = "PATH", env = "ATHQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// AWS profile name
    #[arg(long, value_name = "NAME", env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// AWS region
    #[arg(long, value_name = "REGION", env = "AWS_REGION")]
    pub region: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the query to run.
    pub fn query_name(&self) -> &str {
        self.query.as_deref().unwrap_or(DEFAULT_QUERY_NAME)
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        crate::config::resolve_path(self.config.as_deref())
    }

    /// Returns the requested output format.
    pub fn output_format(&self) -> OutputFormat {
        if self.csv {
            OutputFormat::Csv
        } else {
            OutputFormat::Table
        }
    }

    /// Returns the query timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the clause groups given on the command line, in order.
    pub fn clause_groups(&self) -> [(&'static str, &[String]); 2] {
        [("and", self.and.as_slice()), ("or", self.or.as_slice())]
    }
}
