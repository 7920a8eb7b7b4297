//! Error types for athq.
//!
//! Defines the main error enum used throughout the crate.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for athq operations.
#[derive(Error, Debug)]
pub enum AthqError {
    /// A parameter or override token without a recognized delimiter.
    #[error("Malformed parameter: {0}")]
    MalformedParameter(String),

    /// The requested query name is not defined in the config file.
    #[error("Query '{0}' not found in config file")]
    UnknownQuery(String),

    /// The config file does not exist.
    #[error("Could not locate config file [{}]", .0.display())]
    ConfigFileNotFound(PathBuf),

    /// Configuration errors (invalid JSON, missing required values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential or session problems reported before or during a request.
    #[error("{0}")]
    SessionAuth(AuthFailure),

    /// The engine reported the query as FAILED.
    #[error("Query {id} failed: {reason}")]
    QueryFailed { id: String, reason: String },

    /// The engine reported the query as CANCELLED.
    #[error("Query {id} was cancelled: {reason}")]
    QueryCancelled { id: String, reason: String },

    /// The query did not reach a terminal state within the wait bound.
    #[error("Query {id} did not finish within {}s", .waited.as_secs())]
    QueryTimeout { id: String, waited: Duration },

    /// Remote engine API errors (transport, throttling, invalid requests).
    #[error("Engine error: {0}")]
    Engine(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Ways in which acquiring or using a session can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The SSO token is absent or has expired.
    SsoTokenExpired,
    /// No credentials could be found for the active profile.
    MissingCredentials,
    /// The engine rejected the client's credentials.
    Unauthorized,
}

impl AuthFailure {
    /// Returns the message shown to the user for this failure.
    pub fn message(&self) -> &'static str {
        match self {
            Self::SsoTokenExpired => "Please run `aws sso login`.",
            Self::MissingCredentials => {
                "Could not locate aws credentials, ensure your profile is set."
            }
            Self::Unauthorized => "Session token not found or invalid.",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl AthqError {
    /// Creates a malformed parameter error for the given token.
    pub fn malformed(token: impl Into<String>) -> Self {
        Self::MalformedParameter(token.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an engine error with the given message.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedParameter(_) => "Parameter Error",
            Self::UnknownQuery(_) | Self::ConfigFileNotFound(_) | Self::Config(_) => {
                "Configuration Error"
            }
            Self::SessionAuth(_) => "Session Error",
            Self::QueryFailed { .. } => "Query Failed",
            Self::QueryCancelled { .. } => "Query Cancelled",
            Self::QueryTimeout { .. } => "Query Timeout",
            Self::Engine(_) => "Engine Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<AuthFailure> for AthqError {
    fn from(failure: AuthFailure) -> Self {
        Self::SessionAuth(failure)
    }
}

/// Result type alias using AthqError.
pub type Result<T> = std::result::Result<T, AthqError>;
