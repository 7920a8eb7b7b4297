//! Session and credential handling.
//!
//! A [`SessionProvider`] yields the resolved AWS configuration used by the
//! engine client together with the caller's identity, which is also exposed
//! to query templates as the `aws_account_id`, `profile` and `region`
//! parameters.

mod profile;

pub use profile::ProfileSessionProvider;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::error::{AthqError, AuthFailure, Result};

/// Profile name used when none is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub account_id: String,
    pub profile: String,
    pub region: String,
}

impl SessionIdentity {
    /// Returns the identity as template parameters.
    pub fn as_params(&self) -> [(&'static str, String); 3] {
        [
            ("aws_account_id", self.account_id.clone()),
            ("profile", self.profile.clone()),
            ("region", self.region.clone()),
        ]
    }
}

/// An authorized session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Region, credentials provider and retry settings for service clients.
    pub sdk_config: SdkConfig,
    pub identity: SessionIdentity,
}

/// Source of authorized sessions.
///
/// Failures are reported as [`crate::error::AuthFailure`] wrapped in
/// `AthqError::SessionAuth` so callers can tell an expired SSO login from
/// missing or rejected credentials.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> Result<Session>;
}

/// Maps an AWS error code to the session failure it signals, if any.
pub fn auth_failure_for_code(code: &str) -> Option<AuthFailure> {
    match code {
        "ExpiredToken" | "ExpiredTokenException" | "TokenRefreshRequired" => {
            Some(AuthFailure::SsoTokenExpired)
        }
        "InvalidClientTokenId"
        | "UnrecognizedClientException"
        | "UnauthorizedException"
        | "InvalidSignatureException"
        | "SignatureDoesNotMatch"
        | "IncompleteSignature"
        | "MissingAuthenticationToken" => Some(AuthFailure::Unauthorized),
        _ => None,
    }
}

/// Classifies a failed AWS call as a session failure.
///
/// Service errors are judged by their code. Errors without a code come from
/// credential resolution before any request was sent, where an SSO problem
/// means the login must be refreshed and anything else means no usable
/// credentials were found.
pub fn classify_auth_failure(code: Option<&str>, detail: &str) -> Option<AuthFailure> {
    if let Some(code) = code {
        return auth_failure_for_code(code);
    }

    let detail = detail.to_lowercase();
    if detail.contains("sso") {
        Some(AuthFailure::SsoTokenExpired)
    } else if detail.contains("credential") {
        Some(AuthFailure::MissingCredentials)
    } else {
        None
    }
}

/// Converts an AWS SDK error into an [`AthqError`].
///
/// Credential and token problems become `AthqError::SessionAuth`; anything
/// else is an engine error naming the operation.
pub fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> AthqError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    let code = ProvideErrorMetadata::code(&err);

    if let Some(failure) = classify_auth_failure(code, &detail) {
        return failure.into();
    }

    match (code, ProvideErrorMetadata::message(&err)) {
        (Some(code), Some(message)) => {
            AthqError::engine(format!("{} failed: {}: {}", operation, code, message))
        }
        _ => AthqError::engine(format!("{} failed: {}", operation, detail)),
    }
}
