//! Session provider backed by the AWS shared configuration.
//!
//! Credentials and region are resolved the way the AWS CLI resolves them:
//! environment variables, `~/.aws/config` and `~/.aws/credentials` profiles
//! (including SSO profiles), then instance metadata. The session is confirmed
//! with STS `GetCallerIdentity`, which also yields the account id.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::{debug, info};

use super::{sdk_error, Session, SessionIdentity, SessionProvider, DEFAULT_PROFILE};
use crate::error::{AthqError, Result};

/// Builds sessions from the shared AWS configuration.
#[derive(Debug, Clone, Default)]
pub struct ProfileSessionProvider {
    profile: Option<String>,
    region: Option<String>,
}

impl ProfileSessionProvider {
    /// Creates a provider. Explicit profile/region take precedence over the
    /// environment and profile files.
    pub fn new(profile: Option<String>, region: Option<String>) -> Self {
        Self { profile, region }
    }

    /// Returns the profile name the session is reported under.
    pub fn profile_name(&self) -> &str {
        self.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Loads region and credentials provider without contacting AWS.
    async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        loader.load().await
    }
}

/// Returns the resolved region or a hint on how to set one.
fn require_region(profile: &str, region: Option<&Region>) -> Result<String> {
    region.map(|r| r.to_string()).ok_or_else(|| {
        AthqError::config(format!(
            "No AWS region configured for profile '{}'; pass --region or set AWS_REGION",
            profile
        ))
    })
}

/// Assembles the identity once the caller's account is known.
fn build_identity(account: Option<&str>, profile: &str, region: String) -> Result<SessionIdentity> {
    let account_id = account
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AthqError::engine("GetCallerIdentity returned no account id"))?;

    Ok(SessionIdentity {
        account_id: account_id.to_string(),
        profile: profile.to_string(),
        region,
    })
}

#[async_trait]
impl SessionProvider for ProfileSessionProvider {
    async fn session(&self) -> Result<Session> {
        let sdk_config = self.load_sdk_config().await;
        debug!(
            "Resolved profile {} in region {:?}",
            self.profile_name(),
            sdk_config.region()
        );

        let region = require_region(self.profile_name(), sdk_config.region())?;

        let identity = aws_sdk_sts::Client::new(&sdk_config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| sdk_error("GetCallerIdentity", e))?;

        let identity = build_identity(identity.account(), self.profile_name(), region)?;

        info!("Creating session, values:");
        info!("\t{:<15}{}", "aws_account_id", identity.account_id);
        info!("\t{:<15}{}", "profile", identity.profile);
        info!("\t{:<15}{}", "region", identity.region);

        Ok(Session {
            sdk_config,
            identity,
        })
    }
}
