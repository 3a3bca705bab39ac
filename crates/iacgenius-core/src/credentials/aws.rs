//! Ambient AWS credentials for the Bedrock adapter
//!
//! Mirrors the first two links of the AWS SDK chain: environment variables,
//! then the shared credentials file.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::env::Environment;

/// AWS access key material
///
/// The secret key and session token are [`SecretString`]s, so `Debug`
/// redacts them and they are zeroized on drop.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: session_token.map(SecretString::from),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|t| t.expose_secret())
    }

    /// Resolve from the environment, then `~/.aws/credentials`
    pub fn from_chain(env: &dyn Environment) -> Option<Self> {
        if let Some(creds) = Self::from_env(env) {
            debug!("using AWS credentials from environment");
            return Some(creds);
        }

        let path = env
            .var("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".aws").join("credentials")))?;
        let profile = env.var("AWS_PROFILE").unwrap_or_else(|| "default".to_string());
        let content = std::fs::read_to_string(&path).ok()?;
        let creds = Self::from_profile(&content, &profile);
        if creds.is_some() {
            debug!(profile = %profile, path = %path.display(), "using AWS credentials from shared file");
        }
        creds
    }

    fn from_env(env: &dyn Environment) -> Option<Self> {
        Some(Self::new(
            env.var("AWS_ACCESS_KEY_ID")?,
            env.var("AWS_SECRET_ACCESS_KEY")?,
            env.var("AWS_SESSION_TOKEN"),
        ))
    }

    /// Read one profile out of a shared credentials file
    pub fn from_profile(content: &str, profile: &str) -> Option<Self> {
        let mut in_profile = false;
        let mut access_key_id = None;
        let mut secret_access_key = None;
        let mut session_token = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_profile = section.trim() == profile;
                continue;
            }
            if !in_profile {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().to_string();
                match key.trim() {
                    "aws_access_key_id" => access_key_id = Some(value),
                    "aws_secret_access_key" => secret_access_key = Some(value),
                    "aws_session_token" => session_token = Some(value),
                    _ => {}
                }
            }
        }

        Some(Self::new(
            access_key_id.filter(|v| !v.is_empty())?,
            secret_access_key.filter(|v| !v.is_empty())?,
            session_token.filter(|v| !v.is_empty()),
        ))
    }
}

/// Region from `AWS_REGION`, then `AWS_DEFAULT_REGION`
pub fn aws_region(env: &dyn Environment) -> Option<String> {
    env.var("AWS_REGION").or_else(|| env.var("AWS_DEFAULT_REGION"))
}
