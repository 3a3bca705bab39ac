//! Provider error types

use thiserror::Error;

/// Errors a single provider call can produce
///
/// Adapters map every transport failure onto one of these; the orchestrator
/// decides what to do next from [`is_transient`](ProviderError::is_transient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No response within the per-attempt deadline
    #[error("{provider} request timed out: {message}")]
    Timeout { provider: String, message: String },

    /// Could not reach the provider
    #[error("could not connect to {provider}: {message}")]
    Connection { provider: String, message: String },

    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider} server error ({status}): {message}")]
    Server {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} rejected the credentials ({status}): {message}")]
    AuthRejected {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} rejected the request ({status}): {message}")]
    BadRequest {
        provider: String,
        status: u16,
        message: String,
    },

    /// The response could not be parsed or had no text
    #[error("invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// The adapter cannot build a request (missing credential, region, ...)
    #[error("{provider} is not configured: {message}")]
    NotConfigured { provider: String, message: String },

    /// Any other HTTP client failure
    #[error("{provider} HTTP error: {message}")]
    Transport { provider: String, message: String },
}

impl ProviderError {
    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status
    pub fn from_status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        match status {
            408 => Self::Timeout { provider, message },
            429 => Self::RateLimited { provider, message },
            401 | 403 => Self::AuthRejected { provider, status, message },
            500..=599 => Self::Server { provider, status, message },
            _ => Self::BadRequest { provider, status, message },
        }
    }

    /// Map a `reqwest` failure from sending the request or reading its body
    pub fn from_reqwest(provider: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::from_phase(provider, TransportPhase::of(err), err.to_string())
    }

    fn from_phase(provider: impl Into<String>, phase: TransportPhase, message: String) -> Self {
        let provider = provider.into();
        match phase {
            TransportPhase::Timeout => Self::Timeout { provider, message },
            // A body cut off mid-stream is a dropped connection
            TransportPhase::Connect | TransportPhase::Body => Self::Connection { provider, message },
            TransportPhase::Decode => Self::InvalidResponse { provider, message },
            TransportPhase::Other => Self::Transport { provider, message },
        }
    }

    /// Whether retrying the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connection { .. } | Self::RateLimited { .. } | Self::Server { .. }
        )
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Timeout { provider, .. }
            | Self::Connection { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Server { provider, .. }
            | Self::AuthRejected { provider, .. }
            | Self::BadRequest { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::NotConfigured { provider, .. }
            | Self::Transport { provider, .. } => provider,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Where in the exchange a `reqwest` failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportPhase {
    Timeout,
    Connect,
    Body,
    Decode,
    Other,
}

impl TransportPhase {
    fn of(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() {
            Self::Connect
        } else if err.is_body() || interrupted_body(err) {
            Self::Body
        } else if err.is_decode() {
            Self::Decode
        } else {
            Self::Other
        }
    }
}

/// reqwest reports some interrupted reads as decode errors wrapping a body error
fn interrupted_body(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.downcast_ref::<reqwest::Error>().is_some_and(|e| e.is_body()) {
            return true;
        }
        source = inner.source();
    }
    false
}
