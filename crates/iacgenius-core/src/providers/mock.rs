//! Mock provider client for testing
//!
//! Deterministic, scripted responses without network access. Each call pops
//! the next reply from the script; once the script is empty the repeat reply
//! (if any) is used.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ClientFactory, ProviderClient};
use crate::credentials::Credential;
use crate::prompt::PromptSpec;
use crate::registry::ProviderDescriptor;
use crate::types::{GenerationOptions, ProviderResponse};

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this raw text
    Text(String),
    /// Answer with this text but flag the response as unsuccessful
    Flagged(String),
    /// Fail with this error
    Error(ProviderError),
    /// Never respond (for timeout and cancellation tests)
    Hang,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// An HTTP-status failure, classified like a real adapter would
    pub fn status(provider: &str, status: u16) -> Self {
        Self::Error(ProviderError::from_status(provider, status, "mock failure"))
    }
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub model: String,
    pub had_credential: bool,
    pub prompt: PromptSpec,
}

/// Scripted provider client
pub struct MockProviderClient {
    provider: String,
    script: Mutex<VecDeque<MockReply>>,
    repeat: Option<MockReply>,
    models: Result<Vec<String>, ProviderError>,
    calls: AtomicUsize,
    history: Mutex<Vec<MockCall>>,
}

impl MockProviderClient {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            models: Ok(Vec::new()),
            calls: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Always succeed with `text`
    pub fn fixed(provider: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(provider).repeating(MockReply::text(text))
    }

    /// Always fail with `error`
    pub fn failing(provider: impl Into<String>, error: ProviderError) -> Self {
        Self::new(provider).repeating(MockReply::Error(error))
    }

    /// Reply with `replies` in order
    pub fn scripted(provider: impl Into<String>, replies: Vec<MockReply>) -> Self {
        let mock = Self::new(provider);
        mock.script.lock().extend(replies);
        mock
    }

    /// Reply used after the script runs out
    pub fn repeating(mut self, reply: MockReply) -> Self {
        self.repeat = Some(reply);
        self
    }

    /// What `list_models` (and so `validate`) reports
    pub fn with_models(mut self, models: Result<Vec<String>, ProviderError>) -> Self {
        self.models = models;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn send(
        &self,
        prompt: &PromptSpec,
        credential: Option<&Credential>,
        model: &str,
        _options: &GenerationOptions,
    ) -> ProviderResult<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().push(MockCall {
            model: model.to_string(),
            had_credential: credential.is_some(),
            prompt: prompt.clone(),
        });

        let reply = self.script.lock().pop_front().or_else(|| self.repeat.clone());
        match reply {
            Some(MockReply::Text(text)) => Ok(ProviderResponse::new(
                text,
                &self.provider,
                model,
                Duration::from_millis(1),
            )),
            Some(MockReply::Flagged(text)) => Ok(ProviderResponse::new(
                text,
                &self.provider,
                model,
                Duration::from_millis(1),
            )
            .flagged()),
            Some(MockReply::Error(err)) => Err(err),
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                Err(ProviderError::timeout(&self.provider, "unreachable"))
            }
            None => Err(ProviderError::invalid_response(&self.provider, "mock script exhausted")),
        }
    }

    async fn list_models(&self, _credential: Option<&Credential>) -> ProviderResult<Vec<String>> {
        self.models.clone()
    }
}

/// Hands out registered mock clients by provider name
///
/// Providers without a registered mock get one that fails every call with
/// a non-transient error.
#[derive(Default)]
pub struct MockClientFactory {
    clients: HashMap<String, Arc<MockProviderClient>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Arc<MockProviderClient>) -> Self {
        self.clients.insert(client.provider().to_string(), client);
        self
    }
}

impl ClientFactory for MockClientFactory {
    fn create(&self, descriptor: &ProviderDescriptor) -> Arc<dyn ProviderClient> {
        match self.clients.get(&descriptor.name) {
            Some(client) => client.clone(),
            None => {
                let error = ProviderError::not_configured(&descriptor.name, "no mock registered");
                Arc::new(MockProviderClient::failing(descriptor.name.clone(), error.clone()).with_models(Err(error)))
            }
        }
    }
}
