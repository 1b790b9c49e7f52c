//! Provider selection and implementations.
//!
//! A provider turns one message into one reply. The agent loop owns a single
//! provider chosen from configuration at startup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::config::{BackendConfig, ProviderKind};
use crate::gateway::SessionKey;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn complete(&self, content: &str, session_key: &SessionKey)
        -> Result<String, BackendError>;
}

/// Build the provider named by the configuration.
pub fn create_provider(config: &BackendConfig) -> Result<Arc<dyn Provider>, BackendError> {
    match config.provider {
        ProviderKind::Echo => Ok(Arc::new(EchoProvider)),
        ProviderKind::Upstream => {
            let url = config.upstream_url.as_deref().ok_or_else(|| {
                BackendError::Provider("upstream provider requires backend.upstream_url".into())
            })?;
            let provider = UpstreamProvider::new(
                url,
                Duration::from_secs(config.upstream_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
    }
}

/// Replies with the message it received.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProvider;

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn complete(&self, content: &str, _session_key: &SessionKey) -> Result<String, BackendError> {
        Ok(content.to_string())
    }
}

#[derive(Serialize)]
struct UpstreamRequest<'a> {
    message: &'a str,
    session_key: &'a str,
}

#[derive(Deserialize)]
struct UpstreamReply {
    response: String,
}

/// Forwards each message as JSON to an HTTP agent at `<base>/process`.
#[derive(Debug, Clone)]
pub struct UpstreamProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl UpstreamProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/process", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for UpstreamProvider {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn complete(&self, content: &str, session_key: &SessionKey) -> Result<String, BackendError> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(&UpstreamRequest {
                message: content,
                session_key: session_key.as_str(),
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(BackendError::Provider(format!(
                "upstream returned status {}",
                status
            )));
        }

        let reply: UpstreamReply = res.json().await?;
        Ok(reply.response)
    }
}
