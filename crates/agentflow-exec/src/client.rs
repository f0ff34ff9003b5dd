use std::time::Duration;

use agentflow_core::config::ServiceConfig;
use agentflow_core::AgentRecord;
use agentflow_core::ChatReply;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::contracts::ApprovalRequest;
use crate::contracts::ChatRequest;
use crate::contracts::ExecuteRequest;
use crate::error::ClientError;

pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// The orchestration service, as seen from the client.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ClientError>;

    /// Starts a run and hands back the raw event-stream body.
    async fn execute(&self, request: ExecuteRequest) -> Result<ByteStream, ClientError>;

    async fn approve(&self, step_id: &str, request: ApprovalRequest) -> Result<(), ClientError>;

    async fn list_agents(&self) -> Result<Vec<AgentRecord>, ClientError>;

    async fn update_agent(&self, agent: &AgentRecord) -> Result<AgentRecord, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpOrchestrator {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpOrchestrator {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        // No client-wide timeout: it would also cut off long execution streams.
        let client = Client::builder().build().map_err(ClientError::Build)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        ensure_success(url, response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(url, request.timeout(self.request_timeout)).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| ClientError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ClientError> {
        let url = self.url("/api/chat");
        tracing::debug!(target: "agentflow.client", %url, modality = request.input_modality.label(), "requesting plan");
        self.send_json(&url, self.client.post(&url).json(&request))
            .await
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<ByteStream, ClientError> {
        let url = self.url("/api/execute");
        tracing::debug!(target: "agentflow.client", %url, steps = request.plan.steps.len(), "opening execution stream");
        let response = self
            .send(
                &url,
                self.client
                    .post(&url)
                    .header(reqwest::header::ACCEPT, "text/event-stream")
                    .json(&request),
            )
            .await?;
        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })
        });
        Ok(stream.boxed())
    }

    async fn approve(&self, step_id: &str, request: ApprovalRequest) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/approve/{step_id}"));
        tracing::debug!(target: "agentflow.client", %url, approved = request.approved, "submitting checkpoint decision");
        self.send(
            &url,
            self.client
                .post(&url)
                .timeout(self.request_timeout)
                .json(&request),
        )
        .await?;
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>, ClientError> {
        let url = self.url("/api/agents");
        self.send_json(&url, self.client.get(&url)).await
    }

    async fn update_agent(&self, agent: &AgentRecord) -> Result<AgentRecord, ClientError> {
        let url = self.url(&format!("/api/agents/{}", agent.id));
        tracing::debug!(target: "agentflow.client", %url, enabled = agent.enabled, "updating agent");
        self.send_json(&url, self.client.put(&url).json(agent))
            .await
    }
}

async fn ensure_success(url: &str, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ClientError::Status {
        url: url.to_string(),
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            HttpOrchestrator::new("http://localhost:8000/", Duration::from_secs(5)).expect("client");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/chat"), "http://localhost:8000/api/chat");
    }

    #[test]
    fn config_timeout_has_a_floor() {
        let client = HttpOrchestrator::from_config(&ServiceConfig {
            base_url: "http://agents.local".to_string(),
            request_timeout_secs: 0,
        })
        .expect("client");
        assert_eq!(client.request_timeout, Duration::from_secs(1));
    }
}
