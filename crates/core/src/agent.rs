//! Agent collaborator interface.
//!
//! The gateway never runs inference itself; it hands the user's input plus
//! recent conversation context to an external agent service and relays the
//! reply. The trait keeps that seam narrow so tests can substitute a
//! deterministic fake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who produced a recorded conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One recorded turn, passed to the agent as conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ContextTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The agent's answer to one user input.
///
/// `reply` is always present; `intent` and `workflow` are advisory and a
/// reply without them is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

/// A backend service that turns user input plus context into a reply.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn process(&self, input: &str, context: &[ContextTurn]) -> Result<AgentReply>;
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    input: &'a str,
    context: &'a [ContextTurn],
}

/// `AgentClient` speaking JSON over HTTP to the agent service.
pub struct HttpAgentClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAgentClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn process(&self, input: &str, context: &[ContextTurn]) -> Result<AgentReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProcessRequest { input, context })
            .send()
            .await
            .context("agent request failed")?
            .error_for_status()
            .context("agent returned an error status")?;

        let reply = response
            .json::<AgentReply>()
            .await
            .context("agent reply was not valid JSON")?;
        Ok(reply)
    }
}
