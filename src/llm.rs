//! Completion API client.
//!
//! A thin client for OpenAI-compatible `POST {base}/chat/completions`
//! endpoints. The backend is chosen by the config's model → endpoint map
//! and the API key is read from the environment exactly once, at
//! construction — never ad hoc inside the orchestration loop.
//!
//! Failures are never retried here: the orchestrator converts them into a
//! user-visible error string at its boundary.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::models::{AssistantTurn, ToolCallRequest};

/// The completion seam between the orchestrator and the language model.
#[async_trait]
pub trait Completions: Send + Sync {
    /// Issue one completion request.
    ///
    /// `tools` is the function catalog to attach (if any); `tool_choice` is
    /// the backend's invocation policy (`"auto"`, `"none"`), attached only
    /// when a catalog is present.
    async fn complete(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
        tool_choice: Option<&str>,
    ) -> Result<AssistantTurn>;
}

/// HTTP completion client for OpenAI-compatible backends.
pub struct CompletionClient {
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl CompletionClient {
    /// Build a client from the LLM configuration.
    ///
    /// Fails fast on an unknown model, a missing API key variable, or an
    /// invalid timeout — before any conversation starts.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base_url = config.endpoint()?.trim_end_matches('/').to_string();

        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            base_url,
            api_key,
            client,
        })
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Completions for CompletionClient {
    async fn complete(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
        tool_choice: Option<&str>,
    ) -> Result<AssistantTurn> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(tools) = tools {
            body["tools"] = Value::Array(tools.to_vec());
            if let Some(choice) = tool_choice {
                body["tool_choice"] = Value::String(choice.to_string());
            }
        }

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Completion API error {}: {}", status, text);
        }

        let json: Value = response.json().await?;
        parse_completion_response(&json)
    }
}

/// Parse a chat-completions response into an [`AssistantTurn`].
///
/// Tool calls are preserved in the order the API returned them; execution
/// order must match for reproducibility.
pub fn parse_completion_response(json: &Value) -> Result<AssistantTurn> {
    let message = json["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| anyhow::anyhow!("No choices in completion response"))?;

    let content = message["content"].as_str().map(String::from);

    let tool_calls = match message["tool_calls"].as_array() {
        Some(calls) => calls
            .iter()
            .filter_map(|call| {
                Some(ToolCallRequest {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: call["function"]["name"].as_str()?.to_string(),
                    arguments: call["function"]["arguments"].as_str()?.to_string(),
                })
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(AssistantTurn {
        content,
        tool_calls,
    })
}
