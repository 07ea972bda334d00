//! Tool transport client.
//!
//! The orchestrator treats the tool server as an opaque channel: list the
//! tools once, then invoke them by name. [`HttpToolClient`] implements that
//! channel over the HTTP API in [`crate::server`]; tests substitute their
//! own [`ToolTransport`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::models::ToolDescriptor;

/// The transport seam between the orchestrator and the tool server.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// List the tools the server advertises.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool by name, returning its textual result payload.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String>;
}

/// HTTP implementation of [`ToolTransport`].
pub struct HttpToolClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpToolClient {
    /// Connect to a tool server: verify it is healthy and list its tools.
    ///
    /// A connection or listing failure here is fatal to the session — there
    /// is nothing useful the orchestrator can do without a tool catalog.
    pub async fn connect(base_url: &str) -> Result<Self> {
        let client = HttpToolClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        };

        let health_url = format!("{}/health", client.base_url);
        client
            .client
            .get(&health_url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to tool server at {}", base_url))?
            .error_for_status()
            .with_context(|| "Tool server health check failed")?;

        let tools = client.list_tools().await?;
        println!("Connected to server with tools:");
        for tool in &tools {
            println!("  - {}: {}", tool.name, tool.description);
        }

        Ok(client)
    }
}

#[async_trait]
impl ToolTransport for HttpToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let url = format!("{}/tools/list", self.base_url);
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| "Failed to list tools")?
            .error_for_status()?
            .json()
            .await?;

        let tools = body["tools"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Malformed tool list response"))?
            .iter()
            .map(|t| ToolDescriptor {
                name: t["name"].as_str().unwrap_or_default().to_string(),
                description: t["description"].as_str().unwrap_or_default().to_string(),
                parameters: repair_parameters_schema(t["parameters"].clone()),
            })
            .collect();

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let url = format!("{}/tools/{}", self.base_url, name);
        let body: Value = self
            .client
            .post(&url)
            .json(&arguments)
            .send()
            .await
            .with_context(|| format!("Failed to call tool {}", name))?
            .error_for_status()
            .with_context(|| format!("Tool {} returned an error", name))?
            .json()
            .await?;

        // The result is either a plain diagnostic string or a JSON object;
        // the orchestrator always consumes it as text.
        let result = &body["result"];
        Ok(match result.as_str() {
            Some(s) => s.to_string(),
            None => result.to_string(),
        })
    }
}

/// Repair a tool parameter schema for completion-API compatibility.
///
/// Some completion backends reject a function schema that is missing
/// `required` (or `properties`), so both are always present in the repaired
/// schema — `required` defaults to an empty array. Anything that is not an
/// object is replaced by the canonical empty schema.
pub fn repair_parameters_schema(schema: Value) -> Value {
    let mut map = match schema {
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            return serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            })
        }
    };

    map.entry("type".to_string())
        .or_insert_with(|| Value::String("object".to_string()));
    map.entry("properties".to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    map.entry("required".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_fills_missing_required() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } }
        });
        let repaired = repair_parameters_schema(schema);
        assert_eq!(repaired["required"], serde_json::json!([]));
        assert_eq!(repaired["type"], "object");
    }

    #[test]
    fn test_repair_preserves_existing_required() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "id": { "type": "string" } },
            "required": ["id"]
        });
        let repaired = repair_parameters_schema(schema);
        assert_eq!(repaired["required"], serde_json::json!(["id"]));
    }

    #[test]
    fn test_repair_replaces_non_object() {
        for schema in [Value::Null, serde_json::json!({}), serde_json::json!("x")] {
            let repaired = repair_parameters_schema(schema);
            assert_eq!(repaired["type"], "object");
            assert!(repaired["properties"].as_object().unwrap().is_empty());
            assert_eq!(repaired["required"], serde_json::json!([]));
        }
    }
}
