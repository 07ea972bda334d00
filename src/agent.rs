//! Tool-calling orchestration.
//!
//! Drives the multi-round conversation with the completion API: first call
//! with the full tool catalog, sequential tool execution through the
//! transport, then either a vision round (when the knowledge-base tool
//! returned page images) or a text-only follow-up round.
//!
//! The two mutually exclusive branches are an explicit [`RoundOutcome`]
//! enum, not a boolean latch: "abandon the remaining tool calls" is a
//! transition, not a loop side-effect.
//!
//! Failure semantics: every error inside [`process_query`] — network, JSON
//! parsing, file access — is caught at the top level, logged, and converted
//! to a user-visible error string. Nothing is retried.

use std::path::Path;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::client::ToolTransport;
use crate::llm::Completions;
use crate::models::{RenderedImage, ToolCallRequest, ToolDescriptor};
use crate::tools::KNOWLEDGE_TOOL;

/// Text segment prepended to the query in the vision round.
const VISION_PROMPT_PREFIX: &str =
    "Based on these document pages, please answer the following query: ";

/// Tools whose output is inspected for an image payload.
///
/// Extension point: a future catalog with other image-bearing tools adds
/// their names here; everything else is appended as a plain tool result.
const IMAGE_BEARING_TOOLS: &[&str] = &[KNOWLEDGE_TOOL];

/// Outcome of executing one round of tool calls.
#[derive(Debug)]
enum RoundOutcome {
    /// An image-bearing result was found: the conversation has been
    /// replaced with a single vision user message and the remaining tool
    /// calls in the round were abandoned.
    Vision(Vec<Value>),
    /// No images: the conversation has been extended with one tool-result
    /// message per executed call.
    ToolResults(Vec<Value>),
}

/// Process one query end to end and return the final answer text.
///
/// This is the orchestrator's public boundary: any internal failure is
/// logged and flattened into an error string, never propagated.
pub async fn process_query(
    completions: &dyn Completions,
    transport: &dyn ToolTransport,
    query: &str,
) -> String {
    match run_query(completions, transport, query).await {
        Ok(answer) => answer,
        Err(e) => {
            eprintln!("Warning: query failed: {:#}", e);
            format!("Error processing query: {}", e)
        }
    }
}

async fn run_query(
    completions: &dyn Completions,
    transport: &dyn ToolTransport,
    query: &str,
) -> Result<String> {
    let catalog = tool_catalog(&transport.list_tools().await?);

    println!("Available tools: {}", catalog.len());

    // Round 1: user query with the full catalog, automatic tool selection.
    let messages = vec![serde_json::json!({ "role": "user", "content": query })];
    let first = completions
        .complete(&messages, Some(&catalog), Some("auto"))
        .await?;

    if first.tool_calls.is_empty() {
        println!("No tool calls made by the model");
        return Ok(first.content.unwrap_or_default());
    }

    let mut conversation = messages;
    conversation.push(assistant_message(&first.content, &first.tool_calls));

    let final_turn = match execute_tool_round(transport, query, &first.tool_calls, conversation)
        .await?
    {
        RoundOutcome::Vision(messages) => {
            println!("Making final API call with image data...");
            // No tool catalog for the vision call.
            completions.complete(&messages, None, None).await?
        }
        RoundOutcome::ToolResults(messages) => {
            println!("Making final API call with standard tool results...");
            completions
                .complete(&messages, Some(&catalog), Some("none"))
                .await?
        }
    };

    Ok(final_turn.content.unwrap_or_default())
}

/// Execute the round's tool calls sequentially, in API return order.
///
/// The first image-bearing result replaces the conversation and abandons
/// every remaining call; otherwise each result is appended as a standard
/// tool message.
async fn execute_tool_round(
    transport: &dyn ToolTransport,
    query: &str,
    tool_calls: &[ToolCallRequest],
    mut conversation: Vec<Value>,
) -> Result<RoundOutcome> {
    for call in tool_calls {
        println!("Executing tool: {}", call.name);

        let arguments: Value = serde_json::from_str(&call.arguments)
            .with_context(|| format!("Malformed arguments for tool {}", call.name))?;
        let output = transport.call_tool(&call.name, arguments).await?;

        if IMAGE_BEARING_TOOLS.contains(&call.name.as_str()) {
            if let Some(images) = parse_relevant_images(&output) {
                // Replace, not extend: the vision round starts from a fresh
                // single user message. Remaining calls are abandoned.
                return Ok(RoundOutcome::Vision(vec![build_vision_message(
                    query, &images,
                )]));
            }
        }

        conversation.push(serde_json::json!({
            "role": "tool",
            "tool_call_id": call.id,
            "content": output,
        }));
    }

    Ok(RoundOutcome::ToolResults(conversation))
}

/// Try to read an image payload out of a tool's textual output.
///
/// Returns `Some` only for parseable JSON with a non-empty
/// `relevant_images` array; a plain diagnostic string, malformed JSON, or
/// an empty array all fall back to the standard tool-result path.
fn parse_relevant_images(output: &str) -> Option<Vec<RenderedImage>> {
    let value: Value = serde_json::from_str(output).ok()?;
    let images: Vec<RenderedImage> =
        serde_json::from_value(value.get("relevant_images")?.clone()).ok()?;
    if images.is_empty() {
        None
    } else {
        Some(images)
    }
}

/// Build the single vision user message: the prefixed query as a text
/// segment plus one inline data-URL segment per encodable image.
///
/// Encoding is best-effort — an unreadable image file is logged and
/// skipped, it does not fail the round.
fn build_vision_message(query: &str, images: &[RenderedImage]) -> Value {
    let mut content = vec![serde_json::json!({
        "type": "text",
        "text": format!("{}{}", VISION_PROMPT_PREFIX, query),
    })];

    for image in images {
        match encode_image_data_url(Path::new(&image.path)) {
            Ok(url) => content.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": url },
            })),
            Err(e) => {
                eprintln!("Warning: skipping image {}: {}", image.path, e);
            }
        }
    }

    serde_json::json!({ "role": "user", "content": content })
}

/// Read a PNG file and encode it as a `data:image/png;base64,...` URL.
pub fn encode_image_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
}

/// Convert tool descriptors into the completion API's function catalog.
fn tool_catalog(tools: &[ToolDescriptor]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                },
            })
        })
        .collect()
}

/// Rebuild the assistant turn as a conversation message, tool calls
/// included, so follow-up tool results can reference their call ids.
fn assistant_message(content: &Option<String>, tool_calls: &[ToolCallRequest]) -> Value {
    let calls: Vec<Value> = tool_calls
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "type": "function",
                "function": { "name": c.name, "arguments": c.arguments },
            })
        })
        .collect();

    serde_json::json!({
        "role": "assistant",
        "content": content,
        "tool_calls": calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_images_from_payload() {
        let output = r#"{"relevant_images":[{"path":"mcp_images/a_page_1.png","source":"a.pdf","page":1,"score":2}]}"#;
        let images = parse_relevant_images(output).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].source, "a.pdf");
    }

    #[test]
    fn test_parse_images_rejects_diagnostics_and_empty() {
        assert!(parse_relevant_images("No relevant information found for your query.").is_none());
        assert!(parse_relevant_images("{\"relevant_images\":[]}").is_none());
        assert!(parse_relevant_images("{\"other_key\":1}").is_none());
        assert!(parse_relevant_images("not json at all").is_none());
    }

    #[test]
    fn test_vision_message_shape() {
        let tmp = tempfile::TempDir::new().unwrap();
        let img_path = tmp.path().join("a_page_1.png");
        std::fs::write(&img_path, b"\x89PNG\r\n\x1a\nfakedata").unwrap();

        let images = vec![RenderedImage {
            path: img_path.to_string_lossy().to_string(),
            source: "a.pdf".to_string(),
            page: 1,
            score: 2,
        }];

        let message = build_vision_message("what is this?", &images);
        assert_eq!(message["role"], "user");

        let content = message["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "text");
        assert!(content[0]["text"]
            .as_str()
            .unwrap()
            .ends_with("what is this?"));
        assert_eq!(content[1]["type"], "image_url");
        assert!(content[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_vision_message_skips_missing_files() {
        let images = vec![RenderedImage {
            path: "/nonexistent/x_page_9.png".to_string(),
            source: "x.pdf".to_string(),
            page: 9,
            score: 1,
        }];
        let message = build_vision_message("q", &images);
        // Only the text segment survives.
        assert_eq!(message["content"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_data_url_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let img_path = tmp.path().join("page.png");
        let original: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
        std::fs::write(&img_path, &original).unwrap();

        let url = encode_image_data_url(&img_path).unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_tool_catalog_function_format() {
        let tools = vec![ToolDescriptor {
            name: "get_knowledge_base".to_string(),
            description: "desc".to_string(),
            parameters: serde_json::json!({
                "type": "object", "properties": {}, "required": []
            }),
        }];
        let catalog = tool_catalog(&tools);
        assert_eq!(catalog[0]["type"], "function");
        assert_eq!(catalog[0]["function"]["name"], "get_knowledge_base");
        assert!(catalog[0]["function"]["parameters"]["required"].is_array());
    }
}
