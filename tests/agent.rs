//! Orchestration tests with mocked completion and transport seams.
//!
//! No network: the mocks record every request so the tests can assert on
//! the exact conversation shape each round received.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use notelens::agent::process_query;
use notelens::client::ToolTransport;
use notelens::llm::Completions;
use notelens::models::{AssistantTurn, ToolCallRequest, ToolDescriptor};

/// One recorded completion request.
struct CompletionRequest {
    messages: Vec<Value>,
    has_tools: bool,
    tool_choice: Option<String>,
}

/// Scripted completion backend: pops canned turns, records every request.
struct MockCompletions {
    turns: Mutex<VecDeque<Result<AssistantTurn>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletions {
    fn new(turns: Vec<Result<AssistantTurn>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests.lock().unwrap()
    }
}

#[async_trait]
impl Completions for MockCompletions {
    async fn complete(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
        tool_choice: Option<&str>,
    ) -> Result<AssistantTurn> {
        self.requests.lock().unwrap().push(CompletionRequest {
            messages: messages.to_vec(),
            has_tools: tools.is_some(),
            tool_choice: tool_choice.map(String::from),
        });
        match self.turns.lock().unwrap().pop_front() {
            Some(turn) => turn,
            None => bail!("Unexpected extra completion request"),
        }
    }
}

/// Scripted tool server: pops canned outputs, records call names.
struct MockTransport {
    outputs: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(outputs: Vec<String>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_names(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(vec![ToolDescriptor {
            name: "get_knowledge_base".to_string(),
            description: "Retrieve relevant knowledge base pages".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": [],
            }),
        }])
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> Result<String> {
        self.calls.lock().unwrap().push(name.to_string());
        match self.outputs.lock().unwrap().pop_front() {
            Some(output) => Ok(output),
            None => bail!("Unexpected extra tool call"),
        }
    }
}

fn knowledge_call(id: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: "get_knowledge_base".to_string(),
        arguments: "{\"query\":\"reinforcement learning\"}".to_string(),
    }
}

fn turn_with_calls(calls: Vec<ToolCallRequest>) -> AssistantTurn {
    AssistantTurn {
        content: None,
        tool_calls: calls,
    }
}

fn text_turn(text: &str) -> AssistantTurn {
    AssistantTurn {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

#[tokio::test]
async fn test_vision_round_replaces_conversation_and_abandons_calls() {
    let tmp = TempDir::new().unwrap();
    let img_path = tmp.path().join("doc_page_1.png");
    std::fs::write(&img_path, b"\x89PNG\r\n\x1a\npixels").unwrap();

    let payload = serde_json::json!({
        "relevant_images": [{
            "path": img_path.to_string_lossy(),
            "source": "doc.pdf",
            "page": 1,
            "score": 3,
        }]
    })
    .to_string();

    // Model asks for two tool calls; the first yields images, so the
    // second must never be executed.
    let completions = MockCompletions::new(vec![
        Ok(turn_with_calls(vec![
            knowledge_call("call_1"),
            knowledge_call("call_2"),
        ])),
        Ok(text_turn("The pages describe policy gradients.")),
    ]);
    let transport = MockTransport::new(vec![payload]);

    let answer = process_query(&completions, &transport, "what is PPO?").await;
    assert_eq!(answer, "The pages describe policy gradients.");

    assert_eq!(transport.call_names(), vec!["get_knowledge_base"]);

    let requests = completions.requests();
    assert_eq!(requests.len(), 2);

    // Round 1: catalog attached, automatic selection.
    assert!(requests[0].has_tools);
    assert_eq!(requests[0].tool_choice.as_deref(), Some("auto"));

    // Vision round: no tools, conversation replaced by one user message
    // carrying the prefixed query and one image segment.
    let vision = &requests[1];
    assert!(!vision.has_tools);
    assert_eq!(vision.tool_choice, None);
    assert_eq!(vision.messages.len(), 1);
    assert_eq!(vision.messages[0]["role"], "user");

    let content = vision.messages[0]["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["type"], "text");
    assert!(content[0]["text"].as_str().unwrap().ends_with("what is PPO?"));
    assert_eq!(content[1]["type"], "image_url");
    assert!(content[1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_diagnostic_output_takes_tool_result_path() {
    let completions = MockCompletions::new(vec![
        Ok(turn_with_calls(vec![knowledge_call("call_1")])),
        Ok(text_turn("I could not find anything relevant.")),
    ]);
    let transport = MockTransport::new(vec![
        "No relevant information found for your query.".to_string(),
    ]);

    let answer = process_query(&completions, &transport, "obscure topic").await;
    assert_eq!(answer, "I could not find anything relevant.");

    let requests = completions.requests();
    assert_eq!(requests.len(), 2);

    // Follow-up round keeps the catalog but forbids further tool calls.
    let followup = &requests[1];
    assert!(followup.has_tools);
    assert_eq!(followup.tool_choice.as_deref(), Some("none"));

    // Conversation: user, assistant (with tool_calls), tool result.
    assert_eq!(followup.messages.len(), 3);
    assert_eq!(followup.messages[0]["role"], "user");
    assert_eq!(followup.messages[1]["role"], "assistant");
    assert_eq!(followup.messages[2]["role"], "tool");
    assert_eq!(followup.messages[2]["tool_call_id"], "call_1");
    assert_eq!(
        followup.messages[2]["content"],
        "No relevant information found for your query."
    );
}

#[tokio::test]
async fn test_direct_answer_skips_tools() {
    let completions = MockCompletions::new(vec![Ok(text_turn("Just 42."))]);
    let transport = MockTransport::new(vec![]);

    let answer = process_query(&completions, &transport, "meaning of life?").await;
    assert_eq!(answer, "Just 42.");
    assert!(transport.call_names().is_empty());
    assert_eq!(completions.requests().len(), 1);
}

#[tokio::test]
async fn test_completion_failure_becomes_error_string() {
    let completions = MockCompletions::new(vec![Err(anyhow::anyhow!("connection refused"))]);
    let transport = MockTransport::new(vec![]);

    let answer = process_query(&completions, &transport, "anything").await;
    assert!(answer.starts_with("Error processing query: "));
    assert!(answer.contains("connection refused"));
}

#[tokio::test]
async fn test_empty_image_array_is_not_a_vision_trigger() {
    let completions = MockCompletions::new(vec![
        Ok(turn_with_calls(vec![knowledge_call("call_1")])),
        Ok(text_turn("Nothing rendered, answering from text.")),
    ]);
    let transport = MockTransport::new(vec!["{\"relevant_images\":[]}".to_string()]);

    let answer = process_query(&completions, &transport, "q").await;
    assert_eq!(answer, "Nothing rendered, answering from text.");

    let requests = completions.requests();
    // Standard follow-up round, not a vision round.
    assert!(requests[1].has_tools);
    assert_eq!(requests[1].tool_choice.as_deref(), Some("none"));
}
