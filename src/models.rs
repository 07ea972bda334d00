//! Core data models used throughout Notelens.
//!
//! These types represent the pages, ranked results, and tool-call requests
//! that flow through the retrieval and orchestration pipeline.

use serde::{Deserialize, Serialize};

/// A corpus page that met the relevance threshold for a query.
///
/// Produced by the ranker; ordering is descending by `score` with encounter
/// order preserved among ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredPage {
    /// Number of distinct query keywords present in the page text.
    pub score: usize,
    /// Source document file name (e.g. `"lecture3.pdf"`).
    pub source: String,
    /// 1-based page index within the source document.
    pub page: usize,
}

/// A successfully rasterized page, as carried in the tool wire payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedImage {
    /// Path to the PNG written into the image output directory.
    pub path: String,
    /// Source document file name.
    pub source: String,
    /// 1-based page index within the source document.
    pub page: usize,
    /// Relevance score of the page at ranking time.
    pub score: usize,
}

/// A tool invocation requested by the completion API.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Opaque call identifier, echoed back in the tool-result message.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Raw JSON string of tool arguments, as returned by the API.
    pub arguments: String,
}

/// A tool advertised by the tool server, as seen by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// OpenAI function-calling JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// The assistant's reply to one completion request.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    /// Text content, if the model produced any.
    pub content: Option<String>,
    /// Tool calls in the order the API returned them.
    pub tool_calls: Vec<ToolCallRequest>,
}
