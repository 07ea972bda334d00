//! The tool layer: trait, registry, and the built-in knowledge-base tool.
//!
//! Tools are registered at server startup and exposed via `GET /tools/list`
//! for agent discovery and `POST /tools/{name}` for invocation. The only
//! built-in is `get_knowledge_base`, which drives the whole
//! rank-then-render pipeline for one query.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::models::RenderedImage;
use crate::rank::{self, RankError};
use crate::render;

/// Name of the built-in knowledge-base tool, shared with the client side's
/// image-detection rule.
pub const KNOWLEDGE_TOOL: &str = "get_knowledge_base";

/// Diagnostic returned when the tool hits an unexpected internal error.
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred while retrieving knowledge.";

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// `parameters_schema` must be a valid OpenAI function-calling JSON Schema
/// object with `type: "object"`, `properties`, and `required`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name: a lowercase identifier with underscores, used as the
    /// route path (`POST /tools/{name}`).
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// OpenAI function-calling JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool. Returns the textual wire payload: either a plain
    /// diagnostic string or a serialized JSON object.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String>;
}

/// Context bridge passed to tool executions.
pub struct ToolContext {
    pub config: Arc<Config>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

/// Registry of all tools served by this process.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry pre-loaded with the built-in knowledge-base tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(KnowledgeTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Get all registered tools.
    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Knowledge retrieval
// ═══════════════════════════════════════════════════════════════════════

/// Outcome of one knowledge retrieval.
///
/// `Matches` with an empty vector means the ranking found pages but none of
/// them rendered — deliberately distinct from `NoMatches`, even though the
/// wire payload looks the same to the model.
#[derive(Debug, PartialEq, Eq)]
pub enum KnowledgeResult {
    /// The query was empty or whitespace-only.
    NoQuery,
    /// The corpus directory does not exist.
    CorpusMissing,
    /// No page met the relevance threshold.
    NoMatches,
    /// Ranked pages, rendered to images (successes only).
    Matches(Vec<RenderedImage>),
}

impl KnowledgeResult {
    /// Serialize to the tool wire payload: a plain diagnostic string, or a
    /// JSON object keyed by `relevant_images`.
    pub fn into_payload(self) -> String {
        match self {
            KnowledgeResult::NoQuery => {
                "Please provide a query to search the knowledge base.".to_string()
            }
            KnowledgeResult::CorpusMissing => "Error: Study notes folder not found".to_string(),
            KnowledgeResult::NoMatches => {
                "No relevant information found for your query.".to_string()
            }
            KnowledgeResult::Matches(images) => {
                serde_json::json!({ "relevant_images": images }).to_string()
            }
        }
    }
}

/// Run the full retrieval pipeline for one query: tokenize, rank, render.
pub fn retrieve_knowledge(config: &Config, query: &str) -> KnowledgeResult {
    let keywords = rank::query_keywords(query);
    if keywords.is_empty() {
        return KnowledgeResult::NoQuery;
    }

    println!("Query keywords: {:?}", keywords);

    let ranked = match rank::rank_corpus(&config.corpus.dir, &keywords) {
        Ok(ranked) => ranked,
        Err(RankError::CorpusNotFound(_)) => return KnowledgeResult::CorpusMissing,
        // Keywords were validated above; an empty query here is a bug, but
        // the tool boundary still answers with the user-facing prompt.
        Err(RankError::EmptyQuery) => return KnowledgeResult::NoQuery,
    };

    if ranked.is_empty() {
        return KnowledgeResult::NoMatches;
    }

    let images = render::render_ranked(&ranked, &config.corpus.dir, &config.corpus.image_dir);
    KnowledgeResult::Matches(images)
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tool
// ═══════════════════════════════════════════════════════════════════════

/// The built-in knowledge-base tool. Delegates to [`retrieve_knowledge`].
pub struct KnowledgeTool;

#[async_trait]
impl Tool for KnowledgeTool {
    fn name(&self) -> &str {
        KNOWLEDGE_TOOL
    }

    fn description(&self) -> &str {
        "Retrieve relevant knowledge from PDF files based on query keywords"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to search the study notes for",
                    "default": ""
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let query = params["query"].as_str().unwrap_or("");
        Ok(retrieve_knowledge(&ctx.config, query).into_payload())
    }
}
