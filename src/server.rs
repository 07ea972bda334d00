//! HTTP tool server.
//!
//! Exposes the knowledge-base tool over a JSON HTTP API suitable for
//! integration with tool-calling agent clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a registered tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses are JSON bodies of the form:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no tool registered with name: x" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::models::ToolDescriptor;
use crate::tools::{ToolContext, ToolRegistry, INTERNAL_ERROR_MESSAGE};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    tools: Arc<ToolRegistry>,
}

/// Starts the tool server.
///
/// Binds to the address configured in `[server].bind`, registers the
/// built-in knowledge-base tool, and serves until the process terminates.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let registry = ToolRegistry::with_builtins();

    println!("Registered {} tool(s):", registry.len());
    for t in registry.tools() {
        println!("  POST /tools/{} — {}", t.name(), t.description());
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        tools: Arc::new(registry),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("Tool server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and a message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

/// JSON response body for `GET /tools/list`.
#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDescriptor>,
}

/// Handler for `GET /tools/list`.
///
/// Returns all registered tools with their OpenAI function-calling
/// parameter schemas.
async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools: Vec<ToolDescriptor> = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolDescriptor {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.parameters_schema(),
        })
        .collect();

    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

/// Handler for `POST /tools/{name}`.
///
/// Looks up the tool by name and executes it with the posted JSON params.
/// The textual tool payload is wrapped as `{ "result": "<payload>" }`.
/// Returns `404` if the tool is not found; an execution failure is logged
/// and reported to the caller as the internal-error diagnostic, so the
/// model still receives a well-formed tool result.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let ctx = ToolContext::new(state.config.clone());
    let result = match tool.execute(params, &ctx).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Warning: tool {} failed: {:#}", name, e);
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    };

    Ok(Json(serde_json::json!({ "result": result })))
}
