//! Tool-calling surface for LLM agents: `POST /api/mcp`.
//!
//! Two methods, `tools/list` and `tools/call`. Every reply has the shape
//! `{ "success": bool, "data": ..., "error": string|null }`; tool failures are
//! reported in that shape with HTTP 200. Only missing or invalid credentials
//! produce an HTTP error.

pub mod tools;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth::{authenticate_api_key, authenticate_headers};
use crate::middleware::AuthUser;

pub const API_KEY_ARGUMENT: &str = "apiKey";

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    pub method: String,
    #[serde(default)]
    pub params: McpParams,
}

#[derive(Debug, Default, Deserialize)]
pub struct McpParams {
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                success: true,
                data,
                error: None,
            },
            Err(e) => Self::fail(format!("Failed to serialize result: {}", e)),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// POST /api/mcp
pub async fn mcp_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<McpRequest>,
) -> Result<Json<ToolResponse>, ApiError> {
    let user = resolve_caller(&state, &headers, &request.params.arguments).await?;
    debug!("MCP {} from user {}", request.method, user.user_id);

    let response = match request.method.as_str() {
        "tools/list" => ToolResponse::ok(json!({ "tools": tools::specs() })),
        "tools/call" => match request.params.name.as_deref() {
            Some(name) => {
                info!("MCP tool {} called by user {}", name, user.user_id);
                tools::call(&state, &user, name, request.params.arguments).await
            }
            None => ToolResponse::fail("params.name is required for tools/call"),
        },
        other => ToolResponse::fail(format!("Unknown method: {}", other)),
    };
    Ok(Json(response))
}

/// Header credentials first, then an `apiKey` argument.
async fn resolve_caller(state: &AppState, headers: &HeaderMap, arguments: &Value) -> Result<AuthUser, ApiError> {
    if let Some(user) = authenticate_headers(state, headers).await? {
        return Ok(user);
    }
    match arguments.get(API_KEY_ARGUMENT).and_then(Value::as_str) {
        Some(key) => authenticate_api_key(state, key).await,
        None => Err(ApiError::unauthorized("Missing Authorization header, X-API-Key or apiKey argument")),
    }
}
