//! AI endpoints that proxy to the external inference service.
//!
//! Both handlers are stateless: build a prompt, make one upstream call,
//! and recover what they can from the generated text.

use anyhow::Context;
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::api::ApiJson;
use crate::app::AppState;
use crate::domain::ai::{
    AssistantAction, ChatRequest, ChatResponse, ConversationMessage, RequestMetadata,
    SmartReplyRequest, SmartReplyResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;
use crate::services::extraction::{extract_assistant_reply, extract_suggestions, looks_like_html};
use crate::services::prompts::{build_chat_prompt, build_smart_reply_prompt};
use crate::services::{GenerationOptions, InferenceError};

/// Replaces HTML error pages in upstream error details.
pub const SERVICE_UNAVAILABLE_TEXT: &str =
    "The AI service is currently unavailable or offline. Please check the server connection.";

// =============================================================================
// Chat-Completion Proxy
// =============================================================================

/// Answer a marketplace assistant prompt.
///
/// POST /api/ai_chat
pub async fn ai_chat(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if !req.has_input() {
        return Err(ApiError::BadRequest("Prompt or image is required".to_string()));
    }

    let metadata = RequestMetadata::for_request(&req, Utc::now());
    let prompt = build_chat_prompt(&metadata, req.prompt_text())
        .context("Failed to serialize request metadata")?;

    let raw = state
        .inference
        .generate(
            &prompt,
            GenerationOptions::CHAT,
            req.images.as_deref(),
            headers.request_id(),
        )
        .await
        .map_err(chat_error)?;

    let reply = extract_assistant_reply(&raw);

    match reply.structured.as_ref().and_then(AssistantAction::from_reply) {
        Some(action) => tracing::debug!(
            page = %metadata.page,
            action = %action.kind(),
            "Assistant replied"
        ),
        None => tracing::debug!(
            page = %metadata.page,
            structured = reply.structured.is_some(),
            "Assistant replied without a recognised action"
        ),
    }

    Ok(Json(ChatResponse {
        response: reply.response,
        structured: reply.structured,
        raw,
    }))
}

/// Upstream failures keep their status; the detail text never carries HTML.
fn chat_error(err: InferenceError) -> ApiError {
    match err {
        e @ InferenceError::NotConfigured => ApiError::Configuration(e.to_string()),
        InferenceError::Upstream { status, body } => ApiError::Upstream {
            status: StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            message: format!(
                "External API error: {}. Details: {}",
                status.canonical_reason().unwrap_or("Unknown status"),
                upstream_detail(&body)
            ),
        },
        other => ApiError::Internal(other.into()),
    }
}

fn upstream_detail(body: &str) -> &str {
    if looks_like_html(body) {
        SERVICE_UNAVAILABLE_TEXT
    } else {
        body
    }
}

// =============================================================================
// Smart-Reply Suggester
// =============================================================================

/// Suggest up to three replies for the latest chat messages.
///
/// POST /api/smart_reply
pub async fn smart_reply(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SmartReplyRequest>,
) -> ApiResult<Json<SmartReplyResponse>> {
    let messages = parse_messages(req.messages)?;
    let prompt = build_smart_reply_prompt(&messages);

    let raw = state
        .inference
        .generate(
            &prompt,
            GenerationOptions::SMART_REPLY,
            None,
            headers.request_id(),
        )
        .await
        .map_err(smart_reply_error)?;

    let suggestions = extract_suggestions(&raw);
    tracing::debug!(count = suggestions.len(), "Smart replies generated");

    Ok(Json(SmartReplyResponse { suggestions }))
}

fn parse_messages(messages: Option<Value>) -> ApiResult<Vec<ConversationMessage>> {
    match messages {
        Some(Value::Array(items)) if !items.is_empty() => {
            serde_json::from_value(Value::Array(items)).map_err(|_| {
                ApiError::BadRequest("Each message needs a senderId and text".to_string())
            })
        }
        _ => Err(ApiError::BadRequest("Messages array is required".to_string())),
    }
}

/// Any upstream problem is reported without detail.
fn smart_reply_error(err: InferenceError) -> ApiError {
    match err {
        e @ InferenceError::NotConfigured => ApiError::Configuration(e.to_string()),
        _ => ApiError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to fetch suggestions".to_string(),
        },
    }
}
