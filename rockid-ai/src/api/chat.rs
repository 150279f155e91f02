//! POST /api/chat
//!
//! Single-provider follow-up questions about an identified rock.

use crate::error::{ApiError, ApiResult};
use crate::types::ImagePayload;
use crate::AppState;
use axum::http::StatusCode;
use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use rockid_common::api::{ChatRequest, ChatResponse};
use tracing::warn;

fn rejected_body(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::ChatTooLarge(rejection.body_text())
    } else {
        ApiError::InvalidChat(rejection.body_text())
    }
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(body) = payload.map_err(rejected_body)?;
    let message = body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::InvalidChat("message is required".to_string()))?;

    let chat = state.chat.as_ref().ok_or(ApiError::ChatUnavailable)?;
    let context = body.context.unwrap_or_default();

    // A bad context image degrades to a text-only question
    let image = match context.image_base64.as_deref() {
        Some(raw) if !raw.trim().is_empty() => match ImagePayload::from_data_uri(raw) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable context image");
                None
            }
        },
        _ => None,
    };

    let response = chat
        .respond(message, context.results.as_ref(), image.as_ref(), &state.shutdown)
        .await?;

    Ok(Json(ChatResponse { response }))
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/api/chat", post(chat))
}
