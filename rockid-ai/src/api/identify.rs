//! POST /api/identify
//!
//! Answers 200 with a canonical record on every provider outcome, including
//! total failure. Only a malformed request gets a 400.

use crate::error::{ApiError, ApiResult};
use crate::types::{ClassificationRequest, ImagePayload};
use crate::AppState;
use axum::http::StatusCode;
use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use rockid_common::api::{CanonicalRecord, ClassifyRequest};
use rockid_common::Error;
use tracing::debug;

fn rejected_body(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::ImageTooLarge(rejection.body_text())
    } else {
        ApiError::InvalidImage(rejection.body_text())
    }
}

fn invalid_image(error: Error) -> ApiError {
    match error {
        Error::InvalidInput(msg) => ApiError::InvalidImage(msg),
        other => ApiError::InvalidImage(other.to_string()),
    }
}

/// Validate the body into a classification request
fn classification_request(body: ClassifyRequest) -> ApiResult<ClassificationRequest> {
    let raw = body
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidImage("image is required".to_string()))?;
    let image = ImagePayload::from_data_uri(&raw).map_err(invalid_image)?;

    let request = ClassificationRequest::new(image);
    Ok(match body.message {
        Some(message) if !message.trim().is_empty() => request.with_message(message),
        _ => request,
    })
}

pub async fn identify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> ApiResult<Json<CanonicalRecord>> {
    let Json(body) = payload.map_err(rejected_body)?;
    let request = classification_request(body)?;
    debug!(
        media_type = %request.image.media_type,
        image_bytes = request.image.data.len(),
        "Identify request accepted"
    );

    let outcome = state.pipeline.classify(&request, &state.shutdown).await;

    if outcome.is_total_failure() {
        let failed: Vec<String> = outcome
            .settlements
            .iter()
            .map(|s| match s.error_kind {
                Some(kind) => format!("{} ({})", s.source_id, kind),
                None => s.source_id.clone(),
            })
            .collect();
        let message = if failed.is_empty() {
            "No providers configured".to_string()
        } else {
            format!("All providers failed: {}", failed.join(", "))
        };
        *state.last_error.write().await = Some(message);
    }

    Ok(Json(outcome.record))
}

pub fn identify_routes() -> Router<AppState> {
    Router::new().route("/api/identify", post(identify))
}
