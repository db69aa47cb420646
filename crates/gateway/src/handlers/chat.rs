//! Chat handler
//!
//! `POST /chat` with `{"message": "..."}` answers with
//! `application/x-ndjson`: one `{"text": ...}` object per generated fragment,
//! possibly ending with a single `{"error": ...}` object.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use validator::Validate;

use crate::AppState;
use chatbridge_common::errors::{AppError, Result};

/// Media type of the streamed answer
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Chat request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(max = 4000, message = "Pesan terlalu panjang (maksimal 4000 karakter)"))]
    pub message: Option<String>,
}

impl ChatRequest {
    /// The question to answer; absent, blank or oversized messages are rejected
    fn into_message(self) -> Result<String> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: Some("message".to_string()),
        })?;

        let message = self.message.ok_or_else(|| AppError::MissingField {
            field: "message".to_string(),
        })?;

        if message.trim().is_empty() {
            return Err(AppError::Validation {
                message: "Pesan tidak boleh kosong".to_string(),
                field: Some("message".to_string()),
            });
        }
        Ok(message)
    }
}

/// Stream an answer to one question
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| AppError::InvalidFormat {
        message: rejection.body_text(),
    })?;
    let message = request.into_message()?;

    // Held by the body, so the slot frees only when the stream ends or the client leaves
    let permit = state
        .streams
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal { message: e.to_string() })?;

    tracing::info!(message_len = message.chars().count(), "Chat request received");

    let envelopes = state.pipeline.answer_stream(&message).await;
    let body = Body::from_stream(envelopes.map(move |envelope| {
        let _slot = &permit;
        Ok::<_, Infallible>(envelope.to_ndjson_line())
    }));

    Ok(([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response())
}
