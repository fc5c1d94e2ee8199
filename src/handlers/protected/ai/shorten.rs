// handlers/protected/ai/shorten.rs - POST /api/shorten handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{complete, primary_text, TextToolRequest};
use crate::ai::{html, prompts, LlmRequest};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub shortened_text: String,
}

/// POST /api/shorten - Tighten copy while keeping its message
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<TextToolRequest>, JsonRejection>,
) -> ApiResult<ShortenResponse> {
    let user = identity.require()?;
    let Json(body) = body?;
    let text = primary_text(body.text.as_deref())?;

    let prompt = prompts::with_context(prompts::shorten_prompt(&text), body.brand_voice.as_ref(), body.persona.as_ref());
    let request = LlmRequest::new(prompts::shorten_system(), prompt).timeout(state.llm_timeout());
    let completion = complete(&state, user, "shorten", request).await?;

    Ok(ApiResponse::success(ShortenResponse {
        shortened_text: html::sanitize(&completion.text),
    }))
}
