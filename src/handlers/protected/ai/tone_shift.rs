// handlers/protected/ai/tone_shift.rs - POST /api/tone-shift handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{complete, primary_text};
use crate::ai::prompts::{self, BrandVoiceContext, PersonaContext, TONES};
use crate::ai::{html, LlmRequest};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::validation::one_of;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneShiftRequest {
    pub text: Option<String>,
    pub tone: Option<String>,
    pub brand_voice: Option<BrandVoiceContext>,
    pub persona: Option<PersonaContext>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneShiftResponse {
    pub rewritten_text: String,
    pub tone: &'static str,
}

/// POST /api/tone-shift - Rewrite copy in one of the supported tones
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<ToneShiftRequest>, JsonRejection>,
) -> ApiResult<ToneShiftResponse> {
    let user = identity.require()?;
    let Json(body) = body?;
    let text = primary_text(body.text.as_deref())?;
    let tone = one_of("tone", body.tone.as_deref(), TONES)?;

    let prompt = prompts::with_context(
        prompts::tone_shift_prompt(&text, tone),
        body.brand_voice.as_ref(),
        body.persona.as_ref(),
    );
    let request = LlmRequest::new(prompts::tone_shift_system(), prompt).timeout(state.llm_timeout());
    let completion = complete(&state, user, "tone_shift", request).await?;

    Ok(ApiResponse::success(ToneShiftResponse {
        rewritten_text: html::sanitize(&completion.text),
        tone,
    }))
}
