// handlers/protected/ai/rewrite_channel.rs - POST /api/rewrite-channel handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{complete, primary_text};
use crate::ai::prompts::{self, BrandVoiceContext, PersonaContext, CHANNELS};
use crate::ai::{html, LlmRequest};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::validation::one_of;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteChannelRequest {
    pub text: Option<String>,
    pub channel: Option<String>,
    pub brand_voice: Option<BrandVoiceContext>,
    pub persona: Option<PersonaContext>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteChannelResponse {
    pub rewritten_text: String,
    pub channel: &'static str,
}

/// POST /api/rewrite-channel - Adapt copy to a social or e-mail channel
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<RewriteChannelRequest>, JsonRejection>,
) -> ApiResult<RewriteChannelResponse> {
    let user = identity.require()?;
    let Json(body) = body?;
    let text = primary_text(body.text.as_deref())?;
    let channel = one_of("channel", body.channel.as_deref(), CHANNELS)?;

    let prompt = prompts::with_context(
        prompts::rewrite_channel_prompt(&text, channel),
        body.brand_voice.as_ref(),
        body.persona.as_ref(),
    );
    let request = LlmRequest::new(prompts::rewrite_channel_system(), prompt).timeout(state.llm_timeout());
    let completion = complete(&state, user, "rewrite_channel", request).await?;

    Ok(ApiResponse::success(RewriteChannelResponse {
        rewritten_text: html::sanitize(&completion.text),
        channel,
    }))
}
