// handlers/protected/ai/mod.rs - Writing tools backed by the LLM
//
// These routes never touch the database directly; the only persistence is the
// usage log, which is queued and cannot fail the request.

pub mod brand_alignment;
pub mod expand;
pub mod generate_template;
pub mod headlines;
pub mod rewrite_channel;
pub mod shorten;
pub mod tone_shift;

use serde::Deserialize;

use crate::ai::prompts::{BrandVoiceContext, PersonaContext};
use crate::ai::{self, LlmCompletion, LlmRequest};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::usage::UsageEvent;
use crate::validation::{required_text, ValidationError, MAX_AI_TEXT_LENGTH};

/// Fields every text tool accepts
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToolRequest {
    pub text: Option<String>,
    pub brand_voice: Option<BrandVoiceContext>,
    pub persona: Option<PersonaContext>,
}

pub(crate) fn primary_text(text: Option<&str>) -> Result<String, ValidationError> {
    required_text("text", text, MAX_AI_TEXT_LENGTH)
}

/// Runs one completion and queues its usage record under `feature`.
pub(crate) async fn complete(
    state: &AppState,
    user: &AuthUser,
    feature: &'static str,
    request: LlmRequest,
) -> Result<LlmCompletion, ApiError> {
    let client = state.llm()?;
    let completion = ai::generate(client, &request).await?;
    state.usage.record(UsageEvent {
        user_id: user.user_id,
        model: completion.model.clone(),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        feature,
    });
    Ok(completion)
}
