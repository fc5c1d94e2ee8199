// handlers/protected/ai/headlines.rs - POST /api/headlines handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{complete, primary_text};
use crate::ai::headline_parser::{parse_headlines, Headline};
use crate::ai::prompts::{self, BrandVoiceContext, PersonaContext};
use crate::ai::LlmRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::validation::ValidationError;

const DEFAULT_COUNT: u32 = 10;
const MAX_COUNT: u32 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlinesRequest {
    pub text: Option<String>,
    pub count: Option<i64>,
    pub brand_voice: Option<BrandVoiceContext>,
    pub persona: Option<PersonaContext>,
}

#[derive(Debug, Serialize)]
pub struct HeadlinesResponse {
    pub headlines: Vec<Headline>,
}

fn headline_count(requested: Option<i64>) -> Result<u32, ValidationError> {
    match requested {
        None => Ok(DEFAULT_COUNT),
        Some(n) if (1..=MAX_COUNT as i64).contains(&n) => Ok(n as u32),
        Some(_) => Err(ValidationError::new(format!("count must be between 1 and {}", MAX_COUNT))),
    }
}

/// POST /api/headlines - Generate headline options grouped by copywriting formula
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<HeadlinesRequest>, JsonRejection>,
) -> ApiResult<HeadlinesResponse> {
    let user = identity.require()?;
    let Json(body) = body?;
    let text = primary_text(body.text.as_deref())?;
    let count = headline_count(body.count)?;

    let prompt = prompts::with_context(
        prompts::headlines_prompt(&text, count),
        body.brand_voice.as_ref(),
        body.persona.as_ref(),
    );
    let request = LlmRequest::new(prompts::headlines_system(), prompt).timeout(state.llm_timeout());
    let completion = complete(&state, user, "headlines", request).await?;

    let mut headlines = parse_headlines(&completion.text);
    if headlines.is_empty() {
        return Err(ApiError::internal(
            "Failed to generate headlines",
            "No headlines could be parsed from the AI response",
        ));
    }
    headlines.truncate(count as usize);
    Ok(ApiResponse::success(HeadlinesResponse { headlines }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_bounds() {
        assert_eq!(headline_count(None).unwrap(), 10);
        assert_eq!(headline_count(Some(1)).unwrap(), 1);
        assert_eq!(headline_count(Some(20)).unwrap(), 20);
        assert!(headline_count(Some(0)).is_err());
        assert!(headline_count(Some(21)).is_err());
    }
}
