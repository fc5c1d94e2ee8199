// handlers/protected/ai/brand_alignment.rs - POST /api/brand-alignment handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{complete, primary_text};
use crate::ai::prompts::{self, BrandVoiceContext};
use crate::ai::{extract_json, LlmRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::validation::ValidationError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandAlignmentRequest {
    pub text: Option<String>,
    pub brand_voice: Option<BrandVoiceContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAlignmentResult {
    #[serde(deserialize_with = "score_0_100")]
    pub score: u8,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub matches: Vec<String>,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BrandAlignmentResponse {
    pub result: BrandAlignmentResult,
}

/// Accepts any JSON number (or numeric string) and clamps it to 0..=100.
fn score_0_100<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    let score = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| serde::de::Error::custom(format!("score is not a number: {}", raw)))?;
    Ok(score.round().clamp(0.0, 100.0) as u8)
}

pub fn parse_result(raw: &str) -> Result<BrandAlignmentResult, serde_json::Error> {
    serde_json::from_str(extract_json(raw))
}

/// POST /api/brand-alignment - Score copy against a brand voice
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<BrandAlignmentRequest>, JsonRejection>,
) -> ApiResult<BrandAlignmentResponse> {
    let user = identity.require()?;
    let Json(body) = body?;
    let text = primary_text(body.text.as_deref())?;
    let voice = body
        .brand_voice
        .as_ref()
        .ok_or_else(|| ValidationError::new("brandVoice is required"))?;

    let request = LlmRequest::new(prompts::brand_alignment_system(), prompts::brand_alignment_prompt(&text, voice))
        .timeout(state.llm_timeout());
    let completion = complete(&state, user, "brand_alignment", request).await?;

    let result = parse_result(&completion.text).map_err(|e| {
        tracing::warn!(error = %e, "Brand alignment response was not valid JSON");
        ApiError::internal("Failed to parse brand alignment result", e.to_string())
    })?;
    Ok(ApiResponse::success(BrandAlignmentResponse { result }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_and_clamps_score() {
        let raw = "Here you go:\n```json\n{\"score\": 130, \"assessment\": \"On brand\", \"matches\": [\"tone\"]}\n```";
        let result = parse_result(raw).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.matches, vec!["tone".to_string()]);
        assert!(result.violations.is_empty());

        let negative = parse_result("{\"score\": -4}").unwrap();
        assert_eq!(negative.score, 0);
        assert_eq!(parse_result("{\"score\": \"72%\"}").unwrap().score, 72);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_result("I think it's fine").is_err());
        assert!(parse_result("{\"assessment\": \"no score\"}").is_err());
    }
}
