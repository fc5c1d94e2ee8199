// handlers/protected/ai/generate_template.rs - POST /api/generate-template handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::complete;
use crate::ai::prompts::{self, BrandVoiceContext, PersonaContext};
use crate::ai::templates::TemplateCatalog;
use crate::ai::{html, LlmRequest};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::validation::ValidationError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTemplateRequest {
    pub template_id: Option<String>,
    pub form_data: Option<Map<String, Value>>,
    pub section_id: Option<String>,
    pub brand_voice: Option<BrandVoiceContext>,
    pub persona: Option<PersonaContext>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTemplateResponse {
    pub generated_copy: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

/// POST /api/generate-template - Fill a catalog template (or one of its sections) from form data
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<GenerateTemplateRequest>, JsonRejection>,
) -> ApiResult<GenerateTemplateResponse> {
    let user = identity.require()?;
    let Json(body) = body?;

    let template_id = body
        .template_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ValidationError::new("templateId is required"))?;
    let template = TemplateCatalog::builtin()
        .get(template_id)
        .ok_or_else(|| ValidationError::new(format!("Unknown template: {}", template_id)))?;
    let form_data = body
        .form_data
        .as_ref()
        .ok_or_else(|| ValidationError::new("formData is required"))?;
    let section_id = body.section_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let prompt = template.render(section_id, form_data)?;
    let prompt = prompts::with_context(prompt, body.brand_voice.as_ref(), body.persona.as_ref());
    let budget = template.budget(form_data);
    let request = LlmRequest::new(prompts::template_system(), prompt)
        .max_tokens(budget.max_tokens)
        .timeout(budget.timeout);
    let completion = complete(&state, user, "generate_template", request).await?;

    Ok(ApiResponse::success(GenerateTemplateResponse {
        generated_copy: html::sanitize(&completion.text),
        template_id: template.id.clone(),
        section_id: section_id.map(str::to_string),
    }))
}
