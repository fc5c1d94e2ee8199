use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{check_length, ValidationError, MAX_TEMPLATE_FIELD_LENGTH};

pub const EMAIL_SEQUENCE_ID: &str = "email-sequence";
const MAX_EMAIL_COUNT: u32 = 10;

static CATALOG_YAML: &str = include_str!("../../templates/catalog.yaml");
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("Invalid regex"));
static BUILTIN: Lazy<TemplateCatalog> =
    Lazy::new(|| TemplateCatalog::from_yaml(CATALOG_YAML).expect("embedded template catalog is valid YAML"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub fields: Vec<TemplateField>,
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
    #[serde(skip_serializing)]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub templates: Vec<Template>,
}

/// Timeout and output budget for one template generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationBudget {
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl GenerationBudget {
    pub const DEFAULT: GenerationBudget = GenerationBudget {
        timeout: Duration::from_secs(30),
        max_tokens: 4000,
    };

    /// 30s + 20s per email, and 1000 + 1500 tokens per email capped at 8000.
    pub fn for_emails(count: u32) -> Self {
        Self {
            timeout: Duration::from_secs(30 + 20 * count as u64),
            max_tokens: (1000 + 1500 * count).min(8000),
        }
    }
}

impl TemplateCatalog {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn builtin() -> &'static TemplateCatalog {
        &BUILTIN
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => {
            let joined = items.iter().filter_map(field_text).collect::<Vec<_>>().join(", ");
            Some(joined).filter(|s| !s.is_empty())
        }
        other => Some(other.to_string()),
    }
}

impl Template {
    /// Fills the template (or one of its sections) from `form_data`.
    pub fn render(&self, section_id: Option<&str>, form_data: &Map<String, Value>) -> Result<String, ValidationError> {
        for (key, value) in form_data {
            if let Some(text) = value.as_str() {
                check_length(key, text, MAX_TEMPLATE_FIELD_LENGTH)?;
            }
        }
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required && form_data.get(&f.id).and_then(field_text).is_none())
            .map(|f| f.label.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::new(format!("Missing required fields: {}", missing.join(", "))));
        }

        let body = match section_id {
            Some(id) => self
                .sections
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.prompt.as_str())
                .ok_or_else(|| ValidationError::new(format!("Unknown section '{}' for template {}", id, self.id)))?,
            None => self.prompt.as_str(),
        };

        let rendered = PLACEHOLDER.replace_all(body, |caps: &regex::Captures| {
            form_data
                .get(&caps[1])
                .and_then(field_text)
                .unwrap_or_else(|| "(not provided)".to_string())
        });
        Ok(rendered.trim().to_string())
    }

    pub fn budget(&self, form_data: &Map<String, Value>) -> GenerationBudget {
        if self.id != EMAIL_SEQUENCE_ID {
            return GenerationBudget::DEFAULT;
        }
        GenerationBudget::for_emails(email_count(form_data))
    }
}

/// `emailCount` from form data, as a number or numeric string, clamped to 1..=10.
pub fn email_count(form_data: &Map<String, Value>) -> u32 {
    let parsed = match form_data.get("emailCount") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.unwrap_or(1).clamp(1, MAX_EMAIL_COUNT as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn builtin_catalog_parses() {
        let catalog = TemplateCatalog::builtin();
        assert!(catalog.get("sales-email").is_some());
        assert!(catalog.get(EMAIL_SEQUENCE_ID).is_some());
        assert_eq!(catalog.get("landing-page").unwrap().sections.len(), 4);
    }

    #[test]
    fn renders_placeholders() {
        let template = TemplateCatalog::builtin().get("sales-email").unwrap();
        let prompt = template
            .render(
                None,
                &form(json!({
                    "productName": "PipeCRM", "targetAudience": "agency owners",
                    "keyBenefits": ["faster follow-up", "no spreadsheets"], "callToAction": "Book a demo"
                })),
            )
            .unwrap();
        assert!(prompt.contains("sales email for PipeCRM aimed at agency owners"));
        assert!(prompt.contains("faster follow-up, no spreadsheets"));
        assert!(prompt.contains("Special offer: (not provided)"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let template = TemplateCatalog::builtin().get("sales-email").unwrap();
        let err = template
            .render(None, &form(json!({ "productName": "PipeCRM", "targetAudience": "  " })))
            .unwrap_err();
        assert!(err.0.contains("Target audience"));
    }

    #[test]
    fn oversized_field_is_rejected() {
        let template = TemplateCatalog::builtin().get("product-description").unwrap();
        let big = "x".repeat(MAX_TEMPLATE_FIELD_LENGTH + 1);
        let result = template.render(None, &form(json!({ "productName": "P", "features": big })));
        assert!(result.is_err());
    }

    #[test]
    fn section_prompts() {
        let template = TemplateCatalog::builtin().get("landing-page").unwrap();
        let data = form(json!({ "productName": "PipeCRM", "targetAudience": "founders", "mainBenefit": "more deals" }));
        assert!(template.render(Some("hero"), &data).unwrap().starts_with("Write the hero section for PipeCRM"));
        assert!(template.render(Some("pricing"), &data).is_err());
    }

    #[test]
    fn email_sequence_budget_scales() {
        let template = TemplateCatalog::builtin().get(EMAIL_SEQUENCE_ID).unwrap();
        let budget = template.budget(&form(json!({ "emailCount": "5" })));
        assert_eq!(budget.timeout, Duration::from_secs(130));
        assert_eq!(budget.max_tokens, 8000);
        assert_eq!(GenerationBudget::for_emails(3).max_tokens, 5500);
        assert_eq!(email_count(&form(json!({ "emailCount": 99 }))), MAX_EMAIL_COUNT);
        let other = TemplateCatalog::builtin().get("sales-email").unwrap();
        assert_eq!(other.budget(&Map::new()), GenerationBudget::DEFAULT);
    }
}
