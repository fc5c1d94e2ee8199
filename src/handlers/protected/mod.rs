// handlers/protected/mod.rs - Protected handlers (authenticated user required)
//
// Every handler here checks, in order: persistence configured (503), caller
// authenticated (401), then its own validation. All reads and writes go through
// user-scoped repositories.

pub mod ai;
pub mod brand_voices;
pub mod documents;
pub mod folders;
pub mod migrate;
pub mod personas;
pub mod projects;
pub mod settings;
pub mod snippets;
pub mod sync;
pub mod usage;

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::{AuthUser, Identity};
use crate::state::AppState;
use crate::validation::{check_length, required_text, ValidationError};

/// `?id=` / `?project_id=` style query shared by the resource routes
#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub id: Option<String>,
    pub project_id: Option<String>,
}

/// Database (503) then identity (401), in that order.
pub(crate) fn caller<'a>(state: &'a AppState, identity: &'a Identity) -> Result<(&'a Database, &'a AuthUser), ApiError> {
    let db = state.database()?;
    let user = identity.require()?;
    Ok((db, user))
}

pub(crate) fn parse_id(field: &str, value: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty());
    let raw = raw.ok_or_else(|| ApiError::bad_request(format!("{} is required", field)))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid {}", field)))
}

pub(crate) fn parse_optional_id(field: &str, value: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_id(field, Some(raw)).map(Some),
        None => Ok(None),
    }
}

/// Keeps only the allow-listed keys of a PUT body.
pub(crate) fn pick(body: &Map<String, Value>, allowed: &[&str]) -> Map<String, Value> {
    body.iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// `id` from a PUT body
pub(crate) fn body_id(body: &Map<String, Value>) -> Result<Uuid, ApiError> {
    parse_id("id", body.get("id").and_then(Value::as_str))
}

pub(crate) fn no_fields() -> ApiError {
    ApiError::bad_request("No valid fields to update")
}

/// Re-validates a required text column present in an update, storing the trimmed value.
pub(crate) fn revalidate_required(changes: &mut Map<String, Value>, field: &str, max: usize) -> Result<(), ValidationError> {
    if let Some(value) = changes.get(field) {
        let text = required_text(field, value.as_str(), max)?;
        changes.insert(field.to_string(), Value::String(text));
    }
    Ok(())
}

/// Nullable text column in an update: null or a string within `max`.
pub(crate) fn revalidate_optional(changes: &Map<String, Value>, field: &str, max: usize) -> Result<(), ValidationError> {
    match changes.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(text)) => check_length(field, text, max),
        Some(_) => Err(ValidationError::new(format!("{} must be a string", field))),
    }
}

/// Array-of-strings column in an update.
pub(crate) fn revalidate_string_list(changes: &Map<String, Value>, field: &str) -> Result<(), ValidationError> {
    match changes.get(field) {
        None => Ok(()),
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err(ValidationError::new(format!("{} must be an array of strings", field))),
    }
}
