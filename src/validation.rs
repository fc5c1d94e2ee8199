use thiserror::Error;

/// Human-readable rejection of a request field; surfaces as a 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Name limit shared by projects, folders, personas, brand voices and snippets
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_BASE_TITLE_LENGTH: usize = 200;
pub const MAX_PROFILE_FIELD_LENGTH: usize = 5_000;
pub const MAX_SNIPPET_CONTENT_LENGTH: usize = 50_000;
pub const MAX_SNIPPET_DESCRIPTION_LENGTH: usize = 500;
/// Primary text of an AI request
pub const MAX_AI_TEXT_LENGTH: usize = 10_000;
/// Each template form field
pub const MAX_TEMPLATE_FIELD_LENGTH: usize = 5_000;

/// Present, non-blank after trimming, and at most `max` characters. Returns the trimmed value.
pub fn required_text(field: &str, value: Option<&str>, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ValidationError(format!("{} is required", field)));
    }
    check_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Absent is fine; present values must fit in `max` characters.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) => check_length(field, v, max),
        None => Ok(()),
    }
}

pub fn check_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length > max {
        return Err(ValidationError(format!(
            "{} must be {} characters or less (got {})",
            field, max, length
        )));
    }
    Ok(())
}

/// Value must be one of `allowed`.
pub fn one_of<'a>(field: &str, value: Option<&str>, allowed: &[&'a str]) -> Result<&'a str, ValidationError> {
    let value = value.map(str::trim).unwrap_or_default();
    allowed
        .iter()
        .copied()
        .find(|candidate| *candidate == value)
        .ok_or_else(|| ValidationError(format!("{} must be one of: {}", field, allowed.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_maximum() {
        let name = "a".repeat(MAX_NAME_LENGTH);
        assert_eq!(required_text("name", Some(&name), MAX_NAME_LENGTH).unwrap(), name);
    }

    #[test]
    fn rejects_one_over_maximum() {
        let name = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(required_text("name", Some(&name), MAX_NAME_LENGTH).is_err());
    }

    #[test]
    fn whitespace_only_is_empty() {
        let err = required_text("name", Some("  \t\n "), MAX_NAME_LENGTH).unwrap_err();
        assert_eq!(err.0, "name is required");
        assert!(required_text("name", None, MAX_NAME_LENGTH).is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let name = "é".repeat(MAX_NAME_LENGTH);
        assert!(required_text("name", Some(&name), MAX_NAME_LENGTH).is_ok());
    }

    #[test]
    fn enum_membership() {
        assert_eq!(one_of("tone", Some("casual"), &["professional", "casual"]).unwrap(), "casual");
        assert!(one_of("tone", Some("angry"), &["professional", "casual"]).is_err());
    }
}
