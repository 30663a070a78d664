//! Request validation utilities

use crate::api::error::{ApiError, ApiResult};

/// Validate that a required string field is not blank
pub fn validate_not_empty(value: &str, field_name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{} cannot be empty", field_name)));
    }
    Ok(())
}

/// Validate string length constraints, counted in characters
pub fn validate_string_length(value: &str, field_name: &str, min: usize, max: usize) -> ApiResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::ValidationError(format!(
            "{} must be between {} and {} characters",
            field_name, min, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty_valid() {
        assert!(validate_not_empty("summarize", "query").is_ok());
    }

    #[test]
    fn test_validate_not_empty_blank() {
        assert!(validate_not_empty("", "query").is_err());
        assert!(validate_not_empty("  \n", "query").is_err());
    }

    #[test]
    fn test_validate_string_length() {
        assert!(validate_string_length("hello", "query", 1, 10).is_ok());
        assert!(validate_string_length("hi", "query", 5, 10).is_err());
        assert!(validate_string_length("very long string", "query", 1, 5).is_err());
        // multibyte characters count once
        assert!(validate_string_length("ééé", "query", 1, 3).is_ok());
    }
}
