pub mod board;
pub mod status;
pub mod workflow;

use validator::Validate;

use crate::error::AppError;

/// Runs derived `validator` rules and folds every field error into a single
/// `AppError::Validation`.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate().map_err(|errors| {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|m| format!("{}: {}", field, m))
                        .unwrap_or_else(|| format!("{}: {}", field, error.code))
                })
            })
            .collect();

        details.sort();

        AppError::validation(format!(
            "Validation failed with {} errors: {}",
            details.len(),
            details.join("; ")
        ))
    })
}

/// Shared field rules
pub mod rules {
    use validator::ValidationError;

    pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }

    /// `#RRGGBB`
    pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
        if !color.starts_with('#')
            || color.len() != 7
            || !color.chars().skip(1).all(|c| c.is_ascii_hexdigit())
        {
            return Err(ValidationError::new("invalid_hex_color"));
        }
        Ok(())
    }
}
