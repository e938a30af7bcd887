use crate::db::models::UpdateStatusRequest;
use crate::error::AppError;
use crate::validation::rules::validate_hex_color;

pub fn validate_update_status(changes: &UpdateStatusRequest) -> Result<(), AppError> {
    if changes.name.is_none()
        && changes.description.is_none()
        && changes.color.is_none()
        && changes.category.is_none()
        && changes.position.is_none()
    {
        return Err(AppError::validation("No update data provided"));
    }
    if let Some(name) = &changes.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Status name cannot be empty"));
        }
    }
    if let Some(color) = &changes.color {
        if validate_hex_color(color).is_err() {
            return Err(AppError::validation("Color must be hex like #RRGGBB"));
        }
    }
    if let Some(position) = changes.position {
        if position < 0 {
            return Err(AppError::validation("Status position must be non-negative"));
        }
    }
    Ok(())
}
