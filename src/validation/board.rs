use std::collections::HashSet;

use crate::db::models::Board;
use crate::error::AppError;

/// Checks a board's column layout: unique column ids, sane WIP limits, and
/// no status claimed by two columns.
pub fn validate_board_columns(board: &Board) -> Result<(), AppError> {
    if board.columns.is_empty() {
        return Err(AppError::validation("Board must have at least one column"));
    }

    let mut column_ids = HashSet::new();
    let mut claimed = HashSet::new();
    for column in &board.columns {
        if column.name.trim().is_empty() {
            return Err(AppError::validation("Column name is required"));
        }
        if !column_ids.insert(column.id.as_str()) {
            return Err(AppError::validation(format!(
                "Duplicate column id '{}'",
                column.id
            )));
        }
        if column.max_issues == Some(0) {
            return Err(AppError::validation(format!(
                "Column '{}' max_issues must be at least 1",
                column.name
            )));
        }
        if let (Some(min), Some(max)) = (column.min_issues, column.max_issues) {
            if min > max {
                return Err(AppError::validation(format!(
                    "Column '{}' min_issues cannot exceed max_issues",
                    column.name
                )));
            }
        }

        let statuses: Vec<&str> = if column.status_ids.is_empty() {
            vec![column.id.as_str()]
        } else {
            column.status_ids.iter().map(String::as_str).collect()
        };
        for status in statuses {
            if !claimed.insert(status) {
                return Err(AppError::validation(format!(
                    "Status '{}' is mapped to more than one column",
                    status
                )));
            }
        }
    }
    Ok(())
}
