use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        field: Option<String>,
        code: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict_with_code(
        message: impl Into<String>,
        field: Option<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            message: message.into(),
            field,
            code: Some(code.into()),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Stable short code, used in event payloads and the replay output.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Store(_) => "store_error",
        }
    }
}

/// Terminal failure of a board move. Every variant is recovered inside the
/// coordinator and handed back in the move report.
#[derive(Error, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveError {
    /// Unknown column, issue or transition, or no edge for the pair.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Condition denied: {reason}")]
    ConditionDenied { reason: String },

    #[error("Validator denied: {reason}")]
    ValidatorDenied { reason: String },

    #[error("External failure: {message}")]
    ExternalFailure { message: String },

    #[error("Issue {issue_id} already has a move in flight")]
    Busy { issue_id: Uuid },
}

impl MoveError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MoveError::Configuration { .. } => "configuration_error",
            MoveError::ConditionDenied { .. } => "condition_denied",
            MoveError::ValidatorDenied { .. } => "validator_denied",
            MoveError::ExternalFailure { .. } => "external_failure",
            MoveError::Busy { .. } => "busy",
        }
    }

    /// Text for the toast or banner shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            MoveError::Configuration { .. } => {
                "This move is not available on this board. Refresh the board and try again."
                    .to_string()
            }
            MoveError::ConditionDenied { reason } | MoveError::ValidatorDenied { reason } => {
                reason.clone()
            }
            MoveError::ExternalFailure { .. } => {
                "The issue could not be updated. Try again, or contact support if it keeps failing."
                    .to_string()
            }
            MoveError::Busy { .. } => {
                "This issue is still being moved. Wait for the current move to finish.".to_string()
            }
        }
    }
}
