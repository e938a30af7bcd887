use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::enums::StatusCategory;
use crate::validation::rules::{validate_hex_color, validate_not_blank};

/// Status ids are administrator-chosen keys such as `in_review`, shared by
/// workflows, board columns and issues.
pub type StatusId = String;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IssueStatus {
    pub id: StatusId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    pub category: StatusCategory,
    #[serde(default)]
    pub position: i32,
}

#[derive(Deserialize, Serialize, Validate, Clone, Debug)]
pub struct CreateStatusRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 64, message = "Status id is too long (max 64 characters)")
    )]
    pub id: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Status name is too long (max 100 characters)")
    )]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_hex_color"))]
    pub color: String,

    pub category: StatusCategory,

    #[validate(range(min = 0, message = "Status position must be non-negative"))]
    pub position: i32,
}

#[derive(Deserialize, Serialize, Default, Clone, Debug)]
pub struct UpdateStatusRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub category: Option<StatusCategory>,
    pub position: Option<i32>,
}

impl From<CreateStatusRequest> for IssueStatus {
    fn from(req: CreateStatusRequest) -> Self {
        IssueStatus {
            id: req.id,
            name: req.name,
            description: req.description,
            color: req.color,
            category: req.category,
            position: req.position,
        }
    }
}
