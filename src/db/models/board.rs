use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::enums::{BoardKind, StatusCategory};
use crate::db::models::status::StatusId;
use crate::validation::rules::validate_not_blank;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColumnStatus {
    pub id: StatusId,
    pub name: String,
    #[serde(default)]
    pub category: Option<StatusCategory>,
}

/// A named bucket of one or more statuses. A column without `status_ids`
/// holds the single status whose id equals the column id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoardColumn {
    pub id: String,
    pub name: String,
    pub status_category: StatusCategory,
    #[serde(default)]
    pub status_ids: Vec<StatusId>,
    #[serde(default)]
    pub statuses: Vec<ColumnStatus>,
    #[serde(default)]
    pub min_issues: Option<u32>,
    #[serde(default)]
    pub max_issues: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub kind: BoardKind,
    pub workflow_id: Uuid,
    #[serde(default)]
    pub project_lead_id: Option<Uuid>,
    pub columns: Vec<BoardColumn>,
}

#[derive(Deserialize, Serialize, Validate, Clone, Debug)]
#[validate(schema(function = "validate_column_limits"))]
pub struct BoardColumnRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub id: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    pub status_category: StatusCategory,
    #[serde(default)]
    pub status_ids: Vec<StatusId>,
    pub min_issues: Option<u32>,
    #[validate(range(min = 1, message = "max_issues must be at least 1"))]
    pub max_issues: Option<u32>,
}

fn validate_column_limits(req: &BoardColumnRequest) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (req.min_issues, req.max_issues) {
        if min > max {
            return Err(ValidationError::new("min_issues_above_max_issues"));
        }
    }
    Ok(())
}

impl From<BoardColumnRequest> for BoardColumn {
    fn from(req: BoardColumnRequest) -> Self {
        BoardColumn {
            id: req.id,
            name: req.name,
            status_category: req.status_category,
            status_ids: req.status_ids,
            statuses: Vec::new(),
            min_issues: req.min_issues,
            max_issues: req.max_issues,
        }
    }
}

impl BoardColumn {
    fn template(id: &str, name: &str, category: StatusCategory, max_issues: Option<u32>) -> Self {
        BoardColumn {
            id: id.to_string(),
            name: name.to_string(),
            status_category: category,
            status_ids: Vec::new(),
            statuses: Vec::new(),
            min_issues: None,
            max_issues,
        }
    }

    pub fn scrum_defaults() -> Vec<Self> {
        vec![
            Self::template("todo", "To Do", StatusCategory::Todo, None),
            Self::template("in_progress", "In Progress", StatusCategory::InProgress, Some(5)),
            Self::template("done", "Done", StatusCategory::Done, None),
        ]
    }

    pub fn kanban_defaults() -> Vec<Self> {
        vec![
            Self::template("backlog", "Backlog", StatusCategory::Todo, None),
            Self::template("selected", "Selected for Development", StatusCategory::Todo, Some(10)),
            Self::template("in_progress", "In Progress", StatusCategory::InProgress, Some(5)),
            Self::template("review", "In Review", StatusCategory::InProgress, Some(3)),
            Self::template("done", "Done", StatusCategory::Done, None),
        ]
    }

    pub fn defaults_for(kind: BoardKind) -> Vec<Self> {
        match kind {
            BoardKind::Kanban => Self::kanban_defaults(),
            BoardKind::Scrum | BoardKind::Basic => Self::scrum_defaults(),
        }
    }
}

impl Board {
    pub fn column(&self, column_id: &str) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.id == column_id)
    }
}
