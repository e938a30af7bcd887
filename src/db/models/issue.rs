use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::enums::{IssueType, StatusCategory};
use crate::db::models::status::StatusId;

/// Issue fields that board placement and transition rules read.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Issue {
    pub id: Uuid,
    pub issue_key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub status_id: StatusId,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    pub reporter_id: Uuid,
    #[serde(default)]
    pub story_points: Option<f64>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskRef>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Assignee {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubtaskRef {
    pub id: Uuid,
    pub status_category: StatusCategory,
}

/// Input for creating an issue on a board; the status comes from the
/// workflow's initial step.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct NewIssue {
    pub issue_key: String,
    pub summary: String,
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub assignee: Option<Assignee>,
    pub reporter_id: Uuid,
    pub story_points: Option<f64>,
}

impl Issue {
    pub fn from_new(new_issue: NewIssue, status_id: StatusId, now: DateTime<Utc>) -> Self {
        Issue {
            id: Uuid::new_v4(),
            issue_key: new_issue.issue_key,
            summary: new_issue.summary,
            description: new_issue.description,
            issue_type: new_issue.issue_type,
            status_id,
            assignee: new_issue.assignee,
            reporter_id: new_issue.reporter_id,
            story_points: new_issue.story_points,
            resolution: None,
            subtasks: Vec::new(),
            custom_fields: BTreeMap::new(),
            updated_at: now,
        }
    }

    pub fn assignee_id(&self) -> Option<Uuid> {
        self.assignee.as_ref().map(|a| a.id)
    }

    /// Reads a field as JSON. `None` means the field is not defined for this
    /// issue at all; `Some(Value::Null)` means defined but unset.
    pub fn field_value(&self, field: &str) -> Option<serde_json::Value> {
        use serde_json::Value;

        match field {
            "summary" => Some(Value::String(self.summary.clone())),
            "description" => Some(self.description.clone().map_or(Value::Null, Value::String)),
            "assignee" => Some(
                self.assignee
                    .as_ref()
                    .map_or(Value::Null, |a| Value::String(a.id.to_string())),
            ),
            "story_points" => Some(
                self.story_points
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number),
            ),
            "resolution" => Some(self.resolution.clone().map_or(Value::Null, Value::String)),
            "status" => Some(Value::String(self.status_id.clone())),
            other => self.custom_fields.get(other).cloned(),
        }
    }
}
