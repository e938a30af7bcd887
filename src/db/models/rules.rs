//! Transition rules.
//!
//! Each rule kind is a closed set: an unknown `type` tag in stored JSON is a
//! deserialization error rather than a silently ignored rule.

use serde::{Deserialize, Serialize};

/// Decides whether a transition is offered to the acting user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    OnlyAssignee,
    OnlyReporter,
    UserInGroup { group: String },
    UserInRole { role: String },
    PermissionCheck { permission: String },
}

/// Checked against issue fields when the transition is attempted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Validator {
    FieldRequired {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    FieldNotEmpty {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    SubtasksClosed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ResolutionSet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    CustomFieldValue {
        field: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Validator {
    /// The configured failure message, if the administrator wrote one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Validator::FieldRequired { message, .. }
            | Validator::FieldNotEmpty { message, .. }
            | Validator::SubtasksClosed { message }
            | Validator::ResolutionSet { message }
            | Validator::CustomFieldValue { message, .. } => message.as_deref(),
        }
    }
}

/// Side effect run after a transition has been committed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostFunction {
    SetField {
        field: String,
        value: serde_json::Value,
    },
    ClearField {
        field: String,
    },
    AssignToLead,
    AssignToReporter,
    AddComment {
        comment: String,
    },
    SendNotification {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl PostFunction {
    pub fn kind(&self) -> &'static str {
        match self {
            PostFunction::SetField { .. } => "set_field",
            PostFunction::ClearField { .. } => "clear_field",
            PostFunction::AssignToLead => "assign_to_lead",
            PostFunction::AssignToReporter => "assign_to_reporter",
            PostFunction::AddComment { .. } => "add_comment",
            PostFunction::SendNotification { .. } => "send_notification",
        }
    }
}
