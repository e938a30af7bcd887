use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::models::rules::{Condition, PostFunction, Validator};
use crate::db::models::status::StatusId;
use crate::validation::rules::validate_not_blank;

/// A workflow together with its steps and transitions, loaded wholesale.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub draft_of: Option<Uuid>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WorkflowStep {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status_id: StatusId,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default)]
    pub is_initial: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Transition {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub from_step_id: Uuid,
    pub to_step_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub validators: Vec<Validator>,
    #[serde(default)]
    pub post_functions: Vec<PostFunction>,
}

#[derive(Deserialize, Serialize, Validate, Clone, Debug)]
pub struct CreateWorkflowRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 255, message = "Workflow name is too long (max 255 characters)")
    )]
    pub name: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_default: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AddStepRequest {
    pub status_id: StatusId,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub is_initial: Option<bool>,
}

#[derive(Deserialize, Serialize, Validate, Clone, Debug)]
pub struct CreateTransitionRequest {
    pub from_step_id: Uuid,
    pub to_step_id: Uuid,
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 255, message = "Transition name is too long (max 255 characters)")
    )]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub validators: Vec<Validator>,
    #[serde(default)]
    pub post_functions: Vec<PostFunction>,
}

impl Workflow {
    /// An empty, active, non-draft workflow. Steps must be added before it
    /// passes validation.
    pub fn new(req: CreateWorkflowRequest, now: DateTime<Utc>) -> Self {
        Workflow {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            project_id: req.project_id,
            is_default: req.is_default.unwrap_or(false),
            is_active: true,
            is_draft: false,
            draft_of: None,
            published_at: None,
            steps: Vec::new(),
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, step_id: Uuid) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn transition(&self, transition_id: Uuid) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == transition_id)
    }

    pub fn add_step(&mut self, req: AddStepRequest) -> Uuid {
        let id = Uuid::new_v4();
        self.steps.push(WorkflowStep {
            id,
            workflow_id: self.id,
            status_id: req.status_id,
            position_x: req.position_x.unwrap_or_default(),
            position_y: req.position_y.unwrap_or_default(),
            is_initial: req.is_initial.unwrap_or(false),
        });
        id
    }

    pub fn add_transition(&mut self, req: CreateTransitionRequest) -> Uuid {
        let id = Uuid::new_v4();
        self.transitions.push(Transition {
            id,
            workflow_id: self.id,
            from_step_id: req.from_step_id,
            to_step_id: req.to_step_id,
            name: req.name,
            description: req.description,
            conditions: req.conditions,
            validators: req.validators,
            post_functions: req.post_functions,
        });
        id
    }
}
