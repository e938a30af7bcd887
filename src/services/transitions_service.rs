//! Transition permission checks.
//!
//! Everything here borrows immutably: evaluating conditions and validators
//! never changes the issue, the actor or the workflow.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::enums::StatusCategory,
    db::models::{Condition, Issue, Transition, Validator, Workflow},
    services::{context::Actor, workflows_service::WorkflowsService},
};

pub const NO_SUCH_TRANSITION: &str = "no such transition";

/// Why a move was refused.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    /// No edge joins the two statuses. Points at stale UI or bad
    /// configuration rather than a business rule.
    NoSuchTransition { from_status: String, to_status: String },
    Condition { reason: String },
    Validator { reason: String },
}

impl Denial {
    pub fn reason(&self) -> String {
        match self {
            Denial::NoSuchTransition { .. } => NO_SUCH_TRANSITION.to_string(),
            Denial::Condition { reason } | Denial::Validator { reason } => reason.clone(),
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Denial::NoSuchTransition { .. })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TransitionDecision {
    Allowed { transition_id: Uuid },
    Denied(Denial),
}

impl TransitionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TransitionDecision::Allowed { .. })
    }
}

pub struct TransitionsService;

impl TransitionsService {
    /// Full attempt-time check for moving `issue` from `from_status` to
    /// `to_status`. With several edges between the two steps the first one
    /// that passes wins; if none pass the first edge's denial is returned.
    pub fn can_transition(
        workflow: &Workflow,
        issue: &Issue,
        from_status: &str,
        to_status: &str,
        actor: &Actor,
    ) -> TransitionDecision {
        let no_such = || {
            TransitionDecision::Denied(Denial::NoSuchTransition {
                from_status: from_status.to_string(),
                to_status: to_status.to_string(),
            })
        };

        let (Some(from), Some(to)) = (
            WorkflowsService::step_for_status(workflow, from_status),
            WorkflowsService::step_for_status(workflow, to_status),
        ) else {
            return no_such();
        };

        let candidates = WorkflowsService::find_transitions_between(workflow, from.id, to.id);
        let mut first_denial = None;
        for transition in candidates {
            match Self::check_transition(transition, issue, actor) {
                Ok(()) => {
                    return TransitionDecision::Allowed {
                        transition_id: transition.id,
                    };
                }
                Err(denial) => {
                    first_denial.get_or_insert(denial);
                }
            }
        }

        match first_denial {
            Some(denial) => TransitionDecision::Denied(denial),
            None => no_such(),
        }
    }

    /// Attempt-time check for one specific edge: conditions first (they may
    /// have gone stale since the transition was offered), then validators.
    pub fn check_transition(
        transition: &Transition,
        issue: &Issue,
        actor: &Actor,
    ) -> Result<(), Denial> {
        Self::check_conditions(transition, issue, actor)?;
        for validator in &transition.validators {
            if let Err(reason) = evaluate_validator(validator, issue) {
                return Err(Denial::Validator { reason });
            }
        }
        Ok(())
    }

    pub fn check_conditions(
        transition: &Transition,
        issue: &Issue,
        actor: &Actor,
    ) -> Result<(), Denial> {
        for condition in &transition.conditions {
            if let Err(reason) = evaluate_condition(condition, issue, actor) {
                return Err(Denial::Condition { reason });
            }
        }
        Ok(())
    }

    /// Outgoing transitions of the issue's current step whose conditions
    /// pass for `actor`, in configuration order. Validators are not run.
    pub fn offered_transitions<'a>(
        workflow: &'a Workflow,
        issue: &Issue,
        actor: &Actor,
    ) -> Vec<&'a Transition> {
        let Some(step) = WorkflowsService::step_for_status(workflow, &issue.status_id) else {
            return Vec::new();
        };
        WorkflowsService::transitions_from(workflow, step.id)
            .into_iter()
            .filter(|t| Self::check_conditions(t, issue, actor).is_ok())
            .collect()
    }

    /// Status ids the issue may be dropped on, derived from the offered
    /// transitions.
    pub fn offered_target_statuses<'a>(
        workflow: &'a Workflow,
        issue: &Issue,
        actor: &Actor,
    ) -> Vec<&'a str> {
        let mut targets: Vec<&str> = Vec::new();
        for t in Self::offered_transitions(workflow, issue, actor) {
            if let Some(step) = workflow.step(t.to_step_id) {
                if !targets.contains(&step.status_id.as_str()) {
                    targets.push(step.status_id.as_str());
                }
            }
        }
        targets
    }
}

fn evaluate_condition(condition: &Condition, issue: &Issue, actor: &Actor) -> Result<(), String> {
    match condition {
        Condition::OnlyAssignee => {
            if issue.assignee_id() == Some(actor.user_id) {
                Ok(())
            } else {
                Err("Only the assignee can perform this transition".to_string())
            }
        }
        Condition::OnlyReporter => {
            if issue.reporter_id == actor.user_id {
                Ok(())
            } else {
                Err("Only the reporter can perform this transition".to_string())
            }
        }
        Condition::UserInGroup { group } => {
            if actor.groups.contains(group) {
                Ok(())
            } else {
                Err(format!("You must be in group '{}' to perform this transition", group))
            }
        }
        Condition::UserInRole { role } => {
            if actor.roles.contains(role) {
                Ok(())
            } else {
                Err(format!("You need the '{}' role to perform this transition", role))
            }
        }
        Condition::PermissionCheck { permission } => {
            if actor.permissions.contains(permission) {
                Ok(())
            } else {
                Err(format!("Missing permission '{}'", permission))
            }
        }
    }
}

/// Fails closed: a field the issue does not define is a failure, not a pass.
fn evaluate_validator(validator: &Validator, issue: &Issue) -> Result<(), String> {
    let fail = |default: String| Err(validator.message().map(str::to_string).unwrap_or(default));

    match validator {
        Validator::FieldRequired { field, .. } => match issue.field_value(field) {
            None => fail(format!("Field '{}' is not defined for this issue", field)),
            Some(Value::Null) => fail(format!("Field '{}' is required", field)),
            Some(_) => Ok(()),
        },
        Validator::FieldNotEmpty { field, .. } => match issue.field_value(field) {
            None => fail(format!("Field '{}' is not defined for this issue", field)),
            Some(value) if is_empty_value(&value) => {
                fail(format!("Field '{}' cannot be empty", field))
            }
            Some(_) => Ok(()),
        },
        Validator::SubtasksClosed { .. } => {
            let open = issue
                .subtasks
                .iter()
                .filter(|s| s.status_category != StatusCategory::Done)
                .count();
            if open == 0 {
                Ok(())
            } else {
                fail(format!("{} sub-task(s) must be closed first", open))
            }
        }
        Validator::ResolutionSet { .. } => match issue.resolution.as_deref() {
            Some(r) if !r.trim().is_empty() => Ok(()),
            _ => fail("Resolution must be set".to_string()),
        },
        Validator::CustomFieldValue { field, value, .. } => match issue.field_value(field) {
            None => fail(format!("Field '{}' is not defined for this issue", field)),
            Some(actual) if value_matches(&actual, value) => Ok(()),
            Some(_) => fail(format!("Field '{}' must be '{}'", field, value)),
        },
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn value_matches(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::String(s) => s == expected,
        Value::Null => false,
        other => other.to_string() == expected,
    }
}
