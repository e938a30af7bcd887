use std::collections::HashSet;

use crate::db::models::Workflow;
use crate::error::AppError;

pub fn validate_create_workflow(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Workflow name is required"));
    }
    Ok(())
}

/// Configuration-time checks for a workflow graph. Queries against the graph
/// assume these hold and do not re-check them.
pub fn validate_workflow_graph(workflow: &Workflow) -> Result<(), AppError> {
    validate_create_workflow(&workflow.name)?;

    if workflow.steps.is_empty() {
        return Err(AppError::validation(format!(
            "Workflow '{}' must contain at least one step",
            workflow.name
        )));
    }

    let initial_count = workflow.steps.iter().filter(|s| s.is_initial).count();
    if initial_count != 1 {
        return Err(AppError::validation(format!(
            "Workflow '{}' must have exactly one initial step (found {})",
            workflow.name, initial_count
        )));
    }

    let mut step_ids = HashSet::new();
    let mut status_ids = HashSet::new();
    for step in &workflow.steps {
        if step.workflow_id != workflow.id {
            return Err(AppError::validation(format!(
                "Step {} belongs to another workflow",
                step.id
            )));
        }
        if !step_ids.insert(step.id) {
            return Err(AppError::validation(format!("Duplicate step id {}", step.id)));
        }
        if !status_ids.insert(step.status_id.as_str()) {
            return Err(AppError::validation(format!(
                "Status '{}' appears in more than one step",
                step.status_id
            )));
        }
    }

    let mut edges = HashSet::new();
    for transition in &workflow.transitions {
        if transition.workflow_id != workflow.id {
            return Err(AppError::validation(format!(
                "Transition '{}' belongs to another workflow",
                transition.name
            )));
        }
        if transition.name.trim().is_empty() {
            return Err(AppError::validation("Transition name is required"));
        }
        if !step_ids.contains(&transition.from_step_id)
            || !step_ids.contains(&transition.to_step_id)
        {
            return Err(AppError::validation(format!(
                "Transition '{}' references a step outside workflow '{}'",
                transition.name, workflow.name
            )));
        }
        // Parallel edges between the same steps are told apart by name.
        let key = (
            transition.from_step_id,
            transition.to_step_id,
            transition.name.trim().to_lowercase(),
        );
        if !edges.insert(key) {
            return Err(AppError::validation(format!(
                "Duplicate transition '{}' between the same steps",
                transition.name
            )));
        }
    }

    Ok(())
}
