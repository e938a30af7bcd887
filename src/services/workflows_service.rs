use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::models::workflow::{
        AddStepRequest, CreateTransitionRequest, CreateWorkflowRequest, Transition, Workflow,
        WorkflowStep,
    },
    db::repositories::workflows::WorkflowsRepo,
    error::AppError,
    validation::{
        validate_request,
        workflow::{validate_create_workflow, validate_workflow_graph},
    },
};

const DRAFT_SUFFIX: &str = " (Draft)";

pub struct WorkflowsService;

/// Graph queries. They assume the workflow passed `validate_workflow_graph`.
impl WorkflowsService {
    /// Steps in editor order (top to bottom, then left to right).
    pub fn steps_of(workflow: &Workflow) -> Vec<&WorkflowStep> {
        let mut steps: Vec<&WorkflowStep> = workflow.steps.iter().collect();
        steps.sort_by(|a, b| {
            a.position_y
                .total_cmp(&b.position_y)
                .then_with(|| a.position_x.total_cmp(&b.position_x))
        });
        steps
    }

    pub fn initial_step(workflow: &Workflow) -> Option<&WorkflowStep> {
        workflow.steps.iter().find(|s| s.is_initial)
    }

    pub fn step_for_status<'a>(
        workflow: &'a Workflow,
        status_id: &str,
    ) -> Option<&'a WorkflowStep> {
        workflow.steps.iter().find(|s| s.status_id == status_id)
    }

    /// Outgoing edges in configuration order. A terminal step yields an
    /// empty list.
    pub fn transitions_from(workflow: &Workflow, step_id: Uuid) -> Vec<&Transition> {
        workflow
            .transitions
            .iter()
            .filter(|t| t.from_step_id == step_id)
            .collect()
    }

    pub fn find_transition(
        workflow: &Workflow,
        from_step_id: Uuid,
        to_step_id: Uuid,
    ) -> Option<&Transition> {
        workflow
            .transitions
            .iter()
            .find(|t| t.from_step_id == from_step_id && t.to_step_id == to_step_id)
    }

    /// Every edge between the two steps; more than one when branches are
    /// distinguished by name.
    pub fn find_transitions_between(
        workflow: &Workflow,
        from_step_id: Uuid,
        to_step_id: Uuid,
    ) -> Vec<&Transition> {
        workflow
            .transitions
            .iter()
            .filter(|t| t.from_step_id == from_step_id && t.to_step_id == to_step_id)
            .collect()
    }

    /// Status ids reachable in one move from `status_id`.
    pub fn target_statuses<'a>(workflow: &'a Workflow, status_id: &str) -> Vec<&'a str> {
        let Some(step) = Self::step_for_status(workflow, status_id) else {
            return Vec::new();
        };
        let mut targets: Vec<&str> = Vec::new();
        for t in Self::transitions_from(workflow, step.id) {
            if let Some(to) = workflow.step(t.to_step_id) {
                if !targets.contains(&to.status_id.as_str()) {
                    targets.push(to.status_id.as_str());
                }
            }
        }
        targets
    }
}

/// Registry operations: authoring, cloning and the draft lifecycle.
impl WorkflowsService {
    pub fn create_workflow(
        repo: &mut WorkflowsRepo,
        req: CreateWorkflowRequest,
        steps: Vec<AddStepRequest>,
        now: DateTime<Utc>,
    ) -> Result<Workflow, AppError> {
        validate_request(&req)?;
        validate_create_workflow(&req.name)?;

        let mut workflow = Workflow::new(req, now);
        for step in steps {
            workflow.add_step(step);
        }
        validate_workflow_graph(&workflow)?;

        info!(workflow_id = %workflow.id, name = %workflow.name, "Workflow created");
        Ok(repo.insert_workflow(workflow).clone())
    }

    /// Stores an externally loaded workflow after checking its graph.
    pub fn register(repo: &mut WorkflowsRepo, workflow: Workflow) -> Result<Uuid, AppError> {
        validate_workflow_graph(&workflow)?;
        let id = workflow.id;
        repo.insert_workflow(workflow);
        Ok(id)
    }

    pub fn get_by_id(repo: &WorkflowsRepo, workflow_id: Uuid) -> Result<&Workflow, AppError> {
        repo.find_by_id(workflow_id)
            .ok_or_else(|| AppError::not_found("workflow"))
    }

    pub fn add_step(
        repo: &mut WorkflowsRepo,
        workflow_id: Uuid,
        req: AddStepRequest,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        Self::edit(repo, workflow_id, now, |wf| Ok(wf.add_step(req)))
    }

    pub fn add_transition(
        repo: &mut WorkflowsRepo,
        workflow_id: Uuid,
        req: CreateTransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        validate_request(&req)?;
        Self::edit(repo, workflow_id, now, |wf| Ok(wf.add_transition(req)))
    }

    pub fn remove_transition(
        repo: &mut WorkflowsRepo,
        workflow_id: Uuid,
        transition_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        Self::edit(repo, workflow_id, now, |wf| {
            let before = wf.transitions.len();
            wf.transitions.retain(|t| t.id != transition_id);
            if wf.transitions.len() == before {
                return Err(AppError::not_found("transition"));
            }
            Ok(())
        })
    }

    /// Removes a step together with every transition touching it.
    pub fn remove_step(
        repo: &mut WorkflowsRepo,
        workflow_id: Uuid,
        step_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        Self::edit(repo, workflow_id, now, |wf| {
            if wf.step(step_id).is_none() {
                return Err(AppError::not_found("workflow step"));
            }
            wf.steps.retain(|s| s.id != step_id);
            wf.transitions
                .retain(|t| t.from_step_id != step_id && t.to_step_id != step_id);
            Ok(())
        })
    }

    pub fn delete(repo: &mut WorkflowsRepo, workflow_id: Uuid) -> Result<(), AppError> {
        repo.delete_by_id(workflow_id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("workflow"))
    }

    /// Copies steps and transitions under fresh ids. Rules travel with the
    /// transitions.
    pub fn clone_workflow(
        repo: &mut WorkflowsRepo,
        source_id: Uuid,
        new_name: &str,
        project_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Workflow, AppError> {
        validate_create_workflow(new_name)?;
        let source = Self::get_by_id(repo, source_id)?;

        let mut copy = copy_graph(source, now);
        copy.name = new_name.to_string();
        copy.project_id = project_id;
        copy.is_default = false;

        validate_workflow_graph(&copy)?;
        info!(source_id = %source_id, workflow_id = %copy.id, "Workflow cloned");
        Ok(repo.insert_workflow(copy).clone())
    }

    pub fn get_draft(repo: &WorkflowsRepo, workflow_id: Uuid) -> Option<&Workflow> {
        repo.find_draft_of(workflow_id)
    }

    pub fn create_draft(
        repo: &mut WorkflowsRepo,
        source_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Workflow, AppError> {
        if repo.find_draft_of(source_id).is_some() {
            return Err(AppError::conflict_with_code(
                "A draft already exists for this workflow",
                None,
                "draft_exists",
            ));
        }
        let source = Self::get_by_id(repo, source_id)?;
        if source.is_draft {
            return Err(AppError::validation("Cannot draft a draft workflow"));
        }

        let mut draft = copy_graph(source, now);
        draft.name = format!("{}{}", source.name, DRAFT_SUFFIX);
        draft.project_id = source.project_id;
        draft.is_default = false;
        draft.is_draft = true;
        draft.draft_of = Some(source_id);

        info!(source_id = %source_id, draft_id = %draft.id, "Workflow draft created");
        Ok(repo.insert_workflow(draft).clone())
    }

    /// Replaces the parent's graph with the draft's and deletes the draft.
    pub fn publish_draft(
        repo: &mut WorkflowsRepo,
        draft_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Workflow, AppError> {
        let draft = repo
            .find_by_id(draft_id)
            .filter(|w| w.is_draft)
            .ok_or_else(|| AppError::not_found("draft workflow"))?;
        let parent_id = draft
            .draft_of
            .ok_or_else(|| AppError::validation("This draft has no parent workflow"))?;
        validate_workflow_graph(draft)?;

        let mut replacement = copy_graph(draft, now);
        let name = draft
            .name
            .strip_suffix(DRAFT_SUFFIX)
            .unwrap_or(&draft.name)
            .to_string();
        let description = draft.description.clone();

        let parent = repo
            .find_by_id_mut(parent_id)
            .ok_or_else(|| AppError::not_found("workflow"))?;
        retarget(&mut replacement, parent.id);
        parent.steps = replacement.steps;
        parent.transitions = replacement.transitions;
        parent.name = name;
        parent.description = description;
        parent.published_at = Some(now);
        parent.updated_at = now;
        let published = parent.clone();

        repo.delete_by_id(draft_id);
        info!(workflow_id = %parent_id, draft_id = %draft_id, "Workflow draft published");
        Ok(published)
    }

    pub fn discard_draft(repo: &mut WorkflowsRepo, draft_id: Uuid) -> Result<(), AppError> {
        let draft = repo
            .find_by_id(draft_id)
            .ok_or_else(|| AppError::not_found("draft"))?;
        if !draft.is_draft {
            return Err(AppError::validation("Cannot discard a non-draft workflow"));
        }
        repo.delete_by_id(draft_id);
        info!(draft_id = %draft_id, "Workflow draft discarded");
        Ok(())
    }

    /// Applies an edit and keeps it only if the graph is still valid.
    fn edit<T>(
        repo: &mut WorkflowsRepo,
        workflow_id: Uuid,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Workflow) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let workflow = repo
            .find_by_id_mut(workflow_id)
            .ok_or_else(|| AppError::not_found("workflow"))?;
        let mut edited = workflow.clone();
        let out = f(&mut edited)?;
        validate_workflow_graph(&edited)?;
        edited.updated_at = now;
        *workflow = edited;
        Ok(out)
    }
}

/// Deep copy with new workflow, step and transition ids. Transitions whose
/// endpoints cannot be remapped are dropped.
fn copy_graph(source: &Workflow, now: DateTime<Utc>) -> Workflow {
    let new_id = Uuid::new_v4();
    let mut step_ids: HashMap<Uuid, Uuid> = HashMap::new();

    let steps = source
        .steps
        .iter()
        .map(|s| {
            let id = Uuid::new_v4();
            step_ids.insert(s.id, id);
            WorkflowStep {
                id,
                workflow_id: new_id,
                ..s.clone()
            }
        })
        .collect();

    let transitions = source
        .transitions
        .iter()
        .filter_map(|t| {
            let from = *step_ids.get(&t.from_step_id)?;
            let to = *step_ids.get(&t.to_step_id)?;
            Some(Transition {
                id: Uuid::new_v4(),
                workflow_id: new_id,
                from_step_id: from,
                to_step_id: to,
                ..t.clone()
            })
        })
        .collect();

    Workflow {
        id: new_id,
        name: source.name.clone(),
        description: source.description.clone(),
        project_id: source.project_id,
        is_default: source.is_default,
        is_active: true,
        is_draft: false,
        draft_of: None,
        published_at: None,
        steps,
        transitions,
        created_at: now,
        updated_at: now,
    }
}

fn retarget(workflow: &mut Workflow, workflow_id: Uuid) {
    workflow.id = workflow_id;
    for step in &mut workflow.steps {
        step.workflow_id = workflow_id;
    }
    for transition in &mut workflow.transitions {
        transition.workflow_id = workflow_id;
    }
}
