use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use workflow_board::{
    BoardCoordinator, Collaborators,
    config::{BoardConfig, MovePolicy},
    db::enums::{BoardKind, IssueType, StatusCategory},
    db::models::{
        AddStepRequest, Assignee, Board, BoardColumn, CreateTransitionRequest,
        CreateWorkflowRequest, Issue, NewIssue, Validator, Workflow,
    },
    db::repositories::{InMemoryHistoryLog, InMemoryIssueStore},
    events::RecordingNotifier,
    services::context::Actor,
};

pub fn step(status: &str, initial: bool) -> AddStepRequest {
    AddStepRequest {
        status_id: status.to_string(),
        position_x: None,
        position_y: None,
        is_initial: Some(initial),
    }
}

pub fn workflow_request(name: &str) -> CreateWorkflowRequest {
    CreateWorkflowRequest {
        name: name.to_string(),
        description: None,
        project_id: None,
        is_default: None,
    }
}

/// To-Do (initial) -> In-Progress -> Done, with "resolution must be set" on
/// the way to Done.
pub fn software_workflow() -> Workflow {
    let mut wf = Workflow::new(workflow_request("Software"), Utc::now());
    let todo = wf.add_step(step("todo", true));
    let in_progress = wf.add_step(step("in_progress", false));
    let done = wf.add_step(step("done", false));

    wf.add_transition(CreateTransitionRequest {
        from_step_id: todo,
        to_step_id: in_progress,
        name: "Start".to_string(),
        description: None,
        conditions: vec![],
        validators: vec![],
        post_functions: vec![],
    });
    wf.add_transition(CreateTransitionRequest {
        from_step_id: in_progress,
        to_step_id: done,
        name: "Resolve".to_string(),
        description: None,
        conditions: vec![],
        validators: vec![Validator::ResolutionSet {
            message: Some("Resolution must be set".to_string()),
        }],
        post_functions: vec![],
    });
    wf
}

pub fn column(
    id: &str,
    category: StatusCategory,
    status_ids: &[&str],
    max: Option<u32>,
) -> BoardColumn {
    BoardColumn {
        id: id.to_string(),
        name: id.to_string(),
        status_category: category,
        status_ids: status_ids.iter().map(|s| s.to_string()).collect(),
        statuses: vec![],
        min_issues: None,
        max_issues: max,
    }
}

pub fn board_for(workflow: &Workflow, columns: Vec<BoardColumn>) -> Board {
    Board {
        id: Uuid::new_v4(),
        name: "Team board".to_string(),
        kind: BoardKind::Scrum,
        workflow_id: workflow.id,
        project_lead_id: None,
        columns,
    }
}

pub fn issue(key: &str, status: &str) -> Issue {
    Issue::from_new(
        NewIssue {
            issue_key: key.to_string(),
            summary: format!("Work item {}", key),
            description: None,
            issue_type: IssueType::Task,
            assignee: Some(Assignee {
                id: Uuid::new_v4(),
                display_name: "Ada".to_string(),
            }),
            reporter_id: Uuid::new_v4(),
            story_points: Some(1.0),
        },
        status.to_string(),
        Utc::now(),
    )
}

pub struct Harness {
    pub coordinator: BoardCoordinator,
    pub store: Arc<InMemoryIssueStore>,
    pub history: Arc<InMemoryHistoryLog>,
    pub actor: Actor,
}

pub fn harness(columns: Vec<BoardColumn>, issues: Vec<Issue>, policy: MovePolicy) -> Harness {
    let workflow = software_workflow();
    let board = board_for(&workflow, columns);
    let store = Arc::new(InMemoryIssueStore::new(issues.clone()));
    let history = Arc::new(InMemoryHistoryLog::new());
    let collaborators = Collaborators {
        issues: store.clone(),
        history: history.clone(),
        notifier: Arc::new(RecordingNotifier::new()),
    };
    let config = BoardConfig {
        move_policy: policy,
        ..Default::default()
    };

    Harness {
        coordinator: BoardCoordinator::new(board, workflow, issues, collaborators, config)
            .expect("valid board"),
        store,
        history,
        actor: Actor::new(Uuid::new_v4(), "Grace"),
    }
}
