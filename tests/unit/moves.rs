use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use workflow_board::{
    BoardCoordinator, MoveState,
    config::{BoardConfig, MovePolicy},
    db::enums::{IssueType, StatusCategory},
    db::models::NewIssue,
    error::MoveError,
    events::BoardEvent,
    services::board_service::BoardFilters,
};

use super::support::{board_for, column, harness, issue, software_workflow};

fn three_columns() -> Vec<workflow_board::db::models::BoardColumn> {
    vec![
        column("todo", StatusCategory::Todo, &[], None),
        column("in_progress", StatusCategory::InProgress, &[], Some(5)),
        column("done", StatusCategory::Done, &[], None),
    ]
}

#[tokio::test]
async fn validator_denial_then_success_after_resolution_is_set() {
    let mut work = issue("WEB-1", "in_progress");
    let h = harness(three_columns(), vec![work.clone()], MovePolicy::Reject);

    let denied = h.coordinator.move_to_column(work.id, "done", &h.actor).await;
    assert_eq!(denied.state(), MoveState::Rejected);
    assert_eq!(
        denied.error,
        Some(MoveError::ValidatorDenied {
            reason: "Resolution must be set".to_string()
        })
    );
    assert_eq!(denied.user_message().as_deref(), Some("Resolution must be set"));
    assert_eq!(h.store.status_calls(), 0);

    work.resolution = Some("Fixed".to_string());
    h.coordinator.sync_issues(vec![work.clone()]).await;

    let allowed = h.coordinator.move_to_column(work.id, "done", &h.actor).await;
    assert!(allowed.is_committed());

    let view = h.coordinator.snapshot(&BoardFilters::default()).await;
    assert_eq!(view.column_of_issue(work.id), Some("done"));
    assert_eq!(view.column("in_progress").unwrap().count, 0);
}

#[tokio::test]
async fn missing_transition_is_rejected_without_external_call() {
    let work = issue("WEB-2", "todo");
    let h = harness(three_columns(), vec![work.clone()], MovePolicy::Reject);
    let mut events = h.coordinator.subscribe();

    let report = h.coordinator.move_to_column(work.id, "done", &h.actor).await;

    assert_eq!(
        report.trail,
        vec![
            MoveState::Idle,
            MoveState::Requested,
            MoveState::Validating,
            MoveState::Rejected,
        ]
    );
    let err = report.error.expect("rejection carries an error");
    assert_eq!(err.code(), "configuration_error");
    assert!(err.to_string().contains("no such transition"));
    assert_eq!(h.store.status_calls(), 0);

    let view = h.coordinator.snapshot(&BoardFilters::default()).await;
    assert_eq!(view.column_of_issue(work.id), Some("todo"));

    match events.recv().await.unwrap() {
        BoardEvent::MoveRejected { issue_id, code, .. } => {
            assert_eq!(issue_id, work.id);
            assert_eq!(code, "configuration_error");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn failed_store_update_rolls_back_to_origin_column() {
    let work = issue("WEB-3", "todo");
    let h = harness(three_columns(), vec![work.clone()], MovePolicy::Reject);
    h.store.set_fail_status_updates(true);
    let mut events = h.coordinator.subscribe();

    let report = h.coordinator.move_to_column(work.id, "in_progress", &h.actor).await;

    assert_eq!(
        report.trail,
        vec![
            MoveState::Idle,
            MoveState::Requested,
            MoveState::Validating,
            MoveState::Applying,
            MoveState::RolledBack,
        ]
    );
    assert!(matches!(report.error, Some(MoveError::ExternalFailure { .. })));
    assert_eq!(h.store.status_calls(), 1);

    let local = h.coordinator.issue(work.id).await.unwrap();
    assert_eq!(local.status_id, "todo");
    let view = h.coordinator.snapshot(&BoardFilters::default()).await;
    assert_eq!(view.column_of_issue(work.id), Some("todo"));

    // Exactly one error surfaces for the failed move.
    let first = events.recv().await.unwrap();
    assert!(matches!(
        first,
        BoardEvent::MoveRolledBack { ref restored_status, .. } if restored_status == "todo"
    ));
    assert!(events.try_recv().is_err());

    h.coordinator.flush_background().await;
    assert!(h.history.records().await.is_empty());
}

#[tokio::test]
async fn no_automatic_retry_after_failure() {
    let work = issue("WEB-4", "todo");
    let h = harness(three_columns(), vec![work.clone()], MovePolicy::Reject);
    h.store.set_fail_status_updates(true);
    h.coordinator.move_to_column(work.id, "in_progress", &h.actor).await;
    assert_eq!(h.store.status_calls(), 1);

    h.store.set_fail_status_updates(false);
    let retry = h.coordinator.move_to_column(work.id, "in_progress", &h.actor).await;
    assert!(retry.is_committed());
    assert_eq!(h.store.status_calls(), 2);
}

#[tokio::test]
async fn multi_status_column_targets_its_first_status() {
    let mut wf = software_workflow();
    let in_progress = wf.steps.iter().find(|s| s.status_id == "in_progress").unwrap().id;
    let review = wf.add_step(super::support::step("in_review", false));
    wf.add_transition(workflow_board::db::models::CreateTransitionRequest {
        from_step_id: in_progress,
        to_step_id: review,
        name: "Request review".to_string(),
        description: None,
        conditions: vec![],
        validators: vec![],
        post_functions: vec![],
    });

    let columns = vec![
        column("todo", StatusCategory::Todo, &[], None),
        column("in_progress", StatusCategory::InProgress, &[], None),
        column("review", StatusCategory::InProgress, &["in_review", "qa"], Some(3)),
        column("done", StatusCategory::Done, &[], None),
    ];
    let board = board_for(&wf, columns);
    let work = issue("WEB-5", "in_progress");
    let store = std::sync::Arc::new(workflow_board::db::repositories::InMemoryIssueStore::new([
        work.clone(),
    ]));
    let coordinator = assert_ok!(BoardCoordinator::new(
        board,
        wf,
        vec![work.clone()],
        workflow_board::Collaborators {
            issues: store.clone(),
            history: std::sync::Arc::new(
                workflow_board::db::repositories::InMemoryHistoryLog::new(),
            ),
            notifier: std::sync::Arc::new(workflow_board::events::RecordingNotifier::new()),
        },
        BoardConfig::default(),
    ));

    let actor = workflow_board::services::context::Actor::new(Uuid::new_v4(), "Ada");
    let report = coordinator.move_to_column(work.id, "review", &actor).await;
    assert!(report.is_committed());
    assert_eq!(report.to_status.as_deref(), Some("in_review"));
    assert_eq!(store.get(work.id).await.unwrap().status_id, "in_review");
}

#[tokio::test]
async fn created_issue_starts_in_initial_column() {
    let h = harness(three_columns(), vec![], MovePolicy::Reject);
    let created = assert_ok!(
        h.coordinator
            .create_issue(NewIssue {
                issue_key: "WEB-9".to_string(),
                summary: "Password reset".to_string(),
                description: None,
                issue_type: IssueType::Story,
                assignee: None,
                reporter_id: h.actor.user_id,
                story_points: Some(5.0),
            })
            .await
    );
    assert_eq!(created.status_id, "todo");

    let blank = h
        .coordinator
        .create_issue(NewIssue {
            issue_key: "WEB-10".to_string(),
            summary: "  ".to_string(),
            description: None,
            issue_type: IssueType::Task,
            assignee: None,
            reporter_id: h.actor.user_id,
            story_points: None,
        })
        .await;
    assert_err!(blank);
}

#[tokio::test]
async fn queued_moves_validate_against_updated_status() {
    let work = issue("WEB-6", "todo");
    let h = harness(three_columns(), vec![work.clone()], MovePolicy::Queue);

    let (first, second) = tokio::join!(
        h.coordinator.move_to_column(work.id, "in_progress", &h.actor),
        h.coordinator.move_to_column(work.id, "done", &h.actor),
    );

    assert!(first.is_committed());
    // Second move saw In-Progress and hit the resolution validator.
    assert_eq!(second.from_status.as_deref(), Some("in_progress"));
    assert!(matches!(second.error, Some(MoveError::ValidatorDenied { .. })));
    assert_eq!(h.store.status_calls(), 1);
}

#[test]
fn coordinator_refuses_invalid_configuration() {
    let mut wf = software_workflow();
    for s in wf.steps.iter_mut() {
        s.is_initial = false;
    }
    let board = board_for(&wf, three_columns());
    let result = BoardCoordinator::new(
        board,
        wf,
        vec![],
        workflow_board::Collaborators {
            issues: std::sync::Arc::new(
                workflow_board::db::repositories::InMemoryIssueStore::default(),
            ),
            history: std::sync::Arc::new(
                workflow_board::db::repositories::InMemoryHistoryLog::new(),
            ),
            notifier: std::sync::Arc::new(workflow_board::events::RecordingNotifier::new()),
        },
        BoardConfig::default(),
    );
    assert!(result.is_err());
}
