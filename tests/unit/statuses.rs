use tokio_test::{assert_err, assert_ok};

use workflow_board::{
    db::enums::StatusCategory,
    db::models::CreateStatusRequest,
    db::repositories::{StatusesRepo, WorkflowsRepo},
    error::AppError,
    services::{statuses_service::StatusesService, workflows_service::WorkflowsService},
};

use super::support::{issue, software_workflow};

fn request(id: &str, name: &str, category: StatusCategory, position: i32) -> CreateStatusRequest {
    CreateStatusRequest {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        color: "#42526E".to_string(),
        category,
        position,
    }
}

#[test]
fn status_lifecycle_respects_references() {
    let mut statuses = StatusesRepo::default();
    for (i, (id, name, category)) in [
        ("todo", "To Do", StatusCategory::Todo),
        ("in_progress", "In Progress", StatusCategory::InProgress),
        ("done", "Done", StatusCategory::Done),
        ("archived", "Archived", StatusCategory::Done),
    ]
    .into_iter()
    .enumerate()
    {
        assert_ok!(StatusesService::create(&mut statuses, request(id, name, category, i as i32)));
    }
    let names: Vec<_> = StatusesService::list(&statuses).iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["To Do", "In Progress", "Done", "Archived"]);

    let mut workflows = WorkflowsRepo::new();
    assert_ok!(WorkflowsService::register(&mut workflows, software_workflow()));
    let issues = vec![issue("S-1", "todo")];

    let err = assert_err!(StatusesService::delete(&mut statuses, &workflows, &issues, "done"));
    assert!(matches!(err, AppError::Conflict { .. }));

    assert_ok!(StatusesService::delete(&mut statuses, &workflows, &issues, "archived"));
    assert_err!(StatusesService::delete(&mut statuses, &workflows, &issues, "archived"));
}

#[test]
fn invalid_colors_are_rejected() {
    let mut statuses = StatusesRepo::default();
    let mut bad = request("qa", "QA", StatusCategory::InProgress, 0);
    bad.color = "#12345".to_string();
    assert_err!(StatusesService::create(&mut statuses, bad));
}
