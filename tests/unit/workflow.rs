use chrono::Utc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use workflow_board::{
    db::models::{CreateTransitionRequest, Issue},
    db::repositories::WorkflowsRepo,
    services::{
        context::Actor,
        transitions_service::{Denial, TransitionDecision, TransitionsService},
        workflows_service::WorkflowsService,
    },
    validation::workflow::validate_workflow_graph,
};

use super::support::{issue, software_workflow, step, workflow_request};

#[test]
fn workflow_needs_exactly_one_initial_step() {
    let mut repo = WorkflowsRepo::new();
    let none = WorkflowsService::create_workflow(
        &mut repo,
        workflow_request("No start"),
        vec![step("todo", false), step("done", false)],
        Utc::now(),
    );
    assert_err!(none);

    let two = WorkflowsService::create_workflow(
        &mut repo,
        workflow_request("Two starts"),
        vec![step("todo", true), step("done", true)],
        Utc::now(),
    );
    assert_err!(two);

    let one = assert_ok!(WorkflowsService::create_workflow(
        &mut repo,
        workflow_request("Basic"),
        vec![step("todo", true), step("done", false)],
        Utc::now(),
    ));
    assert_eq!(WorkflowsService::initial_step(&one).unwrap().status_id, "todo");
}

#[test]
fn reopen_cycle_is_valid() {
    let mut wf = software_workflow();
    let done = wf.steps.iter().find(|s| s.status_id == "done").unwrap().id;
    let todo = wf.steps.iter().find(|s| s.status_id == "todo").unwrap().id;
    wf.add_transition(CreateTransitionRequest {
        from_step_id: done,
        to_step_id: todo,
        name: "Reopen".to_string(),
        description: None,
        conditions: vec![],
        validators: vec![],
        post_functions: vec![],
    });
    assert_ok!(validate_workflow_graph(&wf));

    let actor = Actor::new(Uuid::new_v4(), "Ada");
    let closed: Issue = issue("C-1", "done");
    let decision = TransitionsService::can_transition(&wf, &closed, "done", "todo", &actor);
    assert!(decision.is_allowed());
}

#[test]
fn unknown_pairs_are_never_allowed() {
    let wf = software_workflow();
    let actor = Actor::new(Uuid::new_v4(), "Ada");
    let statuses = ["todo", "in_progress", "done", "archived"];
    let legal = [("todo", "in_progress"), ("in_progress", "done")];

    for from in statuses {
        for to in statuses {
            if legal.contains(&(from, to)) {
                continue;
            }
            let work = issue("X-1", from);
            let decision = TransitionsService::can_transition(&wf, &work, from, to, &actor);
            assert!(
                matches!(decision, TransitionDecision::Denied(Denial::NoSuchTransition { .. })),
                "{from} -> {to} should have no transition"
            );
        }
    }
}

#[test]
fn rule_free_transition_is_allowed_for_anyone() {
    let wf = software_workflow();
    let work = issue("X-2", "todo");
    for actor in [Actor::default(), Actor::new(Uuid::new_v4(), "Stranger")] {
        let decision =
            TransitionsService::can_transition(&wf, &work, "todo", "in_progress", &actor);
        assert!(decision.is_allowed());
    }
}

#[test]
fn offered_transitions_are_stable() {
    let wf = software_workflow();
    let work = issue("X-3", "in_progress");
    let actor = Actor::new(Uuid::new_v4(), "Ada");

    let first: Vec<Uuid> = TransitionsService::offered_transitions(&wf, &work, &actor)
        .iter()
        .map(|t| t.id)
        .collect();
    let second: Vec<Uuid> = TransitionsService::offered_transitions(&wf, &work, &actor)
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn draft_publish_replaces_parent_graph() {
    let mut repo = WorkflowsRepo::new();
    let parent_id = assert_ok!(WorkflowsService::register(&mut repo, software_workflow()));

    let draft = assert_ok!(WorkflowsService::create_draft(&mut repo, parent_id, Utc::now()));
    assert_eq!(draft.name, "Software (Draft)");
    assert_err!(WorkflowsService::create_draft(&mut repo, parent_id, Utc::now()));

    let review = assert_ok!(WorkflowsService::add_step(
        &mut repo,
        draft.id,
        step("in_review", false),
        Utc::now(),
    ));
    assert!(repo.find_by_id(draft.id).unwrap().step(review).is_some());

    let published = assert_ok!(WorkflowsService::publish_draft(&mut repo, draft.id, Utc::now()));
    assert_eq!(published.id, parent_id);
    assert_eq!(published.name, "Software");
    assert_eq!(published.steps.len(), 4);
    assert!(published.published_at.is_some());
    assert!(repo.find_by_id(draft.id).is_none());

    assert_err!(WorkflowsService::discard_draft(&mut repo, parent_id));
}
