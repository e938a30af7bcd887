use workflow_board::{
    db::enums::{StatusCategory, WipStatus},
    services::board_service::{BoardFilters, BoardService},
};

use super::support::{board_for, column, issue, software_workflow};

#[test]
fn wip_boundaries_for_limit_of_ten() {
    let col = column("in_progress", StatusCategory::InProgress, &[], Some(10));
    let fill = |n: usize| -> Vec<_> {
        (0..n)
            .map(|i| issue(&format!("P-{i}"), "in_progress"))
            .collect()
    };

    assert_eq!(BoardService::wip_status(&col, &fill(7)), WipStatus::Normal);
    assert_eq!(BoardService::wip_status(&col, &fill(8)), WipStatus::Warning);
    assert_eq!(BoardService::wip_status(&col, &fill(10)), WipStatus::Exceeded);
}

#[test]
fn review_column_over_its_limit() {
    let wf = software_workflow();
    let board = board_for(
        &wf,
        vec![column("review", StatusCategory::InProgress, &["in_review"], Some(3))],
    );
    let mut issues: Vec<_> = (1..=3).map(|i| issue(&format!("R-{i}"), "in_review")).collect();
    issues.push(issue("R-4", "in_review"));

    let view = BoardService::project(&board, &issues, &BoardFilters::default());
    let review = view.column("review").unwrap();
    assert_eq!(review.count, 4);
    assert_eq!(review.max_issues, Some(3));
    assert_eq!(review.wip, WipStatus::Exceeded);
}

#[test]
fn unplaced_issues_are_not_counted() {
    let wf = software_workflow();
    let board = board_for(
        &wf,
        vec![
            column("todo", StatusCategory::Todo, &[], None),
            column("done", StatusCategory::Done, &[], Some(1)),
        ],
    );
    let issues = vec![issue("U-1", "todo"), issue("U-2", "blocked")];

    let view = BoardService::project(&board, &issues, &BoardFilters::default());
    let total: usize = view.columns.iter().map(|c| c.count).sum();
    assert_eq!(total, 1);
    assert_eq!(view.unplaced, vec![issues[1].id]);
}

#[test]
fn search_filter_keeps_source_order() {
    let col = column("todo", StatusCategory::Todo, &[], None);
    let mut issues = vec![issue("APP-2", "todo"), issue("APP-1", "todo"), issue("APP-3", "todo")];
    issues[0].summary = "Billing export".to_string();
    issues[1].summary = "Fix billing rounding".to_string();
    issues[2].summary = "Dark mode".to_string();

    let filters = BoardFilters::with_search("BILLING");
    let keys: Vec<_> = BoardService::issues_in_column(&col, &issues, &filters)
        .into_iter()
        .map(|i| i.issue_key.as_str())
        .collect();
    assert_eq!(keys, vec!["APP-2", "APP-1"]);
}
