use clap::{Arg, Command};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use workflow_board::{
    BoardCoordinator, Collaborators, MoveReport,
    config::{Config, MovePolicy},
    db::models::{Board, Issue, IssueStatus, Workflow},
    db::repositories::{InMemoryHistoryLog, InMemoryIssueStore, StatusesRepo, WorkflowsRepo},
    error::AppError,
    events::RecordingNotifier,
    services::{
        board_service::{BoardFilters, BoardService, BoardView, KanbanMetrics},
        context::Actor,
        workflows_service::WorkflowsService,
    },
};

/// A recorded board session: configuration, starting issues, and the moves
/// to replay. Moves sharing a `batch` number are dropped concurrently.
#[derive(Deserialize, Debug)]
struct Fixture {
    #[serde(default)]
    statuses: Vec<IssueStatus>,
    workflow: Workflow,
    board: Board,
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    actors: Vec<Actor>,
    #[serde(default)]
    moves: Vec<FixtureMove>,
}

#[derive(Deserialize, Debug)]
struct FixtureMove {
    issue_key: String,
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    transition: Option<String>,
    actor: String,
    #[serde(default)]
    batch: u32,
}

#[derive(Serialize)]
struct ReplayOutput {
    reports: Vec<MoveReport>,
    board: BoardView,
    metrics: KanbanMetrics,
}

fn load_fixture(path: &str) -> Result<Fixture, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let fixture: Fixture = serde_json::from_str(&raw).map_err(AppError::from)?;
    Ok(fixture)
}

/// Every workflow step must point at a known status when a catalog is given.
fn check_statuses(fixture: &Fixture) -> Result<(), AppError> {
    if fixture.statuses.is_empty() {
        return Ok(());
    }
    let catalog = StatusesRepo::new(fixture.statuses.clone());
    for step in &fixture.workflow.steps {
        if !catalog.contains(&step.status_id) {
            return Err(AppError::validation(format!(
                "Workflow step references unknown status '{}'",
                step.status_id
            )));
        }
    }
    Ok(())
}

async fn replay_move(
    coordinator: &BoardCoordinator,
    issue_ids: &BTreeMap<String, Uuid>,
    actors: &BTreeMap<String, Actor>,
    step: &FixtureMove,
) -> Option<MoveReport> {
    let Some(issue_id) = issue_ids.get(&step.issue_key).copied() else {
        warn!(issue_key = %step.issue_key, "Skipping move for unknown issue");
        return None;
    };
    let Some(actor) = actors.get(&step.actor) else {
        warn!(actor = %step.actor, "Skipping move for unknown actor");
        return None;
    };

    match (&step.column, &step.transition) {
        (Some(column), _) => Some(coordinator.move_to_column(issue_id, column, actor).await),
        (None, Some(name)) => {
            let transition_id = coordinator
                .offered_transitions(issue_id, actor)
                .await
                .into_iter()
                .chain(coordinator.workflow().transitions.iter().cloned())
                .find(|t| &t.name == name)
                .map(|t| t.id)
                .unwrap_or_else(Uuid::nil);
            Some(coordinator.apply_transition(issue_id, transition_id, actor).await)
        }
        (None, None) => {
            warn!(issue_key = %step.issue_key, "Move has neither column nor transition");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("Board Replay")
        .version("1.0")
        .about("Replays recorded board moves through the mutation coordinator")
        .arg(
            Arg::new("fixture")
                .short('f')
                .long("fixture")
                .value_name("FILE")
                .help("JSON fixture with statuses, workflow, board, issues, actors and moves")
                .required(true),
        )
        .arg(
            Arg::new("policy")
                .short('p')
                .long("policy")
                .value_name("POLICY")
                .help("Concurrent move policy: reject or queue (overrides MOVE_POLICY)")
                .value_parser(["reject", "queue"]),
        )
        .arg(
            Arg::new("latency")
                .short('l')
                .long("latency")
                .value_name("MILLISECONDS")
                .help("Simulated store latency per status update")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("fail-store")
                .long("fail-store")
                .help("Make every status update fail, forcing rollbacks")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config = Config::from_env()?;
    workflow_board::init_tracing(&config);

    let mut board_config = config.board();
    if let Some(policy) = matches.get_one::<String>("policy") {
        board_config.move_policy = match policy.as_str() {
            "queue" => MovePolicy::Queue,
            _ => MovePolicy::Reject,
        };
    }

    let path = matches
        .get_one::<String>("fixture")
        .ok_or_else(|| AppError::Config("--fixture is required".to_string()))?;
    let fixture = load_fixture(path)?;
    check_statuses(&fixture)?;

    let mut workflows = WorkflowsRepo::new();
    let workflow_id = WorkflowsService::register(&mut workflows, fixture.workflow.clone())?;
    let workflow = WorkflowsService::get_by_id(&workflows, workflow_id)?.clone();

    let latency = matches.get_one::<u64>("latency").copied().unwrap_or(0);
    let mut store = InMemoryIssueStore::new(fixture.issues.clone());
    if latency > 0 {
        store = store.with_latency(Duration::from_millis(latency));
    }
    store.set_fail_status_updates(matches.get_flag("fail-store"));

    let collaborators = Collaborators {
        issues: Arc::new(store),
        history: Arc::new(InMemoryHistoryLog::new()),
        notifier: Arc::new(RecordingNotifier::new()),
    };
    let coordinator = BoardCoordinator::new(
        fixture.board.clone(),
        workflow,
        fixture.issues.clone(),
        collaborators,
        board_config,
    )?;

    let issue_ids: BTreeMap<String, Uuid> = fixture
        .issues
        .iter()
        .map(|i| (i.issue_key.clone(), i.id))
        .collect();
    let actors: BTreeMap<String, Actor> = fixture
        .actors
        .iter()
        .map(|a| (a.display_name.clone(), a.clone()))
        .collect();

    let mut batches: BTreeMap<u32, Vec<&FixtureMove>> = BTreeMap::new();
    for step in &fixture.moves {
        batches.entry(step.batch).or_default().push(step);
    }

    let mut reports = Vec::new();
    for (batch, moves) in batches {
        info!(batch, moves = moves.len(), "Replaying batch");
        let results = join_all(
            moves
                .iter()
                .map(|step| replay_move(&coordinator, &issue_ids, &actors, step)),
        )
        .await;
        reports.extend(results.into_iter().flatten());
    }
    coordinator.flush_background().await;

    let issues = coordinator.issues().await;
    let output = ReplayOutput {
        reports,
        board: BoardService::project(coordinator.board(), &issues, &BoardFilters::default()),
        metrics: BoardService::kanban_metrics(coordinator.board(), &issues, chrono::Utc::now()),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
