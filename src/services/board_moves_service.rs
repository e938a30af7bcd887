//! Board mutation coordinator.
//!
//! A move goes `Idle -> Requested -> Validating`, then either `Rejected` or
//! `Applying -> Committed | RolledBack`. The local issue list is updated
//! before the store call and restored if that call fails. At most one move
//! per issue is in flight; a second one is rejected as busy or queued
//! behind the first, depending on [`MovePolicy`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::{BoardConfig, MovePolicy},
    db::models::{
        Assignee, Board, Comment, Issue, NewIssue, PostFunction, StatusId, Transition,
        TransitionRecord, Workflow,
    },
    db::repositories::{HistoryLog, IssueStore, issues::apply_field},
    error::{AppError, AppResult, MoveError},
    events::{BoardEvent, EventBus, Notification, Notifier},
    services::{
        board_service::{BoardFilters, BoardService, BoardView},
        context::Actor,
        transitions_service::{Denial, NO_SUCH_TRANSITION, TransitionDecision, TransitionsService},
        workflows_service::WorkflowsService,
    },
    validation::{board::validate_board_columns, workflow::validate_workflow_graph},
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    Idle,
    Requested,
    Validating,
    Rejected,
    Applying,
    Committed,
    RolledBack,
}

/// What happened to one move attempt.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MoveReport {
    pub issue_id: Uuid,
    /// Every state the attempt passed through, starting at `Idle`.
    pub trail: Vec<MoveState>,
    pub from_status: Option<StatusId>,
    pub to_status: Option<StatusId>,
    pub transition_id: Option<Uuid>,
    pub error: Option<MoveError>,
    /// Post-function failures. They never undo a committed move.
    pub warnings: Vec<String>,
}

impl MoveReport {
    fn new(issue_id: Uuid) -> Self {
        Self {
            issue_id,
            trail: vec![MoveState::Idle],
            from_status: None,
            to_status: None,
            transition_id: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, state: MoveState) {
        self.trail.push(state);
    }

    pub fn state(&self) -> MoveState {
        self.trail.last().copied().unwrap_or(MoveState::Idle)
    }

    pub fn is_committed(&self) -> bool {
        self.state() == MoveState::Committed
    }

    pub fn user_message(&self) -> Option<String> {
        self.error.as_ref().map(MoveError::user_message)
    }
}

impl From<Denial> for MoveError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NoSuchTransition {
                from_status,
                to_status,
            } => MoveError::configuration(format!(
                "{} from '{}' to '{}'",
                NO_SUCH_TRANSITION, from_status, to_status
            )),
            Denial::Condition { reason } => MoveError::ConditionDenied { reason },
            Denial::Validator { reason } => MoveError::ValidatorDenied { reason },
        }
    }
}

/// External systems the coordinator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub issues: Arc<dyn IssueStore>,
    pub history: Arc<dyn HistoryLog>,
    pub notifier: Arc<dyn Notifier>,
}

enum MoveRequest {
    Column(String),
    Transition(Uuid),
}

struct ResolvedMove {
    transition: Transition,
    to_status: StatusId,
}

pub struct BoardCoordinator {
    board: Board,
    workflow: Workflow,
    issues: RwLock<Vec<Issue>>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    applying: RwLock<HashSet<Uuid>>,
    collaborators: Collaborators,
    config: BoardConfig,
    events: EventBus,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl BoardCoordinator {
    /// Checks the workflow graph and the column layout before accepting
    /// them; neither is re-validated per move.
    pub fn new(
        board: Board,
        workflow: Workflow,
        issues: Vec<Issue>,
        collaborators: Collaborators,
        config: BoardConfig,
    ) -> AppResult<Self> {
        validate_workflow_graph(&workflow)?;
        validate_board_columns(&board)?;
        if board.workflow_id != workflow.id {
            return Err(AppError::validation(format!(
                "Board '{}' uses workflow {}, got {}",
                board.name, board.workflow_id, workflow.id
            )));
        }

        Ok(Self {
            board,
            workflow,
            issues: RwLock::new(issues),
            locks: Mutex::new(HashMap::new()),
            applying: RwLock::new(HashSet::new()),
            collaborators,
            events: EventBus::new(config.event_channel_capacity),
            config,
            background: Mutex::new(Vec::new()),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub async fn issue(&self, issue_id: Uuid) -> Option<Issue> {
        self.issues
            .read()
            .await
            .iter()
            .find(|i| i.id == issue_id)
            .cloned()
    }

    pub async fn issues(&self) -> Vec<Issue> {
        self.issues.read().await.clone()
    }

    pub async fn snapshot(&self, filters: &BoardFilters) -> BoardView {
        let issues = self.issues.read().await;
        BoardService::project(&self.board, &issues, filters)
    }

    pub async fn offered_transitions(
        &self,
        issue_id: Uuid,
        actor: &Actor,
    ) -> Vec<Transition> {
        let Some(issue) = self.issue(issue_id).await else {
            return Vec::new();
        };
        TransitionsService::offered_transitions(&self.workflow, &issue, actor)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop `issue_id` on `column_id`. The column's representative status is
    /// the target. Dropping an issue on the column it already sits in is a
    /// no-op and the report stays `Idle`.
    pub async fn move_to_column(
        &self,
        issue_id: Uuid,
        column_id: &str,
        actor: &Actor,
    ) -> MoveReport {
        if let Some(issue) = self.issue(issue_id).await {
            if self.sits_in_column(&issue, column_id) {
                return MoveReport::new(issue_id);
            }
        }
        self.run_move(issue_id, MoveRequest::Column(column_id.to_string()), actor)
            .await
    }

    /// Take a specific transition, e.g. from a transition menu.
    pub async fn apply_transition(
        &self,
        issue_id: Uuid,
        transition_id: Uuid,
        actor: &Actor,
    ) -> MoveReport {
        self.run_move(issue_id, MoveRequest::Transition(transition_id), actor)
            .await
    }

    /// New issues start at the workflow's initial status.
    pub async fn create_issue(&self, new_issue: NewIssue) -> AppResult<Issue> {
        if new_issue.summary.trim().is_empty() {
            return Err(AppError::validation("Issue summary is required"));
        }
        let initial = WorkflowsService::initial_step(&self.workflow).ok_or_else(|| {
            AppError::Config(format!("Workflow '{}' has no initial step", self.workflow.name))
        })?;

        let issue = Issue::from_new(new_issue, initial.status_id.clone(), Utc::now());
        self.collaborators.issues.create_issue(&issue).await?;
        self.issues.write().await.push(issue.clone());

        info!(
            issue_id = %issue.id,
            issue_key = %issue.issue_key,
            status_id = %issue.status_id,
            "Issue created"
        );
        self.events.publish(BoardEvent::IssueCreated {
            issue_id: issue.id,
            status_id: issue.status_id.clone(),
        });
        Ok(issue)
    }

    /// Replace the local issue list with a fresh copy from the store's
    /// change feed. Issues with a move still being applied keep their local
    /// status.
    pub async fn sync_issues(&self, incoming: Vec<Issue>) {
        let count = {
            let applying = self.applying.read().await;
            let mut issues = self.issues.write().await;
            let optimistic: HashMap<Uuid, StatusId> = issues
                .iter()
                .filter(|i| applying.contains(&i.id))
                .map(|i| (i.id, i.status_id.clone()))
                .collect();

            *issues = incoming
                .into_iter()
                .map(|mut issue| {
                    if let Some(status) = optimistic.get(&issue.id) {
                        issue.status_id = status.clone();
                    }
                    issue
                })
                .collect();
            issues.len()
        };

        debug!(count, "Issues synced");
        self.events.publish(BoardEvent::IssuesSynced { count });
    }

    /// Wait for history writes started by earlier moves.
    pub async fn flush_background(&self) {
        let handles: Vec<JoinHandle<()>> = self.background.lock().await.drain(..).collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Background task failed");
            }
        }
    }

    async fn run_move(&self, issue_id: Uuid, request: MoveRequest, actor: &Actor) -> MoveReport {
        let mut report = MoveReport::new(issue_id);
        report.advance(MoveState::Requested);

        let report = match self.acquire(issue_id).await {
            Some(guard) => {
                let report = self.run_locked(report, &request, actor).await;
                drop(guard);
                report
            }
            None => self.reject(report, MoveError::Busy { issue_id }),
        };
        self.release_lock(issue_id).await;
        report
    }

    async fn run_locked(
        &self,
        mut report: MoveReport,
        request: &MoveRequest,
        actor: &Actor,
    ) -> MoveReport {
        let issue_id = report.issue_id;
        let Some(issue) = self.issue(issue_id).await else {
            report.advance(MoveState::Validating);
            return self.reject(
                report,
                MoveError::configuration(format!("Unknown issue {}", issue_id)),
            );
        };

        // A queued drop can find the issue back in its column after the
        // move ahead of it rolled back.
        if let MoveRequest::Column(column_id) = request {
            if self.sits_in_column(&issue, column_id) {
                return MoveReport::new(issue_id);
            }
        }

        report.advance(MoveState::Validating);
        report.from_status = Some(issue.status_id.clone());

        let resolved = match self.resolve(&issue, request, actor) {
            Ok(resolved) => resolved,
            Err(e) => return self.reject(report, e),
        };
        report.to_status = Some(resolved.to_status.clone());
        report.transition_id = Some(resolved.transition.id);

        report.advance(MoveState::Applying);
        self.applying.write().await.insert(issue_id);
        self.set_local_status(issue_id, &resolved.to_status).await;

        let result = self
            .collaborators
            .issues
            .update_status(issue_id, &resolved.to_status)
            .await;

        let report = match result {
            Ok(()) => self.commit(report, &issue, resolved, actor).await,
            Err(e) => self.roll_back(report, &issue.status_id, e).await,
        };
        self.applying.write().await.remove(&issue_id);
        report
    }

    fn sits_in_column(&self, issue: &Issue, column_id: &str) -> bool {
        let current = BoardService::column_of(issue, &self.board.columns);
        if current.is_some_and(|c| c.id == column_id) {
            debug!(issue_id = %issue.id, column_id, "Issue dropped on its own column");
            return true;
        }
        false
    }

    async fn acquire(&self, issue_id: Uuid) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(issue_id).or_default())
        };
        match self.config.move_policy {
            MovePolicy::Reject => lock.try_lock_owned().ok(),
            MovePolicy::Queue => Some(lock.lock_owned().await),
        }
    }

    /// Forget the issue's lock once no move holds or waits on it.
    async fn release_lock(&self, issue_id: Uuid) {
        let mut locks = self.locks.lock().await;
        if locks
            .get(&issue_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&issue_id);
        }
    }

    fn resolve(
        &self,
        issue: &Issue,
        request: &MoveRequest,
        actor: &Actor,
    ) -> Result<ResolvedMove, MoveError> {
        match request {
            MoveRequest::Column(column_id) => {
                let column = self.board.column(column_id).ok_or_else(|| {
                    MoveError::configuration(format!("Unknown column '{}'", column_id))
                })?;
                let to_status = BoardService::representative_status(column).to_string();

                match TransitionsService::can_transition(
                    &self.workflow,
                    issue,
                    &issue.status_id,
                    &to_status,
                    actor,
                ) {
                    TransitionDecision::Allowed { transition_id } => {
                        let transition =
                            self.workflow.transition(transition_id).cloned().ok_or_else(|| {
                                MoveError::configuration(format!(
                                    "Unknown transition {}",
                                    transition_id
                                ))
                            })?;
                        Ok(ResolvedMove {
                            transition,
                            to_status,
                        })
                    }
                    TransitionDecision::Denied(denial) => Err(denial.into()),
                }
            }
            MoveRequest::Transition(transition_id) => {
                let transition = self.workflow.transition(*transition_id).ok_or_else(|| {
                    MoveError::configuration(format!("Unknown transition {}", transition_id))
                })?;
                let from = self.workflow.step(transition.from_step_id);
                let to = self.workflow.step(transition.to_step_id);
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(MoveError::configuration(format!(
                        "Transition '{}' has a dangling endpoint",
                        transition.name
                    )));
                };
                if from.status_id != issue.status_id {
                    return Err(MoveError::configuration(format!(
                        "Transition '{}' does not start from status '{}'",
                        transition.name, issue.status_id
                    )));
                }

                TransitionsService::check_transition(transition, issue, actor)?;
                Ok(ResolvedMove {
                    transition: transition.clone(),
                    to_status: to.status_id.clone(),
                })
            }
        }
    }

    fn reject(&self, mut report: MoveReport, err: MoveError) -> MoveReport {
        report.advance(MoveState::Rejected);
        match &err {
            MoveError::Configuration { message } => {
                error!(
                    issue_id = %report.issue_id,
                    message = %message,
                    "Move rejected: configuration error"
                );
            }
            MoveError::ExternalFailure { message } => {
                warn!(issue_id = %report.issue_id, message = %message, "Move rejected");
            }
            other => {
                info!(
                    issue_id = %report.issue_id,
                    code = other.code(),
                    reason = %other,
                    "Move rejected"
                );
            }
        }

        self.events.publish(BoardEvent::MoveRejected {
            issue_id: report.issue_id,
            code: err.code().to_string(),
            message: err.user_message(),
        });
        report.error = Some(err);
        report
    }

    async fn commit(
        &self,
        mut report: MoveReport,
        before: &Issue,
        resolved: ResolvedMove,
        actor: &Actor,
    ) -> MoveReport {
        report.advance(MoveState::Committed);
        let issue_id = before.id;
        let _ = self
            .update_local(issue_id, |issue| {
                issue.updated_at = Utc::now();
                Ok(())
            })
            .await;

        info!(
            issue_id = %issue_id,
            from_status = %before.status_id,
            to_status = %resolved.to_status,
            transition = %resolved.transition.name,
            "Issue moved"
        );
        self.events.publish(BoardEvent::IssueMoved {
            issue_id,
            from_status: before.status_id.clone(),
            to_status: resolved.to_status.clone(),
            transition_id: resolved.transition.id,
        });

        report.warnings = self.run_post_functions(before, &resolved, actor).await;

        if self.config.history_enabled {
            self.record_history(TransitionRecord {
                id: Uuid::new_v4(),
                issue_id,
                transition_id: resolved.transition.id,
                transition_name: resolved.transition.name.clone(),
                from_status: before.status_id.clone(),
                to_status: resolved.to_status.clone(),
                actor_id: actor.user_id,
                created_at: Utc::now(),
            })
            .await;
        }
        report
    }

    async fn roll_back(
        &self,
        mut report: MoveReport,
        restored: &str,
        cause: AppError,
    ) -> MoveReport {
        self.set_local_status(report.issue_id, restored).await;
        report.advance(MoveState::RolledBack);

        let err = MoveError::ExternalFailure {
            message: cause.to_string(),
        };
        warn!(
            issue_id = %report.issue_id,
            restored_status = restored,
            error = %cause,
            "Status update failed, move rolled back"
        );
        self.events.publish(BoardEvent::MoveRolledBack {
            issue_id: report.issue_id,
            restored_status: restored.to_string(),
            message: err.user_message(),
        });
        report.error = Some(err);
        report
    }

    async fn run_post_functions(
        &self,
        issue: &Issue,
        resolved: &ResolvedMove,
        actor: &Actor,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        for post_function in &resolved.transition.post_functions {
            // Later post-functions see what earlier ones wrote.
            let current = self.issue(issue.id).await.unwrap_or_else(|| issue.clone());
            if let Err(e) = self
                .run_post_function(post_function, &current, &resolved.to_status, actor)
                .await
            {
                warn!(
                    issue_id = %issue.id,
                    post_function = post_function.kind(),
                    error = %e,
                    "Post-function failed"
                );
                warnings.push(format!("{}: {}", post_function.kind(), e));
            }
        }
        warnings
    }

    async fn run_post_function(
        &self,
        post_function: &PostFunction,
        issue: &Issue,
        to_status: &str,
        actor: &Actor,
    ) -> AppResult<()> {
        let store = &self.collaborators.issues;
        match post_function {
            PostFunction::SetField { field, value } => {
                store.set_field(issue.id, field, value.clone()).await?;
                self.update_local(issue.id, |i| apply_field(i, field, Some(value.clone())))
                    .await
            }
            PostFunction::ClearField { field } => {
                store.clear_field(issue.id, field).await?;
                self.update_local(issue.id, |i| apply_field(i, field, None))
                    .await
            }
            PostFunction::AssignToLead => {
                let lead = self
                    .board
                    .project_lead_id
                    .ok_or_else(|| AppError::validation("Board has no project lead"))?;
                self.assign(issue.id, lead).await
            }
            PostFunction::AssignToReporter => self.assign(issue.id, issue.reporter_id).await,
            PostFunction::AddComment { comment } => {
                store
                    .add_comment(Comment {
                        id: Uuid::new_v4(),
                        issue_id: issue.id,
                        author_id: actor.user_id,
                        body: comment.clone(),
                        created_at: Utc::now(),
                    })
                    .await
            }
            PostFunction::SendNotification { message } => {
                let mut recipients = vec![issue.reporter_id];
                if let Some(assignee) = issue.assignee_id() {
                    if !recipients.contains(&assignee) {
                        recipients.push(assignee);
                    }
                }
                recipients.retain(|id| *id != actor.user_id);
                if recipients.is_empty() {
                    debug!(issue_id = %issue.id, "No one to notify");
                    return Ok(());
                }

                let message = message
                    .clone()
                    .unwrap_or_else(|| format!("{} moved to {}", issue.issue_key, to_status));
                self.collaborators
                    .notifier
                    .notify(Notification {
                        issue_id: issue.id,
                        recipient_ids: recipients,
                        message,
                    })
                    .await
            }
        }
    }

    async fn assign(&self, issue_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.collaborators.issues.assign(issue_id, Some(user_id)).await?;
        self.update_local(issue_id, |issue| {
            if issue.assignee_id() != Some(user_id) {
                issue.assignee = Some(Assignee {
                    id: user_id,
                    display_name: String::new(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn record_history(&self, record: TransitionRecord) {
        let history = Arc::clone(&self.collaborators.history);
        let issue_id = record.issue_id;
        let handle = tokio::spawn(async move {
            if let Err(e) = history.record(record).await {
                warn!(issue_id = %issue_id, error = %e, "Failed to record transition history");
            }
        });
        let mut handles = self.background.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    async fn set_local_status(&self, issue_id: Uuid, status_id: &str) {
        let _ = self
            .update_local(issue_id, |issue| {
                issue.status_id = status_id.to_string();
                Ok(())
            })
            .await;
    }

    async fn update_local<F>(&self, issue_id: Uuid, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut Issue) -> AppResult<()>,
    {
        let mut issues = self.issues.write().await;
        match issues.iter_mut().find(|i| i.id == issue_id) {
            Some(issue) => f(issue),
            None => Err(AppError::not_found("issue")),
        }
    }
}
