//! Storage boundary.
//!
//! The issue store and the history log are external collaborators; the
//! traits below are the only calls the board core makes on them. The
//! in-memory implementations back the tests and the replay tool.

pub mod history;
pub mod issues;
pub mod statuses;
pub mod workflows;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{Comment, Issue, TransitionRecord};
use crate::error::AppResult;

pub use history::InMemoryHistoryLog;
pub use issues::InMemoryIssueStore;
pub use statuses::StatusesRepo;
pub use workflows::WorkflowsRepo;

#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn create_issue(&self, issue: &Issue) -> AppResult<()>;

    /// The single status write the coordinator issues per move. Success or
    /// failure only; no atomicity beyond that is assumed.
    async fn update_status(&self, issue_id: Uuid, status_id: &str) -> AppResult<()>;

    async fn set_field(
        &self,
        issue_id: Uuid,
        field: &str,
        value: serde_json::Value,
    ) -> AppResult<()>;

    async fn clear_field(&self, issue_id: Uuid, field: &str) -> AppResult<()>;

    async fn assign(&self, issue_id: Uuid, assignee_id: Option<Uuid>) -> AppResult<()>;

    async fn add_comment(&self, comment: Comment) -> AppResult<()>;
}

#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn record(&self, record: TransitionRecord) -> AppResult<()>;
}
