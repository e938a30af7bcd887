use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::IssueStore;
use crate::db::models::{Assignee, Comment, Issue};
use crate::error::{AppError, AppResult};

/// Issue store kept in process memory, with knobs to simulate a slow or
/// failing backend.
#[derive(Default)]
pub struct InMemoryIssueStore {
    issues: RwLock<HashMap<Uuid, Issue>>,
    comments: RwLock<Vec<Comment>>,
    status_calls: AtomicUsize,
    fail_status_updates: AtomicBool,
    fail_field_updates: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryIssueStore {
    pub fn new(issues: impl IntoIterator<Item = Issue>) -> Self {
        Self {
            issues: RwLock::new(issues.into_iter().map(|i| (i.id, i)).collect()),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_field_updates(&self, fail: bool) {
        self.fail_field_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of `update_status` calls received, successful or not.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub async fn insert(&self, issue: Issue) {
        self.issues.write().await.insert(issue.id, issue);
    }

    pub async fn get(&self, issue_id: Uuid) -> Option<Issue> {
        self.issues.read().await.get(&issue_id).cloned()
    }

    pub async fn comments_for(&self, issue_id: Uuid) -> Vec<Comment> {
        self.comments
            .read()
            .await
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_field_failure(&self) -> AppResult<()> {
        if self.fail_field_updates.load(Ordering::SeqCst) {
            return Err(AppError::store("field update rejected by store"));
        }
        Ok(())
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn create_issue(&self, issue: &Issue) -> AppResult<()> {
        self.simulate_latency().await;
        let mut issues = self.issues.write().await;
        if issues.contains_key(&issue.id) {
            return Err(AppError::conflict_with_code(
                format!("Issue {} already exists", issue.id),
                Some("id".to_string()),
                "issue_exists",
            ));
        }
        issues.insert(issue.id, issue.clone());
        Ok(())
    }

    async fn update_status(&self, issue_id: Uuid, status_id: &str) -> AppResult<()> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(AppError::store("network error while updating issue status"));
        }

        let mut issues = self.issues.write().await;
        let issue = issues
            .get_mut(&issue_id)
            .ok_or_else(|| AppError::not_found("issue"))?;
        issue.status_id = status_id.to_string();
        issue.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn set_field(
        &self,
        issue_id: Uuid,
        field: &str,
        value: serde_json::Value,
    ) -> AppResult<()> {
        self.check_field_failure()?;
        let mut issues = self.issues.write().await;
        let issue = issues
            .get_mut(&issue_id)
            .ok_or_else(|| AppError::not_found("issue"))?;
        apply_field(issue, field, Some(value))
    }

    async fn clear_field(&self, issue_id: Uuid, field: &str) -> AppResult<()> {
        self.check_field_failure()?;
        let mut issues = self.issues.write().await;
        let issue = issues
            .get_mut(&issue_id)
            .ok_or_else(|| AppError::not_found("issue"))?;
        apply_field(issue, field, None)
    }

    async fn assign(&self, issue_id: Uuid, assignee_id: Option<Uuid>) -> AppResult<()> {
        self.check_field_failure()?;
        let mut issues = self.issues.write().await;
        let issue = issues
            .get_mut(&issue_id)
            .ok_or_else(|| AppError::not_found("issue"))?;
        issue.assignee = assignee_id.map(|id| Assignee {
            id,
            display_name: String::new(),
        });
        Ok(())
    }

    async fn add_comment(&self, comment: Comment) -> AppResult<()> {
        self.check_field_failure()?;
        self.comments.write().await.push(comment);
        Ok(())
    }
}

/// Writes a field the way post-functions address it. `None` clears it.
pub fn apply_field(
    issue: &mut Issue,
    field: &str,
    value: Option<serde_json::Value>,
) -> AppResult<()> {
    use serde_json::Value;

    let as_string = |v: Option<Value>| -> AppResult<Option<String>> {
        match v {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(AppError::validation(format!(
                "Field '{}' expects a string, got {}",
                field, other
            ))),
        }
    };

    match field {
        "summary" => match as_string(value)? {
            Some(s) => issue.summary = s,
            None => return Err(AppError::validation("Field 'summary' cannot be cleared")),
        },
        "description" => issue.description = as_string(value)?,
        "resolution" => issue.resolution = as_string(value)?,
        "story_points" => {
            issue.story_points = match value {
                None | Some(Value::Null) => None,
                Some(Value::Number(n)) => n.as_f64(),
                Some(other) => {
                    return Err(AppError::validation(format!(
                        "Field 'story_points' expects a number, got {}",
                        other
                    )));
                }
            }
        }
        "status" | "assignee" => {
            return Err(AppError::validation(format!(
                "Field '{}' cannot be written directly",
                field
            )));
        }
        custom => match value {
            Some(v) => {
                issue.custom_fields.insert(custom.to_string(), v);
            }
            None => {
                issue.custom_fields.remove(custom);
            }
        },
    }
    Ok(())
}
