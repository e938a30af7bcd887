use tracing::info;

use crate::{
    db::models::{CreateStatusRequest, Issue, IssueStatus, UpdateStatusRequest},
    db::repositories::{statuses::StatusesRepo, workflows::WorkflowsRepo},
    error::AppError,
    validation::{status::validate_update_status, validate_request},
};

pub struct StatusesService;

impl StatusesService {
    pub fn list(repo: &StatusesRepo) -> Vec<&IssueStatus> {
        repo.list()
    }

    pub fn create(
        repo: &mut StatusesRepo,
        req: CreateStatusRequest,
    ) -> Result<IssueStatus, AppError> {
        validate_request(&req)?;

        if repo.contains(&req.id) {
            return Err(AppError::conflict_with_code(
                "Status already exists",
                Some("id".to_string()),
                "STATUS_EXISTS",
            ));
        }

        let status = IssueStatus::from(req);
        repo.insert(status.clone());
        info!(status_id = %status.id, category = %status.category, "Status created");
        Ok(status)
    }

    pub fn update(
        repo: &mut StatusesRepo,
        status_id: &str,
        changes: UpdateStatusRequest,
    ) -> Result<IssueStatus, AppError> {
        validate_update_status(&changes)?;

        let status = repo
            .find_by_id_mut(status_id)
            .ok_or_else(|| AppError::not_found("status"))?;

        if let Some(name) = changes.name {
            status.name = name;
        }
        if let Some(description) = changes.description {
            status.description = Some(description);
        }
        if let Some(color) = changes.color {
            status.color = color;
        }
        if let Some(category) = changes.category {
            status.category = category;
        }
        if let Some(position) = changes.position {
            status.position = position;
        }

        Ok(status.clone())
    }

    /// Refused while any issue or workflow step still points at the status.
    pub fn delete(
        repo: &mut StatusesRepo,
        workflows: &WorkflowsRepo,
        issues: &[Issue],
        status_id: &str,
    ) -> Result<(), AppError> {
        if !repo.contains(status_id) {
            return Err(AppError::not_found("status"));
        }

        let issue_refs = issues.iter().filter(|i| i.status_id == status_id).count();
        if issue_refs > 0 {
            return Err(AppError::conflict_with_code(
                format!("Status is used by {} issue(s)", issue_refs),
                Some("id".to_string()),
                "STATUS_IN_USE",
            ));
        }

        let referencing: Vec<&str> = workflows
            .all()
            .filter(|w| w.steps.iter().any(|s| s.status_id == status_id))
            .map(|w| w.name.as_str())
            .collect();
        if !referencing.is_empty() {
            return Err(AppError::conflict_with_code(
                format!("Status is used by workflow(s): {}", referencing.join(", ")),
                Some("id".to_string()),
                "STATUS_IN_USE",
            ));
        }

        repo.delete_by_id(status_id);
        info!(status_id, "Status deleted");
        Ok(())
    }
}
