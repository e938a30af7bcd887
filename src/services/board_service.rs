//! Pure projections from the issue list and column layout to what a board
//! shows. Nothing here mutates its inputs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::enums::{StatusCategory, WipStatus};
use crate::db::models::{Board, BoardColumn, ColumnStatus, Issue};

/// Fraction of `max_issues` at which a column turns to `Warning`.
pub const WIP_WARNING_RATIO: f64 = 0.8;

const COMPLETED_WINDOW_DAYS: i64 = 7;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BoardFilters {
    #[serde(default)]
    pub search: String,
    /// Assignee display names; empty means no assignee filter.
    #[serde(default)]
    pub assignees: Vec<String>,
}

impl BoardFilters {
    pub fn with_search(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Default::default()
        }
    }

    /// Adds the name if absent, removes it if present.
    pub fn toggle_assignee(&mut self, name: &str) {
        if let Some(pos) = self.assignees.iter().position(|n| n == name) {
            self.assignees.remove(pos);
        } else {
            self.assignees.push(name.to_string());
        }
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        let query = self.search.trim().to_lowercase();
        let matches_search = query.is_empty()
            || issue.summary.to_lowercase().contains(&query)
            || issue.issue_key.to_lowercase().contains(&query);

        let matches_assignee = self.assignees.is_empty()
            || issue
                .assignee
                .as_ref()
                .is_some_and(|a| self.assignees.contains(&a.display_name));

        matches_search && matches_assignee
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub column_id: String,
    pub name: String,
    pub issue_ids: Vec<Uuid>,
    pub count: usize,
    pub max_issues: Option<u32>,
    pub wip: WipStatus,
    pub below_minimum: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
    /// Issues whose status maps to no column.
    pub unplaced: Vec<Uuid>,
}

impl BoardView {
    pub fn column(&self, column_id: &str) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.column_id == column_id)
    }

    pub fn column_of_issue(&self, issue_id: Uuid) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.issue_ids.contains(&issue_id))
            .map(|c| c.column_id.as_str())
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct KanbanMetrics {
    pub total_issues: usize,
    pub wip_issues: usize,
    pub completed_this_week: usize,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct CategoryStats {
    pub issues: usize,
    pub story_points: f64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct SprintStats {
    pub todo: CategoryStats,
    pub in_progress: CategoryStats,
    pub done: CategoryStats,
}

impl SprintStats {
    pub fn total_points(&self) -> f64 {
        self.todo.story_points + self.in_progress.story_points + self.done.story_points
    }

    fn bucket_mut(&mut self, category: StatusCategory) -> &mut CategoryStats {
        match category {
            StatusCategory::Todo => &mut self.todo,
            StatusCategory::InProgress => &mut self.in_progress,
            StatusCategory::Done => &mut self.done,
        }
    }
}

pub struct BoardService;

impl BoardService {
    pub fn issue_in_column(issue: &Issue, column: &BoardColumn) -> bool {
        if column.status_ids.is_empty() {
            issue.status_id == column.id
        } else {
            column.status_ids.contains(&issue.status_id)
        }
    }

    /// First matching column; `None` leaves the issue unplaced.
    pub fn column_of<'a>(issue: &Issue, columns: &'a [BoardColumn]) -> Option<&'a BoardColumn> {
        columns.iter().find(|c| Self::issue_in_column(issue, c))
    }

    /// Filtered members of `column`, in source order.
    pub fn issues_in_column<'a>(
        column: &BoardColumn,
        issues: &'a [Issue],
        filters: &BoardFilters,
    ) -> Vec<&'a Issue> {
        issues
            .iter()
            .filter(|i| filters.matches(i))
            .filter(|i| Self::issue_in_column(i, column))
            .collect()
    }

    pub fn wip_for_count(column: &BoardColumn, count: usize) -> WipStatus {
        let Some(max) = column.max_issues.filter(|m| *m > 0) else {
            return WipStatus::Normal;
        };
        let count = count as f64;
        let max = f64::from(max);
        if count >= max {
            WipStatus::Exceeded
        } else if count >= max * WIP_WARNING_RATIO {
            WipStatus::Warning
        } else {
            WipStatus::Normal
        }
    }

    pub fn wip_status(column: &BoardColumn, issues: &[Issue]) -> WipStatus {
        let count = issues.iter().filter(|i| Self::issue_in_column(i, column)).count();
        Self::wip_for_count(column, count)
    }

    pub fn is_below_minimum(column: &BoardColumn, issues: &[Issue]) -> bool {
        let count = issues.iter().filter(|i| Self::issue_in_column(i, column)).count();
        column.min_issues.is_some_and(|min| count < min as usize)
    }

    /// The status an issue gets when dropped on the column.
    pub fn representative_status(column: &BoardColumn) -> &str {
        column
            .status_ids
            .first()
            .map(String::as_str)
            .unwrap_or(column.id.as_str())
    }

    /// Sub-lanes for a column that groups several statuses.
    pub fn column_statuses(column: &BoardColumn) -> Vec<ColumnStatus> {
        if !column.statuses.is_empty() {
            return column.statuses.clone();
        }
        if column.status_ids.len() > 1 {
            return column
                .status_ids
                .iter()
                .map(|id| ColumnStatus {
                    id: id.clone(),
                    name: id.clone(),
                    category: None,
                })
                .collect();
        }
        Vec::new()
    }

    /// WIP figures count every placed issue; filters only narrow what is
    /// listed.
    pub fn project(board: &Board, issues: &[Issue], filters: &BoardFilters) -> BoardView {
        let columns = board
            .columns
            .iter()
            .map(|column| {
                let count = issues.iter().filter(|i| Self::issue_in_column(i, column)).count();
                ColumnView {
                    column_id: column.id.clone(),
                    name: column.name.clone(),
                    issue_ids: Self::issues_in_column(column, issues, filters)
                        .iter()
                        .map(|i| i.id)
                        .collect(),
                    count,
                    max_issues: column.max_issues,
                    wip: Self::wip_for_count(column, count),
                    below_minimum: column.min_issues.is_some_and(|min| count < min as usize),
                }
            })
            .collect();

        let unplaced = issues
            .iter()
            .filter(|i| Self::column_of(i, &board.columns).is_none())
            .map(|i| i.id)
            .collect();

        BoardView { columns, unplaced }
    }

    pub fn kanban_metrics(board: &Board, issues: &[Issue], now: DateTime<Utc>) -> KanbanMetrics {
        let week_ago = now - Duration::days(COMPLETED_WINDOW_DAYS);
        let category_of = |issue: &Issue| {
            Self::column_of(issue, &board.columns).map(|c| c.status_category)
        };

        KanbanMetrics {
            total_issues: issues.len(),
            wip_issues: issues
                .iter()
                .filter(|i| category_of(i) == Some(StatusCategory::InProgress))
                .count(),
            completed_this_week: issues
                .iter()
                .filter(|i| {
                    category_of(i) == Some(StatusCategory::Done) && i.updated_at >= week_ago
                })
                .count(),
        }
    }

    /// Per-category totals by column placement. Unplaced issues are left out.
    pub fn sprint_stats(board: &Board, issues: &[Issue]) -> SprintStats {
        let mut stats = SprintStats::default();
        for issue in issues {
            if let Some(column) = Self::column_of(issue, &board.columns) {
                let bucket = stats.bucket_mut(column.status_category);
                bucket.issues += 1;
                bucket.story_points += issue.story_points.unwrap_or(0.0);
            }
        }
        stats
    }
}
