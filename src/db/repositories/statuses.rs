use std::collections::HashMap;

use crate::db::models::IssueStatus;

/// Administrator-managed status definitions.
#[derive(Default, Clone, Debug)]
pub struct StatusesRepo {
    statuses: HashMap<String, IssueStatus>,
}

impl StatusesRepo {
    pub fn new(statuses: impl IntoIterator<Item = IssueStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn insert(&mut self, status: IssueStatus) -> Option<IssueStatus> {
        self.statuses.insert(status.id.clone(), status)
    }

    pub fn find_by_id(&self, status_id: &str) -> Option<&IssueStatus> {
        self.statuses.get(status_id)
    }

    pub fn find_by_id_mut(&mut self, status_id: &str) -> Option<&mut IssueStatus> {
        self.statuses.get_mut(status_id)
    }

    pub fn contains(&self, status_id: &str) -> bool {
        self.statuses.contains_key(status_id)
    }

    /// Ordered by position, then name.
    pub fn list(&self) -> Vec<&IssueStatus> {
        let mut list: Vec<&IssueStatus> = self.statuses.values().collect();
        list.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        list
    }

    pub fn delete_by_id(&mut self, status_id: &str) -> Option<IssueStatus> {
        self.statuses.remove(status_id)
    }
}
