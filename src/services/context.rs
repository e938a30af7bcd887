use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The acting user, as seen by transition conditions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub groups: HashSet<String>,
    #[serde(default)]
    pub roles: HashSet<String>,
    #[serde(default)]
    pub permissions: HashSet<String>,
}

impl Actor {
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }
}
