use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::status::StatusId;

/// Activity-feed entry for a committed transition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransitionRecord {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub transition_id: Uuid,
    pub transition_name: String,
    pub from_status: StatusId,
    pub to_status: StatusId,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
