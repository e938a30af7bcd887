use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::HistoryLog;
use crate::db::models::TransitionRecord;
use crate::error::{AppError, AppResult};

#[derive(Default)]
pub struct InMemoryHistoryLog {
    records: RwLock<Vec<TransitionRecord>>,
    failing: AtomicBool,
}

impl InMemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<TransitionRecord> {
        self.records.read().await.clone()
    }

    pub async fn records_for(&self, issue_id: Uuid) -> Vec<TransitionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.issue_id == issue_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HistoryLog for InMemoryHistoryLog {
    async fn record(&self, record: TransitionRecord) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::store("history log unavailable"));
        }
        self.records.write().await.push(record);
        Ok(())
    }
}
