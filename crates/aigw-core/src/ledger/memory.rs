//! In-memory usage ledger

use super::entry::{Annotation, LedgerFilter, UsageLogEntry};
use super::UsageLedger;
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

/// Process-local ledger, lost on restart
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RwLock<Vec<UsageLogEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl UsageLedger for MemoryLedger {
    async fn append(&self, entry: UsageLogEntry) -> GatewayResult<()> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn entries(&self, filter: &LedgerFilter) -> GatewayResult<Vec<UsageLogEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn annotate(&self, id: Uuid, annotation: Annotation) -> GatewayResult<UsageLogEntry> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| GatewayError::not_found("ledger entry", id))?;
        entry.moderation.apply(&annotation, Utc::now());
        Ok(entry.clone())
    }
}
