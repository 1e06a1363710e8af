//! Usage ledger and request journal
//!
//! The ledger holds exactly one accounting entry per terminal request
//! outcome. Entries are append-only; moderation flags are the only later
//! change and never touch tokens or cost.

mod entry;
mod journal;
mod jsonl;
mod memory;

pub use entry::{Annotation, LedgerFilter, Moderation, UsageLogEntry, UsageStatus, UsageTotals};
pub use journal::{
    JournalFilter, MemoryJournal, RecordOutcome, RecordStatus, RequestJournal, RequestRecord,
};
pub use jsonl::JsonlLedger;
pub use memory::MemoryLedger;

use crate::error::GatewayResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Append-only usage store
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn append(&self, entry: UsageLogEntry) -> GatewayResult<()>;

    async fn entries(&self, filter: &LedgerFilter) -> GatewayResult<Vec<UsageLogEntry>>;

    /// Attach moderation metadata to an existing entry
    async fn annotate(&self, id: Uuid, annotation: Annotation) -> GatewayResult<UsageLogEntry>;

    /// Aggregate the entries matching `filter`
    async fn totals(&self, filter: &LedgerFilter) -> GatewayResult<UsageTotals> {
        let entries = self.entries(filter).await?;
        Ok(UsageTotals::from_entries(&entries))
    }
}
