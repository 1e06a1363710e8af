//! Append-only JSON-lines ledger
//!
//! Each line is either a full entry or a moderation annotation referring to
//! an earlier entry by id. Opening a ledger replays the file in order.

use super::entry::{Annotation, LedgerFilter, UsageLogEntry};
use super::UsageLedger;
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LedgerLine {
    Entry(Box<UsageLogEntry>),
    Annotation {
        id: Uuid,
        annotation: Annotation,
        at: DateTime<Utc>,
    },
}

/// File-backed ledger
#[derive(Debug)]
pub struct JsonlLedger {
    path: PathBuf,
    file: Mutex<File>,
    entries: RwLock<Vec<UsageLogEntry>>,
}

impl JsonlLedger {
    /// Open (creating if needed) a ledger file and load its contents
    pub async fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.display().to_string();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                GatewayError::io_with_path(format!("Failed to create ledger directory: {}", e), &path_str)
            })?;
        }

        let (entries, torn_tail) = if fs::try_exists(&path).await.unwrap_or(false) {
            let content = fs::read_to_string(&path).await.map_err(|e| {
                GatewayError::io_with_path(format!("Failed to read ledger: {}", e), &path_str)
            })?;
            (replay(&content, &path_str), !content.is_empty() && !content.ends_with('\n'))
        } else {
            (Vec::new(), false)
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| GatewayError::io_with_path(format!("Failed to open ledger: {}", e), &path_str))?;

        // Close off an interrupted write so the next entry starts on its own line
        if torn_tail {
            tracing::warn!(path = %path_str, "ledger ends with a partial line");
            file.write_all(b"\n")
                .await
                .map_err(|e| GatewayError::io_with_path(format!("Failed to repair ledger: {}", e), &path_str))?;
            file.flush()
                .await
                .map_err(|e| GatewayError::io_with_path(format!("Failed to repair ledger: {}", e), &path_str))?;
        }

        tracing::debug!(path = %path_str, entries = entries.len(), "ledger opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, line: &LedgerLine) -> GatewayResult<()> {
        let mut bytes = serde_json::to_vec(line)?;
        bytes.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&bytes)
            .await
            .map_err(|e| GatewayError::storage(format!("Failed to append to ledger: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| GatewayError::storage(format!("Failed to flush ledger: {}", e)))?;
        Ok(())
    }
}

fn replay(content: &str, path: &str) -> Vec<UsageLogEntry> {
    let mut entries: Vec<UsageLogEntry> = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LedgerLine>(line) {
            Ok(LedgerLine::Entry(entry)) => entries.push(*entry),
            Ok(LedgerLine::Annotation { id, annotation, at }) => {
                match entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => entry.moderation.apply(&annotation, at),
                    None => tracing::warn!(path, line = number + 1, %id, "annotation for unknown entry"),
                }
            }
            // A torn final write must not make the whole ledger unreadable
            Err(e) => tracing::warn!(path, line = number + 1, error = %e, "skipping malformed ledger line"),
        }
    }
    entries
}

#[async_trait]
impl UsageLedger for JsonlLedger {
    async fn append(&self, entry: UsageLogEntry) -> GatewayResult<()> {
        let line = LedgerLine::Entry(Box::new(entry));
        self.write_line(&line).await?;
        if let LedgerLine::Entry(entry) = line {
            self.entries.write().push(*entry);
        }
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
        if !self.entries.read().iter().any(|e| e.id == id) {
            return Err(GatewayError::not_found("ledger entry", id));
        }

        let at = Utc::now();
        self.write_line(&LedgerLine::Annotation {
            id,
            annotation: annotation.clone(),
            at,
        })
        .await?;

        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| GatewayError::not_found("ledger entry", id))?;
        entry.moderation.apply(&annotation, at);
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UsageStatus;
    use crate::types::{ActorContext, Operation, Usage};
    use rust_decimal::Decimal;

    fn entry() -> UsageLogEntry {
        UsageLogEntry::new(
            Uuid::new_v4(),
            &ActorContext::new("u1", "acme"),
            "DocumentSummarizerAI",
            Operation::Summarize,
        )
        .with_route(1, 2)
        .with_usage(&Usage::new(12, 30, Decimal::new(42, 4)))
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger").join("usage.jsonl");

        let first = entry();
        let second = entry().failed(UsageStatus::Timeout, "AIGW_PROVIDER_TIMEOUT", "timed out");
        {
            let ledger = JsonlLedger::open(&path).await.unwrap();
            ledger.append(first.clone()).await.unwrap();
            ledger.append(second.clone()).await.unwrap();
            ledger.annotate(first.id, Annotation::Flag).await.unwrap();
        }

        let reopened = JsonlLedger::open(&path).await.unwrap();
        let entries = reopened.entries(&LedgerFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first.id);
        assert!(entries[0].moderation.flagged);
        assert_eq!(entries[0].cost, first.cost);
        assert_eq!(entries[1].status, UsageStatus::Timeout);

        let totals = reopened.totals(&LedgerFilter::tenant("acme")).await.unwrap();
        assert_eq!(totals.request_count, 2);
        assert_eq!(totals.total_tokens, 84);
    }

    #[tokio::test]
    async fn test_malformed_tail_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        {
            let ledger = JsonlLedger::open(&path).await.unwrap();
            ledger.append(entry()).await.unwrap();
        }
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"type\":\"entry\",\"id\":");
        std::fs::write(&path, content).unwrap();

        let reopened = JsonlLedger::open(&path).await.unwrap();
        assert_eq!(reopened.entries(&LedgerFilter::default()).await.unwrap().len(), 1);

        let after_crash = entry();
        reopened.append(after_crash.clone()).await.unwrap();
        drop(reopened);

        let again = JsonlLedger::open(&path).await.unwrap();
        let entries = again.entries(&LedgerFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, after_crash.id);
    }

    #[tokio::test]
    async fn test_annotate_unknown_entry() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::open(dir.path().join("usage.jsonl")).await.unwrap();
        let result = ledger.annotate(Uuid::new_v4(), Annotation::Unflag).await;
        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
    }
}
