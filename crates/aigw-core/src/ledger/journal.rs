//! Rich per-request audit records
//!
//! A record is opened as `Pending` before dispatch and moved to a terminal
//! status exactly once. Unlike ledger entries, records may carry the prompt
//! and response payloads and support a review workflow and soft delete.

use crate::error::{GatewayError, GatewayResult};
use crate::types::{ActorContext, ModelId, Operation, ProviderId, Usage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Success,
    Error,
    Timeout,
    Cancelled,
}

impl RecordStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: Uuid,
    pub actor_id: String,
    pub tenant_id: String,
    pub module_name: String,
    pub operation: Operation,
    pub provider_id: Option<ProviderId>,
    pub model_id: Option<ModelId>,
    pub status: RecordStatus,
    pub prompt: Option<String>,
    pub response: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost: Decimal,
    pub processing_time_ms: u64,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    /// A pending record for a request about to be dispatched
    pub fn pending(id: Uuid, actor: &ActorContext, module_name: impl Into<String>, operation: Operation) -> Self {
        Self {
            id,
            actor_id: actor.actor_id.clone(),
            tenant_id: actor.tenant_id.clone(),
            module_name: module_name.into(),
            operation,
            provider_id: None,
            model_id: None,
            status: RecordStatus::Pending,
            prompt: None,
            response: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            cost: Decimal::ZERO,
            processing_time_ms: 0,
            error_code: None,
            error_detail: None,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
            flagged: false,
            flag_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
            completed_at: None,
            deleted_at: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Terminal outcome written onto a pending record
#[derive(Debug, Clone, Default)]
pub struct RecordOutcome {
    pub status: Option<RecordStatus>,
    pub provider_id: Option<ProviderId>,
    pub model_id: Option<ModelId>,
    pub response: Option<String>,
    pub usage: Usage,
    pub processing_time_ms: u64,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
}

impl RecordOutcome {
    pub fn success(provider_id: ProviderId, model_id: ModelId, usage: Usage) -> Self {
        Self {
            status: Some(RecordStatus::Success),
            provider_id: Some(provider_id),
            model_id: Some(model_id),
            usage,
            ..Default::default()
        }
    }

    pub fn failure(status: RecordStatus, code: &str, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            error_code: Some(code.to_string()),
            error_detail: Some(detail.into()),
            ..Default::default()
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_route(mut self, provider_id: Option<ProviderId>, model_id: Option<ModelId>) -> Self {
        self.provider_id = provider_id;
        self.model_id = model_id;
        self
    }

    pub fn with_latency(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    pub tenant_id: Option<String>,
    pub module_name: Option<String>,
    pub flagged_only: bool,
    pub include_deleted: bool,
}

impl JournalFilter {
    fn matches(&self, record: &RequestRecord) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| &record.tenant_id == t)
            && self.module_name.as_ref().is_none_or(|m| &record.module_name == m)
            && (!self.flagged_only || record.flagged)
            && (self.include_deleted || !record.is_deleted())
    }
}

/// Store for request audit records
#[async_trait]
pub trait RequestJournal: Send + Sync {
    /// Insert a new pending record
    async fn open(&self, record: RequestRecord) -> GatewayResult<()>;

    /// Move a pending record to its terminal status; fails if already terminal
    async fn complete(&self, id: Uuid, outcome: RecordOutcome) -> GatewayResult<RequestRecord>;

    /// A record that has not been soft-deleted
    async fn get(&self, id: Uuid) -> GatewayResult<RequestRecord>;

    async fn list(&self, filter: &JournalFilter) -> GatewayResult<Vec<RequestRecord>>;

    async fn flag(&self, id: Uuid, reason: Option<String>) -> GatewayResult<RequestRecord>;

    async fn unflag(&self, id: Uuid) -> GatewayResult<RequestRecord>;

    async fn mark_reviewed(&self, id: Uuid, reviewer: &str) -> GatewayResult<RequestRecord>;

    async fn soft_delete(&self, id: Uuid) -> GatewayResult<RequestRecord>;
}

const DEFAULT_CAPACITY: usize = 10_000;

/// Process-local journal
///
/// Holds at most `capacity` records; opening a record past that evicts the
/// oldest finished one. Pending records are never evicted.
#[derive(Debug)]
pub struct MemoryJournal {
    capacity: usize,
    state: RwLock<JournalState>,
}

#[derive(Debug, Default)]
struct JournalState {
    records: HashMap<Uuid, RequestRecord>,
    order: VecDeque<Uuid>,
}

impl JournalState {
    fn evict_finished(&mut self) -> bool {
        let Some(pos) = self
            .order
            .iter()
            .position(|id| self.records.get(id).is_some_and(|r| r.status.is_terminal()))
        else {
            return false;
        };
        if let Some(id) = self.order.remove(pos) {
            self.records.remove(&id);
        }
        true
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: RwLock::new(JournalState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F>(&self, id: Uuid, f: F) -> GatewayResult<RequestRecord>
    where
        F: FnOnce(&mut RequestRecord) -> GatewayResult<()>,
    {
        let mut state = self.state.write();
        let record = state
            .records
            .get_mut(&id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| GatewayError::not_found("request record", id))?;
        f(record)?;
        Ok(record.clone())
    }
}

#[async_trait]
impl RequestJournal for MemoryJournal {
    async fn open(&self, record: RequestRecord) -> GatewayResult<()> {
        let mut state = self.state.write();
        if state.records.contains_key(&record.id) {
            return Err(GatewayError::storage(format!("request record {} already exists", record.id)));
        }
        while state.records.len() >= self.capacity {
            if !state.evict_finished() {
                tracing::warn!(capacity = self.capacity, "journal full of pending records");
                break;
            }
        }
        state.order.push_back(record.id);
        state.records.insert(record.id, record);
        Ok(())
    }

    async fn complete(&self, id: Uuid, outcome: RecordOutcome) -> GatewayResult<RequestRecord> {
        self.update(id, |record| {
            if record.status.is_terminal() {
                return Err(GatewayError::validation(format!(
                    "request record {} is already {:?}",
                    id, record.status
                )));
            }
            let status = outcome.status.unwrap_or(RecordStatus::Error);
            if !status.is_terminal() {
                return Err(GatewayError::validation("outcome status must be terminal"));
            }

            record.status = status;
            record.provider_id = outcome.provider_id.or(record.provider_id);
            record.model_id = outcome.model_id.or(record.model_id);
            record.response = outcome.response;
            record.prompt_tokens = outcome.usage.prompt_tokens;
            record.completion_tokens = outcome.usage.completion_tokens;
            record.cost = outcome.usage.cost;
            record.processing_time_ms = outcome.processing_time_ms;
            record.error_code = outcome.error_code;
            record.error_detail = outcome.error_detail;
            record.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn get(&self, id: Uuid) -> GatewayResult<RequestRecord> {
        self.state
            .read()
            .records
            .get(&id)
            .filter(|r| !r.is_deleted())
            .cloned()
            .ok_or_else(|| GatewayError::not_found("request record", id))
    }

    async fn list(&self, filter: &JournalFilter) -> GatewayResult<Vec<RequestRecord>> {
        let state = self.state.read();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn flag(&self, id: Uuid, reason: Option<String>) -> GatewayResult<RequestRecord> {
        self.update(id, |record| {
            record.flagged = true;
            record.flag_reason = reason;
            Ok(())
        })
    }

    async fn unflag(&self, id: Uuid) -> GatewayResult<RequestRecord> {
        self.update(id, |record| {
            record.flagged = false;
            record.flag_reason = None;
            Ok(())
        })
    }

    async fn mark_reviewed(&self, id: Uuid, reviewer: &str) -> GatewayResult<RequestRecord> {
        self.update(id, |record| {
            record.reviewed_by = Some(reviewer.to_string());
            record.reviewed_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn soft_delete(&self, id: Uuid) -> GatewayResult<RequestRecord> {
        self.update(id, |record| {
            record.deleted_at = Some(Utc::now());
            Ok(())
        })
    }
}
