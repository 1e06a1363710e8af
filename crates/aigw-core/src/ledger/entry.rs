//! Usage ledger records

use crate::types::{ActorContext, ModelId, Operation, ProviderId, Usage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Terminal status of a ledgered request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStatus {
    Success,
    Error,
    Timeout,
    /// Caller went away before a provider answered; an error class distinct from timeout
    Cancelled,
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Administrator metadata attached after the fact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderation {
    pub flagged: bool,
    pub reviewed: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// A moderation change applied to an existing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Annotation {
    Flag,
    Unflag,
    Review { reviewer: String },
}

impl Moderation {
    pub fn apply(&mut self, annotation: &Annotation, at: DateTime<Utc>) {
        match annotation {
            Annotation::Flag => self.flagged = true,
            Annotation::Unflag => self.flagged = false,
            Annotation::Review { reviewer } => {
                self.reviewed = true;
                self.reviewed_by = Some(reviewer.clone());
                self.reviewed_at = Some(at);
            }
        }
    }
}

/// One accounting record per terminal request outcome
///
/// Everything except `moderation` is immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    /// Same id as the response and audit record
    pub id: Uuid,
    pub actor_id: String,
    pub tenant_id: String,
    pub module_name: String,
    pub operation: Operation,
    pub provider_id: Option<ProviderId>,
    pub model_id: Option<ModelId>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: Decimal,
    pub processing_time_ms: u64,
    pub status: UsageStatus,
    pub error_code: Option<String>,
    /// Redacted failure detail
    pub error_detail: Option<String>,
    /// Request fingerprint
    pub request_hash: Option<String>,
    /// Served from the response cache at zero cost
    pub cache_hit: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub moderation: Moderation,
}

impl UsageLogEntry {
    /// A successful, zero-usage entry to be filled in with the builder methods
    pub fn new(id: Uuid, actor: &ActorContext, module_name: impl Into<String>, operation: Operation) -> Self {
        Self {
            id,
            actor_id: actor.actor_id.clone(),
            tenant_id: actor.tenant_id.clone(),
            module_name: module_name.into(),
            operation,
            provider_id: None,
            model_id: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost: Decimal::ZERO,
            processing_time_ms: 0,
            status: UsageStatus::Success,
            error_code: None,
            error_detail: None,
            request_hash: None,
            cache_hit: false,
            created_at: Utc::now(),
            moderation: Moderation::default(),
        }
    }

    pub fn with_route(mut self, provider_id: ProviderId, model_id: ModelId) -> Self {
        self.provider_id = Some(provider_id);
        self.model_id = Some(model_id);
        self
    }

    pub fn with_usage(mut self, usage: &Usage) -> Self {
        self.prompt_tokens = usage.prompt_tokens;
        self.completion_tokens = usage.completion_tokens;
        self.total_tokens = usage.total_tokens;
        self.cost = usage.cost;
        self
    }

    pub fn with_latency(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }

    pub fn with_fingerprint(mut self, hash: impl Into<String>) -> Self {
        self.request_hash = Some(hash.into());
        self
    }

    /// Mark as cache-served; accounting stays at zero
    pub fn cache_served(mut self) -> Self {
        self.cache_hit = true;
        self
    }

    pub fn failed(mut self, status: UsageStatus, code: &str, detail: impl Into<String>) -> Self {
        self.status = status;
        self.error_code = Some(code.to_string());
        self.error_detail = Some(detail.into());
        self
    }
}

/// Selection over ledger entries; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub tenant_id: Option<String>,
    pub module_name: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub until: Option<DateTime<Utc>>,
    pub status: Option<UsageStatus>,
    pub flagged_only: bool,
}

impl LedgerFilter {
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, entry: &UsageLogEntry) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| &entry.tenant_id == t)
            && self.module_name.as_ref().is_none_or(|m| &entry.module_name == m)
            && self.since.is_none_or(|s| entry.created_at >= s)
            && self.until.is_none_or(|u| entry.created_at < u)
            && self.status.is_none_or(|s| entry.status == s)
            && (!self.flagged_only || entry.moderation.flagged)
    }
}

/// Aggregated usage figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub request_count: u64,
    pub total_tokens: u64,
    pub total_cost: Decimal,
}

impl UsageTotals {
    pub fn add(&mut self, entry: &UsageLogEntry) {
        self.request_count += 1;
        self.total_tokens += u64::from(entry.total_tokens);
        self.total_cost += entry.cost;
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a UsageLogEntry>) -> Self {
        let mut totals = Self::default();
        for entry in entries {
            totals.add(entry);
        }
        totals
    }
}
