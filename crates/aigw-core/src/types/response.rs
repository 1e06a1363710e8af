//! Outbound response types

use super::{ModelId, ProviderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token and cost accounting for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: Decimal,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, cost: Decimal) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            cost,
        }
    }
}

/// Successful result of `Gateway::execute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Correlates with the ledger entry and audit record
    pub request_id: Uuid,
    pub content: String,
    /// Parsed JSON for `extract` requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_result: Option<serde_json::Value>,
    pub usage: Usage,
    pub latency_ms: u64,
    pub provider_id: ProviderId,
    pub model_id: ModelId,
    /// Served from the response cache
    pub cached: bool,
}
