//! Tenant budget enforcement
//!
//! Spend is derived from the usage ledger and cached as running totals per
//! tenant and period. Successful requests add to the running totals
//! immediately; totals are re-aggregated from the ledger once they are older
//! than the refresh interval or the period rolls over. Concurrent requests may
//! overshoot briefly, re-aggregation corrects it.

use crate::config::BudgetConfig;
use crate::error::GatewayResult;
use crate::ledger::{LedgerFilter, UsageLedger};
use crate::types::{Period, PeriodWindow};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    Allowed,
    Exceeded { period: Period },
}

/// Tokens and cost accrued in one period window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSpend {
    pub window: PeriodWindow,
    pub tokens: u64,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Copy)]
struct RunningTotal {
    spend: PeriodSpend,
    refreshed_at: Instant,
}

pub struct BudgetGuard {
    ledger: Arc<dyn UsageLedger>,
    config: BudgetConfig,
    totals: Mutex<HashMap<(String, Period), RunningTotal>>,
}

impl std::fmt::Debug for BudgetGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetGuard")
            .field("config", &self.config)
            .field("tracked", &self.totals.lock().len())
            .finish()
    }
}

impl BudgetGuard {
    pub fn new(ledger: Arc<dyn UsageLedger>, config: BudgetConfig) -> Self {
        Self {
            ledger,
            config,
            totals: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `tenant_id` may start another request at `now`
    ///
    /// The daily token limit is checked before the monthly cost limit; a
    /// limit of `0` is unlimited.
    pub async fn check_budget(&self, tenant_id: &str, now: DateTime<Utc>) -> GatewayResult<BudgetDecision> {
        let daily_limit = self.config.daily_token_limit_for(tenant_id);
        if daily_limit > 0 {
            let spend = self.spend(tenant_id, Period::Daily, now).await?;
            if spend.tokens >= daily_limit {
                tracing::warn!(tenant_id, tokens = spend.tokens, limit = daily_limit, "daily token budget exceeded");
                return Ok(BudgetDecision::Exceeded { period: Period::Daily });
            }
        }

        let monthly_limit = self.config.monthly_cost_limit_for(tenant_id);
        if monthly_limit > Decimal::ZERO {
            let spend = self.spend(tenant_id, Period::Monthly, now).await?;
            if spend.cost >= monthly_limit {
                tracing::warn!(tenant_id, cost = %spend.cost, limit = %monthly_limit, "monthly cost budget exceeded");
                return Ok(BudgetDecision::Exceeded { period: Period::Monthly });
            }
        }

        Ok(BudgetDecision::Allowed)
    }

    /// Current spend for a tenant in the period window containing `now`
    pub async fn spend(&self, tenant_id: &str, period: Period, now: DateTime<Utc>) -> GatewayResult<PeriodSpend> {
        let window = period.window_at(now);
        let key = (tenant_id.to_string(), period);

        if let Some(total) = self.totals.lock().get(&key) {
            let fresh = total.spend.window == window
                && total.refreshed_at.elapsed() < self.config.refresh_interval;
            if fresh {
                return Ok(total.spend);
            }
        }

        let filter = LedgerFilter::tenant(tenant_id).between(window.start, window.end);
        let totals = self.ledger.totals(&filter).await?;
        let spend = PeriodSpend {
            window,
            tokens: totals.total_tokens,
            cost: totals.total_cost,
        };
        tracing::debug!(tenant_id, %period, tokens = spend.tokens, cost = %spend.cost, "budget totals re-aggregated");

        self.totals.lock().insert(
            key,
            RunningTotal {
                spend,
                refreshed_at: Instant::now(),
            },
        );
        Ok(spend)
    }

    /// Add a completed request's usage to the tracked running totals
    pub fn record(&self, tenant_id: &str, tokens: u64, cost: Decimal, at: DateTime<Utc>) {
        let mut totals = self.totals.lock();
        for period in [Period::Daily, Period::Monthly] {
            if let Some(total) = totals.get_mut(&(tenant_id.to_string(), period)) {
                if total.spend.window.contains(at) {
                    total.spend.tokens += tokens;
                    total.spend.cost += cost;
                }
            }
        }
    }

    /// Drop cached totals so the next check re-aggregates from the ledger
    pub fn invalidate(&self, tenant_id: &str) {
        self.totals.lock().retain(|(tenant, _), _| tenant != tenant_id);
    }
}
