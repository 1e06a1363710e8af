use super::Gateway;
use crate::error::GatewayResult;
use crate::ledger::{LedgerFilter, UsageTotals};
use crate::types::Period;
use chrono::{DateTime, Utc};

impl Gateway {
    /// Usage for a tenant (optionally one module) in the current period
    pub async fn get_usage(&self, tenant_id: &str, module: Option<&str>, period: Period) -> GatewayResult<UsageTotals> {
        self.get_usage_at(tenant_id, module, period, Utc::now()).await
    }

    /// Usage in the period window containing `at`
    pub async fn get_usage_at(
        &self,
        tenant_id: &str,
        module: Option<&str>,
        period: Period,
        at: DateTime<Utc>,
    ) -> GatewayResult<UsageTotals> {
        let window = period.window_at(at);
        let mut filter = LedgerFilter::tenant(tenant_id).between(window.start, window.end);
        if let Some(module) = module {
            filter = filter.with_module(module);
        }
        self.ledger.totals(&filter).await
    }
}
