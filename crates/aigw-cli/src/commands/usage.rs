//! Usage report

use super::print_json;
use aigw_core::{Gateway, Period};
use serde_json::json;

pub async fn report(
    gateway: &Gateway,
    tenant: &str,
    module: Option<&str>,
    period: Period,
    json: bool,
) -> anyhow::Result<()> {
    let totals = gateway.get_usage(tenant, module, period).await?;

    if json {
        return print_json(&json!({
            "tenant": tenant,
            "module": module,
            "period": period,
            "request_count": totals.request_count,
            "total_tokens": totals.total_tokens,
            "total_cost": totals.total_cost,
        }));
    }

    let scope = module.map(|m| format!(" / {}", m)).unwrap_or_default();
    println!("Usage for {}{} ({})", tenant, scope, period);
    println!("  requests: {}", totals.request_count);
    println!("  tokens:   {}", totals.total_tokens);
    println!("  cost:     {}", totals.total_cost);
    Ok(())
}
