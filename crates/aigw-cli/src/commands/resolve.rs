//! Module resolution display

use super::print_json;
use aigw_core::{Gateway, Operation};
use serde_json::json;

pub fn show(gateway: &Gateway, module: &str, operation: Operation, json: bool) -> anyhow::Result<()> {
    let max_providers = gateway.config().failover.max_providers;
    let plan = gateway
        .resolver()
        .plan(module, operation.required_modality(), max_providers)?;
    let configured = gateway.resolver().configuration(module).is_some();

    if json {
        let candidates: Vec<_> = plan
            .candidates
            .iter()
            .map(|c| {
                json!({
                    "provider_id": c.provider.id,
                    "provider": c.provider.name,
                    "model_id": c.model.id,
                    "model": c.model.identifier,
                })
            })
            .collect();
        return print_json(&json!({
            "module": module,
            "configured": configured,
            "max_tokens": plan.limits.max_tokens,
            "temperature": plan.limits.temperature,
            "candidates": candidates,
        }));
    }

    let source = if configured { "module configuration" } else { "system defaults" };
    println!("{} ({}, using {})", module, operation.required_modality(), source);
    println!(
        "  limits: max_tokens={} temperature={}",
        plan.limits.max_tokens, plan.limits.temperature
    );
    for (index, candidate) in plan.candidates.iter().enumerate() {
        let role = if index == 0 { "primary " } else { "failover" };
        println!(
            "  {} {} / {} (provider {}, model {})",
            role, candidate.provider.name, candidate.model.identifier, candidate.provider.id, candidate.model.id
        );
    }
    Ok(())
}
