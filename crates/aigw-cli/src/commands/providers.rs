//! Provider listing and connectivity checks

use super::print_json;
use aigw_core::registry::Provider;
use aigw_core::Gateway;
use anyhow::Context;
use serde_json::json;

pub fn list(gateway: &Gateway, all: bool, json: bool) -> anyhow::Result<()> {
    let catalog = gateway.registry().snapshot();
    let mut providers: Vec<&Provider> = catalog
        .providers()
        .iter()
        .filter(|p| all || p.active)
        .collect();
    providers.sort_by_key(|p| (p.priority, p.id));

    if json {
        let items: Vec<_> = providers
            .iter()
            .map(|p| {
                let models: Vec<_> = catalog
                    .models_of(p.id)
                    .map(|m| {
                        json!({
                            "id": m.id,
                            "identifier": m.identifier,
                            "modality": m.modality,
                            "max_tokens": m.max_tokens,
                            "active": m.active,
                        })
                    })
                    .collect();
                json!({
                    "id": p.id,
                    "name": p.name,
                    "type": p.provider_type,
                    "endpoint": p.endpoint,
                    "priority": p.priority,
                    "active": p.active,
                    "has_credential": p.credential.is_some(),
                    "models": models,
                })
            })
            .collect();
        return print_json(&json!(items));
    }

    if providers.is_empty() {
        println!("No providers configured");
        return Ok(());
    }

    println!("{:<4} {:<20} {:<10} {:<8} {:<7} ENDPOINT", "ID", "NAME", "TYPE", "PRIORITY", "ACTIVE");
    for provider in &providers {
        println!(
            "{:<4} {:<20} {:<10} {:<8} {:<7} {}",
            provider.id,
            provider.name,
            provider.provider_type.as_str(),
            provider.priority,
            if provider.active { "yes" } else { "no" },
            provider.endpoint
        );
        for model in catalog.models_of(provider.id) {
            println!(
                "       - {} [{}] max_tokens={}{}",
                model.identifier,
                model.modality,
                model.max_tokens,
                if model.active { "" } else { " (inactive)" }
            );
        }
    }
    Ok(())
}

pub async fn test_connection(gateway: &Gateway, provider: &str, json: bool) -> anyhow::Result<()> {
    let id = find_provider(gateway, provider)?;
    let report = gateway.test_connection(id).await?;

    if json {
        return print_json(&serde_json::to_value(&report)?);
    }

    if report.reachable {
        println!("Provider {} is reachable ({} ms)", id, report.latency_ms);
        Ok(())
    } else {
        anyhow::bail!(
            "Provider {} is unreachable after {} ms: {}",
            id,
            report.latency_ms,
            report.error.unwrap_or_default()
        )
    }
}

pub async fn test_all(gateway: &Gateway, json: bool) -> anyhow::Result<()> {
    let reports = gateway.test_all_connections().await;

    if json {
        return print_json(&serde_json::to_value(&reports)?);
    }

    let catalog = gateway.registry().snapshot();
    let mut unreachable = 0;
    for report in &reports {
        let name = catalog
            .provider(report.provider_id)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        if report.reachable {
            println!("  ok    {:<20} {} ms", name, report.latency_ms);
        } else {
            unreachable += 1;
            println!("  fail  {:<20} {}", name, report.error.as_deref().unwrap_or("unknown error"));
        }
    }

    if unreachable > 0 {
        anyhow::bail!("{} of {} provider(s) unreachable", unreachable, reports.len());
    }
    Ok(())
}

/// Accept either a numeric id or a provider name
fn find_provider(gateway: &Gateway, key: &str) -> anyhow::Result<u64> {
    let catalog = gateway.registry().snapshot();
    if let Ok(id) = key.parse::<u64>() {
        if catalog.provider(id).is_some() {
            return Ok(id);
        }
    }
    catalog
        .provider_by_name(key)
        .map(|p| p.id)
        .with_context(|| format!("No provider with id or name '{}'", key))
}
