//! Failover across providers, timeouts and cancellation
//!
//! Runs on a paused clock: a hanging adapter costs no wall time, the runtime
//! jumps straight to the request timeout.

mod common;

use aigw_core::config::GatewayConfig;
use aigw_core::ledger::{LedgerFilter, RecordStatus, RequestJournal};
use aigw_core::providers::{ProviderAdapter, ProviderFailure};
use aigw_core::registry::ProviderUpdate;
use aigw_core::{ExecuteOptions, ExecuteRequest, GatewayError, ProviderErrorKind, UsageLedger, UsageStatus};
use common::{ScriptedAdapter, Step, actor, catalog_with, gateway};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn dyn_adapter(adapter: &Arc<ScriptedAdapter>) -> Arc<dyn ProviderAdapter> {
    adapter.clone()
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fails_over_to_next_provider() {
    let (catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    let primary = ScriptedAdapter::hanging();
    let secondary = ScriptedAdapter::replying("from secondary");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap();

    assert_eq!(response.content, "from secondary");
    assert_eq!(response.provider_id, routes[1].provider_id);
    assert!(response.latency_ms >= 60_000);
    assert_eq!(primary.calls(), 1);

    let entries = fx.ledger.entries(&LedgerFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, UsageStatus::Success);
    assert_eq!(entries[0].provider_id, Some(routes[1].provider_id));
    assert_eq!(entries[0].model_id, Some(routes[1].model_id));
}

#[tokio::test(start_paused = true)]
async fn test_retryable_status_fails_over() {
    let (catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    let primary = ScriptedAdapter::failing(ProviderFailure::from_status(503, "overloaded"));
    let secondary = ScriptedAdapter::replying("ok");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap();
    assert_eq!(response.provider_id, routes[1].provider_id);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_rejection_stops_failover() {
    let (catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    let primary = ScriptedAdapter::failing(ProviderFailure::from_status(400, "context length exceeded"));
    let secondary = ScriptedAdapter::replying("unused");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    let err = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap_err();

    match &err {
        GatewayError::Provider { kind, attempts, .. } => {
            assert_eq!(*kind, ProviderErrorKind::VendorRejected);
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.user_message().contains("context length"));
    assert_eq!(secondary.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_failover_reports_last_failure() {
    let (catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    let primary = ScriptedAdapter::failing(ProviderFailure::Transport("connection refused".into()));
    let secondary = ScriptedAdapter::hanging();
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    let err = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap_err();

    let GatewayError::Provider {
        kind,
        attempts,
        reference,
    } = &err
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*kind, ProviderErrorKind::Timeout);
    assert_eq!(*attempts, 2);
    assert_eq!(err.http_status(), 504);

    let entries = fx.ledger.entries(&LedgerFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(&entry.id.to_string(), reference);
    assert_eq!(entry.status, UsageStatus::Timeout);
    assert_eq!(entry.error_code.as_deref(), Some("AIGW_PROVIDER_TIMEOUT"));
    assert_eq!(entry.provider_id, Some(routes[1].provider_id));
    assert_eq!(entry.total_tokens, 0);

    let record = fx.journal.get(entry.id).await.unwrap();
    assert_eq!(record.status, RecordStatus::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_failover_bounded_by_max_providers() {
    let (catalog, routes) = catalog_with(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)]);
    let adapters: Vec<Arc<ScriptedAdapter>> = routes
        .iter()
        .map(|_| ScriptedAdapter::failing(ProviderFailure::Transport("down".into())))
        .collect();
    let mut config = GatewayConfig::default();
    config.failover.max_providers = 2;
    let fx = gateway(
        config,
        catalog,
        routes
            .iter()
            .zip(&adapters)
            .map(|(route, adapter)| (route.provider_id, dyn_adapter(adapter)))
            .collect(),
    )
    .await;

    let err = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Provider { attempts: 2, .. }));
    let calls: Vec<usize> = adapters.iter().map(|a| a.calls()).collect();
    assert_eq!(calls, vec![1, 1, 0, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_dispatch() {
    let (catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    let primary = ScriptedAdapter::hanging();
    let secondary = ScriptedAdapter::replying("unused");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let request = ExecuteRequest::complete("ChatAssistant", "hello")
        .with_options(ExecuteOptions::default().with_cancellation(token));
    let err = fx.gateway.execute(&actor(), request).await.unwrap_err();

    assert_eq!(err, GatewayError::Cancelled);
    assert_eq!(secondary.calls(), 0);

    let entries = fx.ledger.entries(&LedgerFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, UsageStatus::Cancelled);
    assert!(entries[0].processing_time_ms < 60_000);

    let record = fx.journal.get(entries[0].id).await.unwrap();
    assert_eq!(record.status, RecordStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_provider_request_ceiling_skips_to_next() {
    let (mut catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    catalog
        .update_provider(
            routes[0].provider_id,
            ProviderUpdate {
                max_requests_per_minute: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    let primary = ScriptedAdapter::replying("primary");
    let secondary = ScriptedAdapter::replying("secondary");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    let first = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "first"))
        .await
        .unwrap();
    let second = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "second"))
        .await
        .unwrap();

    assert_eq!(first.provider_id, routes[0].provider_id);
    assert_eq!(second.provider_id, routes[1].provider_id);
    assert_eq!(primary.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deactivated_provider_is_not_routed() {
    let (catalog, routes) = catalog_with(&[("Primary", 1), ("Secondary", 2)]);
    let primary = ScriptedAdapter::replying("primary");
    let secondary = ScriptedAdapter::replying("secondary");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![
            (routes[0].provider_id, dyn_adapter(&primary)),
            (routes[1].provider_id, dyn_adapter(&secondary)),
        ],
    )
    .await;

    fx.gateway.deactivate_provider(routes[0].provider_id).await.unwrap();
    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap();

    assert_eq!(response.provider_id, routes[1].provider_id);
    assert_eq!(primary.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scripted_recovery_on_same_provider_next_request() {
    let (catalog, routes) = catalog_with(&[("Only", 1)]);
    let only = ScriptedAdapter::new(
        vec![Step::Fail(ProviderFailure::from_status(502, "bad gateway"))],
        Step::Reply(aigw_core::providers::Invocation::new("recovered").with_usage(1, 1)),
    );
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, dyn_adapter(&only))],
    )
    .await;

    let err = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "AIGW_PROVIDER_REJECTED");
    assert!(err.is_retryable());

    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "hello"))
        .await
        .unwrap();
    assert_eq!(response.content, "recovered");

    let errors = LedgerFilter {
        status: Some(UsageStatus::Error),
        ..Default::default()
    };
    assert_eq!(fx.ledger.entries(&errors).await.unwrap().len(), 1);
}
