//! End-to-end request path: validation, routing, caching and ledgering

mod common;

use aigw_core::config::GatewayConfig;
use aigw_core::ledger::{JournalFilter, LedgerFilter, RecordStatus, RequestJournal};
use aigw_core::providers::{Invocation, InvocationKind, ProviderAdapter};
use aigw_core::{
    ChatMessage, ChatRole, ExecuteOptions, ExecuteRequest, GatewayError, Modality, UsageLedger, UsageStatus,
};
use common::{MockAdapter, ScriptedAdapter, actor, catalog_with, gateway, init_tracing, price};
use rust_decimal::Decimal;
use std::sync::Arc;

#[tokio::test]
async fn test_summarize_is_routed_priced_and_ledgered() {
    init_tracing();
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("Quarterly revenue grew 12%.");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let response = fx
        .gateway
        .execute(
            &actor(),
            ExecuteRequest::summarize("DocumentSummarizerAI", "A long quarterly report about revenue."),
        )
        .await
        .unwrap();

    assert_eq!(response.content, "Quarterly revenue grew 12%.");
    assert!(!response.cached);
    assert_eq!(response.provider_id, routes[0].provider_id);
    assert_eq!(response.usage.total_tokens, 20);
    // 12 * 0.000001 + 8 * 0.000002
    assert_eq!(response.usage.cost, price("0.000028"));

    let sent = adapter.last_request().unwrap();
    assert_eq!(sent.messages[0].role, ChatRole::System);
    assert_eq!(sent.messages[1].content, "A long quarterly report about revenue.");
    assert_eq!(sent.max_tokens, 1024);

    let entries = fx.ledger.entries(&LedgerFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.id, response.request_id);
    assert_eq!(entry.module_name, "DocumentSummarizerAI");
    assert_eq!(entry.tenant_id, "acme");
    assert_eq!(entry.status, UsageStatus::Success);
    assert_eq!(entry.total_tokens, 20);
    assert_eq!(entry.provider_id, Some(routes[0].provider_id));
    assert!(entry.request_hash.is_some());

    let record = fx.journal.get(response.request_id).await.unwrap();
    assert_eq!(record.status, RecordStatus::Success);
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn test_identical_request_is_served_from_cache() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let mut mock = MockAdapter::new();
    mock.expect_name().return_const("mock");
    mock.expect_invoke()
        .times(1)
        .returning(|_, _| Ok(Invocation::new("Paris").with_usage(30, 10)));
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, Arc::new(mock) as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let first = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("GeoQuiz", "Capital of France?"))
        .await
        .unwrap();
    // Whitespace differences normalize to the same fingerprint
    let second = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("GeoQuiz", "Capital  of   France?"))
        .await
        .unwrap();

    assert_eq!(second.content, first.content);
    assert!(second.cached);
    assert_eq!(second.usage.total_tokens, 40);
    assert_eq!(second.usage.cost, Decimal::ZERO);
    assert_ne!(second.request_id, first.request_id);

    let entries = fx.ledger.entries(&LedgerFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 2);
    let hit = entries.iter().find(|e| e.id == second.request_id).unwrap();
    assert!(hit.cache_hit);
    assert_eq!(hit.total_tokens, 0);
    assert_eq!(hit.cost, Decimal::ZERO);
    assert_eq!(hit.provider_id, Some(routes[0].provider_id));

    let stats = fx.gateway.cache_statistics().await.unwrap();
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_skip_cache_always_dispatches() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("fresh");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    for _ in 0..2 {
        let request = ExecuteRequest::complete("GeoQuiz", "Capital of Spain?")
            .with_options(ExecuteOptions::default().without_cache());
        let response = fx.gateway.execute(&actor(), request).await.unwrap();
        assert!(!response.cached);
    }
    // A skipped write means a normal request afterwards still misses
    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("GeoQuiz", "Capital of Spain?"))
        .await
        .unwrap();
    assert!(!response.cached);
    assert_eq!(adapter.calls(), 3);
}

#[tokio::test]
async fn test_cache_disabled_in_config() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("fresh");
    let mut config = GatewayConfig::default();
    config.cache.enabled = false;
    let fx = gateway(
        config,
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    for _ in 0..2 {
        let response = fx
            .gateway
            .execute(&actor(), ExecuteRequest::complete("GeoQuiz", "Capital of Italy?"))
            .await
            .unwrap();
        assert!(!response.cached);
    }
    assert_eq!(adapter.calls(), 2);
}

#[tokio::test]
async fn test_validation_failure_has_no_side_effects() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("unused");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let err = fx
        .gateway
        .execute(&actor(), ExecuteRequest::chat("ChatAssistant", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation { .. }));

    let too_hot = ExecuteRequest::complete("ChatAssistant", "hello")
        .with_options(ExecuteOptions::default().with_temperature(3.5));
    let err = fx.gateway.execute(&actor(), too_hot).await.unwrap_err();
    assert_eq!(err.error_code(), "AIGW_VALIDATION");

    assert_eq!(adapter.calls(), 0);
    assert!(fx.ledger.is_empty());
    assert!(fx.journal.list(&JournalFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_permission_denied_before_anything_else() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("unused");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    // Invalid payload too, but the capability check wins
    let denied = actor().with_permission(false);
    let err = fx
        .gateway
        .execute(&denied, ExecuteRequest::complete("ChatAssistant", ""))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::PermissionDenied);
    assert_eq!(err.http_status(), 403);
    assert!(fx.ledger.is_empty());
}

#[tokio::test]
async fn test_chat_messages_are_forwarded() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("Sure, here is a plan.");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let messages = vec![
        ChatMessage::system("You are a planning assistant."),
        ChatMessage::user("Plan my week."),
    ];
    let request = ExecuteRequest::chat("ChatAssistant", messages.clone())
        .with_options(ExecuteOptions::default().with_max_tokens(200));
    fx.gateway.execute(&actor(), request).await.unwrap();

    let sent = adapter.last_request().unwrap();
    assert_eq!(sent.kind, InvocationKind::Chat);
    assert_eq!(sent.messages, messages);
    assert_eq!(sent.max_tokens, 200);
}

#[tokio::test]
async fn test_extract_returns_structured_result() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("```json\n{\"invoice_number\": \"INV-42\", \"total\": 99.5}\n```");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let response = fx
        .gateway
        .execute(
            &actor(),
            ExecuteRequest::extract(
                "InvoiceParser",
                "Invoice INV-42, total due 99.50",
                vec!["invoice_number".into(), "total".into()],
            ),
        )
        .await
        .unwrap();

    let structured = response.structured_result.unwrap();
    assert_eq!(structured["invoice_number"], "INV-42");
    assert_eq!(structured["total"], 99.5);
}

#[tokio::test]
async fn test_missing_usage_is_estimated() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying_without_usage("abcdefgh");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::complete("ChatAssistant", "abcd"))
        .await
        .unwrap();
    assert_eq!(response.usage.prompt_tokens, 1);
    assert_eq!(response.usage.completion_tokens, 2);
}

#[tokio::test]
async fn test_embed_without_embedding_model_is_ledgered_rejection() {
    let (catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    let adapter = ScriptedAdapter::replying("[0.1, 0.2]");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let err = fx
        .gateway
        .execute(&actor(), ExecuteRequest::embed("SearchIndexer", "some text"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::NoProviderAvailable {
            module: "SearchIndexer".into(),
            modality: Modality::Embedding,
        }
    );
    assert_eq!(adapter.calls(), 0);

    let entries = fx.ledger.entries(&LedgerFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, UsageStatus::Error);
    assert_eq!(entries[0].error_code.as_deref(), Some("AIGW_NO_PROVIDER"));
    assert_eq!(entries[0].cost, Decimal::ZERO);
}

#[tokio::test]
async fn test_embed_parses_vector() {
    let (mut catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    catalog
        .add_model(aigw_core::registry::NewModel::new(
            routes[0].provider_id,
            "text-embedding-3-small",
            Modality::Embedding,
        ))
        .unwrap();
    let adapter = ScriptedAdapter::new(
        vec![],
        common::Step::Reply(Invocation {
            content: "[0.25, -0.5]".into(),
            prompt_tokens: Some(3),
            completion_tokens: None,
        }),
    );
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let response = fx
        .gateway
        .execute(&actor(), ExecuteRequest::embed("SearchIndexer", "some text"))
        .await
        .unwrap();
    assert_eq!(response.usage.completion_tokens, 0);
    assert_eq!(response.structured_result, Some(serde_json::json!([0.25, -0.5])));
    assert_eq!(adapter.last_request().unwrap().kind, InvocationKind::Embedding);

    // Embeddings are never cached
    fx.gateway
        .execute(&actor(), ExecuteRequest::embed("SearchIndexer", "some text"))
        .await
        .unwrap();
    assert_eq!(adapter.calls(), 2);
}

#[tokio::test]
async fn test_module_limits_clamp_request() {
    let (mut catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    catalog.upsert_module(
        aigw_core::ModuleConfiguration::new("ShortAnswers")
            .with_max_tokens(64)
            .with_temperature(0.1),
    );
    let adapter = ScriptedAdapter::replying("ok");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let request = ExecuteRequest::complete("ShortAnswers", "Explain everything.")
        .with_options(ExecuteOptions::default().with_max_tokens(4000));
    fx.gateway.execute(&actor(), request).await.unwrap();

    let sent = adapter.last_request().unwrap();
    assert_eq!(sent.max_tokens, 64);
    assert!((sent.temperature - 0.1).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_zero_module_limit_leaves_request_uncapped() {
    let (mut catalog, routes) = catalog_with(&[("OpenAI", 1)]);
    catalog.upsert_module(aigw_core::ModuleConfiguration::new("Unbounded").with_max_tokens(0));
    let adapter = ScriptedAdapter::replying("ok");
    let fx = gateway(
        GatewayConfig::default(),
        catalog,
        vec![(routes[0].provider_id, adapter.clone() as Arc<dyn ProviderAdapter>)],
    )
    .await;

    let request = ExecuteRequest::complete("Unbounded", "Explain everything.")
        .with_options(ExecuteOptions::default().with_max_tokens(500));
    fx.gateway.execute(&actor(), request).await.unwrap();
    assert_eq!(adapter.last_request().unwrap().max_tokens, 500);

    // Without a caller ceiling the model limit applies
    fx.gateway
        .execute(&actor(), ExecuteRequest::complete("Unbounded", "And again."))
        .await
        .unwrap();
    assert_eq!(adapter.last_request().unwrap().max_tokens, 4096);
}
