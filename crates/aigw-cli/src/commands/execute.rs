//! One-off request execution

use super::print_json;
use aigw_core::{
    ActorContext, ChatMessage, ExecuteOptions, ExecuteRequest, Gateway, GatewayError, Operation, Payload,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Arguments for `aigw execute`
pub struct ExecuteArgs {
    pub module: String,
    pub text: String,
    pub operation: Operation,
    pub fields: Vec<String>,
    pub actor: String,
    pub tenant: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub no_cache: bool,
}

pub async fn run(gateway: &Gateway, args: ExecuteArgs, json: bool) -> anyhow::Result<()> {
    let payload = match args.operation {
        Operation::Chat => Payload::messages(vec![ChatMessage::user(args.text)]),
        Operation::Complete => Payload::prompt(args.text),
        Operation::Summarize | Operation::Embed => Payload::text(args.text),
        Operation::Extract => Payload::extraction(args.text, args.fields),
    };

    // Ctrl+C cancels the in-flight provider call; the ledger still records it
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut options = ExecuteOptions::default().with_cancellation(cancel);
    options.max_tokens = args.max_tokens;
    options.temperature = args.temperature;
    options.skip_cache = args.no_cache;

    let request = ExecuteRequest::new(args.module, args.operation, payload).with_options(options);
    let actor = ActorContext::new(args.actor, args.tenant);
    let result = gateway.execute(&actor, request).await;
    watcher.abort();

    let response = match result {
        Ok(response) => response,
        Err(err) => return Err(caller_error(err)),
    };

    if json {
        return print_json(&serde_json::to_value(&response)?);
    }

    match &response.structured_result {
        Some(structured) if args.operation == Operation::Extract => {
            println!("{}", serde_json::to_string_pretty(structured)?)
        }
        _ => println!("{}", response.content),
    }
    eprintln!(
        "{}",
        json!({
            "request_id": response.request_id.to_string(),
            "provider_id": response.provider_id,
            "model_id": response.model_id,
            "total_tokens": response.usage.total_tokens,
            "cost": response.usage.cost,
            "latency_ms": response.latency_ms,
            "cached": response.cached,
        })
    );
    Ok(())
}

fn caller_error(err: GatewayError) -> anyhow::Error {
    anyhow::anyhow!("{} [{}]", err.user_message(), err.error_code())
}
