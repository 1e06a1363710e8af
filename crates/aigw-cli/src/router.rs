//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use crate::commands::execute::ExecuteArgs;
use aigw_core::{Gateway, GatewayConfig};
use anyhow::Context;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: GatewayConfig) -> anyhow::Result<()> {
    let Cli { command, json, .. } = cli;

    // Configuration display does not need providers or a ledger
    if let Commands::Config = command {
        return commands::config::show(&config, json);
    }

    let gateway = Gateway::from_config(config)
        .await
        .context("Failed to initialize gateway")?;
    route_gateway(&gateway, command, json).await
}

async fn route_gateway(gateway: &Gateway, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Providers { all } => commands::providers::list(gateway, all, json),
        Commands::Resolve { module, operation } => {
            commands::resolve::show(gateway, &module, operation, json)
        }
        Commands::TestConnection { provider: Some(provider) } => {
            commands::providers::test_connection(gateway, &provider, json).await
        }
        Commands::TestConnection { provider: None } => {
            commands::providers::test_all(gateway, json).await
        }
        Commands::Execute {
            module,
            text,
            operation,
            fields,
            actor,
            tenant,
            max_tokens,
            temperature,
            no_cache,
        } => {
            let args = ExecuteArgs {
                module,
                text,
                operation,
                fields,
                actor,
                tenant,
                max_tokens,
                temperature,
                no_cache,
            };
            commands::execute::run(gateway, args, json).await
        }
        Commands::Usage {
            tenant,
            module,
            period,
        } => commands::usage::report(gateway, &tenant, module.as_deref(), period, json).await,
        Commands::CacheFlush => commands::cache::flush(gateway).await,
        Commands::Config => commands::config::show(gateway.config(), json),
    }
}
