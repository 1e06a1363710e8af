//! AI Request Gateway Core Library
//!
//! This crate mediates every AI request a host application's modules make:
//! it validates the request, enforces rate limits and tenant budgets, routes
//! it to a configured provider with bounded failover, caches responses and
//! records usage in an append-only ledger.

pub mod budget;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod modules;
pub mod providers;
pub mod rate_limit;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLoader, GatewayConfig};
pub use error::{GatewayError, GatewayResult, ProviderErrorKind};
pub use gateway::{ConnectionReport, Gateway, GatewayBuilder};
pub use ledger::{UsageLedger, UsageLogEntry, UsageStatus, UsageTotals};
pub use modules::{ModuleConfiguration, ModuleResolver};
pub use providers::{ProviderAdapter, ProviderFailure};
pub use registry::{ProviderRegistry, ProviderType};
pub use types::*;
