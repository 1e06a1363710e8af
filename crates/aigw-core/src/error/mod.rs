//! Error types for the gateway
//!
//! `GatewayError` is the single error type returned by every public operation.
//! Each variant carries a stable `AIGW_*` code for support correlation and a
//! sanitized caller-facing message that never includes vendor bodies or
//! credentials.

mod constructors;
mod conversions;
mod types;

pub use types::{GatewayError, GatewayResult, ProviderErrorKind};
