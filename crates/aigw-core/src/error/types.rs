//! Core error types

use crate::types::{Modality, Period};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure class of the last provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    TransportError,
    VendorRejected,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::TransportError => write!(f, "transport error"),
            Self::VendorRejected => write!(f, "vendor rejected"),
        }
    }
}

/// Main error type for the gateway
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Caller input malformed; never retried
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Host capability check denied the caller
    #[error("Caller is not permitted to invoke AI operations")]
    PermissionDenied,

    /// Actor or global request rate exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Tenant spend reached its configured period budget
    #[error("{period} budget exceeded for tenant {tenant_id}")]
    BudgetExceeded { tenant_id: String, period: Period },

    /// No active provider/model satisfies the module's allow-lists and modality
    #[error("No provider available for module {module} ({modality})")]
    NoProviderAvailable { module: String, modality: Modality },

    /// Every attempted provider failed
    #[error("Provider request failed after {attempts} attempt(s): {kind}")]
    Provider {
        kind: ProviderErrorKind,
        attempts: u32,
        /// Request id, for support correlation with the ledger
        reference: String,
    },

    /// Caller cancelled the request before a provider answered
    #[error("Request was cancelled")]
    Cancelled,

    /// Resource not found
    #[error("Not found: {resource} {id}")]
    NotFound { resource: &'static str, id: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Storage/persistence errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },
}

impl GatewayError {
    /// Stable error code for programmatic handling and support correlation
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "AIGW_VALIDATION",
            Self::PermissionDenied => "AIGW_PERMISSION_DENIED",
            Self::RateLimited { .. } => "AIGW_RATE_LIMITED",
            Self::BudgetExceeded { .. } => "AIGW_BUDGET_EXCEEDED",
            Self::NoProviderAvailable { .. } => "AIGW_NO_PROVIDER",
            Self::Provider { kind, .. } => match kind {
                ProviderErrorKind::Timeout => "AIGW_PROVIDER_TIMEOUT",
                ProviderErrorKind::TransportError => "AIGW_PROVIDER_TRANSPORT",
                ProviderErrorKind::VendorRejected => "AIGW_PROVIDER_REJECTED",
            },
            Self::Cancelled => "AIGW_CANCELLED",
            Self::NotFound { .. } => "AIGW_NOT_FOUND",
            Self::Config { .. } => "AIGW_CONFIG",
            Self::Storage { .. } => "AIGW_STORAGE",
            Self::Io { .. } => "AIGW_IO",
            Self::Json { .. } => "AIGW_JSON",
        }
    }

    /// Message safe to show to end users
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => format!("Invalid request: {}", message),
            Self::PermissionDenied => "You are not allowed to use AI features".to_string(),
            Self::RateLimited { retry_after_secs } => format!(
                "Too many AI requests. Try again in {} second(s)",
                retry_after_secs
            ),
            Self::BudgetExceeded { period, .. } => format!(
                "The {} AI budget for your organization has been reached",
                period
            ),
            Self::NoProviderAvailable { .. } => {
                "No AI provider is configured for this feature".to_string()
            }
            Self::Provider { reference, .. } => format!(
                "The AI service is temporarily unavailable (reference {})",
                reference
            ),
            Self::Cancelled => "The request was cancelled".to_string(),
            Self::NotFound { resource, .. } => format!("The requested {} was not found", resource),
            Self::Config { .. } | Self::Storage { .. } | Self::Io { .. } | Self::Json { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Provider { .. } | Self::Storage { .. }
        )
    }

    /// HTTP status a host application should map this error to
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::PermissionDenied => 403,
            Self::NotFound { .. } => 404,
            Self::RateLimited { .. } => 429,
            Self::BudgetExceeded { .. } => 402,
            Self::Cancelled => 499,
            Self::NoProviderAvailable { .. } => 503,
            Self::Provider { kind, .. } => match kind {
                ProviderErrorKind::Timeout => 504,
                _ => 502,
            },
            Self::Config { .. } | Self::Storage { .. } | Self::Io { .. } | Self::Json { .. } => {
                500
            }
        }
    }
}
