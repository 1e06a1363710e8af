//! Request, response and context types shared across the gateway

mod operation;
mod period;
mod request;
mod response;

pub use operation::{Modality, Operation};
pub use period::{Period, PeriodWindow};
pub use request::{ActorContext, ChatMessage, ChatRole, ExecuteOptions, ExecuteRequest, Payload};
pub use response::{GatewayResponse, Usage};

/// Provider identifier
pub type ProviderId = u64;

/// Model identifier
pub type ModelId = u64;
