//! Module configuration and resolution

mod resolver;
mod types;

pub use resolver::{Candidate, ModuleResolver, Resolution, RoutePlan};
pub use types::{ModuleConfiguration, ModuleLimits};
