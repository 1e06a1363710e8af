//! Request rate limiting
//!
//! Two independent fixed-window counters gate every request: one per actor
//! and one shared global key. A third keyed counter throttles outbound calls
//! to each provider according to its `max_requests_per_minute`.

mod limiter;

pub use limiter::{Acquire, FixedWindowLimiter, Limiter};

use crate::config::RateLimitConfig;
use crate::types::ProviderId;
use std::fmt;

const GLOBAL_KEY: &str = "global";

/// Which counter rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Actor,
    Global,
}

impl fmt::Display for RateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actor => write!(f, "actor"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// Admission decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Rejected { scope: RateScope, retry_after_secs: u64 },
}

/// Per-actor, global and per-provider request limiter
#[derive(Debug)]
pub struct RateLimiter {
    actor: FixedWindowLimiter,
    global: FixedWindowLimiter,
    providers: FixedWindowLimiter,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            actor: FixedWindowLimiter::new(config.per_actor_rpm, config.window),
            global: FixedWindowLimiter::new(config.global_rpm, config.window),
            providers: FixedWindowLimiter::new(0, config.window),
        }
    }

    /// Admit a request for `actor_id`
    ///
    /// The actor slot is returned when the global counter rejects, so a
    /// globally throttled request does not eat into the actor's allowance.
    pub fn try_acquire(&self, actor_id: &str, global_enabled: bool) -> RateDecision {
        let actor_key = format!("actor:{}", actor_id);

        let actor = self.actor.try_acquire(&actor_key);
        if !actor.is_allowed() {
            return RateDecision::Rejected {
                scope: RateScope::Actor,
                retry_after_secs: actor.retry_after_secs(),
            };
        }

        if global_enabled {
            let global = self.global.try_acquire(GLOBAL_KEY);
            if !global.is_allowed() {
                self.actor.release(&actor_key);
                return RateDecision::Rejected {
                    scope: RateScope::Global,
                    retry_after_secs: global.retry_after_secs(),
                };
            }
        }

        RateDecision::Allowed
    }

    /// Take one outbound slot for a provider; `limit == 0` is unlimited
    pub fn try_acquire_provider(&self, provider_id: ProviderId, limit: u32) -> bool {
        self.providers
            .try_acquire_limit(&format!("provider:{}", provider_id), limit)
            .is_allowed()
    }

    /// Drop state for windows that have elapsed
    pub fn prune(&self) {
        let removed = self.actor.prune() + self.global.prune() + self.providers.prune();
        if removed > 0 {
            tracing::trace!(removed, "pruned rate limit windows");
        }
    }
}
