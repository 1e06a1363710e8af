//! Cost computation from model and provider pricing

use super::types::{Model, Provider};
use rust_decimal::Decimal;

/// Price per token in each direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPrice {
    pub input: Decimal,
    pub output: Decimal,
}

impl TokenPrice {
    pub const fn new(input: Decimal, output: Decimal) -> Self {
        Self { input, output }
    }

    /// Effective price for a model: per-direction model pricing when set,
    /// otherwise the provider's flat per-token rate for both directions.
    pub fn for_model(model: &Model, provider: &Provider) -> Self {
        if model.input_cost_per_token.is_zero() && model.output_cost_per_token.is_zero() {
            Self::new(provider.cost_per_token, provider.cost_per_token)
        } else {
            Self::new(model.input_cost_per_token, model.output_cost_per_token)
        }
    }

    /// Calculate cost for given token counts
    pub fn calculate(&self, prompt_tokens: u32, completion_tokens: u32) -> Decimal {
        self.input * Decimal::from(prompt_tokens) + self.output * Decimal::from(completion_tokens)
    }
}
