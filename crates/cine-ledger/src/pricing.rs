//! Per-model price table.
//!
//! Prices are expressed in dollars per 1 000 tokens, except image models
//! which bill a flat price per generated image. The local model is always
//! free. Update alongside published provider pricing.

use cine_models::Provider;

/// Fallback rate for models missing from the table ($ per 1K tokens).
const DEFAULT_COST_PER_1K_TOKENS: f64 = 0.05;

/// Fallback flat price for unknown image models.
const DEFAULT_IMAGE_COST: f64 = 0.02;

/// Dollars per 1 000 tokens for a text-generation model.
pub fn cost_per_1k_tokens(model: &str) -> f64 {
    match model {
        "gemini-3-pro-preview" => 0.125,
        "gemini-1.5-flash" => 0.000_018_75,
        "gemini-2.5-flash-image" => 0.0003,
        "local" => 0.0,
        _ => DEFAULT_COST_PER_1K_TOKENS,
    }
}

/// Flat dollar price for one generated image.
pub fn image_generation_cost(model: &str) -> f64 {
    match model {
        "imagen-4.0-generate-001" => 0.04,
        "imagen-3.0-generate-001" => 0.02,
        _ => DEFAULT_IMAGE_COST,
    }
}

/// Cost of a token-metered call.
pub fn token_cost(provider: Provider, model: &str, tokens: u64) -> f64 {
    match provider {
        Provider::Local => 0.0,
        Provider::Cloud => (tokens as f64 / 1000.0) * cost_per_1k_tokens(model),
    }
}
