//! Generation seam — "given a prompt and context, return text".
//!
//! The engine only depends on [`LlmProvider`]; the concrete provider speaks
//! the OpenAI-compatible chat-completions wire format. `DisabledProvider`
//! keeps the whole pipeline runnable offline: every call takes the
//! quota-exhausted branch, so callers exercise the same degraded path they
//! would on a real credit outage.

pub mod external;

pub use external::ExternalProvider;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::{RagError, Result};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One chat-completion round trip. Classification and SQL compilation
    /// call this with temperature 0.0; composition uses the configured
    /// temperature.
    async fn generate(&self, system: &str, user: &str, temperature: f32) -> Result<String>;

    /// False when every call is guaranteed to fail (no key / disabled).
    /// Lets callers skip straight to their fallback without a round trip.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Provider used when no API key is configured.
pub struct DisabledProvider;

#[async_trait]
impl LlmProvider for DisabledProvider {
    async fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
        Err(RagError::QuotaExhausted)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Build a provider from config plus an API key resolved by the caller
/// (the key never lives in the config file).
pub fn build_provider(config: &LlmConfig, api_key: Option<String>) -> Result<Box<dyn LlmProvider>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(Box::new(ExternalProvider::new(
            config.base_url.clone(),
            config.model.clone(),
            key,
            config.max_tokens,
            config.timeout_secs,
        )?)),
        _ => {
            tracing::warn!("No API key configured, generation runs in offline mode");
            Ok(Box::new(DisabledProvider))
        }
    }
}
