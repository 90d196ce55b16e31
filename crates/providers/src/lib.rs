//! LLM Provider implementations for reactor.
//!
//! All providers implement the `reactor_core::Provider` trait.
//! [`from_config`] builds the configured one.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use reactor_config::AppConfig;
use reactor_core::error::ProviderError;
use reactor_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Build the provider described by `config.provider`.
///
/// A missing API key is only tolerated for local endpoints (Ollama and
/// friends), which ignore the `Authorization` header.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let settings = &config.provider;
    let is_local = settings.api_url.contains("localhost") || settings.api_url.contains("127.0.0.1");

    let api_key = match (&config.api_key, is_local) {
        (Some(key), _) => key.clone(),
        (None, true) => settings.name.clone(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}' at {}",
                settings.name, settings.api_url
            )));
        }
    };

    debug!(provider = %settings.name, url = %settings.api_url, "Building provider");

    let provider = OpenAiCompatProvider::new(
        &settings.name,
        &settings.api_url,
        api_key,
        Duration::from_secs(settings.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}
