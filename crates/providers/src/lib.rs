//! LLM Provider implementations for Switchboard.
//!
//! All providers implement the `switchboard_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use std::time::Duration;
use switchboard_config::AppConfig;
use switchboard_core::error::ProviderError;
use switchboard_core::Provider;

/// Build the configured provider.
///
/// An API key is required unless the endpoint is on the local machine
/// (Ollama, vLLM and friends accept any key).
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_url = &config.provider.api_url;
    let api_key = match (&config.api_key, is_local_url(api_url)) {
        (Some(key), _) => key.clone(),
        (None, true) => "none".to_string(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(
                "no API key; set SWITCHBOARD_API_KEY or OPENAI_API_KEY, or api_key in config.toml".into(),
            ));
        }
    };

    Ok(Arc::new(OpenAiCompatProvider::with_timeout(
        &config.provider.name,
        api_url,
        api_key,
        Duration::from_secs(config.timeouts.request_secs),
    )))
}

fn is_local_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    let host = rest.split(['/', ':']).next().unwrap_or_default();
    matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0") || rest.starts_with("[::1]")
}
