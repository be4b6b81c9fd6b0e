//! Provider router — builds the configured completion service.

use std::sync::Arc;
use std::time::Duration;
use sunnyside_config::AppConfig;
use sunnyside_core::error::ProviderError;
use sunnyside_core::provider::Provider;
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{RetryPolicy, RetryProvider};

/// Build the provider selected by `config.provider`.
///
/// Keys and URLs from `[providers.<name>]` take precedence over the
/// top-level `api_key`. A missing key is only fatal for hosted services;
/// local endpoints such as Ollama accept an empty key. When
/// `retry.max_retries` is non-zero the provider is wrapped in a
/// [`RetryProvider`].
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();
    let section = config.providers.get(name);

    let api_key = section
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    if api_key.is_empty() && requires_api_key(name) {
        return Err(ProviderError::NotConfigured(format!(
            "No API key for provider '{name}'. Set SUNNYSIDE_API_KEY or add api_key to the config file"
        )));
    }

    let custom_url = section.and_then(|p| p.api_url.clone());
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let provider: Arc<dyn Provider> = if name == "anthropic" {
        let mut p = AnthropicProvider::new(api_key).with_timeout(timeout);
        if let Some(url) = custom_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = match custom_url {
            Some(url) => url,
            None => default_base_url(name).ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "Unknown provider '{name}'. Set providers.{name}.api_url in the config file"
                ))
            })?,
        };
        Arc::new(OpenAiCompatProvider::new(name, base_url, api_key).with_timeout(timeout))
    };

    debug!(provider = %name, model = %config.model, "Provider configured");

    if config.retry.max_retries > 0 {
        Ok(Arc::new(RetryProvider::new(
            provider,
            RetryPolicy::from(&config.retry),
        )))
    } else {
        Ok(provider)
    }
}

fn requires_api_key(provider_name: &str) -> bool {
    !matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known OpenAI-compatible services.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.to_string())
}
