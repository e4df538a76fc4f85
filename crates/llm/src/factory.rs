//! Completion client factory.
//!
//! Resolves a provider name to a client, injecting the endpoint and API key
//! from configuration.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OPENAI_BASE_URL};
use crate::types::ProviderType;
use cookbook_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a completion client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom base URL
/// * `api_key` - API key (required for OpenAI)
///
/// # Errors
/// `AppError::Config` if the provider is unknown or its API key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type: ProviderType = provider.parse()?;

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(
            endpoint.unwrap_or(DEFAULT_OLLAMA_BASE_URL),
        )),
        ProviderType::OpenAI => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config("OpenAI provider requires OPENAI_API_KEY".to_string())
            })?;
            Arc::new(OpenAiClient::with_base_url(
                endpoint.unwrap_or(DEFAULT_OPENAI_BASE_URL),
                key,
            ))
        }
    };

    tracing::debug!(provider = %provider_type, "Created completion client");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", Some("http://localhost:8080"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("openai", None, Some("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
            Err(other) => panic!("Expected config error, got {other}"),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
        assert!(create_client("openai", None, Some("  ")).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            create_client("unknown", None, None),
            Err(AppError::Config(_))
        ));
    }
}
