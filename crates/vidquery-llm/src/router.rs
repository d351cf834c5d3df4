//! LLM Router - selects the configured provider once at startup

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::*;
use crate::types::*;

/// Provider settings as they appear in the service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMSettings {
    /// Provider selector (`openai` or `gigachat`)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name for the OpenAI provider
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override for the OpenAI-compatible base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// GigaChat credential set
    #[serde(default)]
    pub gigachat: GigaChatSettings,
}

/// GigaChat-specific settings; all optional until the provider is selected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GigaChatSettings {
    pub credentials: Option<String>,
    pub scope: Option<String>,
    pub model: Option<String>,
    pub ca_bundle_file: Option<PathBuf>,
    pub verify_ssl_certs: Option<bool>,
}

impl Default for LLMSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            request_timeout_secs: default_request_timeout(),
            gigachat: GigaChatSettings::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    OPENAI_DEFAULT_MODEL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// The LLM Router holds the single provider chosen from configuration
#[derive(Clone)]
pub struct LLMRouter {
    provider: Arc<dyn LLMProvider>,
    kind: ProviderKind,
}

impl LLMRouter {
    /// Create a router with a specific provider
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        let kind = provider.kind();
        Self { provider, kind }
    }

    /// Create a router from service settings.
    ///
    /// An unknown provider selector or a missing credential for the selected
    /// provider is a configuration error; there is no fallback provider.
    pub fn from_settings(settings: &LLMSettings) -> Result<Self> {
        let kind: ProviderKind = settings.provider.parse()?;
        let request_timeout = Duration::from_secs(settings.request_timeout_secs);

        let provider: Arc<dyn LLMProvider> = match kind {
            ProviderKind::OpenAI => {
                let api_key = settings
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| LLMError::ConfigurationError {
                        message: "OPENAI_API_KEY must be set for the openai provider".to_string(),
                    })?;

                let mut config = OpenAIConfig::new(api_key);
                config.model = settings.model.clone();
                config.request_timeout = request_timeout;
                if let Some(ref base_url) = settings.base_url {
                    config.base_url = base_url.clone();
                }
                Arc::new(OpenAIProvider::new(config)?)
            }
            ProviderKind::GigaChat => {
                let gc = &settings.gigachat;
                let credentials = gc
                    .credentials
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| LLMError::ConfigurationError {
                        message: "GIGACHAT_CREDENTIALS must be set for the gigachat provider"
                            .to_string(),
                    })?;

                let mut config = GigaChatConfig::new(credentials);
                if let Some(ref scope) = gc.scope {
                    config.scope = scope.clone();
                }
                if let Some(ref model) = gc.model {
                    config.model = model.clone();
                }
                config.ca_bundle_file = gc.ca_bundle_file.clone();
                config.verify_ssl_certs = gc.verify_ssl_certs;
                config.request_timeout = request_timeout;
                Arc::new(GigaChatProvider::new(config)?)
            }
        };

        tracing::info!(provider = %kind, "LLM provider selected");

        Ok(Self::new(provider))
    }

    /// Get the current provider
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Get the provider kind
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Check if the provider is available
    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Complete a request using the configured provider. Errors are returned
    /// as-is; retries are the caller's decision.
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.provider.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAI
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let last = request.messages.last().map(|m| m.content.clone());
            Ok(CompletionResponse::new(last.unwrap_or_default()))
        }
    }

    #[tokio::test]
    async fn test_router_delegates_to_provider() {
        let router = LLMRouter::new(Arc::new(EchoProvider));
        assert!(router.is_available().await);
        assert_eq!(router.kind(), ProviderKind::OpenAI);

        let request = CompletionRequest::new(vec![Message::user("Hello")]);
        let response = router.complete(request).await.unwrap();
        assert_eq!(response.content, "Hello");
    }

    #[test]
    fn test_unknown_provider_is_fatal() {
        let settings = LLMSettings {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        let err = LLMRouter::from_settings(&settings).err().unwrap();
        assert!(matches!(err, LLMError::ConfigurationError { .. }));
        assert!(err.to_string().contains("ollama"));
    }

    #[test]
    fn test_openai_requires_key() {
        let settings = LLMSettings::default();
        let result = LLMRouter::from_settings(&settings);
        assert!(matches!(result, Err(LLMError::ConfigurationError { .. })));
    }

    #[test]
    fn test_openai_from_settings() {
        let settings = LLMSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let router = LLMRouter::from_settings(&settings).unwrap();
        assert_eq!(router.kind(), ProviderKind::OpenAI);
        assert_eq!(router.provider().name(), "OpenAI");
    }

    #[test]
    fn test_gigachat_requires_credentials() {
        let settings = LLMSettings {
            provider: "gigachat".to_string(),
            // an OpenAI key does not satisfy the gigachat provider
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let result = LLMRouter::from_settings(&settings);
        assert!(matches!(result, Err(LLMError::ConfigurationError { .. })));
    }

    #[test]
    fn test_gigachat_from_settings() {
        let settings = LLMSettings {
            provider: "GIGACHAT".to_string(),
            gigachat: GigaChatSettings {
                credentials: Some("Y2xpZW50OnNlY3JldA==".to_string()),
                scope: Some("GIGACHAT_API_CORP".to_string()),
                verify_ssl_certs: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let router = LLMRouter::from_settings(&settings).unwrap();
        assert_eq!(router.kind(), ProviderKind::GigaChat);
        assert_eq!(router.provider().name(), "GigaChat");
    }
}
