//! LLM Provider implementations

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Get the provider kind
    fn kind(&self) -> ProviderKind;

    /// Check if the provider has what it needs to serve requests
    async fn is_available(&self) -> bool;

    /// Complete a conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

// ============================================================================
// Chat completion wire format (shared by OpenAI and GigaChat)
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl ChatRequest {
    fn from_completion(request: CompletionRequest, default_model: &str) -> Self {
        let messages = request
            .messages
            .into_iter()
            .map(|m| ChatMessage {
                role: m.role.as_str().to_string(),
                content: m.content,
            })
            .collect();

        Self {
            model: request.model.unwrap_or_else(|| default_model.to_string()),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

/// Turn a non-success HTTP response into the matching error.
async fn error_from_response(response: reqwest::Response) -> LLMError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        LLMError::Authentication {
            message: format!("HTTP {}: {}", status, body),
        }
    } else {
        LLMError::RequestFailed {
            message: format!("HTTP {}: {}", status, body),
        }
    }
}

async fn parse_chat_response(
    response: reqwest::Response,
    fallback_model: &str,
) -> Result<CompletionResponse> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let chat_response: ChatResponse =
        response.json().await.map_err(|e| LLMError::InvalidResponse {
            message: e.to_string(),
        })?;

    let content = chat_response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LLMError::InvalidResponse {
            message: "response contained no choices".to_string(),
        })?;

    let usage = chat_response.usage.unwrap_or_default();

    Ok(CompletionResponse {
        content,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        },
        model: Some(chat_response.model.unwrap_or_else(|| fallback_model.to_string())),
    })
}

fn network_error(e: reqwest::Error) -> LLMError {
    LLMError::NetworkError {
        message: e.to_string(),
    }
}

// ============================================================================
// OpenAI Provider
// ============================================================================

pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            base_url: OPENAI_DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// OpenAI API provider
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError {
                message: "OpenAI API key is required".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LLMError::ConfigurationError {
                message: format!("HTTP client: {}", e),
            })?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    async fn is_available(&self) -> bool {
        // Just check if we have an API key
        !self.config.api_key.is_empty()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let chat_request = ChatRequest::from_completion(request, &self.config.model);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(network_error)?;

        parse_chat_response(response, &self.config.model).await
    }
}

// ============================================================================
// GigaChat Provider
// ============================================================================

pub const GIGACHAT_DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const GIGACHAT_DEFAULT_API_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";
pub const GIGACHAT_DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";
pub const GIGACHAT_DEFAULT_MODEL: &str = "GigaChat";

/// Configuration for GigaChat provider
#[derive(Debug, Clone)]
pub struct GigaChatConfig {
    /// Base64 authorization key issued in the developer console
    pub credentials: String,
    pub scope: String,
    pub model: String,
    pub auth_url: String,
    pub api_url: String,
    /// PEM bundle with the Russian trusted root certificates
    pub ca_bundle_file: Option<PathBuf>,
    /// `Some(false)` disables TLS certificate verification
    pub verify_ssl_certs: Option<bool>,
    pub request_timeout: Duration,
}

impl GigaChatConfig {
    pub fn new(credentials: impl Into<String>) -> Self {
        Self {
            credentials: credentials.into(),
            scope: GIGACHAT_DEFAULT_SCOPE.to_string(),
            model: GIGACHAT_DEFAULT_MODEL.to_string(),
            auth_url: GIGACHAT_DEFAULT_AUTH_URL.to_string(),
            api_url: GIGACHAT_DEFAULT_API_URL.to_string(),
            ca_bundle_file: None,
            verify_ssl_certs: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Sber GigaChat API provider.
///
/// Every completion exchanges the authorization key for a fresh access token
/// first; tokens are not kept between calls.
pub struct GigaChatProvider {
    config: GigaChatConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct GigaChatToken {
    access_token: String,
}

impl GigaChatProvider {
    pub fn new(config: GigaChatConfig) -> Result<Self> {
        if config.credentials.trim().is_empty() {
            return Err(LLMError::ConfigurationError {
                message: "GigaChat credentials are required".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);

        if let Some(ref path) = config.ca_bundle_file {
            let pem = std::fs::read(path).map_err(|e| LLMError::ConfigurationError {
                message: format!("CA bundle {}: {}", path.display(), e),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                LLMError::ConfigurationError {
                    message: format!("CA bundle {}: {}", path.display(), e),
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if config.verify_ssl_certs == Some(false) {
            tracing::warn!("GigaChat TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| LLMError::ConfigurationError {
            message: format!("HTTP client: {}", e),
        })?;

        Ok(Self { config, client })
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.config.auth_url)
            .header("Authorization", format!("Basic {}", self.config.credentials))
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .form(&[("scope", self.config.scope.as_str())])
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(match error_from_response(response).await {
                LLMError::RequestFailed { message } => LLMError::Authentication { message },
                other => other,
            });
        }

        let token: GigaChatToken = response.json().await.map_err(|e| LLMError::InvalidResponse {
            message: format!("token response: {}", e),
        })?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl LLMProvider for GigaChatProvider {
    fn name(&self) -> &'static str {
        "GigaChat"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::GigaChat
    }

    async fn is_available(&self) -> bool {
        !self.config.credentials.is_empty()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let token = self.access_token().await?;
        let chat_request = ChatRequest::from_completion(request, &self.config.model);

        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&chat_request)
            .send()
            .await
            .map_err(network_error)?;

        parse_chat_response(response, &self.config.model).await
    }
}
