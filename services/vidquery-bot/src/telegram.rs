//! Minimal Telegram Bot API client
//!
//! Only what the bot needs: `getUpdates` long polling and `sendMessage`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TelegramSettings;

/// Telegram client errors
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, TelegramError>;

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api(
                self.description
                    .unwrap_or_else(|| "response without result".to_string()),
            )),
        }
    }
}

/// One entry from `getUpdates`
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct GetUpdatesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Bot API client bound to one token
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(settings: &TelegramSettings) -> Result<Self> {
        let poll_timeout = settings.poll_timeout();
        // the HTTP timeout has to outlive the server-side long poll
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: format!(
                "{}/bot{}",
                settings.api_url.trim_end_matches('/'),
                settings.token
            ),
            poll_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let params = GetUpdatesParams {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };

        let response: ApiResponse<Vec<Update>> = self
            .http
            .post(self.method_url("getUpdates"))
            .json(&params)
            .send()
            .await?
            .json()
            .await?;

        response.into_result()
    }

    /// Send a plain-text message to a chat
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&SendMessageParams { chat_id, text })
            .send()
            .await?
            .json()
            .await?;

        response.into_result().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let settings = TelegramSettings {
            token: "123:abc".to_string(),
            api_url: "https://api.telegram.org/".to_string(),
            ..Default::default()
        };
        let client = TelegramClient::new(&settings).unwrap();
        assert_eq!(
            client.method_url("getUpdates"),
            "https://api.telegram.org/bot123:abc/getUpdates"
        );
    }

    #[test]
    fn test_updates_decoding() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 77, "type": "private"}, "text": "/start"}},
                {"update_id": 11, "message": {"message_id": 2, "chat": {"id": 77, "type": "private"}, "sticker": {}}},
                {"update_id": 12, "edited_message": {"message_id": 1, "chat": {"id": 77}}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = response.into_result().unwrap();

        assert_eq!(updates.len(), 3);
        let first = updates[0].message.as_ref().unwrap();
        assert_eq!(first.chat.id, 77);
        assert_eq!(first.text.as_deref(), Some("/start"));
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
        assert!(updates[2].message.is_none());
    }

    #[test]
    fn test_api_error_surfaces_description() {
        let body = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        match response.into_result() {
            Err(TelegramError::Api(description)) => assert_eq!(description, "Unauthorized"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
