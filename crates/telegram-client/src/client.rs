//! Telegram Bot API HTTP client.

use crate::error::TelegramError;
use crate::types::*;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default public Bot API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Telegram Bot API client.
///
/// The bot id is part of every request URL, so it is kept in a
/// `SecretString` and never appears in logs.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    bot_id: SecretString,
}

impl TelegramClient {
    /// Create a new Telegram client.
    pub fn new(
        base_url: impl Into<String>,
        bot_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_id: SecretString::new(bot_id.into()),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_id.expose_secret(),
            method
        )
    }

    /// Fetch pending updates with an id of at least `offset`.
    ///
    /// Updates are returned as raw JSON records; turning them into typed
    /// values is left to the caller.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<serde_json::Value>, TelegramError> {
        debug!("GET getupdates");
        let response = self
            .client
            .get(self.method_url("getupdates"))
            .query(&[("offset", offset)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!("{}", body);
        let api: ApiResponse = serde_json::from_str(&body)?;
        if !api.ok {
            return Err(TelegramError::Api {
                description: api
                    .description
                    .unwrap_or_else(|| "no error description.".into()),
            });
        }

        match api.result {
            Some(serde_json::Value::Array(updates)) => Ok(updates),
            _ => Ok(Vec::new()),
        }
    }

    /// Send a text message to a chat.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text: text.to_string(),
        };

        let response = self
            .client
            .post(self.method_url("sendmessage"))
            .json(&request)
            .send()
            .await?;

        Self::check(response).await?;
        debug!("Sent message to {}", chat_id);
        Ok(())
    }

    /// Show a chat action such as "typing" in the chat.
    #[instrument(skip(self))]
    pub async fn send_chat_action(
        &self,
        chat_id: i64,
        action: ChatAction,
    ) -> Result<(), TelegramError> {
        let request = SendChatActionRequest { chat_id, action };

        let response = self
            .client
            .post(self.method_url("sendchataction"))
            .json(&request)
            .send()
            .await?;

        Self::check(response).await
    }

    /// Upload an image to a chat, optionally as a reply and with a caption.
    #[instrument(skip(self, photo), fields(bytes = photo.len()))]
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        reply_to_message_id: Option<i64>,
        caption: Option<&str>,
    ) -> Result<(), TelegramError> {
        let mut form = Form::new().text("chat_id", chat_id.to_string());
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        if let Some(reply_to) = reply_to_message_id {
            form = form.text("reply_to_message_id", reply_to.to_string());
        }
        form = form.part("photo", Part::bytes(photo).file_name("image.png"));

        let response = self
            .client
            .post(self.method_url("sendphoto"))
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await?;
        debug!("Sent photo to {}", chat_id);
        Ok(())
    }

    async fn check(response: Response) -> Result<(), TelegramError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!("Send failed: {} {}", status, body);
        Err(TelegramError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
