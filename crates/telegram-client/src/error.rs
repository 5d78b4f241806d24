//! Telegram client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    /// Carries no request URL, since that embeds the bot id.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bad status code: {status} - {body}")]
    Status { status: u16, body: String },

    /// The API answered with `ok: false`.
    #[error("Error: {description}")]
    Api { description: String },
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Http(e.without_url())
    }
}

impl TelegramError {
    /// Whether this is a network-level failure rather than an explicit API refusal.
    pub fn is_transport(&self) -> bool {
        !matches!(self, TelegramError::Api { .. })
    }
}
