//! Bot error types.

use thiserror::Error;

/// A required field of an inbound record was missing or not an integer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not an integer: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Main bot error type.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Malformed update: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid command provider {provider}: {reason}")]
    InvalidCommandProvider { provider: String, reason: String },

    #[error("Command not supported: /{0}")]
    CommandNotSupported(String),

    #[error("Telegram error: {0}")]
    Transport(#[from] telegram_client::TelegramError),

    #[error("Telegram API refused the request: {0}")]
    FatalApi(String),
}

/// Result type alias for bot errors.
pub type BotResult<T> = Result<T, BotError>;
