//! Telegram Bot API client.

mod client;
mod error;
mod types;

pub use client::{TelegramClient, DEFAULT_BASE_URL};
pub use error::TelegramError;
pub use types::*;
