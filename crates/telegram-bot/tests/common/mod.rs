//! Common test utilities for integration tests.

use std::sync::Arc;
use std::time::Duration;
use telegram_bot::{BotContext, CommandProvider, CommandRegistry};
use telegram_client::TelegramClient;
use wiremock::MockServer;

/// Create a Telegram client configured for a mock server.
pub fn test_telegram_client(mock_server: &MockServer) -> TelegramClient {
    TelegramClient::new(mock_server.uri(), "test-token", Duration::from_secs(5)).unwrap()
}

/// Build a bot context from providers, talking to a mock server.
pub fn test_context(
    mock_server: &MockServer,
    providers: Vec<Box<dyn CommandProvider>>,
) -> BotContext {
    let registry = CommandRegistry::build(&providers).unwrap();
    BotContext::new(Arc::new(registry), test_telegram_client(mock_server))
}

/// A raw private-chat text update as returned by `getupdates`.
pub fn raw_text_update(update_id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id * 10,
            "chat": {"id": 10, "username": "alice"},
            "from": {"id": 10, "username": "alice"},
            "date": 1441645532,
            "text": text
        }
    })
}
