//! Routes updates to command handlers.

use crate::error::{BotError, BotResult};
use crate::model::Update;
use crate::registry::CommandRegistry;
use std::sync::Arc;
use telegram_client::{ChatAction, TelegramClient, TelegramError};
use tracing::{debug, error, instrument, warn};

/// What a command handler gets to work with: the registry and the
/// outbound Telegram operations.
#[derive(Clone)]
pub struct BotContext {
    registry: Arc<CommandRegistry>,
    client: TelegramClient,
}

impl BotContext {
    pub fn new(registry: Arc<CommandRegistry>, client: TelegramClient) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn client(&self) -> &TelegramClient {
        &self.client
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.client.send_message(chat_id, text).await
    }

    pub async fn send_chat_action(
        &self,
        chat_id: i64,
        action: ChatAction,
    ) -> Result<(), TelegramError> {
        self.client.send_chat_action(chat_id, action).await
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        reply_to_message_id: Option<i64>,
        caption: Option<&str>,
    ) -> Result<(), TelegramError> {
        self.client
            .send_photo(chat_id, photo, reply_to_message_id, caption)
            .await
    }
}

/// Run the command carried by `update`, if any.
///
/// Updates without text are ignored. An unknown command is returned as
/// [`BotError::CommandNotSupported`]; handler failures are logged and
/// answered with an apology in the chat, never returned.
#[instrument(skip_all, fields(update_id = update.id))]
pub async fn handle(update: &Update, bot: &BotContext) -> BotResult<()> {
    let Some(message) = update.message.as_ref().filter(|m| !m.text.is_empty()) else {
        return Ok(());
    };

    let command = update.command().unwrap_or_default();
    let binding = bot
        .registry()
        .get(command)
        .ok_or_else(|| BotError::CommandNotSupported(command.to_string()))?;

    debug!(
        command,
        provider = %binding.provider,
        "Dispatching {}",
        update
    );

    let chat_id = message.chat.id();
    if let Err(e) = binding.handler.call(update.command_args(), bot, update).await {
        error!(
            command,
            provider = %binding.provider,
            chat_id,
            user = message.user.username.as_deref().unwrap_or("?"),
            text = %message.text,
            error = ?e,
            "Command handler failed"
        );

        let apology = format!("There was an error with the /{} command. Sorry!", command);
        if let Err(e) = bot.send_message(chat_id, &apology).await {
            warn!(chat_id, error = %e, "Failed to send error reply");
        }
    }

    Ok(())
}
