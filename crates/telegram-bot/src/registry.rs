//! Command registry built from command providers.

use crate::dispatcher::BotContext;
use crate::error::{BotError, BotResult};
use crate::model::Update;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// A bot command such as `/get`.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command. `args` are the whitespace-separated words after it.
    async fn call(
        &self,
        args: &[String],
        bot: &BotContext,
        update: &Update,
    ) -> anyhow::Result<()>;
}

/// Command names (without the leading `/`) mapped to their handlers.
pub type CommandMap = BTreeMap<String, Arc<dyn CommandHandler>>;

/// A plugin contributing one or more commands.
pub trait CommandProvider: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Commands this provider handles.
    fn command_map(&self) -> CommandMap;
}

/// A command name bound to the provider that registered it.
#[derive(Clone)]
pub struct CommandBinding {
    pub provider: String,
    pub handler: Arc<dyn CommandHandler>,
}

/// Immutable lookup table from command name to handler.
pub struct CommandRegistry {
    commands: HashMap<String, CommandBinding>,
}

impl CommandRegistry {
    /// Collect the commands of every provider, in order.
    ///
    /// When two providers claim the same name the first one keeps it.
    pub fn build(providers: &[Box<dyn CommandProvider>]) -> BotResult<Self> {
        let mut commands: HashMap<String, CommandBinding> = HashMap::new();

        for provider in providers {
            let map = provider.command_map();
            if map.is_empty() {
                warn!(provider = provider.name(), "Provider exposes no commands");
            }

            for (command, handler) in map {
                validate_name(provider.name(), &command)?;

                if let Some(existing) = commands.get(&command) {
                    warn!(
                        "\"/{}\" already provided by {}! Ignoring redefinition by {}.",
                        command,
                        existing.provider,
                        provider.name()
                    );
                    continue;
                }

                debug!(provider = provider.name(), "Registered /{}", command);
                commands.insert(
                    command,
                    CommandBinding {
                        provider: provider.name().to_string(),
                        handler,
                    },
                );
            }
        }

        Ok(Self { commands })
    }

    /// Look up a command. Names are case-sensitive.
    pub fn get(&self, command: &str) -> Option<&CommandBinding> {
        self.commands.get(command)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn validate_name(provider: &str, command: &str) -> BotResult<()> {
    let reason = if command.is_empty() {
        "command name is empty".to_string()
    } else if command.starts_with('/') {
        format!("command \"{}\" must not start with '/'", command)
    } else if command.chars().any(char::is_whitespace) {
        format!("command \"{}\" contains whitespace", command)
    } else {
        return Ok(());
    };

    Err(BotError::InvalidCommandProvider {
        provider: provider.to_string(),
        reason,
    })
}
