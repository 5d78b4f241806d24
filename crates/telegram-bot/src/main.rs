//! Telegram bot - main entry point.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use telegram_bot::cli::Cli;
use telegram_bot::commands::{GetCommand, RedditCommand};
use telegram_bot::config::Config;
use telegram_bot::{BotContext, BotResult, CommandProvider, CommandRegistry, PollLoop};
use telegram_client::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> BotResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()
        .context("Failed to load configuration")?
        .with_bot_id(cli.bot_id);

    // Initialize logging
    let level = if cli.verbose { "debug" } else { config.bot.log_level.as_str() };
    init_logging(level);

    info!("Starting Telegram bot..");

    let bot_id = config.bot_id().map_err(|e| {
        error!("{}", e);
        e
    })?;

    let client = TelegramClient::new(&config.telegram.base_url, bot_id, config.telegram.timeout)
        .context("Failed to create Telegram client")?;

    // Command providers, in priority order
    let providers: Vec<Box<dyn CommandProvider>> = vec![
        Box::new(GetCommand::new(&config.commands.get)?),
        Box::new(RedditCommand::new(&config.commands.reddit)?),
    ];
    let registry = Arc::new(CommandRegistry::build(&providers)?);
    info!("Registered commands: {}", registry.commands().join(", "));

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    let mut poller = PollLoop::new(BotContext::new(registry, client), shutdown)
        .with_poll_interval(config.bot.poll_interval);
    if config.bot.complain_about_invalid_commands {
        poller =
            poller.with_invalid_command_reply(config.bot.command_not_supported_message.clone());
    }

    poller.run().await
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => debug!("Bot interrupted via keypress!"),
                    _ = terminate.recv() => debug!("Bot was asked to shutdown.."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        debug!("Bot interrupted via keypress!");
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
