//! Command-line arguments.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "telegram-bot", about = "An easily extensible Telegram bot.")]
pub struct Cli {
    /// Bot token; overrides TELEGRAM__BOT_ID / TELEGRAM_BOT_ID
    #[arg(long = "bot-id")]
    pub bot_id: Option<String>,

    /// Verbose logging
    #[arg(short = 'v')]
    pub verbose: bool,
}
