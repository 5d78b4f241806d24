//! An easily extensible long-polling Telegram bot.
//!
//! Updates are fetched by the [`PollLoop`], parsed into [`Update`]s and
//! routed by their leading `/command` to handlers registered through
//! [`CommandProvider`]s.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod poller;
pub mod registry;

pub use dispatcher::{handle, BotContext};
pub use error::{BotError, BotResult, ParseError};
pub use model::{Chat, GroupChat, Message, Update, User};
pub use poller::{PollLoop, PollState};
pub use registry::{CommandBinding, CommandHandler, CommandMap, CommandProvider, CommandRegistry};
