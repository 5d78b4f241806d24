//! Bundled command providers.

mod get;
mod imgur;
mod reddit;

pub use get::GetCommand;
pub use imgur::{extract_image_links, get_image_links_from_imgur};
pub use reddit::RedditCommand;

use crate::model::Update;
use rand::seq::SliceRandom;

/// Random element of `items`.
fn pick<T: Clone>(items: &[T]) -> Option<T> {
    items.choose(&mut rand::thread_rng()).cloned()
}

/// The command line as typed, for logs.
fn command_line(update: &Update) -> String {
    let mut words = vec![update.command().unwrap_or_default()];
    words.extend(update.command_args().iter().map(String::as_str));
    words.join(" ")
}

/// Sender username, for logs.
fn sender(update: &Update) -> &str {
    update
        .message
        .as_ref()
        .and_then(|m| m.user.username.as_deref())
        .unwrap_or("?")
}
