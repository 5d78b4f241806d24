//! `/reddit` - posts a random hot imgur image from the configured subreddits.

use super::{command_line, get_image_links_from_imgur, pick, sender};
use crate::config::RedditConfig;
use crate::dispatcher::BotContext;
use crate::model::Update;
use crate::registry::{CommandHandler, CommandMap, CommandProvider};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use telegram_client::ChatAction;
use tracing::{debug, info, warn};

const ERROR_MESSAGE: &str = "I can't find a suitable image. Try again later!";

/// Posts picked before giving up on finding an image.
const MAX_ATTEMPTS: usize = 5;

const HOT_LIMIT: &str = "50";

/// Provides `/reddit`.
pub struct RedditCommand {
    images: Arc<RandomRedditImage>,
}

impl RedditCommand {
    pub fn new(config: &RedditConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create /reddit HTTP client")?;

        Ok(Self {
            images: Arc::new(RandomRedditImage {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                user_agent: config.user_agent.clone(),
                subreddits: config.subreddit_list(),
            }),
        })
    }
}

impl CommandProvider for RedditCommand {
    fn name(&self) -> &str {
        "RedditCommand"
    }

    fn command_map(&self) -> CommandMap {
        let mut map = CommandMap::new();
        map.insert("reddit".into(), self.images.clone() as Arc<dyn CommandHandler>);
        map
    }
}

struct RandomRedditImage {
    client: Client,
    base_url: String,
    user_agent: String,
    subreddits: Vec<String>,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Submission>,
}

#[derive(Deserialize)]
struct Submission {
    data: SubmissionData,
}

#[derive(Deserialize)]
struct SubmissionData {
    url: Option<String>,
}

impl RandomRedditImage {
    /// Links of hot imgur submissions in a subreddit.
    async fn hot_imgur_links(&self, subreddit: &str) -> anyhow::Result<Vec<String>> {
        let listing: Listing = self
            .client
            .get(format!("{}/r/{}/hot.json", self.base_url, subreddit))
            .query(&[("limit", HOT_LIMIT)])
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(|s| s.data.url)
            .filter(|url| url.contains("imgur.com"))
            .collect())
    }

    async fn find_image(&self) -> anyhow::Result<Option<String>> {
        for attempt in 1..=MAX_ATTEMPTS {
            let subreddit = pick(&self.subreddits).context("No subreddits configured")?;
            let links = self.hot_imgur_links(&subreddit).await?;

            let Some(submission) = pick(&links) else {
                debug!(attempt, "No imgur submissions in /r/{}", subreddit);
                continue;
            };

            match get_image_links_from_imgur(&self.client, &submission).await {
                Ok(images) => match pick(&images) {
                    Some(image) => return Ok(Some(image)),
                    None => debug!(attempt, "No images at {}", submission),
                },
                Err(e) => debug!(attempt, error = %e, "Skipping {}", submission),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl CommandHandler for RandomRedditImage {
    async fn call(
        &self,
        _args: &[String],
        bot: &BotContext,
        update: &Update,
    ) -> anyhow::Result<()> {
        let Some(message) = update.message.as_ref() else {
            return Ok(());
        };
        let chat_id = message.chat.id();

        if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
            warn!(chat_id, error = %e, "Failed to send chat action");
        }

        let Some(image_url) = self.find_image().await? else {
            bot.send_message(chat_id, ERROR_MESSAGE).await?;
            return Ok(());
        };

        info!(
            "\"/{}\" from {}: posting image at {}",
            command_line(update),
            sender(update),
            image_url
        );

        let response = self.client.get(&image_url).send().await?;
        if !response.status().is_success() {
            bot.send_message(chat_id, ERROR_MESSAGE).await?;
            return Ok(());
        }
        let image = response.bytes().await?;

        bot.send_photo(chat_id, image.to_vec(), Some(message.id), Some(&image_url))
            .await?;
        Ok(())
    }
}
