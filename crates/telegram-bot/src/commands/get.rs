//! `/get <search terms>` - posts a random image matching the search terms.

use super::{command_line, pick, sender};
use crate::config::GetConfig;
use crate::dispatcher::BotContext;
use crate::model::Update;
use crate::registry::{CommandHandler, CommandMap, CommandProvider};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use telegram_client::ChatAction;
use tracing::{error, info, warn};

/// Provides `/get`, backed by Google Custom Search.
pub struct GetCommand {
    search: Option<Arc<ImageSearch>>,
}

impl GetCommand {
    /// Without both a CSE id and an API key the provider offers no commands.
    pub fn new(config: &GetConfig) -> anyhow::Result<Self> {
        let Some(cse_id) = config.google_cse_id.clone().filter(|s| !s.is_empty()) else {
            error!("No Google CSE ID specified! Set COMMANDS__GET__GOOGLE_CSE_ID.");
            warn!("GetCommand will not be available until a CSE ID is provided.");
            return Ok(Self { search: None });
        };
        let Some(api_key) = config.google_api_key.clone().filter(|s| !s.is_empty()) else {
            error!("No Google Search API key specified! Set COMMANDS__GET__GOOGLE_API_KEY.");
            warn!("GetCommand will not be available until an API key is provided.");
            return Ok(Self { search: None });
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create /get HTTP client")?;

        Ok(Self {
            search: Some(Arc::new(ImageSearch {
                client,
                search_url: config.search_url.clone(),
                cse_id,
                api_key,
            })),
        })
    }
}

impl CommandProvider for GetCommand {
    fn name(&self) -> &str {
        "GetCommand"
    }

    fn command_map(&self) -> CommandMap {
        let mut map = CommandMap::new();
        if let Some(search) = &self.search {
            map.insert("get".into(), search.clone() as Arc<dyn CommandHandler>);
        }
        map
    }
}

struct ImageSearch {
    client: Client,
    search_url: String,
    cse_id: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    link: Option<String>,
}

impl ImageSearch {
    /// URL of a random image for the search terms, if any.
    async fn random_image(&self, terms: &[String]) -> anyhow::Result<Option<String>> {
        let query = terms.join(" ");
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query.as_str()),
                ("searchType", "image"),
                ("imgSize", "medium"),
                ("imgType", "photo"),
                ("fileType", "png"),
                ("num", "10"),
                ("start", "1"),
                ("safe", "off"),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{}: {}", status.as_u16(), body);
            return Ok(None);
        }

        let results: SearchResponse =
            response.json().await.map_err(reqwest::Error::without_url)?;
        let links: Vec<String> = results.items.into_iter().filter_map(|i| i.link).collect();
        Ok(pick(&links))
    }
}

#[async_trait]
impl CommandHandler for ImageSearch {
    async fn call(&self, args: &[String], bot: &BotContext, update: &Update) -> anyhow::Result<()> {
        let Some(message) = update.message.as_ref() else {
            return Ok(());
        };
        if args.is_empty() {
            return Ok(());
        }
        let chat_id = message.chat.id();

        if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
            warn!(chat_id, error = %e, "Failed to send chat action");
        }

        let Some(image_url) = self.random_image(args).await? else {
            bot.send_message(
                chat_id,
                &format!("I can't find an image for \"{}\"", args.join(" ")),
            )
            .await?;
            return Ok(());
        };

        info!(
            "\"/{}\" from {}: posting image at {}",
            command_line(update),
            sender(update),
            image_url
        );

        let image = self
            .client
            .get(&image_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        bot.send_photo(chat_id, image.to_vec(), Some(message.id), Some(&image_url))
            .await?;
        Ok(())
    }
}
