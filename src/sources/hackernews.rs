//! Hacker News stories from the official Firebase API.
//!
//! The API has no date query, so the adapter reads one of the story lists,
//! fetches the items and keeps the ones posted on the requested day.

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::send_json;
use crate::config::HackerNewsConfig;
use crate::error::UpstreamError;
use crate::model::{ContentItem, Source};

const ITEM_URL_PREFIX: &str = "https://news.ycombinator.com/item?id=";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryList {
    #[default]
    Top,
    Best,
    New,
}

impl StoryList {
    fn endpoint(self) -> &'static str {
        match self {
            StoryList::Top => "topstories.json",
            StoryList::Best => "beststories.json",
            StoryList::New => "newstories.json",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HnItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub by: Option<String>,
    pub time: Option<i64>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub score: Option<i64>,
    pub descendants: Option<i64>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
}

pub struct HackerNewsAdapter {
    client: Client,
    config: HackerNewsConfig,
}

impl HackerNewsAdapter {
    pub fn new(client: Client, config: HackerNewsConfig) -> Self {
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, date: NaiveDate) -> Result<Vec<ContentItem>, UpstreamError> {
        let list_url = format!("{}/{}", self.base_url(), self.config.list.endpoint());
        let ids: Vec<u64> = send_json(self.client.get(&list_url)).await?;
        debug!(listed = ids.len(), "Hacker News story list fetched");

        // buffered() keeps list order, which is the ranking
        let fetched: Vec<Result<Option<HnItem>, UpstreamError>> =
            stream::iter(ids.into_iter().take(self.config.scan))
                .map(|id| self.fetch_item(id))
                .buffered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut first_error = None;
        let mut stories = Vec::with_capacity(fetched.len());
        for outcome in fetched {
            match outcome {
                Ok(item) => stories.push(item),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        // The list loaded but not a single item did
        if stories.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let items: Vec<ContentItem> = stories
            .into_iter()
            .flatten()
            .filter_map(Self::to_item)
            .filter(|item| item.published_on() == date)
            .take(self.config.limit)
            .collect();

        info!(count = items.len(), %date, "Hacker News stories on date");
        Ok(items)
    }

    /// Fetch one item. `Ok(None)` is an id the API no longer knows.
    async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>, UpstreamError> {
        let url = format!("{}/item/{}.json", self.base_url(), id);
        send_json::<Option<HnItem>>(self.client.get(&url))
            .await
            .inspect_err(|e| warn!(error = %e, id, "Hacker News item fetch failed"))
    }

    /// Map a live story to a [`ContentItem`]; anything else yields `None`.
    pub fn to_item(item: HnItem) -> Option<ContentItem> {
        if item.dead || item.deleted || item.kind.as_deref() != Some("story") {
            return None;
        }
        let title = item.title.filter(|t| !t.trim().is_empty())?;
        let published_at = DateTime::<Utc>::from_timestamp(item.time?, 0)?;

        let item_page = format!("{}{}", ITEM_URL_PREFIX, item.id);
        let (url, discussion_url) = match item.url.filter(|u| !u.is_empty()) {
            Some(url) => (url, Some(item_page)),
            // Ask HN and text posts live on the item page itself
            None => (item_page, None),
        };

        let summary = format!(
            "{} points by {} | {} comments",
            item.score.unwrap_or(0),
            item.by.as_deref().unwrap_or("unknown"),
            item.descendants.unwrap_or(0)
        );

        Some(ContentItem {
            title,
            url,
            source: Source::Hackernews,
            published_at,
            summary: Some(summary),
            discussion_url,
            score: item.score,
            top_comments: Vec::new(),
        })
    }
}
