//! arXiv papers submitted on a given day.
//!
//! Uses the arXiv query API, which answers in Atom. The date goes into a
//! `submittedDate` range so upstream does the filtering.

use std::collections::HashSet;

use chrono::NaiveDate;
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::{collapse_whitespace, send, summarize};
use crate::config::ArxivConfig;
use crate::error::UpstreamError;
use crate::model::{ContentItem, Source};

pub struct ArxivAdapter {
    client: Client,
    config: ArxivConfig,
}

impl ArxivAdapter {
    pub fn new(client: Client, config: ArxivConfig) -> Self {
        Self { client, config }
    }

    /// The `search_query` for papers in the configured categories on `date`.
    pub fn search_query(&self, date: NaiveDate) -> String {
        let day = date.format("%Y%m%d");
        let range = format!("submittedDate:[{}0000 TO {}2359]", day, day);

        let categories: Vec<String> = self
            .config
            .categories
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("cat:{}", c.trim()))
            .collect();

        if categories.is_empty() {
            range
        } else {
            format!("({}) AND {}", categories.join(" OR "), range)
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, date: NaiveDate) -> Result<Vec<ContentItem>, UpstreamError> {
        let url = format!("{}/query", self.config.base_url.trim_end_matches('/'));
        let max_results = self.config.limit.to_string();

        let request = self.client.get(&url).query(&[
            ("search_query", self.search_query(date).as_str()),
            ("sortBy", "submittedDate"),
            ("sortOrder", "descending"),
            ("start", "0"),
            ("max_results", max_results.as_str()),
        ]);

        let bytes = send(request).await?.bytes().await?;
        Self::parse_feed(&bytes)
    }

    /// Parse an arXiv Atom response into items, in feed order.
    pub fn parse_feed(xml: &[u8]) -> Result<Vec<ContentItem>, UpstreamError> {
        let feed = parser::parse(xml).map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for entry in feed.entries {
            // Query errors come back as a single entry under /api/errors
            if entry.id.contains("/api/errors") {
                let message = entry
                    .summary
                    .map(|s| collapse_whitespace(&s.content))
                    .unwrap_or_else(|| "arXiv query error".to_string());
                return Err(UpstreamError::Malformed(message));
            }

            if !seen.insert(Self::paper_id(&entry.id)) {
                debug!(id = %entry.id, "Skipping duplicate arXiv entry");
                continue;
            }

            match Self::to_item(entry) {
                Some(item) => items.push(item),
                None => warn!("Skipping arXiv entry without link or date"),
            }
        }

        Ok(items)
    }

    /// `http://arxiv.org/abs/2401.01234v2` -> `2401.01234`
    pub fn paper_id(entry_id: &str) -> String {
        let tail = entry_id.rsplit("/abs/").next().unwrap_or(entry_id);
        match tail.rsplit_once('v') {
            Some((id, version))
                if !id.is_empty()
                    && !version.is_empty()
                    && version.chars().all(|c| c.is_ascii_digit()) =>
            {
                id.to_string()
            }
            _ => tail.to_string(),
        }
    }

    fn to_item(entry: Entry) -> Option<ContentItem> {
        let published_at = entry.published.or(entry.updated)?;

        let url = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone())
            .filter(|href| !href.is_empty())
            .unwrap_or_else(|| entry.id.clone());
        if url.is_empty() {
            return None;
        }

        let title = entry
            .title
            .map(|t| collapse_whitespace(&t.content))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        Some(ContentItem {
            title,
            url,
            source: Source::Arxiv,
            published_at,
            summary: entry.summary.and_then(|s| summarize(&s.content)),
            discussion_url: None,
            score: None,
            top_comments: Vec::new(),
        })
    }
}
