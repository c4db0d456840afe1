//! Upstream source adapters.
//!
//! Each adapter turns one upstream API into [`ContentItem`]s for a single
//! day. The set of adapters is closed: [`SourceAdapter`] has one variant per
//! [`Source`] and dispatches on it.
//!
//! | Source | Module | Date handling |
//! |--------|--------|---------------|
//! | GitHub | [`github`] | `created:` search qualifier |
//! | arXiv | [`arxiv`] | `submittedDate` range query |
//! | Hacker News | [`hackernews`] | fetch story list, filter locally |
//! | Reddit | [`reddit`] | fetch the smallest covering `top` window, filter locally |

pub mod arxiv;
pub mod github;
pub mod hackernews;
pub mod reddit;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::model::{ContentItem, Source};

pub use arxiv::ArxivAdapter;
pub use github::GithubAdapter;
pub use hackernews::HackerNewsAdapter;
pub use reddit::RedditAdapter;

const SUMMARY_MAX_CHARS: usize = 280;

pub enum SourceAdapter {
    Github(GithubAdapter),
    Hackernews(HackerNewsAdapter),
    Arxiv(ArxivAdapter),
    Reddit(RedditAdapter),
}

impl SourceAdapter {
    /// Build the adapter for `source`, sharing the process-wide client.
    pub fn for_source(source: Source, client: Client, config: &Config) -> Self {
        match source {
            Source::Github => SourceAdapter::Github(GithubAdapter::new(client, config.github.clone())),
            Source::Hackernews => SourceAdapter::Hackernews(HackerNewsAdapter::new(
                client,
                config.hackernews.clone(),
            )),
            Source::Arxiv => SourceAdapter::Arxiv(ArxivAdapter::new(client, config.arxiv.clone())),
            Source::Reddit => SourceAdapter::Reddit(RedditAdapter::new(client, config.reddit.clone())),
        }
    }

    pub fn source(&self) -> Source {
        match self {
            SourceAdapter::Github(_) => Source::Github,
            SourceAdapter::Hackernews(_) => Source::Hackernews,
            SourceAdapter::Arxiv(_) => Source::Arxiv,
            SourceAdapter::Reddit(_) => Source::Reddit,
        }
    }

    /// Fetch the items this source published on `date`, in upstream order.
    pub async fn fetch(&self, date: NaiveDate) -> Result<Vec<ContentItem>, UpstreamError> {
        let items = match self {
            SourceAdapter::Github(adapter) => adapter.fetch(date).await?,
            SourceAdapter::Hackernews(adapter) => adapter.fetch(date).await?,
            SourceAdapter::Arxiv(adapter) => adapter.fetch(date).await?,
            SourceAdapter::Reddit(adapter) => adapter.fetch(date).await?,
        };
        Ok(retain_on_date(items, date))
    }
}

/// Build the HTTP client shared by every adapter.
pub fn build_client(config: &Config) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.fetch.timeout_secs))
        .user_agent(config.fetch.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Send a request, turning any non-2xx status into an error.
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, UpstreamError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::from_response(status, response.headers()));
    }
    Ok(response)
}

/// Send a request and decode a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, UpstreamError> {
    let body = send(request).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

pub(crate) fn retain_on_date(mut items: Vec<ContentItem>, date: NaiveDate) -> Vec<ContentItem> {
    items.retain(|item| item.published_on() == date);
    items
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim free text down to a card-sized summary; blank text becomes `None`.
pub(crate) fn summarize(text: &str) -> Option<String> {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return Some(text);
    }
    let cut: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    let cut = match cut.rfind(' ') {
        Some(idx) if idx > SUMMARY_MAX_CHARS / 2 => &cut[..idx],
        _ => cut.as_str(),
    };
    Some(format!("{}…", cut.trim_end()))
}
