//! GitHub repositories created on a given day, ranked by stars.
//!
//! GitHub's trending page has no history, so the day view is built from the
//! search API with a `created:YYYY-MM-DD` qualifier instead.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{send_json, summarize};
use crate::config::GithubConfig;
use crate::error::UpstreamError;
use crate::model::{ContentItem, Source};

pub struct GithubAdapter {
    client: Client,
    config: GithubConfig,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub stargazers_count: i64,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GithubAdapter {
    pub fn new(client: Client, config: GithubConfig) -> Self {
        Self { client, config }
    }

    /// The `q` parameter for repositories created on `date`.
    pub fn search_query(&self, date: NaiveDate) -> String {
        let mut query = format!("created:{}", date.format("%Y-%m-%d"));
        if let Some(language) = self.config.language.as_deref().filter(|l| !l.is_empty()) {
            query.push_str(" language:");
            query.push_str(language);
        }
        query
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, date: NaiveDate) -> Result<Vec<ContentItem>, UpstreamError> {
        let url = format!(
            "{}/search/repositories",
            self.config.base_url.trim_end_matches('/')
        );
        let per_page = self.config.limit.to_string();

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", self.search_query(date).as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response: SearchResponse = send_json(request).await?;
        debug!(count = response.items.len(), "GitHub search returned repositories");

        Ok(Self::to_items(response))
    }

    pub fn to_items(response: SearchResponse) -> Vec<ContentItem> {
        response
            .items
            .into_iter()
            .filter(|repo| !repo.html_url.is_empty())
            .map(|repo| {
                let summary = match (repo.description.as_deref(), repo.language.as_deref()) {
                    (Some(description), Some(language)) => {
                        summarize(&format!("[{}] {}", language, description))
                    }
                    (Some(description), None) => summarize(description),
                    (None, Some(language)) => Some(format!("[{}]", language)),
                    (None, None) => None,
                };

                ContentItem {
                    title: repo.full_name,
                    url: repo.html_url,
                    source: Source::Github,
                    published_at: repo.created_at,
                    summary,
                    discussion_url: None,
                    score: Some(repo.stargazers_count),
                    top_comments: Vec::new(),
                }
            })
            .collect()
    }
}
