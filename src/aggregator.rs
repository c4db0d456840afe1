use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::UpstreamError;
use crate::model::{DigestRequest, DigestResult, Source, SourceDigest};
use crate::sources::SourceAdapter;

/// Fans a digest request out to the source adapters.
pub struct Aggregator {
    adapters: BTreeMap<Source, SourceAdapter>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(client: Client, config: &Config) -> Self {
        let adapters = Source::ALL
            .into_iter()
            .map(|source| SourceAdapter::for_source(source, client.clone(), config));
        Self::from_adapters(adapters, Duration::from_secs(config.fetch.timeout_secs))
    }

    pub fn from_adapters(
        adapters: impl IntoIterator<Item = SourceAdapter>,
        timeout: Duration,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.source(), adapter))
            .collect();
        Self { adapters, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch every requested source concurrently.
    ///
    /// Never fails: a source that errors or exceeds the timeout contributes
    /// an empty list and an error note, and the others are unaffected.
    pub async fn fetch(&self, request: &DigestRequest) -> DigestResult {
        let date = request.date();

        let fetches = request.sources().iter().map(|&source| async move {
            let outcome = match self.adapters.get(&source) {
                Some(adapter) => match timeout(self.timeout, adapter.fetch(date)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(UpstreamError::Unavailable(format!(
                        "timed out after {}s",
                        self.timeout.as_secs_f32()
                    ))),
                },
                None => Err(UpstreamError::Unavailable(
                    "source is not configured".to_string(),
                )),
            };
            (source, outcome)
        });

        let mut sources = BTreeMap::new();
        for (source, outcome) in join_all(fetches).await {
            match &outcome {
                Ok(items) => info!(%source, count = items.len(), %date, "Fetched source"),
                Err(e) => warn!(%source, error = %e, %date, "Source fetch failed"),
            }
            sources.insert(source, SourceDigest::from_outcome(outcome));
        }

        DigestResult { date, sources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GithubConfig, HackerNewsConfig};
    use crate::sources::test_support::*;
    use crate::sources::{GithubAdapter, HackerNewsAdapter};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(n: u32, created: &str) -> serde_json::Value {
        json!({
            "full_name": format!("octo/repo-{}", n),
            "html_url": format!("https://github.com/octo/repo-{}", n),
            "description": "desc",
            "stargazers_count": 1000 - n,
            "language": "Rust",
            "created_at": created
        })
    }

    fn story(id: u64, created: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": "story",
            "by": "bob",
            "time": at(created).timestamp(),
            "title": format!("HN {}", id),
            "url": format!("https://example.com/hn/{}", id),
            "score": 50,
            "descendants": 2
        })
    }

    async fn github_server(delay: Option<Duration>) -> MockServer {
        let server = MockServer::start().await;
        let body = json!({"items": [
            repo(1, "2024-01-15T01:00:00Z"),
            repo(2, "2024-01-15T02:00:00Z"),
            repo(3, "2024-01-15T03:00:00Z"),
        ]});
        let mut response = ResponseTemplate::new(200).set_body_json(body);
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    async fn hackernews_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([15, 14, 13, 12, 11])))
            .mount(&server)
            .await;
        for id in 11..=15 {
            Mock::given(method("GET"))
                .and(path(format!("/item/{}.json", id)))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(story(id, "2024-01-15T12:00:00Z")),
                )
                .mount(&server)
                .await;
        }
        server
    }

    fn aggregator(github: &MockServer, hackernews: &MockServer, timeout: Duration) -> Aggregator {
        let client = test_client();
        Aggregator::from_adapters(
            [
                SourceAdapter::Github(GithubAdapter::new(
                    client.clone(),
                    GithubConfig {
                        base_url: github.uri(),
                        ..GithubConfig::default()
                    },
                )),
                SourceAdapter::Hackernews(HackerNewsAdapter::new(
                    client,
                    HackerNewsConfig {
                        base_url: hackernews.uri(),
                        ..HackerNewsConfig::default()
                    },
                )),
            ],
            timeout,
        )
    }

    fn request(sources: &[Source]) -> DigestRequest {
        DigestRequest::new(day("2024-01-15"), sources.iter().copied(), day("2024-02-01")).unwrap()
    }

    #[tokio::test]
    async fn test_both_sources_populated_in_upstream_order() {
        let github = github_server(None).await;
        let hackernews = hackernews_server().await;
        let aggregator = aggregator(&github, &hackernews, Duration::from_secs(5));

        let result = aggregator
            .fetch(&request(&[Source::Github, Source::Hackernews]))
            .await;

        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.date, day("2024-01-15"));

        let github_items = &result.get(Source::Github).unwrap().items;
        let titles: Vec<_> = github_items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["octo/repo-1", "octo/repo-2", "octo/repo-3"]);

        let hn_items = &result.get(Source::Hackernews).unwrap().items;
        let titles: Vec<_> = hn_items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["HN 15", "HN 14", "HN 13", "HN 12", "HN 11"]);

        assert!(result.sources.values().all(|digest| digest.error.is_none()));
        assert!(result
            .sources
            .values()
            .flat_map(|digest| &digest.items)
            .all(|item| item.published_on() == day("2024-01-15")));
    }

    #[tokio::test]
    async fn test_slow_source_times_out_without_affecting_others() {
        let github = github_server(Some(Duration::from_secs(3))).await;
        let hackernews = hackernews_server().await;
        let aggregator = aggregator(&github, &hackernews, Duration::from_millis(500));

        let result = aggregator
            .fetch(&request(&[Source::Github, Source::Hackernews]))
            .await;

        let github_digest = result.get(Source::Github).unwrap();
        assert!(github_digest.items.is_empty());
        assert!(github_digest.error.as_deref().unwrap().contains("timed out"));

        let hn_digest = result.get(Source::Hackernews).unwrap();
        assert_eq!(hn_digest.items.len(), 5);
        assert!(hn_digest.error.is_none());
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let github = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&github)
            .await;
        let hackernews = hackernews_server().await;
        let aggregator = aggregator(&github, &hackernews, Duration::from_secs(5));

        let result = aggregator
            .fetch(&request(&[Source::Github, Source::Hackernews]))
            .await;

        assert!(result.get(Source::Github).unwrap().items.is_empty());
        assert!(result.get(Source::Github).unwrap().error.is_some());
        assert_eq!(result.get(Source::Hackernews).unwrap().items.len(), 5);
    }

    #[tokio::test]
    async fn test_one_key_per_requested_source() {
        let github = github_server(None).await;
        let hackernews = hackernews_server().await;
        let aggregator = aggregator(&github, &hackernews, Duration::from_secs(5));

        let result = aggregator.fetch(&request(&[Source::Hackernews])).await;
        assert_eq!(result.sources.keys().copied().collect::<Vec<_>>(), vec![Source::Hackernews]);

        // arXiv has no adapter here; it still gets a key, with an error
        let result = aggregator
            .fetch(&request(&[Source::Github, Source::Arxiv, Source::Hackernews]))
            .await;
        assert_eq!(result.sources.len(), 3);
        assert!(result.get(Source::Arxiv).unwrap().error.is_some());
    }

    #[tokio::test]
    async fn test_fetch_is_idempotent() {
        let github = github_server(None).await;
        let hackernews = hackernews_server().await;
        let aggregator = aggregator(&github, &hackernews, Duration::from_secs(5));
        let request = request(&[Source::Github, Source::Hackernews]);

        let first = aggregator.fetch(&request).await;
        let second = aggregator.fetch(&request).await;

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_source_set_is_invalid() {
        let result = DigestRequest::new(day("2024-01-15"), Vec::<Source>::new(), day("2024-02-01"));
        assert!(matches!(
            result,
            Err(crate::error::DigestError::InvalidRequest(_))
        ));
    }
}
