use serde::Deserialize;
use std::path::Path;

use crate::model::Source;
use crate::sources::hackernews::StoryList;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Sources shown when a request does not name any
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub hackernews: HackerNewsConfig,
    #[serde(default)]
    pub arxiv: ArxivConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
}

fn default_sources() -> Vec<Source> {
    Source::ALL.to_vec()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Per-source timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_user_agent() -> String {
    "TechDigest/0.1 (daily developer digest)".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_base_url")]
    pub base_url: String,
    #[serde(default = "default_github_limit")]
    pub limit: usize,
    /// Restrict results to one language, e.g. "rust"
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_limit() -> usize {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct HackerNewsConfig {
    #[serde(default = "default_hackernews_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub list: StoryList,
    /// How many story ids to look at before date filtering
    #[serde(default = "default_hackernews_scan")]
    pub scan: usize,
    #[serde(default = "default_hackernews_limit")]
    pub limit: usize,
    #[serde(default = "default_hackernews_concurrency")]
    pub concurrency: usize,
}

fn default_hackernews_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_hackernews_scan() -> usize {
    100
}

fn default_hackernews_limit() -> usize {
    30
}

fn default_hackernews_concurrency() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArxivConfig {
    #[serde(default = "default_arxiv_base_url")]
    pub base_url: String,
    #[serde(default = "default_arxiv_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_arxiv_limit")]
    pub limit: usize,
}

fn default_arxiv_base_url() -> String {
    "https://export.arxiv.org/api".to_string()
}

fn default_arxiv_categories() -> Vec<String> {
    vec!["cs.AI".to_string(), "cs.CL".to_string(), "cs.LG".to_string()]
}

fn default_arxiv_limit() -> usize {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_base_url")]
    pub base_url: String,
    #[serde(default = "default_reddit_oauth_base_url")]
    pub oauth_base_url: String,
    /// Posts requested per subreddit
    #[serde(default = "default_reddit_limit")]
    pub limit: usize,
    #[serde(default = "default_min_upvote_ratio")]
    pub min_upvote_ratio: f64,
    /// Top comments fetched per kept post; 0 turns comments off
    #[serde(default = "default_comments_limit")]
    pub comments_limit: usize,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<SubredditConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubredditConfig {
    pub name: String,
}

fn default_reddit_base_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_reddit_oauth_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_reddit_limit() -> usize {
    10
}

fn default_min_upvote_ratio() -> f64 {
    0.7
}

fn default_comments_limit() -> usize {
    3
}

fn default_subreddits() -> Vec<SubredditConfig> {
    ["MachineLearning", "programming", "rust"]
        .into_iter()
        .map(|name| SubredditConfig {
            name: name.to_string(),
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            server: ServerConfig::default(),
            fetch: FetchConfig::default(),
            github: GithubConfig::default(),
            hackernews: HackerNewsConfig::default(),
            arxiv: ArxivConfig::default(),
            reddit: RedditConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: default_github_base_url(),
            limit: default_github_limit(),
            language: None,
            token: None,
        }
    }
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_hackernews_base_url(),
            list: StoryList::default(),
            scan: default_hackernews_scan(),
            limit: default_hackernews_limit(),
            concurrency: default_hackernews_concurrency(),
        }
    }
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_base_url(),
            categories: default_arxiv_categories(),
            limit: default_arxiv_limit(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_reddit_base_url(),
            oauth_base_url: default_reddit_oauth_base_url(),
            limit: default_reddit_limit(),
            min_upvote_ratio: default_min_upvote_ratio(),
            comments_limit: default_comments_limit(),
            client_id: None,
            client_secret: None,
            subreddits: default_subreddits(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("`sources` must name at least one source");
        }
        Ok(())
    }

    /// Fill credentials from the environment, overriding the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(id) = lookup("REDDIT_CLIENT_ID") {
            self.reddit.client_id = Some(id);
        }
        if let Some(secret) = lookup("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = Some(secret);
        }
    }
}
