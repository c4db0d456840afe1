//! Top posts from a configured list of subreddits.
//!
//! Reddit listings cannot be queried by date, only by a `top` window ending
//! now. The adapter asks for the smallest window that still covers the
//! requested day and filters locally. With client credentials configured,
//! listings are read through the OAuth host with an application-only token.
//! Each kept post also carries its few highest-ranked comments.

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{send_json, summarize};
use crate::config::RedditConfig;
use crate::error::UpstreamError;
use crate::model::{Comment, ContentItem, Source};

const PERMALINK_HOST: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    /// Smallest `top` window reaching back to `date`.
    pub fn covering(date: NaiveDate, today: NaiveDate) -> Self {
        match (today - date).num_days() {
            i64::MIN..=0 => TimeWindow::Day,
            1..=6 => TimeWindow::Week,
            7..=29 => TimeWindow::Month,
            30..=364 => TimeWindow::Year,
            _ => TimeWindow::All,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Image,
    Gallery,
    Video,
    Poll,
    Crosspost,
    Text,
    Link,
}

#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    pub children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub struct Thing {
    pub data: Post,
}

#[derive(Debug, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub permalink: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub ups: i64,
    #[serde(default = "full_ratio")]
    pub upvote_ratio: f64,
    #[serde(default)]
    pub selftext: String,
    pub created_utc: f64,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub is_gallery: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub post_hint: Option<String>,
    #[serde(default)]
    pub poll_data: Option<serde_json::Value>,
    #[serde(default)]
    pub crosspost_parent: Option<String>,
    #[serde(default)]
    pub media: Option<serde_json::Value>,
    #[serde(default)]
    pub secure_media: Option<serde_json::Value>,
}

fn full_ratio() -> f64 {
    1.0
}

impl Post {
    pub fn kind(&self) -> PostKind {
        if self.post_hint.as_deref() == Some("image") {
            PostKind::Image
        } else if self.is_gallery {
            PostKind::Gallery
        } else if self.is_video {
            PostKind::Video
        } else if self.poll_data.is_some() {
            PostKind::Poll
        } else if self.crosspost_parent.is_some() {
            PostKind::Crosspost
        } else if self.is_self {
            PostKind::Text
        } else {
            PostKind::Link
        }
    }

    fn video_url(&self) -> Option<String> {
        [&self.media, &self.secure_media]
            .into_iter()
            .flatten()
            .find_map(|media| media.pointer("/reddit_video/fallback_url"))
            .and_then(|url| url.as_str())
            .map(String::from)
    }
}

/// The comments endpoint answers with the post listing, then the replies.
#[derive(Debug, Deserialize)]
struct CommentsPage(serde::de::IgnoredAny, CommentListing);

#[derive(Debug, Deserialize)]
struct CommentListing {
    data: CommentListingData,
}

#[derive(Debug, Deserialize)]
struct CommentListingData {
    children: Vec<CommentThing>,
}

// "more" stubs share the listing but carry none of these fields
#[derive(Debug, Deserialize)]
struct CommentThing {
    kind: String,
    data: CommentData,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    author: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    stickied: bool,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

pub struct RedditAdapter {
    client: Client,
    config: RedditConfig,
}

impl RedditAdapter {
    pub fn new(client: Client, config: RedditConfig) -> Self {
        Self { client, config }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, date: NaiveDate) -> Result<Vec<ContentItem>, UpstreamError> {
        let window = TimeWindow::covering(date, Utc::now().date_naive());
        let token = self.access_token().await?;

        let listings = join_all(
            self.config
                .subreddits
                .iter()
                .map(|sub| self.fetch_subreddit(&sub.name, window, token.as_deref())),
        )
        .await;

        let mut posts = Vec::new();
        let mut first_error = None;
        let mut succeeded = 0;
        for (sub, listing) in self.config.subreddits.iter().zip(listings) {
            match listing {
                Ok(listing) => {
                    succeeded += 1;
                    posts.extend(self.kept_posts(listing));
                }
                Err(e) => {
                    warn!(error = %e, subreddit = %sub.name, "Subreddit fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        posts.retain(|(_, item)| item.published_on() == date);
        let items = self.with_top_comments(posts, token.as_deref()).await;
        info!(count = items.len(), %date, window = window.as_param(), "Reddit posts on date");
        Ok(items)
    }

    /// Application-only OAuth token, when credentials are configured.
    async fn access_token(&self) -> Result<Option<String>, UpstreamError> {
        let (Some(id), Some(secret)) = (&self.config.client_id, &self.config.client_secret) else {
            return Ok(None);
        };

        let url = format!(
            "{}/api/v1/access_token",
            self.config.base_url.trim_end_matches('/')
        );
        let request = self
            .client
            .post(&url)
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")]);

        let token: AccessToken = send_json(request).await?;
        debug!("Obtained Reddit access token");
        Ok(Some(token.access_token))
    }

    async fn fetch_subreddit(
        &self,
        name: &str,
        window: TimeWindow,
        token: Option<&str>,
    ) -> Result<Listing, UpstreamError> {
        let limit = self.config.limit.to_string();
        let request = match token {
            Some(token) => self
                .client
                .get(format!(
                    "{}/r/{}/top",
                    self.config.oauth_base_url.trim_end_matches('/'),
                    name
                ))
                .bearer_auth(token),
            None => self.client.get(format!(
                "{}/r/{}/top.json",
                self.config.base_url.trim_end_matches('/'),
                name
            )),
        };

        send_json(request.query(&[
            ("t", window.as_param()),
            ("limit", limit.as_str()),
            ("raw_json", "1"),
        ]))
        .await
    }

    /// Drop unwanted posts and map the rest, keeping listing order.
    pub fn to_items(&self, listing: Listing) -> Vec<ContentItem> {
        self.kept_posts(listing)
            .into_iter()
            .map(|(_, item)| item)
            .collect()
    }

    fn kept_posts(&self, listing: Listing) -> Vec<(String, ContentItem)> {
        listing
            .data
            .children
            .into_iter()
            .map(|thing| thing.data)
            .filter(|post| self.keep(post))
            .filter_map(|post| {
                let id = post.id.clone();
                Self::to_item(post).map(|item| (id, item))
            })
            .collect()
    }

    /// Attach each post's top comments. A failed comment fetch leaves the
    /// post without comments.
    async fn with_top_comments(
        &self,
        posts: Vec<(String, ContentItem)>,
        token: Option<&str>,
    ) -> Vec<ContentItem> {
        if self.config.comments_limit == 0 {
            return posts.into_iter().map(|(_, item)| item).collect();
        }

        join_all(posts.into_iter().map(|(id, mut item)| async move {
            match self.fetch_comments(&id, token).await {
                Ok(comments) => item.top_comments = comments,
                Err(e) => warn!(error = %e, post = %id, "Reddit comments fetch failed"),
            }
            item
        }))
        .await
    }

    async fn fetch_comments(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<Vec<Comment>, UpstreamError> {
        let limit = self.config.comments_limit.to_string();
        let request = match token {
            Some(token) => self
                .client
                .get(format!(
                    "{}/comments/{}",
                    self.config.oauth_base_url.trim_end_matches('/'),
                    id
                ))
                .bearer_auth(token),
            None => self.client.get(format!(
                "{}/comments/{}.json",
                self.config.base_url.trim_end_matches('/'),
                id
            )),
        };

        let CommentsPage(_, listing) = send_json(request.query(&[
            ("sort", "top"),
            ("limit", limit.as_str()),
            ("depth", "1"),
            ("raw_json", "1"),
        ]))
        .await?;

        Ok(Self::to_comments(listing, self.config.comments_limit))
    }

    fn to_comments(listing: CommentListing, limit: usize) -> Vec<Comment> {
        listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t1")
            .map(|thing| thing.data)
            .filter(|c| !c.stickied && c.author != "AutoModerator")
            .filter(|c| !matches!(c.body.trim(), "" | "[deleted]" | "[removed]"))
            .filter_map(|c| {
                Some(Comment {
                    body: summarize(&c.body)?,
                    author: c.author,
                    score: c.score,
                })
            })
            .take(limit)
            .collect()
    }

    fn keep(&self, post: &Post) -> bool {
        if post.stickied || post.author == "AutoModerator" {
            return false;
        }
        if post.title.to_lowercase().contains("megathread") {
            return false;
        }
        if post.upvote_ratio < self.config.min_upvote_ratio {
            return false;
        }
        !matches!(
            post.kind(),
            PostKind::Gallery | PostKind::Poll | PostKind::Crosspost
        )
    }

    fn to_item(post: Post) -> Option<ContentItem> {
        let published_at = DateTime::<Utc>::from_timestamp(post.created_utc as i64, 0)?;
        let permalink = format!("{}{}", PERMALINK_HOST, post.permalink);

        let url = match post.kind() {
            PostKind::Video => post.video_url(),
            PostKind::Text => None,
            _ => post.url.clone(),
        }
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| permalink.clone());

        let discussion_url = (url != permalink).then_some(permalink);

        Some(ContentItem {
            title: post.title,
            url,
            source: Source::Reddit,
            published_at,
            summary: summarize(&post.selftext),
            discussion_url,
            score: Some(post.ups),
            top_comments: Vec::new(),
        })
    }
}
