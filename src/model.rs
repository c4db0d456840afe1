use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DigestError, UpstreamError};

/// One of the upstream content sources shown as a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Github,
    Hackernews,
    Arxiv,
    Reddit,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Github,
        Source::Hackernews,
        Source::Arxiv,
        Source::Reddit,
    ];

    /// Lower-case name used in query strings and JSON.
    pub fn slug(self) -> &'static str {
        match self {
            Source::Github => "github",
            Source::Hackernews => "hackernews",
            Source::Arxiv => "arxiv",
            Source::Reddit => "reddit",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Source::Github => "GitHub",
            Source::Hackernews => "Hacker News",
            Source::Arxiv => "arXiv",
            Source::Reddit => "Reddit",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Source {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DigestError::InvalidRequest(format!("unknown source '{}'", s.trim())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub title: String,
    pub url: String,
    pub source: Source,
    pub published_at: DateTime<Utc>,
    pub summary: Option<String>,
    /// Comment thread, when it lives somewhere other than `url`.
    pub discussion_url: Option<String>,
    /// Stars, points or upvotes, whichever the source ranks by.
    pub score: Option<i64>,
    /// Highest-ranked replies; only Reddit fills this.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub score: i64,
}

impl ContentItem {
    pub fn published_on(&self) -> NaiveDate {
        self.published_at.date_naive()
    }
}

/// A validated request for one day's digest.
///
/// The fields are private so every instance has gone through [`DigestRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRequest {
    date: NaiveDate,
    sources: BTreeSet<Source>,
}

impl DigestRequest {
    pub fn new(
        date: NaiveDate,
        sources: impl IntoIterator<Item = Source>,
        today: NaiveDate,
    ) -> Result<Self, DigestError> {
        let sources: BTreeSet<Source> = sources.into_iter().collect();
        if sources.is_empty() {
            return Err(DigestError::InvalidRequest(
                "at least one source must be requested".to_string(),
            ));
        }
        if date > today {
            return Err(DigestError::InvalidRequest(format!(
                "date {} is in the future",
                date
            )));
        }
        Ok(Self { date, sources })
    }

    /// Build a request from raw query parameters.
    ///
    /// A missing `date` means `today`, a missing `sources` means `defaults`.
    /// An explicitly empty `sources` is rejected.
    pub fn from_params(
        date: Option<&str>,
        sources: Option<&str>,
        defaults: &[Source],
        today: NaiveDate,
    ) -> Result<Self, DigestError> {
        let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                DigestError::InvalidRequest(format!("invalid date '{}', expected YYYY-MM-DD", raw))
            })?,
            None => today,
        };

        let sources = match sources {
            Some(raw) => raw
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(Source::from_str)
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.to_vec(),
        };

        Self::new(date, sources, today)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sources(&self) -> &BTreeSet<Source> {
        &self.sources
    }
}

/// What one source contributed to a digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceDigest {
    pub items: Vec<ContentItem>,
    pub error: Option<String>,
}

impl SourceDigest {
    pub fn from_outcome(outcome: Result<Vec<ContentItem>, UpstreamError>) -> Self {
        match outcome {
            Ok(items) => Self { items, error: None },
            Err(err) => Self {
                items: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestResult {
    pub date: NaiveDate,
    pub sources: BTreeMap<Source, SourceDigest>,
}

impl DigestResult {
    pub fn get(&self, source: Source) -> Option<&SourceDigest> {
        self.sources.get(&source)
    }
}
