use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::error::DigestError;
use crate::model::{Comment, ContentItem, DigestRequest, DigestResult, Source, SourceDigest};

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Sources used when the query string names none
    pub default_sources: Vec<Source>,
}

impl AppState {
    fn digest_request(&self, query: &DigestQuery) -> Result<DigestRequest, DigestError> {
        DigestRequest::from_params(
            query.date.as_deref(),
            query.sources.as_deref(),
            &self.default_sources,
            Utc::now().date_naive(),
        )
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/digest", get(digest_json))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub date: String,
    pub today: String,
    pub prev_date: String,
    pub next_date: Option<String>,
    pub sources_param: String,
    pub tabs: Vec<Tab>,
}

pub struct Tab {
    pub slug: &'static str,
    pub label: &'static str,
    pub items: Vec<ItemView>,
    pub error: Option<String>,
}

pub struct ItemView {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub discussion_url: Option<String>,
    pub score: Option<String>,
    pub time: String,
    pub comments: Vec<Comment>,
}

impl IndexTemplate {
    pub fn new(request: &DigestRequest, digest: DigestResult, today: NaiveDate) -> Self {
        let date = digest.date;
        let sources_param = request
            .sources()
            .iter()
            .map(|source| source.slug())
            .collect::<Vec<_>>()
            .join(",");

        let tabs = digest
            .sources
            .into_iter()
            .map(|(source, digest)| Tab::new(source, digest))
            .collect();

        Self {
            date: date.to_string(),
            today: today.to_string(),
            prev_date: date.pred_opt().unwrap_or(date).to_string(),
            next_date: (date < today)
                .then(|| date.succ_opt())
                .flatten()
                .map(|d| d.to_string()),
            sources_param,
            tabs,
        }
    }
}

impl Tab {
    fn new(source: Source, digest: SourceDigest) -> Self {
        Self {
            slug: source.slug(),
            label: source.label(),
            items: digest.items.into_iter().map(ItemView::from).collect(),
            error: digest.error,
        }
    }
}

impl From<ContentItem> for ItemView {
    fn from(item: ContentItem) -> Self {
        let score = item.score.map(|score| match item.source {
            Source::Github => format!("★ {}", score),
            _ => format!("▲ {}", score),
        });

        let discussion_url = item.discussion_url.filter(|url| is_web_url(url));
        // A link with any other scheme is never rendered into an href
        let url = if is_web_url(&item.url) {
            item.url
        } else {
            discussion_url.clone().unwrap_or_else(|| "#".to_string())
        };

        Self {
            time: item.published_at.format("%H:%M UTC").to_string(),
            title: item.title,
            url,
            summary: item.summary,
            discussion_url,
            score,
            comments: item.top_comments,
        }
    }
}

fn is_web_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("https://") || url.starts_with("http://")
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Invalid requests are the only errors a caller ever sees
pub struct AppError(DigestError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, format!("Error: {}", self.0)).into_response()
    }
}

impl From<DigestError> for AppError {
    fn from(err: DigestError) -> Self {
        AppError(err)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DigestQuery {
    pub date: Option<String>,
    /// Comma-separated source slugs
    pub sources: Option<String>,
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DigestQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.digest_request(&query)?;
    debug!(date = %request.date(), sources = request.sources().len(), "Rendering digest page");

    let digest = state.aggregator.fetch(&request).await;

    Ok(HtmlTemplate(IndexTemplate::new(
        &request,
        digest,
        Utc::now().date_naive(),
    )))
}

pub async fn digest_json(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DigestQuery>,
) -> Result<Json<DigestResult>, AppError> {
    let request = state.digest_request(&query)?;
    Ok(Json(state.aggregator.fetch(&request).await))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
