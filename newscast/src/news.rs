//! Headline fetching from NewsAPI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, NewsSettings};
use crate::error::Result;
use crate::retry::RetryConfig;
use crate::upstream::{self, Credential, Provider, UpstreamError, UpstreamErrorKind};

/// Title NewsAPI substitutes for articles withdrawn by their publisher.
const REMOVED_TITLE: &str = "[Removed]";

/// One headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Headline text.
    pub title: String,
    /// Short summary, when the publisher provides one.
    pub description: Option<String>,
    /// Publisher name.
    pub source_name: String,
    /// Publication time, when known.
    pub published_at: Option<DateTime<Utc>>,
    /// Link to the full article.
    pub url: Option<String>,
}

impl Article {
    /// Create an article with only the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            source_name: source_name.into(),
            published_at: None,
            url: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A source of current headlines.
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch one page of headlines.
    async fn headlines(&self) -> Result<Vec<Article>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadlinesResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArticle {
    #[serde(default)]
    source: WireSource,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSource {
    name: Option<String>,
}

impl WireArticle {
    fn into_article(self) -> Option<Article> {
        let title = self.title.map(|t| t.trim().to_owned())?;
        if title.is_empty() || title == REMOVED_TITLE {
            return None;
        }

        Some(Article {
            title,
            description: self
                .description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
            source_name: self
                .source
                .name
                .unwrap_or_else(|| "Unknown source".to_owned()),
            published_at: self
                .published_at
                .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            url: self.url,
        })
    }
}

/// NewsAPI top-headlines client.
#[derive(Debug, Clone)]
pub struct NewsApi {
    client: Client,
    credential: Credential,
    base_url: String,
    query: NewsSettings,
    retry: RetryConfig,
}

impl NewsApi {
    /// Create a client from its parts.
    pub fn new(
        credential: Credential,
        base_url: impl Into<String>,
        query: NewsSettings,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: upstream::build_client(Provider::NewsApi, timeout_secs)?,
            credential,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            query,
            retry: RetryConfig::default(),
        })
    }

    /// Create a client from the pipeline configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.credential(Provider::NewsApi)?,
            config.endpoints.base_url(Provider::NewsApi),
            config.news.clone(),
            config.timeout_secs,
        )?
        .with_retry(config.retry.clone()))
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The headlines URL without the credential.
    pub fn headlines_url(&self) -> Result<Url> {
        let page_size = self.query.page_size.to_string();
        Ok(Url::parse_with_params(
            &format!("{}/top-headlines", self.base_url),
            [
                ("country", self.query.country.as_str()),
                ("category", self.query.category.as_str()),
                ("pageSize", page_size.as_str()),
            ],
        )?)
    }

    fn parse_body(body: &str) -> std::result::Result<Vec<Article>, UpstreamError> {
        let parsed: HeadlinesResponse = serde_json::from_str(body).map_err(|e| {
            UpstreamError::response_format(Provider::NewsApi, "a headlines document", e)
        })?;

        if parsed.status != "ok" {
            let kind = match parsed.code.as_deref() {
                Some("apiKeyInvalid" | "apiKeyMissing" | "apiKeyDisabled") => {
                    UpstreamErrorKind::Auth
                }
                Some("rateLimited") => UpstreamErrorKind::RateLimited,
                _ => UpstreamErrorKind::HttpStatus,
            };
            let message = parsed
                .message
                .or(parsed.code)
                .unwrap_or_else(|| format!("status {}", parsed.status));
            return Err(UpstreamError::new(Provider::NewsApi, kind, None, message));
        }

        Ok(parsed
            .articles
            .into_iter()
            .filter_map(WireArticle::into_article)
            .collect())
    }
}

#[async_trait]
impl HeadlineSource for NewsApi {
    async fn headlines(&self) -> Result<Vec<Article>> {
        let url = self.headlines_url()?;
        info!(
            country = %self.query.country,
            category = %self.query.category,
            page_size = self.query.page_size,
            "fetching headlines"
        );
        debug!(%url, "GET");

        let response = upstream::execute(Provider::NewsApi, &self.retry, || {
            self.credential
                .authorize(&self.client, Method::GET, url.clone())
        })
        .await?;

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Provider::NewsApi, &e))?;
        let articles = Self::parse_body(&body)?;

        info!(count = articles.len(), "fetched headlines");
        for (index, article) in articles.iter().enumerate() {
            info!("  {}. {} ({})", index + 1, article.title, article.source_name);
        }

        Ok(articles)
    }
}
