//! News capability - looks up recent articles for a topic
//!
//! Queries a NewsAPI-compatible `everything` endpoint and returns a JSON array
//! of formatted article summaries. Exactly five articles are requested; the
//! output is capped at five even if the upstream ignores `pageSize`.

use super::{Capability, CapabilityResult};
use crate::config::DocentConfig;
use crate::error::{DocentError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Number of articles requested from the upstream search
pub const PAGE_SIZE: usize = 5;

/// News search response body
#[derive(Debug, Clone, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub source: ArticleSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Pack one article into the summary line handed to the model.
pub fn format_article(article: &Article) -> String {
    format!(
        "Title: {}, Author: {}, Source: {}, Description: {}, URL: {}",
        article.title.as_deref().unwrap_or(""),
        article.author.as_deref().unwrap_or("unknown"),
        article.source.name.as_deref().unwrap_or(""),
        article.description.as_deref().unwrap_or(""),
        article.url.as_deref().unwrap_or(""),
    )
}

/// `get_news` capability
pub struct NewsCapability {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl NewsCapability {
    pub fn new(http: reqwest::Client, config: &DocentConfig) -> Self {
        Self {
            http,
            api_key: config.news_api_key.clone(),
            endpoint: config.news_api_url.clone(),
        }
    }

    /// Query the upstream search for `topic`.
    pub async fn search(&self, topic: &str) -> Result<Vec<Article>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DocentError::config("NEWS_API_KEY environment variable not set"))?;

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", topic),
                ("apikey", api_key),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocentError::api(status.as_u16(), body));
        }

        let body: NewsResponse = response.json().await?;
        if body.status.as_deref() == Some("error") {
            return Err(DocentError::http("news search reported an error status"));
        }

        Ok(body.articles.into_iter().take(PAGE_SIZE).collect())
    }
}

#[async_trait]
impl Capability for NewsCapability {
    fn name(&self) -> &str {
        "get_news"
    }

    fn description(&self) -> &str {
        "Get news title, author, description and URL which is similar to the news topic provided by the user"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "news topic provided by the user"
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, arguments: Value) -> CapabilityResult {
        let topic = match arguments.get("topic").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => return CapabilityResult::tool_error("Argument 'topic' must be a string"),
        };

        match self.search(topic).await {
            Ok(articles) => {
                tracing::debug!(topic = %topic, count = articles.len(), "News search succeeded");
                let summaries: Vec<String> = articles.iter().map(format_article).collect();
                match serde_json::to_string(&summaries) {
                    Ok(output) => CapabilityResult::success(output),
                    Err(e) => CapabilityResult::failed(e.to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "News search failed");
                CapabilityResult::failed(format!("news search failed: {}", e))
            }
        }
    }
}
