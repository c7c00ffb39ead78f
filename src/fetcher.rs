use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{
    group_news_by_feed, CategoriesEnvelope, ErrorBody, FeedEntity, FeedId, FeedsEnvelope,
    LocationsEnvelope, NewsEnvelope, API_BASE_URL,
};
use crate::error::FetchError;
use crate::filter::Filter;

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub news: String,
    pub categories: String,
    pub locations: String,
}

impl Endpoints {
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            news: format!("{base}/news"),
            categories: format!("{base}/categories"),
            locations: format!("{base}/locations"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::with_base(API_BASE_URL)
    }
}

/// Shape of the `/news` response the server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// `{ feeds: [{ feed_id, ..., news: [...] }] }`
    #[default]
    Feeds,
    /// `{ news: [{ ..., feed_id, locations: [...], feed: { name } }] }`
    News,
}

pub fn request_url(endpoint: &str, pairs: &[(&'static str, String)]) -> String {
    if pairs.is_empty() {
        return endpoint.to_string();
    }
    let query = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{endpoint}?{query}")
}

/// Thin client over the news API. Every call issues a fresh request; the
/// caller decides which response is still wanted.
#[derive(Debug, Clone)]
pub struct DataFetcher {
    client: Client,
    endpoints: Endpoints,
}

impl DataFetcher {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Feeds with their news, decoded from whichever envelope the server
    /// is configured for.
    pub async fn fetch(
        &self,
        envelope: Envelope,
        filter: &Filter,
        feed_ids: &[FeedId],
    ) -> Result<Vec<FeedEntity>, FetchError> {
        match envelope {
            Envelope::Feeds => self.fetch_feeds(filter, feed_ids).await,
            Envelope::News => self.fetch_news(filter, feed_ids).await,
        }
    }

    /// Feed-centric envelope: `{ feeds: [{ feed_id, ..., news: [...] }] }`.
    pub async fn fetch_feeds(
        &self,
        filter: &Filter,
        feed_ids: &[FeedId],
    ) -> Result<Vec<FeedEntity>, FetchError> {
        let url = request_url(&self.endpoints.news, &filter.to_query_pairs(feed_ids));
        let envelope: FeedsEnvelope = self.get_json(&url).await?;
        let feeds = present_or_empty(envelope.feeds, "feeds", &url);
        Ok(feeds.into_iter().filter_map(FeedEntity::from_record).collect())
    }

    /// Flat envelope: `{ news: [{ ..., locations: [...], feed: { name } }] }`,
    /// regrouped per feed so it renders like `fetch_feeds`.
    pub async fn fetch_news(
        &self,
        filter: &Filter,
        feed_ids: &[FeedId],
    ) -> Result<Vec<FeedEntity>, FetchError> {
        let url = request_url(&self.endpoints.news, &filter.to_query_pairs(feed_ids));
        let envelope: NewsEnvelope = self.get_json(&url).await?;
        Ok(group_news_by_feed(present_or_empty(envelope.news, "news", &url)))
    }

    pub async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
        let url = self.endpoints.categories.clone();
        let envelope: CategoriesEnvelope = self.get_json(&url).await?;
        Ok(present_or_empty(envelope.categories, "categories", &url))
    }

    pub async fn fetch_locations(&self) -> Result<Vec<String>, FetchError> {
        let url = self.endpoints.locations.clone();
        let envelope: LocationsEnvelope = self.get_json(&url).await?;
        Ok(present_or_empty(envelope.locations, "locations", &url))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(%url, "fetching");
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(FetchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str::<T>(&text).map_err(|source| FetchError::Malformed {
            endpoint: url.to_string(),
            source,
        })
    }
}

fn present_or_empty<T>(value: Option<Vec<T>>, key: &str, url: &str) -> Vec<T> {
    match value {
        Some(items) => items,
        None => {
            warn!(%url, key, "response missing expected key, treating as empty");
            Vec::new()
        }
    }
}
