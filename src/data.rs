use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

pub const APP_ID: &str = "org.newsmap.NewsMap";
pub const API_BASE_URL: &str = "https://peterwolters.org/api";

pub type FeedId = i64;

#[derive(Debug, Deserialize, Clone)]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedNameRecord {
    #[serde(default)]
    pub name: Option<String>,
}

/// A news item as the API sends it. The flat `/news` envelope fills
/// `feed_id`, `locations` and `feed`; inside `feeds[].news` they are absent.
/// Every field may be `null`: items scraped without a link or title still
/// arrive alongside valid ones.
#[derive(Debug, Deserialize, Clone)]
pub struct NewsRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub feed_id: Option<FeedId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default)]
    pub feed: Option<FeedNameRecord>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedRecord {
    pub feed_id: FeedId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub news_count: Option<u32>,
    #[serde(default)]
    pub news: Vec<NewsRecord>,
}

// Top-level keys are optional: a missing key decodes to `None` and is
// treated as an empty result by the fetcher.

#[derive(Debug, Deserialize)]
pub struct FeedsEnvelope {
    pub feeds: Option<Vec<FeedRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct NewsEnvelope {
    pub news: Option<Vec<NewsRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesEnvelope {
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct LocationsEnvelope {
    pub locations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub publication_date: Option<DateTime<FixedOffset>>,
    pub link: String,
    pub feed_name: Option<String>,
}

impl NewsItem {
    pub fn from_record(record: NewsRecord, feed_name: Option<&str>) -> Self {
        let publication_date = record
            .publication_date
            .as_deref()
            .and_then(parse_publication_date);
        let feed_name = record
            .feed
            .and_then(|feed| feed.name)
            .or_else(|| feed_name.map(ToOwned::to_owned))
            .filter(|name| !name.trim().is_empty());

        Self {
            title: record.title.unwrap_or_default(),
            description: record.description.unwrap_or_default(),
            publication_date,
            link: record.link.unwrap_or_default(),
            feed_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntity {
    pub id: FeedId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub news_count: u32,
    pub news: Vec<NewsItem>,
}

impl FeedEntity {
    pub fn has_news(&self) -> bool {
        !self.news.is_empty()
    }
}

impl FeedEntity {
    /// Converts a wire record. Feeds without coordinates cannot be placed on
    /// the map and yield `None`.
    pub fn from_record(record: FeedRecord) -> Option<Self> {
        let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
            debug!(feed_id = record.feed_id, "skipping feed without coordinates");
            return None;
        };

        let name = record.name.unwrap_or_default();
        let news: Vec<NewsItem> = record
            .news
            .into_iter()
            .map(|item| NewsItem::from_record(item, Some(&name)))
            .collect();
        let news_count = record.news_count.unwrap_or(news.len() as u32);

        Some(Self {
            id: record.feed_id,
            name,
            latitude,
            longitude,
            news_count,
            news,
        })
    }
}

/// Folds the flat `news[]` envelope into feed entities keyed by `feed_id`,
/// keeping first-seen order. Items without a feed id or a location are
/// dropped because they cannot be placed on the map.
pub fn group_news_by_feed(records: Vec<NewsRecord>) -> Vec<FeedEntity> {
    let mut feeds: Vec<FeedEntity> = Vec::new();
    let mut index: HashMap<FeedId, usize> = HashMap::new();

    for record in records {
        let Some(feed_id) = record.feed_id else {
            debug!(title = ?record.title, "skipping news item without feed id");
            continue;
        };

        let slot = match index.get(&feed_id) {
            Some(&slot) => slot,
            None => {
                let Some(location) = record.locations.first() else {
                    debug!(feed_id, title = ?record.title, "skipping news item without location");
                    continue;
                };
                let name = record
                    .feed
                    .as_ref()
                    .and_then(|feed| feed.name.clone())
                    .or_else(|| location.name.clone())
                    .unwrap_or_default();
                feeds.push(FeedEntity {
                    id: feed_id,
                    name,
                    latitude: location.latitude,
                    longitude: location.longitude,
                    news_count: 0,
                    news: Vec::new(),
                });
                index.insert(feed_id, feeds.len() - 1);
                feeds.len() - 1
            }
        };

        let feed = &mut feeds[slot];
        let item = NewsItem::from_record(record, Some(&feed.name));
        feed.news.push(item);
        feed.news_count += 1;
    }

    feeds
}

/// Accepts RFC 3339, naive ISO 8601 (read as UTC) and RFC 2822 timestamps.
pub fn parse_publication_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }

    debug!(raw, "unrecognised publication date");
    None
}
