use chrono::{DateTime, FixedOffset};

use crate::data::{FeedEntity, FeedId, NewsItem};
use crate::filter::Bounds;
use crate::marker::{MarkerStyle, MarkerVisual};
use crate::selection::SelectionStore;

pub const NO_NEWS_MESSAGE: &str = "No news found";
pub const DATE_NOT_AVAILABLE: &str = "not available";
pub const UNKNOWN_PUBLISHER: &str = "unknown";

const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Position of a news item inside the feed list of the last applied
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewsRef {
    pub feed_index: usize,
    pub item_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub feed_id: FeedId,
    pub latitude: f64,
    pub longitude: f64,
    pub visual: MarkerVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsCard {
    pub news: NewsRef,
    pub title: String,
    pub description: String,
    pub published: String,
}

/// Map widget seen from the controller. Implementations dispatch
/// `UiEvent::MarkerClicked(feed_id)` when a placed marker is clicked.
pub trait MapSurface {
    fn clear_markers(&mut self);
    fn place_marker(&mut self, marker: MarkerSpec);
    fn viewport(&self) -> Option<Bounds>;
}

/// Scrollable news list. Implementations dispatch
/// `UiEvent::NewsActivated(card.news)` when a card is clicked.
pub trait ListSurface {
    fn clear(&mut self);
    fn append_header(&mut self, feed_name: &str, count: usize);
    fn append_card(&mut self, card: NewsCard);
    fn show_message(&mut self, message: &str);
}

/// Replaces every marker with one per feed that has news. Returns the number
/// of markers placed.
pub fn render_map(
    feeds: &[FeedEntity],
    selection: &SelectionStore,
    style: &MarkerStyle,
    map: &mut dyn MapSurface,
) -> usize {
    map.clear_markers();

    let mut placed = 0;
    for feed in feeds.iter().filter(|feed| feed.has_news()) {
        map.place_marker(MarkerSpec {
            feed_id: feed.id,
            latitude: feed.latitude,
            longitude: feed.longitude,
            visual: style.visual(feed, selection.has(feed.id)),
        });
        placed += 1;
    }
    placed
}

/// Rebuilds the list: a header per feed followed by its cards. Returns the
/// number of cards.
pub fn render_list(feeds: &[FeedEntity], list: &mut dyn ListSurface) -> usize {
    list.clear();

    let mut cards = 0;
    for (feed_index, feed) in feeds.iter().enumerate() {
        if !feed.has_news() {
            continue;
        }
        list.append_header(&feed.name, feed.news.len());
        for (item_index, item) in feed.news.iter().enumerate() {
            list.append_card(NewsCard {
                news: NewsRef {
                    feed_index,
                    item_index,
                },
                title: item.title.clone(),
                description: item.description.clone(),
                published: format_publication(item.publication_date.as_ref()),
            });
            cards += 1;
        }
    }

    if cards == 0 {
        list.show_message(NO_NEWS_MESSAGE);
    }
    cards
}

pub fn format_publication(date: Option<&DateTime<FixedOffset>>) -> String {
    match date {
        Some(date) => date.format(DISPLAY_DATE_FORMAT).to_string(),
        None => DATE_NOT_AVAILABLE.to_string(),
    }
}

/// Display label for a category: first letter uppercased.
pub fn category_label(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Content of the detail popup for one news item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsDetail {
    pub title: String,
    pub description: String,
    pub published: String,
    pub publisher: String,
    pub link: String,
}

impl NewsDetail {
    pub fn new(item: &NewsItem, feed_name: Option<&str>) -> Self {
        let publisher = feed_name
            .filter(|name| !name.trim().is_empty())
            .or(item.feed_name.as_deref())
            .unwrap_or(UNKNOWN_PUBLISHER)
            .to_string();

        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            published: format_publication(item.publication_date.as_ref()),
            publisher,
            link: item.link.clone(),
        }
    }
}
