use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::data::{FeedEntity, FeedId};
use crate::error::FetchError;
use crate::fetcher::{DataFetcher, Envelope};
use crate::filter::{parse_date, Bounds, Filter, FilterState};
use crate::marker::MarkerStyle;
use crate::selection::{SelectionStore, Toggle};
use crate::sequence::{RequestSequence, Ticket};
use crate::settings::Settings;
use crate::view::{render_list, render_map, ListSurface, MapSurface, NewsDetail, NewsRef, NO_NEWS_MESSAGE};

/// Everything the view layer can report.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    KeywordChanged(String),
    CategoryChanged(Option<String>),
    LocationChanged(Option<String>),
    StartDateChanged(String),
    EndDateChanged(String),
    ApplyFilters,
    PageChanged(u32),
    ClearSelection,
    MarkerClicked(FeedId),
    ViewportChanged(Bounds),
    Refresh,
    NewsActivated(NewsRef),
}

/// A fetch the controller wants issued, stamped with its ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFetch {
    pub ticket: Ticket,
    pub envelope: Envelope,
    pub filter: Filter,
    pub feed_ids: Vec<FeedId>,
}

impl PendingFetch {
    pub async fn run(self, fetcher: &DataFetcher) -> (Ticket, Result<Vec<FeedEntity>, FetchError>) {
        let result = fetcher
            .fetch(self.envelope, &self.filter, &self.feed_ids)
            .await;
        (self.ticket, result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied { markers: usize, cards: usize },
    Empty,
    Stale,
}

/// Single owner of the application state, built once at startup.
#[derive(Debug)]
pub struct Controller {
    filter: FilterState,
    selection: SelectionStore,
    sequence: RequestSequence,
    envelope: Envelope,
    style: MarkerStyle,
    viewport: Option<Bounds>,
    feeds: Vec<FeedEntity>,
    categories: Vec<String>,
    locations: Vec<String>,
}

impl Controller {
    pub fn new(settings: &Settings, today: NaiveDate) -> Self {
        let mut filter = FilterState::new();
        filter.set_default_range(today, settings.default_range_days);
        filter.set_per_page(settings.per_page);

        Self {
            filter,
            selection: SelectionStore::new(),
            sequence: RequestSequence::new(),
            envelope: settings.envelope,
            style: settings.markers.clone(),
            viewport: None,
            feeds: Vec::new(),
            categories: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn feeds(&self) -> &[FeedEntity] {
        &self.feeds
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Applies a UI event. Returns the fetch to issue, if the event changes
    /// what should be on screen.
    pub fn handle(&mut self, event: UiEvent, map: &mut dyn MapSurface) -> Option<PendingFetch> {
        match event {
            UiEvent::KeywordChanged(keyword) => {
                self.filter.set_keyword(keyword);
                None
            }
            UiEvent::CategoryChanged(category) => {
                self.filter.set_category(category);
                None
            }
            UiEvent::LocationChanged(location) => {
                self.filter.set_location(location);
                None
            }
            UiEvent::StartDateChanged(text) => {
                self.filter.set_start_date(parse_date(&text));
                None
            }
            UiEvent::EndDateChanged(text) => {
                self.filter.set_end_date(parse_date(&text));
                None
            }
            UiEvent::ApplyFilters => {
                self.selection.clear();
                Some(self.begin(map))
            }
            UiEvent::PageChanged(page) => {
                self.filter.set_page(Some(page.max(1)));
                Some(self.begin(map))
            }
            UiEvent::ClearSelection => {
                self.selection.clear();
                render_map(&self.feeds, &self.selection, &self.style, map);
                Some(self.begin(map))
            }
            UiEvent::MarkerClicked(feed_id) => {
                let toggle = self.selection.toggle(feed_id);
                info!(feed_id, selected = toggle == Toggle::Selected, "marker toggled");
                // Recolor right away; the refetch replaces the markers again.
                render_map(&self.feeds, &self.selection, &self.style, map);
                Some(self.begin(map))
            }
            UiEvent::ViewportChanged(bounds) => {
                self.viewport = Some(bounds);
                Some(self.begin(map))
            }
            UiEvent::Refresh => Some(self.begin(map)),
            UiEvent::NewsActivated(_) => None,
        }
    }

    /// Snapshots filter, viewport and selection into a new ticketed fetch.
    pub fn begin(&mut self, map: &dyn MapSurface) -> PendingFetch {
        if let Some(bounds) = map.viewport() {
            self.viewport = Some(bounds);
        }
        let ticket = self.sequence.issue();
        let pending = PendingFetch {
            ticket,
            envelope: self.envelope,
            filter: self.filter.query(self.viewport),
            feed_ids: self.selection.as_query_fragment(),
        };
        debug!(%ticket, selected = pending.feed_ids.len(), "issuing fetch");
        pending
    }

    /// Applies a finished fetch unless a newer one has been issued since.
    /// Errors are logged and shown as an empty result.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<FeedEntity>, FetchError>,
        map: &mut dyn MapSurface,
        list: &mut dyn ListSurface,
    ) -> Outcome {
        if !self.sequence.is_current(ticket) {
            debug!(%ticket, latest = ?self.sequence.latest(), "discarding stale response");
            return Outcome::Stale;
        }

        match result {
            Ok(feeds) => {
                self.feeds = feeds;
                let markers = render_map(&self.feeds, &self.selection, &self.style, map);
                let cards = render_list(&self.feeds, list);
                debug!(%ticket, markers, cards, "applied response");
                if cards == 0 {
                    Outcome::Empty
                } else {
                    Outcome::Applied { markers, cards }
                }
            }
            Err(e) => {
                warn!(%ticket, error = %e, status = ?e.status(), "failed to load feeds and news");
                self.feeds.clear();
                map.clear_markers();
                list.clear();
                list.show_message(NO_NEWS_MESSAGE);
                Outcome::Empty
            }
        }
    }

    pub fn detail(&self, news: NewsRef) -> Option<NewsDetail> {
        let feed = self.feeds.get(news.feed_index)?;
        let item = feed.news.get(news.item_index)?;
        Some(NewsDetail::new(item, Some(&feed.name)))
    }

    pub fn set_categories(&mut self, result: Result<Vec<String>, FetchError>) {
        match result {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                warn!(error = %e, "failed to load categories");
                self.categories.clear();
            }
        }
    }

    pub fn set_locations(&mut self, result: Result<Vec<String>, FetchError>) {
        match result {
            Ok(locations) => self.locations = locations,
            Err(e) => {
                warn!(error = %e, "failed to load locations");
                self.locations.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMap {
        bounds: Option<Bounds>,
        placed: Vec<FeedId>,
        selected: Vec<FeedId>,
    }

    impl MapSurface for FixedMap {
        fn clear_markers(&mut self) {
            self.placed.clear();
            self.selected.clear();
        }

        fn place_marker(&mut self, marker: crate::view::MarkerSpec) {
            if marker.visual.selected {
                self.selected.push(marker.feed_id);
            }
            self.placed.push(marker.feed_id);
        }

        fn viewport(&self) -> Option<Bounds> {
            self.bounds
        }
    }

    fn map() -> FixedMap {
        FixedMap {
            bounds: Some(Bounds { lat_min: 1.0, lat_max: 2.0, lon_min: 3.0, lon_max: 4.0 }),
            placed: Vec::new(),
            selected: Vec::new(),
        }
    }

    fn controller() -> Controller {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        Controller::new(&Settings::default(), today)
    }

    #[test]
    fn control_changes_do_not_fetch() {
        let mut controller = controller();
        let mut map = map();

        assert!(controller.handle(UiEvent::KeywordChanged("rain".into()), &mut map).is_none());
        assert!(controller.handle(UiEvent::StartDateChanged("2024-06-01".into()), &mut map).is_none());

        let pending = controller.handle(UiEvent::Refresh, &mut map).unwrap();
        assert_eq!(pending.filter.keyword.as_deref(), Some("rain"));
        assert_eq!(pending.filter.start_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(pending.filter.end_date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert_eq!(pending.filter.bounds, map.bounds);
    }

    #[test]
    fn marker_click_toggles_and_fetches_with_selection() {
        let mut controller = controller();
        let mut map = map();

        let first = controller.handle(UiEvent::MarkerClicked(4), &mut map).unwrap();
        assert_eq!(first.feed_ids, vec![4]);

        let second = controller.handle(UiEvent::MarkerClicked(4), &mut map).unwrap();
        assert!(second.feed_ids.is_empty());
        assert!(second.ticket > first.ticket);
    }

    #[test]
    fn apply_filters_clears_selection() {
        let mut controller = controller();
        let mut map = map();
        controller.handle(UiEvent::MarkerClicked(1), &mut map);
        controller.handle(UiEvent::MarkerClicked(2), &mut map);

        let pending = controller.handle(UiEvent::ApplyFilters, &mut map).unwrap();
        assert!(pending.feed_ids.is_empty());
        assert!(controller.selection().is_empty());
    }

    #[test]
    fn page_change_refetches_and_keeps_filters() {
        let mut controller = controller();
        let mut map = map();
        controller.handle(UiEvent::LocationChanged(Some("Passau".into())), &mut map);

        let pending = controller.handle(UiEvent::PageChanged(3), &mut map).unwrap();
        assert_eq!(pending.filter.page, Some(3));
        assert_eq!(pending.filter.location.as_deref(), Some("Passau"));

        let pending = controller.handle(UiEvent::PageChanged(0), &mut map).unwrap();
        assert_eq!(pending.filter.page, Some(1));
    }

    #[test]
    fn envelope_comes_from_settings() {
        let settings = Settings {
            envelope: Envelope::News,
            ..Settings::default()
        };
        let mut controller = Controller::new(&settings, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        let pending = controller.handle(UiEvent::Refresh, &mut map()).unwrap();
        assert_eq!(pending.envelope, Envelope::News);
    }

    #[test]
    fn viewport_event_is_remembered_without_live_bounds() {
        let mut controller = controller();
        let mut map = FixedMap { bounds: None, placed: Vec::new(), selected: Vec::new() };
        let bounds = Bounds { lat_min: -1.0, lat_max: 1.0, lon_min: -2.0, lon_max: 2.0 };

        let pending = controller.handle(UiEvent::ViewportChanged(bounds), &mut map).unwrap();
        assert_eq!(pending.filter.bounds, Some(bounds));
    }
}
