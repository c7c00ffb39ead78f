use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsmap::{
    Bounds, Controller, DataFetcher, Endpoints, Envelope, FetchError, ListSurface, MapSurface,
    MarkerSpec, NewsCard, Outcome, Settings, UiEvent,
};

#[derive(Default)]
struct FakeMap {
    bounds: Option<Bounds>,
    markers: Vec<MarkerSpec>,
}

impl MapSurface for FakeMap {
    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn place_marker(&mut self, marker: MarkerSpec) {
        self.markers.push(marker);
    }

    fn viewport(&self) -> Option<Bounds> {
        self.bounds
    }
}

#[derive(Default)]
struct FakeList {
    headers: Vec<String>,
    cards: Vec<NewsCard>,
    messages: Vec<String>,
}

impl ListSurface for FakeList {
    fn clear(&mut self) {
        self.headers.clear();
        self.cards.clear();
        self.messages.clear();
    }

    fn append_header(&mut self, feed_name: &str, count: usize) {
        self.headers.push(format!("{feed_name}:{count}"));
    }

    fn append_card(&mut self, card: NewsCard) {
        self.cards.push(card);
    }

    fn show_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

fn controller() -> Controller {
    Controller::new(&Settings::default(), NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
}

fn feed_json(id: i64, name: &str, titles: &[&str]) -> serde_json::Value {
    let news: Vec<serde_json::Value> = titles
        .iter()
        .map(|title| serde_json::json!({ "title": title, "description": "", "link": "http://n", "publication_date": null }))
        .collect();
    serde_json::json!({
        "feed_id": id,
        "name": name,
        "latitude": 50.0,
        "longitude": 8.0,
        "news_count": titles.len(),
        "news": news
    })
}

#[tokio::test]
async fn later_request_wins_even_when_it_resolves_first() {
    let server = MockServer::start().await;

    // A: the slow, superseded request
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param_is_missing("search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "feeds": [feed_json(1, "A", &["old"])] }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    // B: the fresh request
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("search", "fresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "feeds": [feed_json(2, "B", &["new", "newer"])] })),
        )
        .mount(&server)
        .await;

    let fetcher = DataFetcher::new(Client::new(), Endpoints::with_base(&server.uri()));
    let mut controller = controller();
    let mut map = FakeMap::default();
    let mut list = FakeList::default();

    let a = controller.handle(UiEvent::Refresh, &mut map).unwrap();
    controller.handle(UiEvent::KeywordChanged("fresh".into()), &mut map);
    let b = controller.handle(UiEvent::ApplyFilters, &mut map).unwrap();

    let (result_a, result_b) = tokio::join!(a.run(&fetcher), b.run(&fetcher));

    // B resolves first, then A arrives late
    let outcome_b = controller.complete(result_b.0, result_b.1, &mut map, &mut list);
    let outcome_a = controller.complete(result_a.0, result_a.1, &mut map, &mut list);

    assert_eq!(outcome_b, Outcome::Applied { markers: 1, cards: 2 });
    assert_eq!(outcome_a, Outcome::Stale);
    assert_eq!(map.markers.len(), 1);
    assert_eq!(map.markers[0].feed_id, 2);
    assert_eq!(list.headers, vec!["B:2".to_string()]);
    assert_eq!(controller.feeds()[0].name, "B");
}

#[tokio::test]
async fn marker_click_refetches_with_selected_feed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param_is_missing("feed_ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "feeds": [feed_json(3, "C", &["c1"]), feed_json(4, "D", &["d1"]), feed_json(5, "E", &[])]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("feed_ids", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "feeds": [feed_json(4, "D", &["d1"])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = DataFetcher::new(Client::new(), Endpoints::with_base(&server.uri()));
    let mut controller = controller();
    let mut map = FakeMap::default();
    let mut list = FakeList::default();

    let initial = controller.handle(UiEvent::Refresh, &mut map).unwrap();
    let (ticket, result) = initial.run(&fetcher).await;
    controller.complete(ticket, result, &mut map, &mut list);
    // E has no news and gets no marker
    assert_eq!(map.markers.len(), 2);

    let pending = controller.handle(UiEvent::MarkerClicked(4), &mut map).unwrap();
    // Immediate recolor from the current feed list
    let selected: Vec<_> = map.markers.iter().filter(|m| m.visual.selected).map(|m| m.feed_id).collect();
    assert_eq!(selected, vec![4]);

    let (ticket, result) = pending.run(&fetcher).await;
    controller.complete(ticket, result, &mut map, &mut list);

    assert_eq!(map.markers.len(), 1);
    assert!(map.markers[0].visual.selected);

    let detail = controller.detail(list.cards[0].news).unwrap();
    assert_eq!(detail.title, "d1");
    assert_eq!(detail.publisher, "D");
    assert_eq!(detail.published, "not available");
}

#[tokio::test]
async fn first_viewport_report_scopes_the_startup_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("latitude_min", "47.25"))
        .and(query_param("longitude_max", "15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "feeds": [feed_json(8, "BR", &["b1"])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = DataFetcher::new(Client::new(), Endpoints::with_base(&server.uri()));
    let mut controller = controller();
    // Not allocated yet: the widget cannot report bounds on its own
    let mut map = FakeMap::default();
    let mut list = FakeList::default();

    let bounds = Bounds { lat_min: 47.25, lat_max: 55.0, lon_min: 5.5, lon_max: 15.0 };
    let pending = controller
        .handle(UiEvent::ViewportChanged(bounds), &mut map)
        .unwrap();
    assert_eq!(pending.filter.bounds, Some(bounds));

    let (ticket, result) = pending.run(&fetcher).await;
    let outcome = controller.complete(ticket, result, &mut map, &mut list);
    assert_eq!(outcome, Outcome::Applied { markers: 1, cards: 1 });
}

#[tokio::test]
async fn flat_envelope_renders_like_feeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("location", "Passau"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "news": [
                {
                    "title": "Pegel steigt", "description": "", "link": null,
                    "publication_date": "2024-06-02 06:15:00",
                    "feed_id": 11,
                    "locations": [{ "name": "Passau", "latitude": 48.57, "longitude": 13.43 }],
                    "feed": { "name": "PNP" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let settings = Settings {
        envelope: Envelope::News,
        ..Settings::default()
    };
    let fetcher = DataFetcher::new(Client::new(), Endpoints::with_base(&server.uri()));
    let mut controller = Controller::new(&settings, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    let mut map = FakeMap::default();
    let mut list = FakeList::default();

    controller.handle(UiEvent::LocationChanged(Some("Passau".into())), &mut map);
    let pending = controller.handle(UiEvent::ApplyFilters, &mut map).unwrap();
    let (ticket, result) = pending.run(&fetcher).await;

    assert_eq!(
        controller.complete(ticket, result, &mut map, &mut list),
        Outcome::Applied { markers: 1, cards: 1 }
    );
    assert_eq!(list.headers, vec!["PNP:1".to_string()]);
    assert_eq!(list.cards[0].published, "2024-06-02 06:15");
    assert_eq!(controller.detail(list.cards[0].news).unwrap().link, "");
}

#[test]
fn fetch_error_renders_empty_state() {
    let mut controller = controller();
    let mut map = FakeMap::default();
    let mut list = FakeList::default();

    let pending = controller.handle(UiEvent::Refresh, &mut map).unwrap();
    let outcome = controller.complete(
        pending.ticket,
        Err(FetchError::Http { status: 503, message: "Service Unavailable".into() }),
        &mut map,
        &mut list,
    );

    assert_eq!(outcome, Outcome::Empty);
    assert!(map.markers.is_empty());
    assert!(list.cards.is_empty());
    assert_eq!(list.messages, vec!["No news found".to_string()]);
    assert!(controller.feeds().is_empty());
}

#[test]
fn choice_load_failure_leaves_empty_choices() {
    let mut controller = controller();
    controller.set_categories(Ok(vec!["sport".into()]));
    controller.set_locations(Ok(vec!["Bonn".into()]));
    assert_eq!(controller.categories(), ["sport".to_string()]);
    assert_eq!(controller.locations(), ["Bonn".to_string()]);

    controller.set_categories(Err(FetchError::Http { status: 500, message: "boom".into() }));
    controller.set_locations(Err(FetchError::Http { status: 502, message: "Bad Gateway".into() }));
    assert!(controller.categories().is_empty());
    assert!(controller.locations().is_empty());
}
