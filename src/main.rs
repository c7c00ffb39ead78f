mod map_view;
mod news_list;

use gtk::prelude::*;
use gtk::{glib, Orientation, ScrolledWindow};
use libadwaita::{prelude::*, ApplicationWindow, HeaderBar, ToolbarView};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use newsmap::data::APP_ID;
use newsmap::{Controller, DataFetcher, MarkerStyle, Settings, UiEvent};

use crate::map_view::{create_feed_map, create_filter_bar, FeedMap, FilterBar};
use crate::news_list::{create_news_list, show_detail, NewsList};

const USER_AGENT: &str = concat!("newsmap/", env!("CARGO_PKG_VERSION"));

fn main() -> anyhow::Result<glib::ExitCode> {
    init_tracing();

    // reqwest futures are polled on the GTK main loop and need the Tokio reactor
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let app = libadwaita::Application::builder()
        .application_id(APP_ID)
        .build();

    app.connect_activate(build_ui);

    let exit_code = app.run();

    // Keep runtime alive until app exits
    drop(_guard);
    drop(rt);

    Ok(exit_code)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_ui(app: &libadwaita::Application) {
    let settings = Settings::load();
    info!(api = %settings.api_base_url, "starting");

    let today = chrono::Local::now().date_naive();
    let controller = Rc::new(RefCell::new(Controller::new(&settings, today)));

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client, using defaults");
            reqwest::Client::new()
        });
    let fetcher = DataFetcher::new(client, settings.endpoints());

    let (tx, rx) = flume::unbounded::<UiEvent>();

    let filter_bar = create_filter_bar(controller.borrow().filter(), tx.clone());
    let news_list = create_news_list(tx.clone());
    let feed_map = create_feed_map(tx.clone());

    // Sidebar: filters on top, scrollable news list below
    let sidebar = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(12)
        .margin_top(12)
        .margin_bottom(12)
        .margin_start(12)
        .margin_end(12)
        .build();
    sidebar.append(&filter_bar.container);

    let scrolled_window = ScrolledWindow::builder()
        .vexpand(true)
        .hexpand(true)
        .build();
    scrolled_window.set_child(Some(&news_list.widget));
    sidebar.append(&scrolled_window);

    let paned = gtk::Paned::builder()
        .orientation(Orientation::Horizontal)
        .wide_handle(true)
        .build();
    paned.set_start_child(Some(&sidebar));
    paned.set_resize_start_child(false);
    paned.set_shrink_start_child(false);
    paned.set_end_child(Some(&feed_map.widget));
    paned.set_resize_end_child(true);
    paned.set_shrink_end_child(false);
    paned.set_position(360);

    let header_bar = HeaderBar::builder().build();

    let refresh_button = gtk::Button::builder()
        .icon_name("view-refresh-symbolic")
        .tooltip_text("Refresh news")
        .build();
    let tx_refresh = tx.clone();
    refresh_button.connect_clicked(move |_| {
        let _ = tx_refresh.send(UiEvent::Refresh);
    });
    header_bar.pack_start(&refresh_button);

    let toolbar_view = ToolbarView::builder().build();
    toolbar_view.add_top_bar(&header_bar);
    toolbar_view.set_content(Some(&paned));

    let window = ApplicationWindow::builder()
        .application(app)
        .title("News Map")
        .default_width(1100)
        .default_height(720)
        .build();

    let css_provider = gtk::CssProvider::new();
    css_provider.load_from_data(&stylesheet(&settings.markers));
    gtk::style_context_add_provider_for_display(
        &gtk::prelude::WidgetExt::display(&window),
        &css_provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    window.set_content(Some(&toolbar_view));

    // The first fetch starts when the map reports its allocated viewport
    spawn_event_loop(rx, controller.clone(), fetcher.clone(), feed_map, news_list, window.clone());
    spawn_choices_load(controller, fetcher, filter_bar);

    window.present();
}

/// Drains UI events on the main loop. Fetches run as separate local futures
/// so a slow response never blocks further input.
fn spawn_event_loop(
    rx: flume::Receiver<UiEvent>,
    controller: Rc<RefCell<Controller>>,
    fetcher: DataFetcher,
    feed_map: FeedMap,
    news_list: NewsList,
    window: ApplicationWindow,
) {
    glib::spawn_future_local(async move {
        while let Ok(event) = rx.recv_async().await {
            if let UiEvent::NewsActivated(news) = event {
                let detail = controller.borrow().detail(news);
                match detail {
                    Some(detail) => show_detail(&window, &detail),
                    None => debug!(?news, "news item no longer listed"),
                }
                continue;
            }

            let mut map = feed_map.clone();
            let pending = controller.borrow_mut().handle(event, &mut map);
            let Some(pending) = pending else {
                continue;
            };

            let controller = controller.clone();
            let fetcher = fetcher.clone();
            let mut map = feed_map.clone();
            let mut list = news_list.clone();
            glib::spawn_future_local(async move {
                let (ticket, result) = pending.run(&fetcher).await;
                let outcome = controller
                    .borrow_mut()
                    .complete(ticket, result, &mut map, &mut list);
                debug!(%ticket, ?outcome, "fetch finished");
            });
        }
    });
}

/// Fills the category and location dropdowns. Either list failing leaves
/// only its "all" entry.
fn spawn_choices_load(controller: Rc<RefCell<Controller>>, fetcher: DataFetcher, filter_bar: FilterBar) {
    glib::spawn_future_local(async move {
        let categories = fetcher.fetch_categories().await;
        let locations = fetcher.fetch_locations().await;
        let mut controller = controller.borrow_mut();
        controller.set_categories(categories);
        controller.set_locations(locations);
        filter_bar.set_categories(controller.categories());
        filter_bar.set_locations(controller.locations());
    });
}

fn stylesheet(markers: &MarkerStyle) -> String {
    format!(
        ".feed-marker {{
            background-image: none;
            background-color: {default};
            border-radius: 50%;
            border: 2px solid #ffffff;
            padding: 0;
            min-width: 0;
            min-height: 0;
            box-shadow: 0 2px 6px alpha(black, 0.4);
        }}
        .feed-marker.selected {{
            background-color: {selected};
        }}
        .news-card {{
            background-color: @card_bg_color;
            border-radius: 12px;
            padding: 8px 10px;
            border: 1px solid alpha(@borders, 0.2);
        }}
        .news-card:hover {{
            border-color: alpha(@accent_bg_color, 0.3);
        }}
        .news-title {{
            font-size: 14px;
            font-weight: 600;
        }}
        .news-description {{
            font-size: 12px;
            color: alpha(@window_fg_color, 0.75);
        }}
        .badge {{
            background-color: alpha(@accent_bg_color, 0.15);
            border-radius: 6px;
            padding: 3px 8px;
            font-size: 10px;
            font-weight: 600;
        }}
        .badge-time {{
            background-color: alpha(@window_fg_color, 0.08);
            color: alpha(@window_fg_color, 0.7);
        }}",
        default = markers.default_color,
        selected = markers.selected_color,
    )
}
