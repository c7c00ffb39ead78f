use gtk::prelude::*;
use gtk::{glib, Orientation, SearchEntry};
use libshumate::prelude::{LocationExt, MarkerExt};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

use newsmap::filter::format_date;
use newsmap::{category_label, Bounds, FilterState, MapSurface, MarkerSpec, UiEvent};

const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const INITIAL_CENTER: (f64, f64) = (51.505, -0.09);
const INITIAL_ZOOM: f64 = 5.0;
// Pan and zoom emit a burst of notifications; wait for the map to settle.
const VIEWPORT_SETTLE: Duration = Duration::from_millis(400);
const ALLOCATION_POLL: Duration = Duration::from_millis(50);

/// libshumate map with a single marker layer for feeds.
#[derive(Clone)]
pub struct FeedMap {
    pub widget: libshumate::SimpleMap,
    layer: Option<libshumate::MarkerLayer>,
    events: flume::Sender<UiEvent>,
}

pub fn create_feed_map(events: flume::Sender<UiEvent>) -> FeedMap {
    let map = libshumate::SimpleMap::new();

    let map_source = libshumate::RasterRenderer::from_url(TILE_URL);
    map.set_map_source(Some(&map_source));

    // Get the viewport to create the marker layer
    let layer = match map.map().and_then(|map_view| map_view.viewport().map(|vp| (map_view, vp))) {
        Some((map_view, viewport)) => {
            let marker_layer = libshumate::MarkerLayer::new(&viewport);
            map_view.add_layer(&marker_layer);

            viewport.set_min_zoom_level(2);
            viewport.set_max_zoom_level(18);
            map_view.go_to_full(INITIAL_CENTER.0, INITIAL_CENTER.1, INITIAL_ZOOM);

            Some(marker_layer)
        }
        None => {
            warn!("map has no viewport, markers disabled");
            None
        }
    };

    map.set_vexpand(true);
    map.set_hexpand(true);

    let feed_map = FeedMap {
        widget: map,
        layer,
        events,
    };
    watch_viewport(&feed_map);
    announce_first_viewport(&feed_map);
    feed_map
}

/// Sends the first `ViewportChanged` once the map has a size, which starts
/// the initial fetch scoped to the visible area.
fn announce_first_viewport(feed_map: &FeedMap) {
    if feed_map.layer.is_none() {
        // No viewport will ever report bounds
        feed_map.send(UiEvent::Refresh);
        return;
    }

    let surface = feed_map.clone();
    glib::timeout_add_local(ALLOCATION_POLL, move || match surface.viewport() {
        Some(bounds) => {
            debug!(?bounds, "map allocated");
            surface.send(UiEvent::ViewportChanged(bounds));
            glib::ControlFlow::Break
        }
        None => glib::ControlFlow::Continue,
    });
}

/// Sends `ViewportChanged` once the map stops moving.
fn watch_viewport(feed_map: &FeedMap) {
    let Some(viewport) = feed_map.widget.map().and_then(|map_view| map_view.viewport()) else {
        return;
    };

    let pending: Rc<RefCell<Option<glib::SourceId>>> = Rc::new(RefCell::new(None));
    let surface = feed_map.clone();
    let schedule = Rc::new(move || {
        if let Some(source) = pending.borrow_mut().take() {
            source.remove();
        }

        let surface = surface.clone();
        let pending_for_timeout = pending.clone();
        let source = glib::timeout_add_local_once(VIEWPORT_SETTLE, move || {
            // The source is finishing on its own; forget it so it is never removed twice
            pending_for_timeout.borrow_mut().take();
            if let Some(bounds) = surface.viewport() {
                surface.send(UiEvent::ViewportChanged(bounds));
            }
        });
        *pending.borrow_mut() = Some(source);
    });

    for property in ["latitude", "longitude", "zoom-level"] {
        let schedule = schedule.clone();
        viewport.connect_notify_local(Some(property), move |_, _| schedule());
    }
}

impl FeedMap {
    fn send(&self, event: UiEvent) {
        if self.events.send(event).is_err() {
            warn!("event loop is gone, dropping map event");
        }
    }
}

impl MapSurface for FeedMap {
    fn clear_markers(&mut self) {
        if let Some(layer) = &self.layer {
            layer.remove_all();
        }
    }

    fn place_marker(&mut self, spec: MarkerSpec) {
        let Some(layer) = &self.layer else {
            return;
        };

        let diameter = (spec.visual.radius * 2.0).round() as i32;
        let dot = gtk::Button::builder()
            .tooltip_text(spec.visual.tooltip.as_str())
            .width_request(diameter)
            .height_request(diameter)
            .build();
        dot.add_css_class("feed-marker");
        if spec.visual.selected {
            dot.add_css_class("selected");
        }

        let events = self.events.clone();
        let feed_id = spec.feed_id;
        dot.connect_clicked(move |_| {
            debug!(feed_id, "marker clicked");
            if events.send(UiEvent::MarkerClicked(feed_id)).is_err() {
                warn!("event loop is gone, dropping marker click");
            }
        });

        let marker = libshumate::Marker::new();
        marker.set_child(Some(&dot));
        marker.set_location(spec.latitude, spec.longitude);
        layer.add_marker(&marker);
    }

    fn viewport(&self) -> Option<Bounds> {
        let map_view = self.widget.map()?;
        let viewport = map_view.viewport()?;

        let width = map_view.width() as f64;
        let height = map_view.height() as f64;
        if width <= 0.0 || height <= 0.0 {
            // Not allocated yet
            return None;
        }

        let (north, west) = viewport.widget_coords_to_location(&map_view, 0.0, 0.0);
        let (south, east) = viewport.widget_coords_to_location(&map_view, width, height);

        Some(Bounds {
            lat_min: south.min(north),
            lat_max: north.max(south),
            lon_min: west.min(east),
            lon_max: east.max(west),
        })
    }
}

/// Dropdown with a leading "all" entry followed by API values shown through
/// a label function.
#[derive(Clone)]
struct ChoiceDropDown {
    widget: gtk::DropDown,
    model: gtk::StringList,
    values: Rc<RefCell<Vec<String>>>,
}

impl ChoiceDropDown {
    fn new(all_label: &str, on_change: impl Fn(Option<String>) + 'static) -> Self {
        let model = gtk::StringList::new(&[all_label]);
        let widget = gtk::DropDown::builder().model(&model).build();
        let values: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let values_for_change = values.clone();
        widget.connect_selected_notify(move |dropdown| {
            let position = dropdown.selected();
            let value = if position == 0 || position == gtk::INVALID_LIST_POSITION {
                None
            } else {
                values_for_change.borrow().get(position as usize - 1).cloned()
            };
            on_change(value);
        });

        Self {
            widget,
            model,
            values,
        }
    }

    fn set_values(&self, values: &[String], label: impl Fn(&str) -> String) {
        let labels: Vec<String> = values.iter().map(|value| label(value)).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        *self.values.borrow_mut() = values.to_vec();
        let existing = self.model.n_items();
        self.model.splice(1, existing.saturating_sub(1), &labels);
    }
}

/// Keyword search plus the collapsible category, location, date and page
/// filters.
#[derive(Clone)]
pub struct FilterBar {
    pub container: gtk::Box,
    categories: ChoiceDropDown,
    locations: ChoiceDropDown,
}

pub fn create_filter_bar(filter: &FilterState, events: flume::Sender<UiEvent>) -> FilterBar {
    let container = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(8)
        .build();

    let send = {
        let events = events.clone();
        Rc::new(move |event: UiEvent| {
            if events.send(event).is_err() {
                warn!("event loop is gone, dropping filter event");
            }
        })
    };

    // Keyword row with a toggle for the extended filters
    let keyword_row = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .build();

    let search_entry = SearchEntry::builder()
        .placeholder_text("Search news...")
        .hexpand(true)
        .build();

    let toggle_filters = gtk::ToggleButton::builder()
        .icon_name("funnel-symbolic")
        .tooltip_text("More filters")
        .build();

    keyword_row.append(&search_entry);
    keyword_row.append(&toggle_filters);
    container.append(&keyword_row);

    let extended = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(6)
        .build();

    let send_category = send.clone();
    let categories = ChoiceDropDown::new("All categories", move |category| {
        send_category(UiEvent::CategoryChanged(category));
    });
    extended.append(&categories.widget);

    let send_location = send.clone();
    let locations = ChoiceDropDown::new("All locations", move |location| {
        send_location(UiEvent::LocationChanged(location));
    });
    extended.append(&locations.widget);

    let dates_row = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .homogeneous(true)
        .build();

    let start_entry = date_entry(filter.start_date().map(format_date));
    let end_entry = date_entry(filter.end_date().map(format_date));
    dates_row.append(&start_entry);
    dates_row.append(&end_entry);
    extended.append(&dates_row);

    let page_row = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .build();
    let page_label = gtk::Label::builder().label("Page").xalign(0.0).hexpand(true).build();
    let page_spin = gtk::SpinButton::with_range(1.0, 999.0, 1.0);
    page_spin.set_value(filter.page().unwrap_or(1) as f64);
    page_row.append(&page_label);
    page_row.append(&page_spin);
    extended.append(&page_row);

    let buttons_row = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .homogeneous(true)
        .build();

    let apply_button = gtk::Button::builder().label("Apply").build();
    apply_button.add_css_class("suggested-action");
    let clear_button = gtk::Button::builder().label("Clear selection").build();
    buttons_row.append(&clear_button);
    buttons_row.append(&apply_button);
    extended.append(&buttons_row);

    let revealer = gtk::Revealer::builder()
        .child(&extended)
        .reveal_child(false)
        .build();
    container.append(&revealer);

    let revealer_for_toggle = revealer.clone();
    toggle_filters.connect_toggled(move |button| {
        revealer_for_toggle.set_reveal_child(button.is_active());
    });

    let send_keyword = send.clone();
    search_entry.connect_search_changed(move |entry| {
        send_keyword(UiEvent::KeywordChanged(entry.text().to_string()));
    });

    let send_activate = send.clone();
    search_entry.connect_activate(move |_| {
        send_activate(UiEvent::ApplyFilters);
    });

    let send_start = send.clone();
    start_entry.connect_changed(move |entry| {
        send_start(UiEvent::StartDateChanged(entry.text().to_string()));
    });

    let send_end = send.clone();
    end_entry.connect_changed(move |entry| {
        send_end(UiEvent::EndDateChanged(entry.text().to_string()));
    });

    let send_page = send.clone();
    page_spin.connect_value_changed(move |spin| {
        send_page(UiEvent::PageChanged(spin.value_as_int().max(1) as u32));
    });

    let send_apply = send.clone();
    let toggle_for_apply = toggle_filters.clone();
    apply_button.connect_clicked(move |_| {
        // Collapse the extended filters like a submitted form
        toggle_for_apply.set_active(false);
        send_apply(UiEvent::ApplyFilters);
    });

    let send_clear = send;
    clear_button.connect_clicked(move |_| {
        send_clear(UiEvent::ClearSelection);
    });

    FilterBar {
        container,
        categories,
        locations,
    }
}

impl FilterBar {
    /// Replaces the category choices, keeping "All categories" first.
    pub fn set_categories(&self, categories: &[String]) {
        self.categories.set_values(categories, category_label);
    }

    pub fn set_locations(&self, locations: &[String]) {
        self.locations.set_values(locations, str::to_string);
    }
}

fn date_entry(initial: Option<String>) -> gtk::Entry {
    let entry = gtk::Entry::builder()
        .placeholder_text("YYYY-MM-DD")
        .max_width_chars(10)
        .build();
    if let Some(text) = initial {
        entry.set_text(&text);
    }
    entry
}
