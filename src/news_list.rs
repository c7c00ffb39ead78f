use gtk::prelude::*;
use gtk::{Label, ListBox, Orientation};
use libadwaita::prelude::*;
use tracing::{debug, warn};

use newsmap::{ListSurface, NewsCard, NewsDetail, UiEvent};

#[derive(Clone)]
pub struct NewsList {
    pub widget: ListBox,
    events: flume::Sender<UiEvent>,
}

pub fn create_news_list(events: flume::Sender<UiEvent>) -> NewsList {
    let list = ListBox::builder()
        .selection_mode(gtk::SelectionMode::None)
        .build();
    list.add_css_class("boxed-list");

    NewsList {
        widget: list,
        events,
    }
}

impl ListSurface for NewsList {
    fn clear(&mut self) {
        while let Some(child) = self.widget.first_child() {
            self.widget.remove(&child);
        }
    }

    fn append_header(&mut self, feed_name: &str, count: usize) {
        let header = Label::builder()
            .label(format!("{feed_name} ({count} news)"))
            .xalign(0.0)
            .margin_top(10)
            .margin_start(6)
            .build();
        header.add_css_class("title-4");
        self.widget.append(&header);
    }

    fn append_card(&mut self, card: NewsCard) {
        let row = create_news_card(&card);

        let events = self.events.clone();
        let news = card.news;
        let gesture = gtk::GestureClick::new();
        gesture.connect_released(move |_, _, _, _| {
            if events.send(UiEvent::NewsActivated(news)).is_err() {
                warn!("event loop is gone, dropping card click");
            }
        });
        row.add_controller(gesture);

        self.widget.append(&row);
    }

    fn show_message(&mut self, message: &str) {
        let label = Label::builder()
            .label(message)
            .margin_top(12)
            .margin_bottom(12)
            .build();
        label.add_css_class("dim-label");
        self.widget.append(&label);
    }
}

fn create_news_card(card: &NewsCard) -> gtk::Box {
    let row = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(6)
        .margin_top(4)
        .margin_bottom(4)
        .margin_start(6)
        .margin_end(6)
        .build();
    row.add_css_class("news-card");

    let title_label = Label::builder()
        .label(card.title.as_str())
        .wrap(true)
        .wrap_mode(gtk::pango::WrapMode::Word)
        .xalign(0.0)
        .lines(2)
        .ellipsize(gtk::pango::EllipsizeMode::End)
        .build();
    title_label.add_css_class("news-title");
    row.append(&title_label);

    if !card.description.is_empty() {
        let description = Label::builder()
            .label(card.description.as_str())
            .wrap(true)
            .xalign(0.0)
            .lines(3)
            .ellipsize(gtk::pango::EllipsizeMode::End)
            .build();
        description.add_css_class("news-description");
        row.append(&description);
    }

    let time_badge = Label::builder()
        .label(card.published.as_str())
        .xalign(0.0)
        .build();
    time_badge.add_css_class("badge");
    time_badge.add_css_class("badge-time");
    row.append(&time_badge);

    row.add_css_class("activatable");
    row
}

/// Detail dialog for one news item with a button to open the article.
pub fn show_detail(parent: &impl IsA<gtk::Window>, detail: &NewsDetail) {
    let dialog = libadwaita::MessageDialog::builder()
        .heading(detail.title.as_str())
        .body(detail.description.as_str())
        .modal(true)
        .build();
    dialog.set_transient_for(Some(parent));

    let meta = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(4)
        .build();
    for (caption, value) in [("Published", &detail.published), ("Publisher", &detail.publisher)] {
        let label = Label::builder()
            .label(format!("{caption}: {value}"))
            .xalign(0.0)
            .build();
        label.add_css_class("dim-label");
        meta.append(&label);
    }
    dialog.set_extra_child(Some(&meta));

    dialog.add_response("close", "Close");
    dialog.add_response("open", "Open Article");
    dialog.set_response_appearance("open", libadwaita::ResponseAppearance::Suggested);
    dialog.set_response_enabled("open", !detail.link.is_empty());
    dialog.set_default_response(Some("open"));
    dialog.set_close_response("close");

    let link = detail.link.clone();
    dialog.connect_response(None, move |_, response| {
        if response == "open" {
            debug!(%link, "opening article");
            if let Err(e) = open::that(&link) {
                warn!(error = %e, "failed to open URL");
            }
        }
    });

    dialog.present();
}
