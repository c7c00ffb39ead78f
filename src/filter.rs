use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::FeedId;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_RANGE_DAYS: i64 = 7;

/// Geographic rectangle currently visible on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Bounds {
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("latitude_min", self.lat_min.to_string()),
            ("latitude_max", self.lat_max.to_string()),
            ("longitude_min", self.lon_min.to_string()),
            ("longitude_max", self.lon_max.to_string()),
        ]
    }
}

/// Immutable snapshot of the active constraints. Absent fields are never
/// sent to the API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bounds: Option<Bounds>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Filter {
    /// Query parameters for the news endpoint. Selected feed ids are joined
    /// with commas; an empty selection adds no `feed_ids` key.
    pub fn to_query_pairs(&self, feed_ids: &[FeedId]) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(keyword) = &self.keyword {
            pairs.push(("search", keyword.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.clone()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", format_date(start)));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", format_date(end)));
        }
        if !feed_ids.is_empty() {
            let joined = feed_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("feed_ids", joined));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        if let Some(bounds) = &self.bounds {
            pairs.extend(bounds.query_pairs());
        }

        pairs
    }
}

/// Raw values of the filter controls.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    keyword: String,
    category: Option<String>,
    location: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    page: Option<u32>,
    per_page: Option<u32>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    /// Place name as listed by the locations endpoint; matched by substring
    /// on the server.
    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) {
        self.start_date = date;
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) {
        self.end_date = date;
    }

    pub fn set_page(&mut self, page: Option<u32>) {
        self.page = page;
    }

    pub fn set_per_page(&mut self, per_page: Option<u32>) {
        self.per_page = per_page;
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Trailing window ending today.
    pub fn set_default_range(&mut self, today: NaiveDate, days: i64) {
        self.start_date = Some(today - Duration::days(days));
        self.end_date = Some(today);
    }

    pub fn query(&self, viewport: Option<Bounds>) -> Filter {
        Filter {
            keyword: non_blank(&self.keyword),
            category: self.category.as_deref().and_then(non_blank),
            location: self.location.as_deref().and_then(non_blank),
            start_date: self.start_date,
            end_date: self.end_date,
            bounds: viewport,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reads a date entry. Blank or malformed text clears the constraint.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(text, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!(text, error = %e, "ignoring malformed date");
            None
        }
    }
}
