use serde::{Deserialize, Serialize};

use crate::data::FeedEntity;

pub const DEFAULT_MARKER_COLOR: &str = "#3388ff";
pub const SELECTED_MARKER_COLOR: &str = "#ff7800";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub min_radius: f64,
    pub max_radius: f64,
    /// Item count at which markers stop growing.
    pub saturation: u32,
    pub default_color: String,
    pub selected_color: String,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            min_radius: 5.0,
            max_radius: 15.0,
            saturation: 50,
            default_color: DEFAULT_MARKER_COLOR.to_string(),
            selected_color: SELECTED_MARKER_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerVisual {
    pub selected: bool,
    pub color: String,
    pub radius: f64,
    pub tooltip: String,
}

impl MarkerStyle {
    /// Radius in pixels, linear in `count` up to `saturation`, clamped above.
    pub fn marker_size(&self, count: u32) -> f64 {
        if self.saturation == 0 {
            return self.max_radius.max(self.min_radius);
        }
        let span = (self.max_radius - self.min_radius).max(0.0);
        let clamped = count.min(self.saturation) as f64;
        self.min_radius + clamped / self.saturation as f64 * span
    }

    pub fn visual(&self, feed: &FeedEntity, selected: bool) -> MarkerVisual {
        let color = if selected {
            &self.selected_color
        } else {
            &self.default_color
        };
        MarkerVisual {
            selected,
            color: color.clone(),
            radius: self.marker_size(feed.news_count),
            tooltip: format!("{} ({} news)", feed.name, feed.news_count),
        }
    }
}
