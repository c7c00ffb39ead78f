pub mod controller;
pub mod data;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod marker;
pub mod selection;
pub mod sequence;
pub mod settings;
pub mod view;

pub use controller::{Controller, Outcome, PendingFetch, UiEvent};
pub use data::{FeedEntity, FeedId, NewsItem};
pub use error::{FetchError, SettingsError};
pub use fetcher::{DataFetcher, Endpoints, Envelope};
pub use filter::{Bounds, Filter, FilterState};
pub use marker::{MarkerStyle, MarkerVisual};
pub use selection::{SelectionStore, Toggle};
pub use sequence::{RequestSequence, Ticket};
pub use settings::Settings;
pub use view::{category_label, ListSurface, MapSurface, MarkerSpec, NewsCard, NewsDetail, NewsRef};
