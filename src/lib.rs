mod config;
mod download;
mod error;
mod stations;
mod tide_data;
mod tides;
mod types;
mod utils;

pub use config::TidesConfig;
pub use download::{DataFormat, DownloadReport, Downloaded, FailedDownload};
pub use error::TidesError;
pub use tides::*;

pub use stations::catalog::{StationCatalog, StationEntry};
pub use stations::error::CatalogError;

pub use types::calendar::{days_in_month, is_leap_year, last_day_offset};
pub use types::location::{DateRangeError, Location};
pub use types::product::{ParseProductError, Product, RequestWindow};
pub use types::window::{plan_chunks, Chunk, WindowKind};

pub use tide_data::cache::{CacheKey, CacheTier, TwoTierCache};
pub use tide_data::cleaner::clean_frame;
pub use tide_data::error::{FetchError, TideDataError};
pub use tide_data::fetcher::RetryPolicy;
pub use tide_data::loader::{DataOrigin, TideFrame};
pub use tide_data::request::{Query, QueryPlan, ServiceEndpoint};
pub use tide_data::selector::select_range;
pub use tide_data::source::{HttpSource, TidesSource};
pub use tide_data::stitcher::GapPolicy;
pub use tide_data::{DATE_COLUMN, TIMESTAMP_COLUMN, TIME_COLUMN};
