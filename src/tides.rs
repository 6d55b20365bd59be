//! The main entry point: a client that loads NOAA tides datasets through the
//! on-disk cache, fetching from the CO-OPS data service only when needed.

use crate::config::TidesConfig;
use crate::error::TidesError;
use crate::stations::catalog::StationCatalog;
use crate::stations::error::CatalogError;
use crate::tide_data::cache::{CacheKey, TwoTierCache};
use crate::tide_data::fetcher::RawFetcher;
use crate::tide_data::loader::{TideDataLoader, TideFrame};
use crate::tide_data::source::{HttpSource, TidesSource};
use crate::types::location::Location;
use crate::types::product::Product;
use crate::types::window::WindowKind;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Client for NOAA tides and water level data.
///
/// Every load goes through a two-tier cache under the cache folder: cleaned
/// datasets in `data/`, the stitched service output in `raw_data/`. Only when
/// both miss is the data service queried, one month (or one year, for hourly
/// heights) at a time.
///
/// Cached entries are never refreshed automatically. A cached window that
/// reached "today" when it was fetched will not grow on later loads; call
/// [`Tides::evict`] to force a new download.
///
/// # Examples
///
/// ```no_run
/// # use noaa_tides::{Tides, TidesError};
/// # async fn run() -> Result<(), TidesError> {
/// // Default cache directory, bundled station table, default settings
/// let client = Tides::new().await?;
/// # Ok(())
/// # }
/// ```
pub struct Tides {
    pub(crate) loader: TideDataLoader,
    cache_dir: PathBuf,
    config: TidesConfig,
}

#[bon]
impl Tides {
    /// Creates a client that caches under `cache_folder`, which is created if
    /// it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`TidesError::CacheDirCreation`] if the directory cannot be
    /// created, or [`TidesError::HttpClient`] if the HTTP client cannot be
    /// initialized.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use noaa_tides::{Tides, TidesError};
    /// # use std::path::PathBuf;
    /// # async fn run() -> Result<(), TidesError> {
    /// let client = Tides::with_cache_folder(PathBuf::from("/tmp/tides")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, TidesError> {
        Self::builder().cache_folder(cache_folder).build().await
    }

    /// Creates a client using the default cache directory
    /// (e.g. `~/.cache/noaa_tides_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`TidesError::CacheDirResolution`] if the system cache
    /// directory cannot be found, otherwise the same errors as
    /// [`Tides::with_cache_folder`].
    pub async fn new() -> Result<Self, TidesError> {
        Self::builder().build().await
    }

    /// Creates a client with full control over its parts.
    ///
    /// * `.cache_folder(PathBuf)`: Optional. Defaults to the system cache directory.
    /// * `.config(TidesConfig)`: Optional. Endpoint, datum, timeout, retry and gap policy.
    /// * `.catalog(Arc<StationCatalog>)`: Optional. Defaults to the bundled station table.
    /// * `.source(Arc<dyn TidesSource>)`: Optional. Defaults to HTTP against the configured endpoint.
    /// * `.as_of(NaiveDate)`: Optional. The last day fetches run through. Defaults to today (UTC).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use noaa_tides::{GapPolicy, Tides, TidesConfig, TidesError};
    /// # use std::path::PathBuf;
    /// # async fn run() -> Result<(), TidesError> {
    /// let config = TidesConfig {
    ///     gap_policy: GapPolicy::RecordGaps,
    ///     ..TidesConfig::default()
    /// };
    /// let client = Tides::builder()
    ///     .cache_folder(PathBuf::from("/tmp/tides"))
    ///     .config(config)
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[builder(start_fn = builder, finish_fn = build)]
    pub async fn create(
        cache_folder: Option<PathBuf>,
        config: Option<TidesConfig>,
        catalog: Option<Arc<StationCatalog>>,
        source: Option<Arc<dyn TidesSource>>,
        as_of: Option<NaiveDate>,
    ) -> Result<Self, TidesError> {
        let cache_dir = match cache_folder {
            Some(folder) => folder,
            None => get_cache_dir().map_err(TidesError::CacheDirResolution)?,
        };
        ensure_cache_dir_exists(&cache_dir)
            .await
            .map_err(|e| TidesError::CacheDirCreation(cache_dir.clone(), e))?;

        let config = config.unwrap_or_default();
        let source: Arc<dyn TidesSource> = match source {
            Some(source) => source,
            None => Arc::new(
                HttpSource::new(config.request_timeout).map_err(TidesError::HttpClient)?,
            ),
        };
        let fetcher = RawFetcher::new(
            source,
            config.endpoint.clone(),
            config.datum.clone(),
            config.retry,
        );
        let loader = TideDataLoader::new(
            TwoTierCache::new(&cache_dir),
            fetcher,
            catalog.unwrap_or_else(StationCatalog::bundled),
            config.gap_policy,
        )
        .with_as_of(as_of);

        Ok(Self {
            loader,
            cache_dir,
            config,
        })
    }

    /// Loads the clean dataset of `product` for a location.
    ///
    /// The result is restricted to the location's date range (inclusive,
    /// whole days). Underneath, the cache entry covers the whole window
    /// kind: everything since January 1st of the start year, or all history
    /// when `all_history` is set or no start date is given.
    ///
    /// * `.product(Product)`: **Required.**
    /// * `.location(&Location)`: **Required.** Station and optional date range.
    /// * `.all_history(bool)`: Optional. Defaults to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`TidesError::TideData`] when the station is unknown, a chunk
    /// fails under [`GapPolicy::FailFast`](crate::GapPolicy::FailFast), the
    /// service has no data at all, or the cache cannot be read or written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use noaa_tides::{Location, Product, Tides, TidesError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), TidesError> {
    /// let client = Tides::new().await?;
    /// let may = Location::parse("8418150", Some("20230501"), Some("20230531"))?;
    ///
    /// let levels = client
    ///     .load()
    ///     .product(Product::WaterLevel)
    ///     .location(&may)
    ///     .call()
    ///     .await?;
    /// println!("{}", levels.frame.head(Some(5)));
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn load(
        &self,
        product: Product,
        location: &Location,
        #[builder(default)] all_history: bool,
    ) -> Result<TideFrame, TidesError> {
        Ok(self.loader.load(product, location, all_history).await?)
    }

    /// Loads the stitched service output backing a load, before cleaning and
    /// without date slicing. Column names are the service's own.
    #[builder]
    pub async fn load_raw(
        &self,
        product: Product,
        location: &Location,
        #[builder(default)] all_history: bool,
    ) -> Result<TideFrame, TidesError> {
        Ok(self.loader.load_raw(product, location, all_history).await?)
    }

    /// Loads every product the station offers, in [`Product::ALL`] order.
    /// Products without a start year in the catalog are left out.
    pub async fn load_all(
        &self,
        location: &Location,
        all_history: bool,
    ) -> Result<Vec<TideFrame>, TidesError> {
        let catalog = self.loader.catalog();
        let mut frames = Vec::new();
        for product in Product::ALL {
            match catalog.earliest_year(location.station_id(), product) {
                Ok(_) => {}
                Err(CatalogError::ProductUnavailable { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
            frames.push(self.loader.load(product, location, all_history).await?);
        }
        Ok(frames)
    }

    /// Deletes the raw and clean cache entries for one window.
    /// Returns the number of files removed.
    pub async fn evict(
        &self,
        product: Product,
        station_id: &str,
        window: WindowKind,
    ) -> Result<usize, TidesError> {
        let key = CacheKey::new(product, station_id, window);
        Ok(self.loader.evict(&key).await?)
    }

    pub fn catalog(&self) -> &StationCatalog {
        self.loader.catalog()
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn config(&self) -> &TidesConfig {
        &self.config
    }
}
