//! The per-request pipeline: clean cache, raw cache, then the network.

use crate::stations::catalog::StationCatalog;
use crate::tide_data::cache::{CacheKey, CacheTier, TwoTierCache};
use crate::tide_data::cleaner::clean_frame;
use crate::tide_data::error::TideDataError;
use crate::tide_data::fetcher::RawFetcher;
use crate::tide_data::selector::select_range;
use crate::tide_data::stitcher::{stitch, GapPolicy, Stitched};
use crate::types::location::Location;
use crate::types::product::Product;
use crate::types::window::{plan_chunks, Chunk, WindowKind};
use chrono::{Datelike, NaiveDate, Utc};
use log::{info, warn};
use polars::prelude::*;
use std::sync::Arc;
use tokio::task;

/// Where a [`TideFrame`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    CleanCache,
    RawCache,
    Network,
}

/// The outcome of a load.
#[derive(Debug, Clone)]
pub struct TideFrame {
    pub product: Product,
    pub station_id: String,
    pub origin: DataOrigin,
    pub frame: DataFrame,
    /// Chunks that failed to download. Only ever non-empty under
    /// [`GapPolicy::RecordGaps`]; such frames are not cached.
    pub missing: Vec<Chunk>,
}

impl TideFrame {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct TideDataLoader {
    cache: TwoTierCache,
    fetcher: RawFetcher,
    catalog: Arc<StationCatalog>,
    gap_policy: GapPolicy,
    as_of: Option<NaiveDate>,
}

impl TideDataLoader {
    pub fn new(
        cache: TwoTierCache,
        fetcher: RawFetcher,
        catalog: Arc<StationCatalog>,
        gap_policy: GapPolicy,
    ) -> Self {
        Self {
            cache,
            fetcher,
            catalog,
            gap_policy,
            as_of: None,
        }
    }

    /// Pins "today", the last day any fetch runs through.
    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn cache(&self) -> &TwoTierCache {
        &self.cache
    }

    pub fn catalog(&self) -> &Arc<StationCatalog> {
        &self.catalog
    }

    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Returns the clean dataset for `location`, sliced to its date range.
    pub async fn load(
        &self,
        product: Product,
        location: &Location,
        all_history: bool,
    ) -> Result<TideFrame, TideDataError> {
        let station = location.station_id();
        self.catalog.station_name(station)?;
        let candidates = candidate_keys(product, station, location.requested_window(all_history));

        if let Some(key) = self.find(CacheTier::Clean, &candidates).await {
            info!("Clean cache hit for {} at station {} ({})", product, station, key.window);
            return self.from_clean_cache(&key, location).await;
        }

        let key = match self.find(CacheTier::Raw, &candidates).await {
            Some(key) => key,
            None => candidates[candidates.len() - 1].clone(),
        };
        let _guard = self.cache.lock(&key).await;

        // Populated by someone else while we waited.
        if self.cache.has(CacheTier::Clean, &key).await {
            return self.from_clean_cache(&key, location).await;
        }

        let (stitched, origin) = self.raw_for(&key).await?;
        let clean = clean_frame(stitched.frame, product, station)?;
        if stitched.missing.is_empty() {
            self.cache.save(CacheTier::Clean, &key, &clean).await?;
        }

        let frame = select_range(clean.lazy(), location.start_date(), location.end_date()).collect()?;
        Ok(TideFrame {
            product,
            station_id: station.to_string(),
            origin,
            frame,
            missing: stitched.missing,
        })
    }

    /// Returns the raw dataset backing a load, unsliced.
    pub async fn load_raw(
        &self,
        product: Product,
        location: &Location,
        all_history: bool,
    ) -> Result<TideFrame, TideDataError> {
        let station = location.station_id();
        self.catalog.station_name(station)?;
        let candidates = candidate_keys(product, station, location.requested_window(all_history));
        let key = match self.find(CacheTier::Raw, &candidates).await {
            Some(key) => key,
            None => candidates[candidates.len() - 1].clone(),
        };
        let _guard = self.cache.lock(&key).await;
        let (stitched, origin) = self.raw_for(&key).await?;
        Ok(TideFrame {
            product,
            station_id: station.to_string(),
            origin,
            frame: stitched.frame,
            missing: stitched.missing,
        })
    }

    /// Deletes both tiers of one entry. Returns how many files were removed.
    pub async fn evict(&self, key: &CacheKey) -> Result<usize, TideDataError> {
        let _guard = self.cache.lock(key).await;
        let mut removed = 0;
        for tier in [CacheTier::Raw, CacheTier::Clean] {
            if self.cache.remove(tier, key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn find(&self, tier: CacheTier, candidates: &[CacheKey]) -> Option<CacheKey> {
        for key in candidates {
            if self.cache.has(tier, key).await {
                return Some(key.clone());
            }
        }
        None
    }

    async fn from_clean_cache(
        &self,
        key: &CacheKey,
        location: &Location,
    ) -> Result<TideFrame, TideDataError> {
        let selected = select_range(
            self.cache.scan(CacheTier::Clean, key)?,
            location.start_date(),
            location.end_date(),
        );
        let frame = task::spawn_blocking(move || selected.collect()).await??;
        Ok(TideFrame {
            product: key.product,
            station_id: key.station_id.clone(),
            origin: DataOrigin::CleanCache,
            frame,
            missing: Vec::new(),
        })
    }

    /// The raw entry for `key`, fetched and cached first if absent.
    async fn raw_for(&self, key: &CacheKey) -> Result<(Stitched, DataOrigin), TideDataError> {
        if self.cache.has(CacheTier::Raw, key).await {
            info!(
                "Raw cache hit for {} at station {} ({})",
                key.product, key.station_id, key.window
            );
            let frame = self.cache.load(CacheTier::Raw, key).await?;
            let stitched = Stitched {
                frame,
                missing: Vec::new(),
            };
            return Ok((stitched, DataOrigin::RawCache));
        }

        let start_year = match key.window {
            WindowKind::AllHistory => self.catalog.earliest_year(&key.station_id, key.product)?,
            WindowKind::SinceYear(year) => year,
        };
        let today = self.today();
        let chunks = plan_chunks(key.product, start_year, today.year(), today);
        warn!(
            "Cache miss for {} at station {} ({}). Fetching {} chunks from {} through {}.",
            key.product,
            key.station_id,
            key.window,
            chunks.len(),
            start_year,
            today
        );

        let stitched = stitch(
            &self.fetcher,
            key.product,
            &key.station_id,
            &chunks,
            self.gap_policy,
        )
        .await?;
        if stitched.is_complete() {
            self.cache.save(CacheTier::Raw, key, &stitched.frame).await?;
        } else {
            warn!(
                "Not caching {} for station {}: {} chunks missing",
                key.product,
                key.station_id,
                stitched.missing.len()
            );
        }
        Ok((stitched, DataOrigin::Network))
    }
}

/// All-history first, then the requested window if it differs.
fn candidate_keys(product: Product, station: &str, requested: WindowKind) -> Vec<CacheKey> {
    let mut keys = vec![CacheKey::new(product, station, WindowKind::AllHistory)];
    if requested != WindowKind::AllHistory {
        keys.push(CacheKey::new(product, station, requested));
    }
    keys
}
