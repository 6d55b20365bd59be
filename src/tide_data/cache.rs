//! Parquet files for raw and cleaned datasets, one per (product, station, window).

use crate::tide_data::error::TideDataError;
use crate::types::product::Product;
use crate::types::window::WindowKind;
use crate::utils::size_mb;
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::{fs, task};

/// The two stages a dataset is cached at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// Stitched service output, column names as the service sends them.
    Raw,
    /// Output of the cleaner.
    Clean,
}

impl CacheTier {
    pub fn dir_name(&self) -> &'static str {
        match self {
            CacheTier::Raw => "raw_data",
            CacheTier::Clean => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub product: Product,
    pub station_id: String,
    pub window: WindowKind,
}

impl CacheKey {
    pub fn new(product: Product, station_id: impl Into<String>, window: WindowKind) -> Self {
        Self {
            product,
            station_id: station_id.into(),
            window,
        }
    }

    pub fn file_name(&self, tier: CacheTier) -> String {
        let suffix = match tier {
            CacheTier::Raw => "",
            CacheTier::Clean => "_clean",
        };
        match self.window {
            WindowKind::AllHistory if tier == CacheTier::Raw => {
                format!("noaa_{}_{}_all.parquet", self.product, self.station_id)
            }
            WindowKind::AllHistory => {
                format!("noaa_{}_{}{}.parquet", self.product, self.station_id, suffix)
            }
            WindowKind::SinceYear(year) => format!(
                "noaa_{}_start_{}_{}{}.parquet",
                self.product, year, self.station_id, suffix
            ),
        }
    }
}

/// On-disk cache with a `raw_data/` and a `data/` tier under one root.
///
/// Entries are never refreshed or expired: once written, an entry is served
/// until it is removed with [`TwoTierCache::remove`] or deleted by hand.
/// Writes land in a temporary file that is renamed into place, so readers
/// never observe a partial file.
#[derive(Debug)]
pub struct TwoTierCache {
    root: PathBuf,
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl TwoTierCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, tier: CacheTier, key: &CacheKey) -> PathBuf {
        self.root.join(tier.dir_name()).join(key.file_name(tier))
    }

    pub async fn has(&self, tier: CacheTier, key: &CacheKey) -> bool {
        fs::metadata(self.path(tier, key)).await.is_ok()
    }

    /// Reads an entry eagerly.
    pub async fn load(&self, tier: CacheTier, key: &CacheKey) -> Result<DataFrame, TideDataError> {
        let path = self.path(tier, key);
        debug!("Reading {:?}", path);
        task::spawn_blocking(move || {
            let file = File::open(&path).map_err(|e| TideDataError::CacheOpen(path.clone(), e))?;
            ParquetReader::new(file)
                .finish()
                .map_err(|e| TideDataError::ParquetRead(path, e))
        })
        .await?
    }

    /// Scans an entry lazily so filters can be pushed into the read.
    pub fn scan(&self, tier: CacheTier, key: &CacheKey) -> Result<LazyFrame, TideDataError> {
        let path = self.path(tier, key);
        LazyFrame::scan_parquet(&path, Default::default())
            .map_err(|e| TideDataError::ParquetRead(path, e))
    }

    /// Writes `frame`, replacing any existing entry.
    pub async fn save(
        &self,
        tier: CacheTier,
        key: &CacheKey,
        frame: &DataFrame,
    ) -> Result<PathBuf, TideDataError> {
        let dir = self.root.join(tier.dir_name());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| TideDataError::CacheDirCreation(dir.clone(), e))?;

        let path = self.path(tier, key);
        let mut frame = frame.clone();
        let target = path.clone();
        task::spawn_blocking(move || {
            let mut temp = NamedTempFile::new_in(&dir)
                .map_err(|e| TideDataError::ParquetWriteIo(target.clone(), e))?;
            ParquetWriter::new(temp.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut frame)
                .map_err(|e| TideDataError::ParquetWritePolars(target.clone(), e))?;
            temp.persist(&target)
                .map_err(|e| TideDataError::ParquetWriteIo(target.clone(), e.error))?;
            Ok::<(), TideDataError>(())
        })
        .await??;

        let size = fs::metadata(&path)
            .await
            .map_err(|e| TideDataError::CacheOpen(path.clone(), e))?
            .len();
        info!(
            "Cached {} data for station {} to {:?} ({:.2} MB)",
            key.product,
            key.station_id,
            path,
            size_mb(size)
        );
        Ok(path)
    }

    /// Deletes an entry. Returns whether there was one.
    pub async fn remove(&self, tier: CacheTier, key: &CacheKey) -> Result<bool, TideDataError> {
        let path = self.path(tier, key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed cache file {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TideDataError::CacheDeletion(path, e)),
        }
    }

    /// Serializes population of one key within this process.
    pub async fn lock(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        entry.lock_owned().await
    }
}
