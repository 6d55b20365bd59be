//! Bulk pre-population of the cache for products × stations.

use crate::error::TidesError;
use crate::tide_data::error::TideDataError;
use crate::tides::Tides;
use crate::types::location::Location;
use crate::types::product::Product;
use log::{info, warn};
use std::fmt;
use std::str::FromStr;

const ALL: &str = "all";

/// Which cache tiers a bulk download fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Only the stitched service output.
    Raw,
    /// The full pipeline; the raw tier is filled along the way.
    Clean,
    /// Same pipeline as `Clean`, accepted for the command line's "all".
    All,
}

impl FromStr for DataFormat {
    type Err = TidesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(DataFormat::Raw),
            "clean" => Ok(DataFormat::Clean),
            ALL => Ok(DataFormat::All),
            _ => Err(TidesError::UnknownDataFormat(s.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataFormat::Raw => "raw",
            DataFormat::Clean => "clean",
            DataFormat::All => ALL,
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub station_id: String,
    pub product: Product,
    /// Chunks that could not be fetched; the entry was not cached if non-zero.
    pub missing_chunks: usize,
}

#[derive(Debug)]
pub struct FailedDownload {
    pub station_id: String,
    pub product: Product,
    pub error: TideDataError,
}

/// What a bulk download did, pair by pair.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub completed: Vec<Downloaded>,
    /// Product names that are not one of the four products.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedDownload>,
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.completed.iter().all(|d| d.missing_chunks == 0)
    }
}

impl Tides {
    /// Fills the all-history cache entries for `product` at `station_id`.
    ///
    /// Both accept `"all"`. An unrecognised product is recorded in
    /// [`DownloadReport::skipped`] instead of failing the run; an unknown
    /// station is an error. Failures of individual (station, product) pairs
    /// are collected and the remaining pairs still run.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use noaa_tides::{DataFormat, Tides, TidesError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), TidesError> {
    /// let client = Tides::new().await?;
    /// let report = client.download("all", "8418150", DataFormat::Clean).await?;
    /// for failure in &report.failed {
    ///     eprintln!("{} {}: {}", failure.station_id, failure.product, failure.error);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download(
        &self,
        product: &str,
        station_id: &str,
        format: DataFormat,
    ) -> Result<DownloadReport, TidesError> {
        let mut report = DownloadReport::default();

        let products: Vec<Product> = if product.trim().eq_ignore_ascii_case(ALL) {
            Product::ALL.to_vec()
        } else {
            match product.parse::<Product>() {
                Ok(product) => vec![product],
                Err(e) => {
                    warn!("Skipping download: {}", e);
                    report.skipped.push(product.to_string());
                    Vec::new()
                }
            }
        };

        let stations: Vec<String> = if station_id.trim().eq_ignore_ascii_case(ALL) {
            self.catalog().station_ids().map(str::to_string).collect()
        } else {
            self.catalog().get(station_id)?;
            vec![station_id.to_string()]
        };

        for station in &stations {
            let location = Location::all_time(station.as_str());
            for &product in &products {
                info!("Downloading {} {} data for station {}", format, product, station);
                match self.download_one(product, &location, format).await {
                    Ok(missing_chunks) => report.completed.push(Downloaded {
                        station_id: station.clone(),
                        product,
                        missing_chunks,
                    }),
                    Err(error) => {
                        warn!("Download of {} for station {} failed: {}", product, station, error);
                        report.failed.push(FailedDownload {
                            station_id: station.clone(),
                            product,
                            error,
                        });
                    }
                }
            }
        }
        info!(
            "Download finished: {} completed, {} failed, {} skipped",
            report.completed.len(),
            report.failed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn download_one(
        &self,
        product: Product,
        location: &Location,
        format: DataFormat,
    ) -> Result<usize, TideDataError> {
        // A full load writes the raw tier on its way to the clean one.
        let frame = match format {
            DataFormat::Raw => self.loader.load_raw(product, location, true).await?,
            DataFormat::Clean | DataFormat::All => {
                self.loader.load(product, location, true).await?
            }
        };
        Ok(frame.missing.len())
    }
}
