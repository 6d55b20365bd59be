use crate::stations::error::CatalogError;
use crate::tide_data::error::TideDataError;
use crate::types::location::DateRangeError;
use crate::types::product::ParseProductError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TidesError {
    #[error(transparent)]
    TideData(#[from] TideDataError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid date range")]
    InvalidDateRange(#[from] DateRangeError),

    #[error(transparent)]
    UnknownProduct(#[from] ParseProductError),

    #[error("Unsupported data format '{0}', expected raw, clean or all")]
    UnknownDataFormat(String),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to read config file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),
}
