use crate::types::product::Product;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown station '{0}'")]
    UnknownStation(String),

    #[error("Station '{station}' has no recorded start year for {product}")]
    ProductUnavailable { station: String, product: Product },

    #[error("Failed to read station catalog '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse station catalog")]
    Parse(#[from] serde_json::Error),
}
