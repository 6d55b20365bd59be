//! Read-only lookup of monitoring stations and how far back each product goes.
//!
//! The bundled table covers the five Gulf of Maine stations the crate was
//! built around. It is parsed once per process; other tables can be loaded
//! from JSON files with the same layout.

use crate::stations::error::CatalogError;
use crate::types::product::Product;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

const BUNDLED_STATIONS: &str = include_str!("stations.json");

static BUNDLED_CATALOG: OnceLock<Arc<StationCatalog>> = OnceLock::new();

/// One monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationEntry {
    /// Numeric NOAA station id, kept as a string (e.g. "8418150").
    pub id: String,
    pub name: String,
    /// Short names accepted by [`StationCatalog::station_id_for_name`].
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Earliest year with data, per product.
    pub first_year: HashMap<Product, i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationCatalog {
    stations: Vec<StationEntry>,
}

impl StationCatalog {
    /// The catalog shipped with the crate, shared process-wide.
    pub fn bundled() -> Arc<StationCatalog> {
        BUNDLED_CATALOG
            .get_or_init(|| {
                // The bundled table is compiled in and covered by tests.
                let catalog = Self::from_json(BUNDLED_STATIONS)
                    .expect("bundled stations.json must be valid");
                Arc::new(catalog)
            })
            .clone()
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let stations: Vec<StationEntry> = serde_json::from_str(json)?;
        Ok(Self { stations })
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Read(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }

    pub fn stations(&self) -> &[StationEntry] {
        &self.stations
    }

    /// Station ids in table order. The first one is the default station.
    pub fn station_ids(&self) -> impl Iterator<Item = &str> {
        self.stations.iter().map(|s| s.id.as_str())
    }

    pub fn get(&self, station_id: &str) -> Result<&StationEntry, CatalogError> {
        self.stations
            .iter()
            .find(|s| s.id == station_id)
            .ok_or_else(|| CatalogError::UnknownStation(station_id.to_string()))
    }

    pub fn station_name(&self, station_id: &str) -> Result<&str, CatalogError> {
        self.get(station_id).map(|s| s.name.as_str())
    }

    pub fn earliest_year(&self, station_id: &str, product: Product) -> Result<i32, CatalogError> {
        let station = self.get(station_id)?;
        station
            .first_year
            .get(&product)
            .copied()
            .ok_or_else(|| CatalogError::ProductUnavailable {
                station: station_id.to_string(),
                product,
            })
    }

    /// Resolves a loosely typed station name ("portland", "Bar Harbor", "si")
    /// to its id. Matching is a case-insensitive substring test against the
    /// name and each alias.
    pub fn station_id_for_name(&self, query: &str) -> Result<&str, CatalogError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CatalogError::UnknownStation(query.to_string()));
        }
        self.stations
            .iter()
            .find(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.aliases.iter().any(|a| a.to_lowercase() == needle)
            })
            .map(|s| s.id.as_str())
            .ok_or_else(|| CatalogError::UnknownStation(query.to_string()))
    }
}
