//! Defines the NOAA tides data products this crate can retrieve and the
//! per-product rules that govern how they are requested and normalized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of measured series offered by the NOAA CO-OPS data service.
///
/// Each product has a maximum span the service accepts per request
/// ([`RequestWindow`]) and a canonical schema produced by the cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// Six-minute water level observations, with verified/preliminary quality flags.
    WaterLevel,
    /// Verified hourly water heights. Available much further back than `WaterLevel`.
    HourlyHeight,
    /// Six-minute air temperature observations.
    AirTemperature,
    /// Six-minute water temperature observations.
    WaterTemperature,
}

/// The largest date span the service will serve in one request for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestWindow {
    /// One calendar month per request.
    Month,
    /// One calendar year per request.
    Year,
}

impl Product {
    /// Every product, in the order the bulk download walks them.
    pub const ALL: [Product; 4] = [
        Product::HourlyHeight,
        Product::WaterLevel,
        Product::AirTemperature,
        Product::WaterTemperature,
    ];

    /// The lower-case name the service expects in the `product` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::WaterLevel => "water_level",
            Product::HourlyHeight => "hourly_height",
            Product::AirTemperature => "air_temperature",
            Product::WaterTemperature => "water_temperature",
        }
    }

    pub fn request_window(&self) -> RequestWindow {
        match self {
            Product::HourlyHeight => RequestWindow::Year,
            Product::WaterLevel | Product::AirTemperature | Product::WaterTemperature => {
                RequestWindow::Month
            }
        }
    }

    /// Whether the measured series is paired with tide predictions for the same window.
    pub fn has_predictions(&self) -> bool {
        matches!(self, Product::WaterLevel | Product::HourlyHeight)
    }

    /// Service column name → canonical column name.
    pub(crate) fn column_renames(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Product::AirTemperature => &[
                (" Air Temperature", "Air Temp"),
                (" X", "X"),
                (" N", "N"),
                (" R ", "R"),
            ],
            Product::WaterTemperature => &[
                (" Water Temperature", "Water Temp"),
                (" X", "X"),
                (" N", "N"),
                (" R ", "R"),
            ],
            Product::HourlyHeight => &[
                (" Water Level", "Water Level"),
                (" Sigma", "Sigma"),
                (" I", "I"),
                (" L ", "L"),
                (" Prediction", "Prediction"),
            ],
            Product::WaterLevel => &[
                (" Water Level", "Water Level"),
                (" Sigma", "Sigma"),
                (" O or I (for verified)", "I"),
                (" F", "F"),
                (" R", "R"),
                (" L", "L"),
                (" Prediction", "Prediction"),
            ],
        }
    }

    /// Flag and metadata columns (canonical names) the clean schema leaves out.
    pub(crate) fn unused_columns(&self) -> &'static [&'static str] {
        match self {
            Product::WaterLevel => &["Sigma", "I", "F", "R", "L"],
            Product::HourlyHeight => &["Sigma", "I", "L"],
            Product::AirTemperature | Product::WaterTemperature => &["X", "N", "R"],
        }
    }

    /// Canonical numeric columns of the clean schema.
    pub fn value_columns(&self) -> &'static [&'static str] {
        match self {
            Product::WaterLevel | Product::HourlyHeight => &["Water Level", "Prediction"],
            Product::AirTemperature => &["Air Temp"],
            Product::WaterTemperature => &["Water Temp"],
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string does not name one of the four products.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported product '{0}'")]
pub struct ParseProductError(pub String);

impl FromStr for Product {
    type Err = ParseProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "water_level" => Ok(Product::WaterLevel),
            "hourly_height" => Ok(Product::HourlyHeight),
            "air_temperature" => Ok(Product::AirTemperature),
            "water_temperature" => Ok(Product::WaterTemperature),
            _ => Err(ParseProductError(s.to_string())),
        }
    }
}
