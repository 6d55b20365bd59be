//! The immutable request descriptor threaded through the load pipeline.

use crate::error::TidesError;
use crate::stations::catalog::StationCatalog;
use crate::types::product::Product;
use crate::types::window::WindowKind;
use chrono::{Datelike, Days, NaiveDate};
use std::fmt;
use thiserror::Error;

const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("'{0}' is not a valid YYYYMMDD date")]
    Malformed(String),

    #[error("start date {start} is after end date {end}")]
    Reversed { start: NaiveDate, end: NaiveDate },

    #[error("year {0} is outside the supported date range")]
    YearOutOfRange(i32),
}

/// A station together with an optional date window.
///
/// An absent `start_date` means "earliest available", an absent `end_date`
/// means "latest available". Values are never mutated once built; use
/// [`Location::with_range`] to derive a new one.
///
/// # Examples
///
/// ```
/// use noaa_tides::Location;
///
/// let may = Location::parse("8418150", Some("20230501"), Some("20230531")).unwrap();
/// assert_eq!(may.station_id(), "8418150");
/// assert_eq!(may.start_date().unwrap().to_string(), "2023-05-01");
///
/// assert!(Location::parse("8418150", Some("2023-05-01"), None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    station_id: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl Location {
    pub fn new(
        station_id: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, DateRangeError> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(DateRangeError::Reversed { start, end });
            }
        }
        Ok(Self {
            station_id: station_id.into(),
            start_date,
            end_date,
        })
    }

    /// A location covering everything the station has ever reported.
    pub fn all_time(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            start_date: None,
            end_date: None,
        }
    }

    /// January 1st of `year` onwards.
    pub fn since_year(station_id: impl Into<String>, year: i32) -> Result<Self, DateRangeError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(DateRangeError::YearOutOfRange(year))?;
        Self::new(station_id, Some(start), None)
    }

    /// Seven days starting at `start`, both ends included.
    pub fn one_week(station_id: impl Into<String>, start: NaiveDate) -> Result<Self, DateRangeError> {
        let end = start
            .checked_add_days(Days::new(6))
            .ok_or(DateRangeError::YearOutOfRange(start.year()))?;
        Self::new(station_id, Some(start), Some(end))
    }

    /// Everything since the first year `catalog` records `product` for the
    /// station.
    ///
    /// # Examples
    ///
    /// ```
    /// use noaa_tides::{Location, Product, StationCatalog};
    ///
    /// let catalog = StationCatalog::bundled();
    /// let levels = Location::from_earliest(&catalog, "8418150", Product::WaterLevel).unwrap();
    /// assert_eq!(levels.start_date().unwrap().to_string(), "1996-01-01");
    /// assert_eq!(levels.end_date(), None);
    /// ```
    pub fn from_earliest(
        catalog: &StationCatalog,
        station_id: &str,
        product: Product,
    ) -> Result<Self, TidesError> {
        let year = catalog.earliest_year(station_id, product)?;
        Ok(Self::since_year(station_id, year)?)
    }

    /// Builds a location from 8-digit `YYYYMMDD` strings.
    pub fn parse(
        station_id: impl Into<String>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self, DateRangeError> {
        let start = start_date.map(parse_compact_date).transpose()?;
        let end = end_date.map(parse_compact_date).transpose()?;
        Self::new(station_id, start, end)
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Same station, different window.
    pub fn with_range(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, DateRangeError> {
        Self::new(self.station_id.clone(), start_date, end_date)
    }

    /// The cache window a load for this location asks for.
    pub(crate) fn requested_window(&self, all_history: bool) -> WindowKind {
        match self.start_date {
            Some(start) if !all_history => WindowKind::SinceYear(start.year()),
            _ => WindowKind::AllHistory,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |date: Option<NaiveDate>| {
            date.map(compact_date)
                .unwrap_or_else(|| "None".to_string())
        };
        write!(
            f,
            "start_date={}, end_date={}, station_id={}",
            show(self.start_date),
            show(self.end_date),
            self.station_id
        )
    }
}

/// Parses an 8-digit `YYYYMMDD` date.
pub fn parse_compact_date(value: &str) -> Result<NaiveDate, DateRangeError> {
    let trimmed = value.trim();
    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateRangeError::Malformed(value.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, COMPACT_DATE_FORMAT)
        .map_err(|_| DateRangeError::Malformed(value.to_string()))
}

/// Formats a date the way the service expects it in `begin_date` / `end_date`.
pub fn compact_date(date: NaiveDate) -> String {
    date.format(COMPACT_DATE_FORMAT).to_string()
}
