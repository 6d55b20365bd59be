//! Cache windows and the per-request chunks a multi-year span is split into.

use crate::types::calendar::{month_bounds, year_bounds};
use crate::types::product::{Product, RequestWindow};
use chrono::NaiveDate;
use std::fmt;

/// Which slice of a station's history a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// Everything from the station's earliest available year.
    AllHistory,
    /// Everything from January 1st of the given year.
    SinceYear(i32),
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::AllHistory => write!(f, "all history"),
            WindowKind::SinceYear(year) => write!(f, "since {year}"),
        }
    }
}

/// One bounded request, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.begin, self.end)
    }
}

/// Splits `[start_year, end_year]` into the product's request window.
///
/// Chunks starting after `today` are skipped and the last chunk's end is
/// clamped to `today`.
pub fn plan_chunks(product: Product, start_year: i32, end_year: i32, today: NaiveDate) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for year in start_year..=end_year {
        let bounds: Vec<(NaiveDate, NaiveDate)> = match product.request_window() {
            RequestWindow::Month => (1..=12).filter_map(|m| month_bounds(year, m)).collect(),
            RequestWindow::Year => year_bounds(year).into_iter().collect(),
        };
        for (begin, end) in bounds {
            if begin > today {
                return chunks;
            }
            chunks.push(Chunk {
                begin,
                end: end.min(today),
            });
        }
    }
    chunks
}
