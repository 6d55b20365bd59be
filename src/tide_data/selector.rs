use crate::tide_data::DATE_COLUMN;
use chrono::NaiveDate;
use polars::prelude::*;

/// Restricts a clean frame to `[start, end]`, inclusive on whole days.
///
/// The `"Date"` column holds ISO `YYYY-MM-DD` strings, so lexical order is
/// chronological order. An absent bound leaves that side open.
pub fn select_range(frame: LazyFrame, start: Option<NaiveDate>, end: Option<NaiveDate>) -> LazyFrame {
    let iso = |date: NaiveDate| date.format("%Y-%m-%d").to_string();
    let mut frame = frame;
    if let Some(start) = start {
        frame = frame.filter(col(DATE_COLUMN).gt_eq(lit(iso(start))));
    }
    if let Some(end) = end {
        frame = frame.filter(col(DATE_COLUMN).lt_eq(lit(iso(end))));
    }
    frame
}
