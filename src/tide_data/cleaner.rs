//! Normalizes a stitched raw frame into the canonical per-product schema.

use crate::tide_data::error::TideDataError;
use crate::tide_data::{DATE_COLUMN, TIMESTAMP_COLUMN, TIME_COLUMN};
use crate::types::product::Product;
use log::debug;
use polars::prelude::*;

const QUALITY_COLUMN: &str = " Quality ";
const PRELIMINARY: &str = "p";

/// Cleans `raw` for `product`:
///
/// 1. rows with any missing field are dropped,
/// 2. for water levels, preliminary (`"p"`) rows are dropped along with the
///    quality column,
/// 3. service column names are mapped to canonical ones and flag columns
///    are removed,
/// 4. value columns are cast to `Float64` (unparseable rows are dropped),
/// 5. `"Date Time"` is split into `"Date"` and `"Time"`, which follow it.
pub fn clean_frame(
    raw: DataFrame,
    product: Product,
    station: &str,
) -> Result<DataFrame, TideDataError> {
    let missing = |column: &str| TideDataError::MissingColumn {
        product,
        station: station.to_string(),
        column: column.trim().to_string(),
    };

    if raw.get_column_index(TIMESTAMP_COLUMN).is_none() {
        return Err(missing(TIMESTAMP_COLUMN));
    }
    let raw_height = raw.height();
    let mut frame = raw.drop_nulls::<String>(None)?;

    if product == Product::WaterLevel {
        if frame.get_column_index(QUALITY_COLUMN).is_none() {
            return Err(missing(QUALITY_COLUMN));
        }
        frame = frame
            .lazy()
            .filter(col(QUALITY_COLUMN).neq(lit(PRELIMINARY)))
            .collect()?;
        frame.drop_in_place(QUALITY_COLUMN)?;
    }

    let (from, to): (Vec<&str>, Vec<&str>) = product.column_renames().iter().copied().unzip();
    let mut frame = frame.lazy().rename(from, to, false).collect()?;

    for column in product.unused_columns() {
        if frame.get_column_index(column).is_some() {
            frame.drop_in_place(column)?;
        }
    }

    let mut casts = Vec::new();
    for column in product.value_columns() {
        if frame.get_column_index(column).is_none() {
            return Err(missing(column));
        }
        casts.push(col(*column).cast(DataType::Float64));
    }
    let mut frame = frame.lazy().with_columns(casts).collect()?;

    let (date, time) = split_timestamps(&frame)?;
    frame.with_column(date)?.with_column(time)?;
    let frame = frame.drop_nulls::<String>(None)?;

    let mut order = vec![
        TIMESTAMP_COLUMN.to_string(),
        DATE_COLUMN.to_string(),
        TIME_COLUMN.to_string(),
    ];
    let rest: Vec<String> = frame
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !order.contains(name))
        .collect();
    order.extend(rest);
    let frame = frame.select(order)?;

    debug!(
        "Cleaned {} for station {}: {} of {} rows kept",
        product,
        station,
        frame.height(),
        raw_height
    );
    Ok(frame)
}

fn split_timestamps(frame: &DataFrame) -> PolarsResult<(Column, Column)> {
    let stamps = frame.column(TIMESTAMP_COLUMN)?.str()?;
    let (dates, times): (Vec<Option<&str>>, Vec<Option<&str>>) = stamps
        .into_iter()
        .map(|stamp| match stamp.and_then(|s| s.trim().split_once(' ')) {
            Some((date, time)) => (Some(date), Some(time)),
            None => (None, None),
        })
        .unzip();
    Ok((
        Column::new(DATE_COLUMN.into(), dates),
        Column::new(TIME_COLUMN.into(), times),
    ))
}
