//! Assembles a multi-year dataset out of per-window chunks.

use crate::tide_data::error::TideDataError;
use crate::tide_data::fetcher::RawFetcher;
use crate::tide_data::TIMESTAMP_COLUMN;
use crate::types::product::Product;
use crate::types::window::Chunk;
use log::{debug, info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What to do when a chunk still fails after its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Abort the whole stitch on the first failed chunk.
    #[default]
    FailFast,
    /// Keep going and report the failed chunks alongside the data.
    RecordGaps,
}

/// A stitched dataset and the chunks that could not be fetched.
#[derive(Debug, Clone)]
pub struct Stitched {
    pub frame: DataFrame,
    pub missing: Vec<Chunk>,
}

impl Stitched {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Fetches `chunks` in order and concatenates them.
///
/// Rows whose timestamp is not strictly after the last accumulated one are
/// dropped, so the result is ascending with unique timestamps.
pub async fn stitch(
    fetcher: &RawFetcher,
    product: Product,
    station: &str,
    chunks: &[Chunk],
    policy: GapPolicy,
) -> Result<Stitched, TideDataError> {
    let started = Instant::now();
    let mut stitched: Option<DataFrame> = None;
    let mut missing = Vec::new();

    for chunk in chunks {
        match fetcher.fetch_chunk(product, station, *chunk).await {
            Ok(Some(frame)) => {
                debug!(
                    "Got {} rows of {} for station {} {}",
                    frame.height(),
                    product,
                    station,
                    chunk
                );
                append_chunk(&mut stitched, frame)?;
            }
            Ok(None) => debug!("No {} data for station {} {}", product, station, chunk),
            Err(source) => match policy {
                GapPolicy::FailFast => {
                    return Err(TideDataError::ChunkFailed {
                        product,
                        station: station.to_string(),
                        chunk: *chunk,
                        source,
                    })
                }
                GapPolicy::RecordGaps => {
                    warn!(
                        "Skipping {} chunk {} for station {}: {}",
                        product, chunk, station, source
                    );
                    missing.push(*chunk);
                }
            },
        }
    }

    if !chunks.is_empty() && missing.len() == chunks.len() {
        return Err(TideDataError::StitchFailed {
            product,
            station: station.to_string(),
            attempted: chunks.len(),
        });
    }

    let Some(mut frame) = stitched else {
        return Err(TideDataError::NoData {
            product,
            station: station.to_string(),
        });
    };
    frame.as_single_chunk_par();

    info!(
        "Got {} rows of '{}' for station {} from {} chunks in {:?}",
        frame.height(),
        product,
        station,
        chunks.len(),
        started.elapsed()
    );
    Ok(Stitched { frame, missing })
}

fn append_chunk(stitched: &mut Option<DataFrame>, chunk: DataFrame) -> PolarsResult<()> {
    match stitched {
        None => *stitched = Some(chunk),
        Some(frame) => {
            let fresh = match last_timestamp(frame)? {
                Some(last) => chunk
                    .lazy()
                    .filter(col(TIMESTAMP_COLUMN).gt(lit(last)))
                    .collect()?,
                None => chunk,
            };
            frame.vstack_mut(&fresh)?;
        }
    }
    Ok(())
}

fn last_timestamp(frame: &DataFrame) -> PolarsResult<Option<String>> {
    let height = frame.height();
    if height == 0 {
        return Ok(None);
    }
    let stamps = frame.column(TIMESTAMP_COLUMN)?.str()?;
    Ok(stamps.get(height - 1).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tide_data::error::FetchError;
    use crate::tide_data::fetcher::RetryPolicy;
    use crate::tide_data::request::ServiceEndpoint;
    use crate::tide_data::testing::{synthetic_csv, MockSource};
    use crate::types::window::plan_chunks;
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn fetcher(source: Arc<MockSource>) -> RawFetcher {
        RawFetcher::new(
            source,
            ServiceEndpoint::default(),
            "MLLW",
            RetryPolicy {
                max_attempts: 1,
                delay: Duration::ZERO,
            },
        )
    }

    fn far_future() -> NaiveDate {
        NaiveDate::from_ymd_opt(2100, 1, 1).unwrap()
    }

    fn assert_strictly_ascending(frame: &DataFrame) {
        let stamps: Vec<&str> = frame
            .column(TIMESTAMP_COLUMN)
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn month_chunks_of_a_year_concatenate_in_order() -> Result<(), TideDataError> {
        let source = Arc::new(MockSource::synthetic());
        let chunks = plan_chunks(Product::AirTemperature, 2023, 2023, far_future());
        let stitched = stitch(
            &fetcher(source.clone()),
            Product::AirTemperature,
            "8418150",
            &chunks,
            GapPolicy::FailFast,
        )
        .await?;

        // 365 days, two samples each: the sum of the twelve month chunks
        assert_eq!(stitched.frame.height(), 730);
        assert!(stitched.is_complete());
        assert_eq!(source.calls(), 12);
        assert_strictly_ascending(&stitched.frame);
        Ok(())
    }

    #[tokio::test]
    async fn overlapping_chunk_rows_are_dropped() -> Result<(), TideDataError> {
        // Every month also echoes the previous month's last day.
        let source = Arc::new(MockSource::new(|query| {
            let body = synthetic_csv(query);
            if query.param("begin_date") == Some("20230201") {
                let mut lines: Vec<&str> = body.lines().collect();
                lines.insert(1, "2023-01-31 12:00,49.9,0,0,0");
                return Ok(format!("{}\n", lines.join("\n")).into_bytes());
            }
            Ok(body.into_bytes())
        }));
        let chunks = plan_chunks(Product::WaterTemperature, 2023, 2023, far_future());
        let stitched = stitch(
            &fetcher(source),
            Product::WaterTemperature,
            "8418150",
            &chunks[..3],
            GapPolicy::FailFast,
        )
        .await?;
        assert_eq!(stitched.frame.height(), (31 + 28 + 31) * 2);
        assert_strictly_ascending(&stitched.frame);
        Ok(())
    }

    #[tokio::test]
    async fn yearly_chunks_for_hourly_height() -> Result<(), TideDataError> {
        let source = Arc::new(MockSource::synthetic());
        let chunks = plan_chunks(Product::HourlyHeight, 2023, 2024, far_future());
        let stitched = stitch(
            &fetcher(source.clone()),
            Product::HourlyHeight,
            "8418150",
            &chunks,
            GapPolicy::FailFast,
        )
        .await?;
        assert_eq!(stitched.frame.height(), (365 + 366) * 2);
        // measured + predictions per year
        assert_eq!(source.calls(), 4);
        assert_strictly_ascending(&stitched.frame);
        Ok(())
    }

    fn fail_march(query: &crate::tide_data::request::Query) -> Result<Vec<u8>, FetchError> {
        if query.param("begin_date") == Some("20230301") {
            return Err(FetchError::Service {
                url: query.to_string(),
                message: "Error: internal".to_string(),
            });
        }
        Ok(synthetic_csv(query).into_bytes())
    }

    #[tokio::test]
    async fn fail_fast_stops_at_first_failed_chunk() {
        let source = Arc::new(MockSource::new(fail_march));
        let chunks = plan_chunks(Product::AirTemperature, 2023, 2023, far_future());
        let result = stitch(
            &fetcher(source.clone()),
            Product::AirTemperature,
            "8418150",
            &chunks,
            GapPolicy::FailFast,
        )
        .await;
        match result {
            Err(TideDataError::ChunkFailed { chunk, .. }) => assert_eq!(chunk, chunks[2]),
            other => panic!("expected chunk failure, got {other:?}"),
        }
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn record_gaps_reports_missing_chunks() -> Result<(), TideDataError> {
        let source = Arc::new(MockSource::new(fail_march));
        let chunks = plan_chunks(Product::AirTemperature, 2023, 2023, far_future());
        let stitched = stitch(
            &fetcher(source),
            Product::AirTemperature,
            "8418150",
            &chunks,
            GapPolicy::RecordGaps,
        )
        .await?;
        assert_eq!(stitched.missing, vec![chunks[2]]);
        assert!(!stitched.is_complete());
        assert_eq!(stitched.frame.height(), (365 - 31) * 2);
        let months: HashSet<String> = stitched
            .frame
            .column(TIMESTAMP_COLUMN)?
            .str()?
            .into_no_null_iter()
            .map(|s| s[..7].to_string())
            .collect();
        assert!(!months.contains("2023-03"));
        Ok(())
    }

    #[tokio::test]
    async fn every_chunk_failing_is_an_error() {
        let source = Arc::new(MockSource::new(|query| {
            Err(FetchError::Service {
                url: query.to_string(),
                message: "Error: down".to_string(),
            })
        }));
        let chunks = plan_chunks(Product::AirTemperature, 2023, 2023, far_future());
        let result = stitch(
            &fetcher(source),
            Product::AirTemperature,
            "8418150",
            &chunks,
            GapPolicy::RecordGaps,
        )
        .await;
        assert!(matches!(
            result,
            Err(TideDataError::StitchFailed { attempted: 12, .. })
        ));
    }

    #[tokio::test]
    async fn all_empty_chunks_is_no_data() {
        let source = Arc::new(MockSource::new(|_| {
            Ok(b"Error: No data was found. This product may not be offered at this station at the requested time.".to_vec())
        }));
        let chunks = plan_chunks(Product::WaterLevel, 1990, 1990, far_future());
        let result = stitch(
            &fetcher(source),
            Product::WaterLevel,
            "8418150",
            &chunks,
            GapPolicy::FailFast,
        )
        .await;
        assert!(matches!(result, Err(TideDataError::NoData { .. })));
    }
}
