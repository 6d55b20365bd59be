//! Executes the queries for one chunk, pairs measurements with predictions
//! and retries transient failures.

use crate::tide_data::error::FetchError;
use crate::tide_data::request::{build_query_plan, Query, QueryPlan, ServiceEndpoint};
use crate::tide_data::source::TidesSource;
use crate::tide_data::TIMESTAMP_COLUMN;
use crate::types::product::Product;
use crate::types::window::Chunk;
use log::{debug, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

const NO_DATA_MESSAGE: &str = "No data was found";

/// How often and how patiently a chunk is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

pub struct RawFetcher {
    source: Arc<dyn TidesSource>,
    endpoint: ServiceEndpoint,
    datum: String,
    retry: RetryPolicy,
}

impl RawFetcher {
    pub fn new(
        source: Arc<dyn TidesSource>,
        endpoint: ServiceEndpoint,
        datum: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            endpoint,
            datum: datum.into(),
            retry,
        }
    }

    /// Fetches one chunk, sorted by timestamp.
    ///
    /// `Ok(None)` means the service has no data for the window. Transient
    /// failures are retried up to the policy's attempt limit, after which
    /// [`FetchError::RetriesExhausted`] wraps the last error.
    pub async fn fetch_chunk(
        &self,
        product: Product,
        station: &str,
        chunk: Chunk,
    ) -> Result<Option<DataFrame>, FetchError> {
        let plan = build_query_plan(&self.endpoint, product, station, &self.datum, chunk);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_plan(&plan).await {
                Ok(frame) => return Ok(frame),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(
                        "Giving up on {} for station {} {} after {} attempts: {}",
                        product, station, chunk, attempt, e
                    );
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        "Error retrieving {} for station {} {} on attempt {}: {}",
                        product, station, chunk, attempt, e
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }

    async fn try_plan(&self, plan: &QueryPlan) -> Result<Option<DataFrame>, FetchError> {
        let Some(measured) = self.fetch_csv(&plan.primary).await? else {
            return Ok(None);
        };

        let Some(prediction_query) = &plan.prediction else {
            return sort_by_timestamp(measured)
                .map(Some)
                .map_err(|source| parse_error(&plan.primary, source));
        };

        let Some(predicted) = self.fetch_csv(prediction_query).await? else {
            return Ok(None);
        };

        let joined = join_on_timestamp(measured, predicted)
            .map_err(|source| parse_error(prediction_query, source))?;
        Ok((joined.height() > 0).then_some(joined))
    }

    async fn fetch_csv(&self, query: &Query) -> Result<Option<DataFrame>, FetchError> {
        let body = self.source.fetch(query).await?;
        parse_response(query, body)
    }
}

fn parse_error(query: &Query, source: PolarsError) -> FetchError {
    FetchError::CsvParse {
        url: query.to_string(),
        source,
    }
}

/// Turns a response body into a frame with every column read as text.
///
/// The service reports problems as a plain `Error: ...` body with a success
/// status. "No data was found" is an empty window, anything else is a
/// [`FetchError::Service`].
pub(crate) fn parse_response(query: &Query, body: Vec<u8>) -> Result<Option<DataFrame>, FetchError> {
    let text = String::from_utf8_lossy(&body);
    let trimmed = text.trim_start();
    if trimmed.starts_with("Error") {
        if trimmed.contains(NO_DATA_MESSAGE) {
            debug!("No data for {}", query);
            return Ok(None);
        }
        let message = trimmed.lines().next().unwrap_or_default().trim().to_string();
        return Err(FetchError::Service {
            url: query.to_string(),
            message,
        });
    }

    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(body))
        .finish()
        .map_err(|source| parse_error(query, source))?;

    if frame.get_column_index(TIMESTAMP_COLUMN).is_none() {
        return Err(parse_error(
            query,
            PolarsError::ColumnNotFound(TIMESTAMP_COLUMN.into()),
        ));
    }
    Ok((frame.height() > 0).then_some(frame))
}

fn sort_by_timestamp(frame: DataFrame) -> PolarsResult<DataFrame> {
    frame
        .lazy()
        .sort([TIMESTAMP_COLUMN], SortMultipleOptions::default())
        .collect()
}

/// Inner join: only timestamps present in both frames survive.
fn join_on_timestamp(measured: DataFrame, predicted: DataFrame) -> PolarsResult<DataFrame> {
    measured
        .lazy()
        .join(
            predicted.lazy(),
            [col(TIMESTAMP_COLUMN)],
            [col(TIMESTAMP_COLUMN)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([TIMESTAMP_COLUMN], SortMultipleOptions::default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tide_data::testing::{synthetic_csv, MockSource};
    use chrono::NaiveDate;

    fn may_2023() -> Chunk {
        Chunk {
            begin: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(),
        }
    }

    fn fetcher(source: Arc<MockSource>) -> RawFetcher {
        RawFetcher::new(
            source,
            ServiceEndpoint::default(),
            "MLLW",
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
        )
    }

    fn transient() -> FetchError {
        FetchError::CsvParse {
            url: "mock".to_string(),
            source: PolarsError::ComputeError("connection reset".into()),
        }
    }

    #[tokio::test]
    async fn joins_measurements_with_predictions() -> Result<(), FetchError> {
        let source = Arc::new(MockSource::synthetic());
        let frame = fetcher(source.clone())
            .fetch_chunk(Product::WaterLevel, "8418150", may_2023())
            .await?
            .expect("synthetic source has data");

        // two samples a day
        assert_eq!(frame.height(), 62);
        assert!(frame.get_column_index(" Water Level").is_some());
        assert!(frame.get_column_index(" Prediction").is_some());
        assert_eq!(source.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn inner_join_drops_unmatched_timestamps() -> Result<(), FetchError> {
        let source = Arc::new(MockSource::new(|query| {
            if query.param("product") == Some("predictions") {
                Ok(b"Date Time, Prediction\n2023-05-01 00:00,1.0\n2023-05-01 06:00,2.0\n".to_vec())
            } else {
                Ok(synthetic_csv(query).into_bytes())
            }
        }));
        let frame = fetcher(source)
            .fetch_chunk(Product::WaterLevel, "8418150", may_2023())
            .await?
            .unwrap();
        assert_eq!(frame.height(), 1);
        let stamps = frame.column(TIMESTAMP_COLUMN).unwrap().str().unwrap();
        assert_eq!(stamps.get(0), Some("2023-05-01 00:00"));
        Ok(())
    }

    #[tokio::test]
    async fn temperatures_are_fetched_alone() -> Result<(), FetchError> {
        let source = Arc::new(MockSource::synthetic());
        let frame = fetcher(source.clone())
            .fetch_chunk(Product::AirTemperature, "8418150", may_2023())
            .await?
            .unwrap();
        assert_eq!(frame.height(), 62);
        assert_eq!(source.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() -> Result<(), FetchError> {
        let source = Arc::new(MockSource::synthetic().failing_first(2, transient));
        let frame = fetcher(source.clone())
            .fetch_chunk(Product::WaterTemperature, "8418150", may_2023())
            .await?;
        assert_eq!(frame.map(|f| f.height()), Some(62));
        assert_eq!(source.calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let source = Arc::new(MockSource::synthetic().failing_first(3, transient));
        let result = fetcher(source.clone())
            .fetch_chunk(Product::WaterTemperature, "8418150", may_2023())
            .await;
        assert!(matches!(
            result,
            Err(FetchError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn prediction_failure_retries_the_whole_attempt() -> Result<(), FetchError> {
        // calls: measured ok, prediction fails, measured ok, prediction ok
        let source = Arc::new(MockSource::synthetic().failing_calls(&[2], transient));
        let frame = fetcher(source.clone())
            .fetch_chunk(Product::HourlyHeight, "8418150", may_2023())
            .await?;
        assert!(frame.is_some());
        assert_eq!(source.calls(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn service_errors_are_not_retried() {
        let source = Arc::new(MockSource::new(|_| {
            Ok(b"Error: Wrong Product : Product cannot be null or empty\n".to_vec())
        }));
        let result = fetcher(source.clone())
            .fetch_chunk(Product::AirTemperature, "8418150", may_2023())
            .await;
        match result {
            Err(FetchError::Service { message, .. }) => {
                assert!(message.starts_with("Error: Wrong Product"))
            }
            other => panic!("expected service error, got {other:?}"),
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn no_data_is_an_empty_chunk() -> Result<(), FetchError> {
        let source = Arc::new(MockSource::new(|_| {
            Ok(b"\nError: No data was found. This product may not be offered at this station at the requested time.\n".to_vec())
        }));
        let frame = fetcher(source.clone())
            .fetch_chunk(Product::WaterLevel, "8418150", may_2023())
            .await?;
        assert!(frame.is_none());
        assert_eq!(source.calls(), 1);
        Ok(())
    }

    #[test]
    fn every_column_is_read_as_text() {
        let plan = build_query_plan(
            &ServiceEndpoint::default(),
            Product::AirTemperature,
            "8418150",
            "MLLW",
            may_2023(),
        );
        let body = b"Date Time, Air Temperature, X, N, R \n2023-05-01 00:00,50.1,0,0,0\n".to_vec();
        let frame = parse_response(&plan.primary, body).unwrap().unwrap();
        for column in frame.get_columns() {
            assert_eq!(column.dtype(), &DataType::String);
        }
        assert!(frame.get_column_index(" Air Temperature").is_some());
    }

    #[test]
    fn body_without_timestamp_is_a_parse_error() {
        let plan = build_query_plan(
            &ServiceEndpoint::default(),
            Product::AirTemperature,
            "8418150",
            "MLLW",
            may_2023(),
        );
        let result = parse_response(&plan.primary, b"<html>maintenance</html>\n".to_vec());
        assert!(matches!(result, Err(FetchError::CsvParse { .. })));
    }
}
