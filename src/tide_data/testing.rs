//! In-memory stand-in for the data service.

use crate::tide_data::error::FetchError;
use crate::tide_data::request::Query;
use crate::tide_data::source::TidesSource;
use crate::types::location::parse_compact_date;
use async_trait::async_trait;
use chrono::Datelike;
use std::collections::HashSet;
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&Query) -> Result<Vec<u8>, FetchError> + Send + Sync>;

pub(crate) struct MockSource {
    responder: Responder,
    failing: HashSet<usize>,
    make_error: fn() -> FetchError,
    calls: AtomicUsize,
    queries: Mutex<Vec<Query>>,
}

impl MockSource {
    pub(crate) fn new(
        responder: impl Fn(&Query) -> Result<Vec<u8>, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            failing: HashSet::new(),
            make_error: || unreachable!("no failing calls configured"),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answers every query with [`synthetic_csv`].
    pub(crate) fn synthetic() -> Self {
        Self::new(|query| Ok(synthetic_csv(query).into_bytes()))
    }

    /// The first `n` calls fail with `make_error`.
    pub(crate) fn failing_first(self, n: usize, make_error: fn() -> FetchError) -> Self {
        let calls: Vec<usize> = (1..=n).collect();
        self.failing_calls(&calls, make_error)
    }

    /// The given 1-based call numbers fail with `make_error`.
    pub(crate) fn failing_calls(mut self, calls: &[usize], make_error: fn() -> FetchError) -> Self {
        self.failing = calls.iter().copied().collect();
        self.make_error = make_error;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<Query> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TidesSource for MockSource {
    async fn fetch(&self, query: &Query) -> Result<Vec<u8>, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        if self.failing.contains(&call) {
            return Err((self.make_error)());
        }
        (self.responder)(query)
    }
}

/// A CSV body shaped like the service's, with samples at 00:00 and 12:00 on
/// every day of the queried window.
pub(crate) fn synthetic_csv(query: &Query) -> String {
    let product = query.param("product").unwrap_or_default();
    let begin = query
        .param("begin_date")
        .and_then(|d| parse_compact_date(d).ok())
        .expect("query has begin_date");
    let end = query
        .param("end_date")
        .and_then(|d| parse_compact_date(d).ok())
        .expect("query has end_date");

    let header = match product {
        "predictions" => "Date Time, Prediction",
        "water_level" => "Date Time, Water Level, Sigma, O or I (for verified), F, R, L, Quality ",
        "hourly_height" => "Date Time, Water Level, Sigma, I, L ",
        "air_temperature" => "Date Time, Air Temperature, X, N, R ",
        "water_temperature" => "Date Time, Water Temperature, X, N, R ",
        other => panic!("unexpected product {other}"),
    };

    let mut body = format!("{header}\n");
    for day in begin.iter_days().take_while(|d| *d <= end) {
        for hour in ["00:00", "12:00"] {
            let value = f64::from(day.ordinal()) / 100.0;
            let stamp = format!("{day} {hour}");
            let _ = match product {
                "predictions" => writeln!(body, "{stamp},{:.3}", value + 0.01),
                "water_level" => writeln!(body, "{stamp},{value:.3},0.003,0,0,0,0,v"),
                "hourly_height" => writeln!(body, "{stamp},{value:.3},0.003,0,0"),
                _ => writeln!(body, "{stamp},{:.1},0,0,0", value + 40.0),
            };
        }
    }
    body
}
