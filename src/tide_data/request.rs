//! Builds the outbound queries for one chunk of one product.

use crate::types::location::compact_date;
use crate::types::product::Product;
use crate::types::window::Chunk;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";
/// Identifies this client in the service's activity and error logs.
pub const DEFAULT_APPLICATION: &str = "noaa_tides_rs";
pub const DEFAULT_DATUM: &str = "MLLW";

/// Where requests go and how they identify themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoint {
    pub base_url: String,
    pub application: String,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            application: DEFAULT_APPLICATION.to_string(),
        }
    }
}

/// A single GET against the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    base_url: String,
    params: Vec<(&'static str, String)>,
}

impl Query {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }
}

/// Renders the fully encoded URL.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match reqwest::Url::parse_with_params(&self.base_url, &self.params) {
            Ok(url) => write!(f, "{url}"),
            Err(_) => write!(f, "{}", self.base_url),
        }
    }
}

/// The measured series plus, for water levels, the matching predictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub primary: Query,
    pub prediction: Option<Query>,
}

/// Builds the queries for `product` at `station` over `chunk`.
///
/// `hourly_height` predictions are requested at an hourly interval so they
/// line up with the hourly measurements; the measured query itself carries no
/// interval.
pub fn build_query_plan(
    endpoint: &ServiceEndpoint,
    product: Product,
    station: &str,
    datum: &str,
    chunk: Chunk,
) -> QueryPlan {
    let product_name = product.as_str().to_lowercase();
    let datum = datum.to_uppercase();

    let mut query = Query {
        base_url: endpoint.base_url.clone(),
        params: vec![
            ("application", endpoint.application.clone()),
            ("product", product_name.clone()),
            ("station", station.to_string()),
            ("begin_date", compact_date(chunk.begin)),
            ("end_date", compact_date(chunk.end)),
            ("time_zone", "GMT".to_string()),
            ("datum", datum),
            ("units", "english".to_string()),
            ("format", "csv".to_string()),
        ],
    };
    let primary = query.clone();

    if product == Product::HourlyHeight {
        query.set("interval", "h");
    }

    let prediction = product.has_predictions().then(|| {
        query.set("product", "predictions");
        query
    });

    QueryPlan {
        primary,
        prediction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn may_2023() -> Chunk {
        Chunk {
            begin: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(),
        }
    }

    #[test]
    fn water_level_has_prediction_query() {
        let plan = build_query_plan(
            &ServiceEndpoint::default(),
            Product::WaterLevel,
            "8418150",
            "mllw",
            may_2023(),
        );
        let primary = &plan.primary;
        assert_eq!(primary.param("product"), Some("water_level"));
        assert_eq!(primary.param("station"), Some("8418150"));
        assert_eq!(primary.param("begin_date"), Some("20230501"));
        assert_eq!(primary.param("end_date"), Some("20230531"));
        assert_eq!(primary.param("datum"), Some("MLLW"));
        assert_eq!(primary.param("units"), Some("english"));
        assert_eq!(primary.param("time_zone"), Some("GMT"));
        assert_eq!(primary.param("format"), Some("csv"));
        assert_eq!(primary.param("application"), Some(DEFAULT_APPLICATION));
        assert_eq!(primary.param("interval"), None);

        let prediction = plan.prediction.expect("water_level has predictions");
        assert_eq!(prediction.param("product"), Some("predictions"));
        assert_eq!(prediction.param("begin_date"), Some("20230501"));
        assert_eq!(prediction.param("interval"), None);
    }

    #[test]
    fn hourly_height_prediction_is_hourly() {
        let plan = build_query_plan(
            &ServiceEndpoint::default(),
            Product::HourlyHeight,
            "8418150",
            "MLLW",
            may_2023(),
        );
        assert_eq!(plan.primary.param("product"), Some("hourly_height"));
        assert_eq!(plan.primary.param("interval"), None);
        let prediction = plan.prediction.unwrap();
        assert_eq!(prediction.param("product"), Some("predictions"));
        assert_eq!(prediction.param("interval"), Some("h"));
    }

    #[test]
    fn temperatures_have_no_prediction() {
        for product in [Product::AirTemperature, Product::WaterTemperature] {
            let plan = build_query_plan(
                &ServiceEndpoint::default(),
                product,
                "8410140",
                "MLLW",
                may_2023(),
            );
            assert!(plan.prediction.is_none());
            assert_eq!(plan.primary.param("product"), Some(product.as_str()));
        }
    }

    #[test]
    fn renders_encoded_url() {
        let endpoint = ServiceEndpoint {
            base_url: "https://example.test/api".to_string(),
            application: "my app".to_string(),
        };
        let plan = build_query_plan(&endpoint, Product::AirTemperature, "1", "mllw", may_2023());
        let url = plan.primary.to_string();
        assert!(url.starts_with("https://example.test/api?application=my+app&product=air_temperature"));
        assert!(url.contains("begin_date=20230501&end_date=20230531"));
    }
}
