//! NASA POWER daily point API adapter

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::instrument;

use super::{SourceAdapter, SourceError, http};
use crate::fallback::Provider;
use crate::models::{ClimateVariable, Coordinate, HistoricalSample, SampleQuery};

pub const NAME: &str = "NASA POWER";

/// POWER marks missing days with this value
const FILL_VALUE: f64 = -999.0;

pub struct PowerAdapter {
    client: ClientWithMiddleware,
    base_url: String,
}

impl PowerAdapter {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, parameter: &str, coordinate: &Coordinate, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}?parameters={}&start={}&end={}&latitude={:.4}&longitude={:.4}&community=AG&format=JSON",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(parameter),
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
            coordinate.latitude,
            coordinate.longitude,
        )
    }
}

/// POWER parameter name for a variable, if POWER offers it
#[must_use]
pub fn parameter(variable: ClimateVariable) -> Option<&'static str> {
    match variable {
        ClimateVariable::Temperature => Some("T2M"),
        ClimateVariable::Precipitation => Some("PRECTOTCORR"),
        ClimateVariable::WindSpeed => Some("WS10M"),
        ClimateVariable::Humidity => Some("RH2M"),
        ClimateVariable::AirQuality => None,
    }
}

impl Provider for PowerAdapter {
    fn name(&self) -> &str {
        NAME
    }
}

#[async_trait]
impl SourceAdapter for PowerAdapter {
    #[instrument(skip(self, query), fields(variable = %query.variable, lat = query.coordinate.latitude, lon = query.coordinate.longitude))]
    async fn fetch(&self, query: &SampleQuery) -> Result<Vec<HistoricalSample>, SourceError> {
        let parameter = parameter(query.variable).ok_or(SourceError::Unsupported {
            variable: query.variable,
        })?;
        let Some((start, end)) = query.date_span() else {
            return Ok(Vec::new());
        };

        let url = self.url(parameter, &query.coordinate, start, end);
        let response: PowerResponse = http::get_json(self.client.get(&url)).await?;
        let series = parse_series(response, parameter)?;
        Ok(query.samples_from_series(series, NAME))
    }
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, HashMap<String, Option<f64>>>,
}

fn parse_series(response: PowerResponse, parameter: &str) -> Result<Vec<(NaiveDate, f64)>, SourceError> {
    let series = response
        .properties
        .parameter
        .get(parameter)
        .ok_or_else(|| SourceError::parse(format!("POWER response lacks {parameter}")))?;

    Ok(series
        .iter()
        .filter_map(|(day, value)| {
            let value = (*value)?;
            if (value - FILL_VALUE).abs() < f64::EPSILON {
                return None;
            }
            let date = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;
            Some((date, value))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayWindow;

    fn adapter() -> PowerAdapter {
        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        PowerAdapter::new(client, "https://power.example/api/temporal/daily/point/")
    }

    #[test]
    fn test_url_layout() {
        let url = adapter().url(
            "T2M",
            &Coordinate::new(28.61, 77.21),
            NaiveDate::from_ymd_opt(1990, 6, 27).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 11).unwrap(),
        );
        assert_eq!(
            url,
            "https://power.example/api/temporal/daily/point?parameters=T2M&start=19900627&end=20240711&latitude=28.6100&longitude=77.2100&community=AG&format=JSON"
        );
    }

    #[test]
    fn test_air_quality_is_unsupported() {
        assert!(parameter(ClimateVariable::AirQuality).is_none());
        assert_eq!(parameter(ClimateVariable::Humidity), Some("RH2M"));
    }

    #[test]
    fn test_parse_drops_fill_values_and_bad_dates() {
        let body = r#"{"properties": {"parameter": {"T2M": {
            "20000703": 31.5,
            "20000704": -999.0,
            "20000705": null,
            "2000xx06": 12.0,
            "20000707": 29.25
        }}}}"#;
        let response: PowerResponse = serde_json::from_str(body).unwrap();
        let mut series = parse_series(response, "T2M").unwrap();
        series.sort_by_key(|(date, _)| *date);

        assert_eq!(
            series,
            vec![
                (NaiveDate::from_ymd_opt(2000, 7, 3).unwrap(), 31.5),
                (NaiveDate::from_ymd_opt(2000, 7, 7).unwrap(), 29.25),
            ]
        );
    }

    #[test]
    fn test_parse_missing_parameter_is_error() {
        let body = r#"{"properties": {"parameter": {"WS10M": {}}}}"#;
        let response: PowerResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            parse_series(response, "T2M"),
            Err(SourceError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_variable_fails_without_io() {
        let query = SampleQuery::new(
            ClimateVariable::AirQuality,
            Coordinate::new(0.0, 0.0),
            DayWindow::around(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(), 7),
            1990..=2024,
        );
        let result = adapter().fetch(&query).await;
        assert!(matches!(result, Err(SourceError::Unsupported { .. })));
    }
}
