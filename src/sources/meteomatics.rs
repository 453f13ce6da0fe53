//! Meteomatics time-series API adapter

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::instrument;

use super::{SourceAdapter, SourceError, http};
use crate::fallback::Provider;
use crate::models::{ClimateVariable, Coordinate, HistoricalSample, SampleQuery};

pub const NAME: &str = "Meteomatics";

pub struct MeteomaticsAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    username: String,
    password: String,
    cutoff: Option<NaiveDate>,
}

impl MeteomaticsAdapter {
    #[must_use]
    pub fn new(
        client: ClientWithMiddleware,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            cutoff: None,
        }
    }

    /// Stop querying once `today` is past this date
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: Option<NaiveDate>) -> Self {
        self.cutoff = cutoff;
        self
    }

    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.cutoff.is_some_and(|cutoff| today > cutoff)
    }

    fn url(&self, parameter: &str, coordinate: &Coordinate, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/{}T00:00:00Z--{}T00:00:00Z:P1D/{}/{:.4},{:.4}/json",
            self.base_url.trim_end_matches('/'),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            parameter,
            coordinate.latitude,
            coordinate.longitude,
        )
    }
}

#[must_use]
pub fn parameter(variable: ClimateVariable) -> &'static str {
    match variable {
        ClimateVariable::Temperature => "t_2m:C",
        ClimateVariable::Precipitation => "precip_24h:mm",
        ClimateVariable::WindSpeed => "wind_speed_10m:ms",
        ClimateVariable::Humidity => "relative_humidity_2m:p",
        ClimateVariable::AirQuality => "pm2p5:ugm3",
    }
}

impl Provider for MeteomaticsAdapter {
    fn name(&self) -> &str {
        NAME
    }
}

#[async_trait]
impl SourceAdapter for MeteomaticsAdapter {
    #[instrument(skip(self, query), fields(variable = %query.variable, lat = query.coordinate.latitude, lon = query.coordinate.longitude))]
    async fn fetch(&self, query: &SampleQuery) -> Result<Vec<HistoricalSample>, SourceError> {
        if self.is_expired(Utc::now().date_naive()) {
            return Err(SourceError::disabled("account cutoff date has passed"));
        }
        let Some((start, end)) = query.date_span() else {
            return Ok(Vec::new());
        };

        let url = self.url(parameter(query.variable), &query.coordinate, start, end);
        let request = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password));
        let response: MeteomaticsResponse = http::get_json(request).await?;
        Ok(query.samples_from_series(response.into_series(), NAME))
    }
}

#[derive(Debug, Deserialize)]
struct MeteomaticsResponse {
    #[serde(default)]
    data: Vec<ParameterSeries>,
}

#[derive(Debug, Deserialize)]
struct ParameterSeries {
    #[serde(default)]
    coordinates: Vec<CoordinateSeries>,
}

#[derive(Debug, Deserialize)]
struct CoordinateSeries {
    #[serde(default)]
    dates: Vec<DatedValue>,
}

#[derive(Debug, Deserialize)]
struct DatedValue {
    date: DateTime<Utc>,
    value: Option<f64>,
}

impl MeteomaticsResponse {
    fn into_series(self) -> Vec<(NaiveDate, f64)> {
        self.data
            .into_iter()
            .filter_map(|series| series.coordinates.into_iter().next())
            .flat_map(|coordinate| coordinate.dates)
            .filter_map(|entry| entry.value.map(|v| (entry.date.date_naive(), v)))
            .collect()
    }
}
