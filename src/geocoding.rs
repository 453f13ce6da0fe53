//! Place search and reverse geocoding through a fallback chain of geocoders

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::fallback::{Fallback, Provider};
use crate::models::Coordinate;
use crate::sources::{SourceError, http};

const OPEN_METEO_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const MAX_RESULTS: usize = 5;

/// A named location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
}

#[async_trait]
pub trait Geocoder: Provider {
    async fn search(&self, name: &str) -> Result<Vec<Place>, SourceError>;

    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<Place>, SourceError>;
}

/// Open-Meteo geocoding API; forward search only
pub struct OpenMeteoGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OpenMeteoGeocoder {
    #[must_use]
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: OPEN_METEO_URL.to_string(),
        }
    }
}

impl Provider for OpenMeteoGeocoder {
    fn name(&self) -> &str {
        "Open-Meteo"
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn search(&self, name: &str) -> Result<Vec<Place>, SourceError> {
        let url = format!(
            "{}?name={}&count={MAX_RESULTS}&language=en&format=json",
            self.base_url,
            urlencoding::encode(name)
        );
        let response: openmeteo::SearchResponse = http::get_json(self.client.get(&url)).await?;
        Ok(response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(Place::from)
            .collect())
    }

    async fn reverse(&self, _coordinate: Coordinate) -> Result<Vec<Place>, SourceError> {
        Ok(Vec::new())
    }
}

/// OpenStreetMap Nominatim; requires an identifying User-Agent
pub struct NominatimGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NominatimGeocoder {
    #[must_use]
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: NOMINATIM_URL.to_string(),
        }
    }
}

impl Provider for NominatimGeocoder {
    fn name(&self) -> &str {
        "Nominatim"
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn search(&self, name: &str) -> Result<Vec<Place>, SourceError> {
        let url = format!(
            "{}/search?q={}&format=json&addressdetails=1&limit={MAX_RESULTS}",
            self.base_url,
            urlencoding::encode(name)
        );
        let results: Vec<nominatim::Place> = http::get_json(self.client.get(&url)).await?;
        Ok(results.into_iter().filter_map(nominatim::Place::into_place).collect())
    }

    #[instrument(skip(self))]
    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<Place>, SourceError> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1",
            self.base_url, coordinate.latitude, coordinate.longitude
        );
        let result: nominatim::Place = http::get_json(self.client.get(&url)).await?;
        Ok(result.into_place().into_iter().collect())
    }
}

/// Geocoders tried in order until one returns at least one place
pub struct GeocoderChain {
    geocoders: Fallback<Arc<dyn Geocoder>>,
}

impl GeocoderChain {
    #[must_use]
    pub fn new(geocoders: Vec<Arc<dyn Geocoder>>) -> Self {
        Self {
            geocoders: Fallback::new("geocoder", geocoders),
        }
    }

    /// Open-Meteo first, then Nominatim
    #[must_use]
    pub fn with_client(client: &ClientWithMiddleware) -> Self {
        Self::new(vec![
            Arc::new(OpenMeteoGeocoder::new(client.clone())),
            Arc::new(NominatimGeocoder::new(client.clone())),
        ])
    }

    pub async fn search(&self, name: &str) -> Vec<Place> {
        self.geocoders
            .first_success(|geocoder| async move {
                geocoder.search(name).await.map(|places| (!places.is_empty()).then_some(places))
            })
            .await
            .map(|(_, places)| places)
            .unwrap_or_default()
    }

    pub async fn reverse(&self, coordinate: Coordinate) -> Vec<Place> {
        self.geocoders
            .first_success(|geocoder| async move {
                geocoder
                    .reverse(coordinate)
                    .await
                    .map(|places| (!places.is_empty()).then_some(places))
            })
            .await
            .map(|(_, places)| places)
            .unwrap_or_default()
    }
}

/// Open-Meteo geocoding response structures
mod openmeteo {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct SearchResponse {
        pub results: Option<Vec<SearchResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub country: Option<String>,
        pub admin1: Option<String>,
    }

    impl From<SearchResult> for super::Place {
        fn from(result: SearchResult) -> Self {
            let name = match result.admin1 {
                Some(region) if region != result.name => format!("{}, {region}", result.name),
                _ => result.name,
            };
            Self {
                name,
                latitude: result.latitude,
                longitude: result.longitude,
                country: result.country,
            }
        }
    }
}

/// Nominatim response structures; coordinates arrive as strings
mod nominatim {
    use super::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Place {
        pub display_name: Option<String>,
        pub lat: Option<String>,
        pub lon: Option<String>,
        pub address: Option<Address>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Address {
        pub country: Option<String>,
    }

    impl Place {
        pub fn into_place(self) -> Option<super::Place> {
            Some(super::Place {
                name: self.display_name?,
                latitude: self.lat?.parse().ok()?,
                longitude: self.lon?.parse().ok()?,
                country: self.address.and_then(|a| a.country),
            })
        }
    }
}
