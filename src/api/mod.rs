use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::{
    RaincheckConfig, RaincheckError, VERSION,
    analysis::AnalysisOrchestrator,
    geocoding::{GeocoderChain, Place},
    models::{AnalysisRequest, AnalysisResult, Coordinate},
    sources::{SourceChain, SourceInfo, http},
};

/// Shared, request-independent services
pub struct AppState {
    pub orchestrator: AnalysisOrchestrator,
    pub geocoders: GeocoderChain,
}

impl AppState {
    pub fn from_config(config: &RaincheckConfig) -> anyhow::Result<Self> {
        let chain = SourceChain::from_config(&config.sources)
            .with_context(|| "Failed to set up data sources")?;
        let client = http::build_client(&config.sources)?;
        Ok(Self {
            orchestrator: AnalysisOrchestrator::new(Arc::new(chain), &config.analysis),
            geocoders: GeocoderChain::with_client(&client),
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Deserialize)]
pub struct GeocodeParams {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ReverseGeocodeParams {
    pub latitude: f64,
    pub longitude: f64,
}

/// Engine error rendered as `{"detail": ...}`
pub struct ApiError(RaincheckError);

impl From<RaincheckError> for ApiError {
    fn from(err: RaincheckError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "analysis failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "detail": self.0.user_message() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .route("/data-sources", get(data_sources))
        .route("/geocode", get(geocode))
        .route("/reverse-geocode", get(reverse_geocode))
        .with_state(state)
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let result = state.orchestrator.analyze(&request).await?;
    Ok(Json(result))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

async fn data_sources(State(state): State<Arc<AppState>>) -> Json<Vec<SourceInfo>> {
    Json(state.orchestrator.sources())
}

async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<Vec<Place>>, ApiError> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(RaincheckError::invalid_request("Query parameter 'name' must not be empty").into());
    }
    Ok(Json(state.geocoders.search(name).await))
}

async fn reverse_geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseGeocodeParams>,
) -> Result<Json<Vec<Place>>, ApiError> {
    let coordinate = Coordinate::new(params.latitude, params.longitude);
    if !coordinate.is_valid() {
        return Err(RaincheckError::invalid_request("Coordinates out of range").into());
    }
    Ok(Json(state.geocoders.reverse(coordinate).await))
}
