//! Request and response shapes of a weather risk analysis

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ClimateVariable, Condition, Coordinate};

/// Inbound analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// ISO date, e.g. `2025-07-04`
    pub event_date: String,
    #[serde(default)]
    pub thresholds: HashMap<String, f64>,
    #[serde(default)]
    pub area_radius_km: Option<f64>,
    #[serde(default)]
    pub polygon: Option<Vec<PolygonPoint>>,
}

impl AnalysisRequest {
    /// Point request with the default thresholds
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, event_date: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            event_date: event_date.into(),
            thresholds: HashMap::new(),
            area_radius_km: None,
            polygon: None,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, key: &str, value: f64) -> Self {
        self.thresholds.insert(key.to_string(), value);
        self
    }
}

/// Polygon vertex as sent by map clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonPoint {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

impl From<PolygonPoint> for Coordinate {
    fn from(point: PolygonPoint) -> Self {
        Coordinate::new(point.lat, point.lng)
    }
}

/// Direction of a fitted year-over-year trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Statistics for one condition over the aggregated samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableStatistics {
    /// Serialized as its label, e.g. "Very Hot"
    pub condition: Condition,
    pub variable: ClimateVariable,
    /// Share of samples on the adverse side of the threshold (0-100)
    pub probability: f64,
    /// Threshold label, e.g. ">32°C"
    #[serde(rename = "threshold")]
    pub threshold_label: String,
    pub trend: Trend,
    /// 0-1
    pub confidence: f64,
    pub historical_mean: f64,
    /// Units per year
    pub trend_slope: f64,
    pub p_value: f64,
    pub sample_count: usize,
    pub sources: Vec<String>,
}

/// How an alternative date compares to the requested one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Better,
    Monitor,
    Risky,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeDateEntry {
    pub date: NaiveDate,
    pub comfort_index: u8,
    pub offset_days: i64,
    pub recommendation: Recommendation,
}

/// Overall provenance of the data behind a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Observed,
    Mixed,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Sources that actually supplied data, "Synthetic" included when used
    pub datasets_used: Vec<String>,
    /// e.g. "1990-2024"
    pub years_analyzed: String,
    pub analysis_date: DateTime<Utc>,
    /// e.g. "72%"
    pub confidence_level: String,
    /// e.g. "±7 days"
    pub data_window: String,
    pub data_quality: DataQuality,
    /// Variables whose samples came from the synthetic generator
    pub synthetic_variables: Vec<ClimateVariable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub location: Coordinate,
    pub event_date: NaiveDate,
    pub comfort_index: u8,
    pub probabilities: Vec<VariableStatistics>,
    pub alternative_dates: Vec<AlternativeDateEntry>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Statistics entry for a condition, if it was analysed
    #[must_use]
    pub fn probability_for(&self, condition: Condition) -> Option<&VariableStatistics> {
        self.probabilities
            .iter()
            .find(|p| p.condition == condition)
    }
}
