//! Public entry point: validate a request, run the pipeline, assemble the result

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

use super::alternatives::{self, AlternativeDateSearch};
use super::pipeline::{Evaluation, Pipeline, Provenance};
use crate::config::AnalysisConfig;
use crate::models::{
    AnalysisMetadata, AnalysisRequest, AnalysisResult, ClimateVariable, Coordinate, DataQuality,
    Target, Thresholds,
};
use crate::sources::{SourceChain, SourceInfo, synthetic};
use crate::{RaincheckError, Result};

/// Largest accepted area radius, in kilometers
pub const MAX_RADIUS_KM: f64 = 500.0;

/// A request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub target: Target,
    pub event_date: NaiveDate,
    pub thresholds: Thresholds,
}

pub struct AnalysisOrchestrator {
    chain: Arc<SourceChain>,
    pipeline: Pipeline,
    search: AlternativeDateSearch,
    years_label: String,
}

impl AnalysisOrchestrator {
    #[must_use]
    pub fn new(chain: Arc<SourceChain>, config: &AnalysisConfig) -> Self {
        Self {
            pipeline: Pipeline::new(
                Arc::clone(&chain),
                config.window_days,
                config.start_year..=config.end_year,
            ),
            chain,
            search: AlternativeDateSearch::new(
                config.alternative_offsets.clone(),
                config.recommendation_margin,
            ),
            years_label: config.years_label(),
        }
    }

    /// The data-source chain in preference order
    #[must_use]
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.chain.describe()
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        self.analyze_at(request, Utc::now()).await
    }

    /// Same as [`analyze`](Self::analyze) with a fixed analysis timestamp
    #[instrument(skip(self, request), fields(lat = request.latitude, lon = request.longitude, date = %request.event_date))]
    pub async fn analyze_at(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Result<AnalysisResult> {
        let ValidatedRequest {
            target,
            event_date,
            thresholds,
        } = validate(request)?;
        info!(points = target.sample_points().len(), conditions = thresholds.len(), "starting analysis");

        let prefetched = self
            .pipeline
            .prefetch(&target, event_date, &thresholds, self.search.reach_days())
            .await?;
        let baseline = self
            .pipeline
            .evaluate_prefetched(&prefetched, event_date, &thresholds)?;
        let candidates = self
            .search
            .evaluate_candidates(&self.pipeline, &prefetched, event_date, &thresholds)?;

        let alternative_dates = self
            .search
            .rank(baseline.comfort_index, alternatives::candidates(&candidates));

        let evaluations: Vec<&Evaluation> = std::iter::once(&baseline)
            .chain(candidates.iter().map(|(_, evaluation)| evaluation))
            .collect();
        let metadata = self.metadata(&baseline, &evaluations, now);

        info!(
            comfort_index = baseline.comfort_index,
            datasets = ?metadata.datasets_used,
            "analysis complete"
        );

        Ok(AnalysisResult {
            location: target.center,
            event_date,
            comfort_index: baseline.comfort_index,
            probabilities: baseline.statistics,
            alternative_dates,
            metadata,
        })
    }

    fn metadata(&self, baseline: &Evaluation, evaluations: &[&Evaluation], now: DateTime<Utc>) -> AnalysisMetadata {
        let provenance: Vec<&Provenance> = evaluations
            .iter()
            .flat_map(|evaluation| evaluation.provenance.iter())
            .collect();

        let mut datasets_used: Vec<String> = Vec::new();
        for source in provenance.iter().flat_map(|p| p.sources.iter()) {
            if !datasets_used.contains(source) {
                datasets_used.push(source.clone());
            }
        }

        let mut synthetic_variables: Vec<ClimateVariable> = provenance
            .iter()
            .filter(|p| p.synthetic)
            .map(|p| p.variable)
            .collect();
        synthetic_variables.sort();
        synthetic_variables.dedup();

        let data_quality = if provenance.iter().all(|p| !p.synthetic) {
            DataQuality::Observed
        } else if provenance
            .iter()
            .all(|p| p.sources.iter().all(|s| s == synthetic::NAME))
        {
            DataQuality::Synthetic
        } else {
            DataQuality::Mixed
        };

        let confidence = if baseline.statistics.is_empty() {
            0.0
        } else {
            baseline.statistics.iter().map(|s| s.confidence).sum::<f64>()
                / baseline.statistics.len() as f64
        };

        let years_analyzed = match baseline.years_covered {
            Some((first, last)) => format!("{first}-{last}"),
            None => self.years_label.clone(),
        };

        AnalysisMetadata {
            datasets_used,
            years_analyzed,
            analysis_date: now,
            confidence_level: format!("{:.0}%", confidence * 100.0),
            data_window: format!("±{} days", self.pipeline.window_days()),
            data_quality,
            synthetic_variables,
        }
    }
}

/// Reject malformed requests before any source is contacted
pub fn validate(request: &AnalysisRequest) -> Result<ValidatedRequest> {
    let center = Coordinate::new(request.latitude, request.longitude);
    if !request.latitude.is_finite() || !(-90.0..=90.0).contains(&request.latitude) {
        return Err(RaincheckError::invalid_request(
            "Latitude must be between -90 and 90",
        ));
    }
    if !request.longitude.is_finite() || !(-180.0..=180.0).contains(&request.longitude) {
        return Err(RaincheckError::invalid_request(
            "Longitude must be between -180 and 180",
        ));
    }

    let event_date = NaiveDate::parse_from_str(request.event_date.trim(), "%Y-%m-%d").map_err(|_| {
        RaincheckError::invalid_request(format!(
            "Invalid event_date '{}', expected YYYY-MM-DD",
            request.event_date
        ))
    })?;

    if let Some(radius_km) = request.area_radius_km {
        if !radius_km.is_finite() || !(0.0..=MAX_RADIUS_KM).contains(&radius_km) {
            return Err(RaincheckError::invalid_request(format!(
                "area_radius_km must be between 0 and {MAX_RADIUS_KM}"
            )));
        }
    }

    let target = match (&request.polygon, request.area_radius_km) {
        (Some(polygon), _) => {
            if polygon.len() < 3 {
                return Err(RaincheckError::invalid_request(
                    "Polygon must have at least 3 vertices",
                ));
            }
            let vertices: Vec<Coordinate> = polygon.iter().copied().map(Coordinate::from).collect();
            if let Some(bad) = vertices.iter().find(|v| !v.is_valid()) {
                return Err(RaincheckError::invalid_request(format!(
                    "Polygon vertex ({}) is out of range",
                    bad.format_coordinates()
                )));
            }
            let target = Target::polygon(vertices);
            if target.extent_km() > MAX_RADIUS_KM {
                return Err(RaincheckError::invalid_request(format!(
                    "Polygon must lie within {MAX_RADIUS_KM} km of its center"
                )));
            }
            target
        }
        (None, Some(radius_km)) => {
            if radius_km == 0.0 {
                Target::point(center)
            } else {
                Target::circle(center, radius_km)
            }
        }
        (None, None) => Target::point(center),
    };

    let thresholds = Thresholds::from_request(&request.thresholds)?;

    Ok(ValidatedRequest {
        target,
        event_date,
        thresholds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaSpec, PolygonPoint};
    use rstest::rstest;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(28.61, 77.21, "2025-07-04")
    }

    #[rstest]
    #[case(91.0, 0.0)]
    #[case(-90.5, 0.0)]
    #[case(0.0, 180.5)]
    #[case(f64::NAN, 0.0)]
    fn test_out_of_range_coordinates_rejected(#[case] lat: f64, #[case] lon: f64) {
        let result = validate(&AnalysisRequest::new(lat, lon, "2025-07-04"));
        assert!(matches!(result, Err(RaincheckError::InvalidRequest { .. })));
    }

    #[rstest]
    #[case("2025-13-01")]
    #[case("04/07/2025")]
    #[case("")]
    fn test_bad_dates_rejected(#[case] date: &str) {
        let result = validate(&AnalysisRequest::new(10.0, 10.0, date));
        assert!(matches!(result, Err(RaincheckError::InvalidRequest { .. })));
    }

    #[test]
    fn test_two_point_polygon_rejected() {
        let mut req = request();
        req.polygon = Some(vec![
            PolygonPoint { lat: 28.0, lng: 77.0 },
            PolygonPoint { lat: 29.0, lng: 77.5 },
        ]);
        let err = validate(&req).unwrap_err();
        assert!(err.user_message().contains("at least 3"));
    }

    #[test]
    fn test_polygon_wins_over_radius() {
        let mut req = request();
        req.area_radius_km = Some(50.0);
        req.polygon = Some(vec![
            PolygonPoint { lat: 28.0, lng: 77.0 },
            PolygonPoint { lat: 29.0, lng: 77.0 },
            PolygonPoint { lat: 29.0, lng: 78.0 },
        ]);
        let validated = validate(&req).unwrap();
        assert!(matches!(validated.target.area, Some(AreaSpec::Polygon { .. })));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(500.1)]
    #[case(f64::INFINITY)]
    fn test_bad_radius_rejected(#[case] radius: f64) {
        let mut req = request();
        req.area_radius_km = Some(radius);
        assert!(validate(&req).is_err());
    }

    #[rstest]
    #[case(-5.0)]
    #[case(f64::NAN)]
    fn test_bad_radius_rejected_alongside_polygon(#[case] radius: f64) {
        let mut req = request();
        req.area_radius_km = Some(radius);
        req.polygon = Some(vec![
            PolygonPoint { lat: 28.0, lng: 77.0 },
            PolygonPoint { lat: 29.0, lng: 77.0 },
            PolygonPoint { lat: 29.0, lng: 78.0 },
        ]);
        let err = validate(&req).unwrap_err();
        assert!(err.user_message().contains("area_radius_km"));
    }

    #[test]
    fn test_oversized_polygon_rejected() {
        let mut req = request();
        req.polygon = Some(vec![
            PolygonPoint { lat: 10.0, lng: 70.0 },
            PolygonPoint { lat: 30.0, lng: 70.0 },
            PolygonPoint { lat: 30.0, lng: 90.0 },
        ]);
        let err = validate(&req).unwrap_err();
        assert!(err.user_message().contains("km of its center"));
    }

    #[test]
    fn test_zero_radius_is_point() {
        let mut req = request();
        req.area_radius_km = Some(0.0);
        assert_eq!(validate(&req).unwrap().target.area, None);
    }

    #[tokio::test]
    async fn test_offline_analysis_reports_synthetic() {
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(SourceChain::offline()), &AnalysisConfig::default());
        let result = orchestrator.analyze(&request()).await.unwrap();

        assert_eq!(result.metadata.datasets_used, vec!["Synthetic"]);
        assert_eq!(result.metadata.data_quality, DataQuality::Synthetic);
        assert_eq!(result.metadata.years_analyzed, "1990-2024");
        assert_eq!(result.metadata.data_window, "±7 days");
        assert!(result.metadata.confidence_level.ends_with('%'));
        assert_eq!(result.probabilities.len(), 4);
        assert_eq!(result.alternative_dates.len(), 6);
    }
}
