//! Data models for the Raincheck engine
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates, areas and their sample points
//! - Climate: variables, adverse conditions and thresholds
//! - Sample: historical samples and day-of-year windows
//! - Analysis: request and result shapes

pub mod analysis;
pub mod climate;
pub mod location;
pub mod sample;

// Re-export all public types for convenient access
pub use analysis::{
    AlternativeDateEntry, AnalysisMetadata, AnalysisRequest, AnalysisResult, DataQuality,
    PolygonPoint, Recommendation, Trend, VariableStatistics,
};
pub use climate::{ClimateVariable, Condition, Direction, Threshold, Thresholds};
pub use location::{AreaSpec, Coordinate, Target};
pub use sample::{DayWindow, HistoricalSample, SampleQuery};
