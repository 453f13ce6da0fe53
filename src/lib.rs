//! Raincheck - historical weather risk analysis for planned outdoor events
//!
//! This library turns decades of daily weather observations around a
//! calendar day into threshold-exceedance probabilities, a composite comfort
//! index and ranked alternative dates, falling back through a chain of data
//! sources down to a deterministic synthetic generator.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geocoding;
pub mod models;
pub mod sources;
pub mod web;

// Re-export core types for public API
pub use analysis::{AnalysisOrchestrator, ComfortScorer, VariableAnalyzer, WindowAggregator};
pub use config::RaincheckConfig;
pub use error::RaincheckError;
pub use models::{AnalysisRequest, AnalysisResult, ClimateVariable, Coordinate, Target};
pub use sources::{SourceAdapter, SourceChain, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RaincheckError>;
