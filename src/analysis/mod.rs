//! The weather risk analysis engine
//!
//! Control flow per request: [`AnalysisOrchestrator`] validates the request,
//! [`WindowAggregator`] pulls window samples through the source chain,
//! [`VariableAnalyzer`] derives per-condition statistics and
//! [`ComfortScorer`] folds them into one index. [`AlternativeDateSearch`]
//! repeats the same [`Pipeline`] for nearby dates.

pub mod alternatives;
pub mod comfort;
pub mod orchestrator;
pub mod pipeline;
pub mod statistics;
pub mod window;

pub use alternatives::{AlternativeDateSearch, Candidate};
pub use comfort::ComfortScorer;
pub use orchestrator::{AnalysisOrchestrator, ValidatedRequest, validate};
pub use pipeline::{Evaluation, Pipeline, Prefetched, Provenance};
pub use statistics::{MIN_TREND_YEARS, SIGNIFICANCE_LEVEL, TrendFit, VariableAnalyzer, fit_trend};
pub use window::{AggregatedSeries, WindowAggregator};
