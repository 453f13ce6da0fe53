//! Exceedance probability, mean, trend and confidence for one condition
//!
//! Trend significance uses the ordinary least-squares slope of per-year means
//! against year with a two-sided Student-t test on `k - 2` degrees of freedom.

use std::collections::BTreeMap;

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::models::{HistoricalSample, Threshold, Trend, VariableStatistics};
use crate::{RaincheckError, Result};

/// p-value below which a slope counts as a trend
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Distinct years required before a slope is tested for significance
pub const MIN_TREND_YEARS: usize = 5;

const OBSERVED_CONFIDENCE_CEILING: f64 = 0.95;
const SYNTHETIC_CONFIDENCE_CEILING: f64 = 0.60;

/// Sample count at which confidence reaches ~63% of its ceiling
const CONFIDENCE_SCALE: f64 = 120.0;

/// Expected minimum history, in years of full windows
const MIN_HISTORY_YEARS: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct VariableAnalyzer {
    significance_level: f64,
    window_days: u32,
}

impl Default for VariableAnalyzer {
    fn default() -> Self {
        Self::new(7)
    }
}

/// Fitted slope of per-year means and its two-sided p-value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub p_value: f64,
}

impl VariableAnalyzer {
    /// Analyzer for samples drawn from a ±`window_days` window
    #[must_use]
    pub fn new(window_days: u32) -> Self {
        Self {
            significance_level: SIGNIFICANCE_LEVEL,
            window_days,
        }
    }

    #[must_use]
    pub fn with_significance_level(mut self, level: f64) -> Self {
        self.significance_level = level;
        self
    }

    pub fn analyze(&self, threshold: &Threshold, samples: &[HistoricalSample]) -> Result<VariableStatistics> {
        let condition = threshold.condition;
        if samples.is_empty() {
            return Err(RaincheckError::insufficient_data(condition.label()));
        }

        let n = samples.len() as f64;
        let mean = samples.iter().map(|s| s.value).sum::<f64>() / n;
        let violations = samples
            .iter()
            .filter(|s| threshold.is_violated_by(s.value))
            .count() as f64;
        let probability = round_to(violations / n * 100.0, 1).clamp(0.0, 100.0);

        let raw = fit_trend(&yearly_means(samples));
        let fit = TrendFit {
            slope: round_to(raw.slope, 4),
            p_value: round_to(raw.p_value, 4).clamp(0.0, 1.0),
        };
        let trend = self.classify(fit);

        let mut sources: Vec<String> = Vec::new();
        for source in samples.iter().flat_map(|s| s.source_id.split('+')) {
            if !sources.iter().any(|known| known == source) {
                sources.push(source.to_string());
            }
        }

        Ok(VariableStatistics {
            condition,
            variable: condition.variable(),
            probability,
            threshold_label: threshold.label(),
            trend,
            confidence: self.confidence(samples),
            historical_mean: round_to(mean, 2),
            trend_slope: fit.slope,
            p_value: fit.p_value,
            sample_count: samples.len(),
            sources,
        })
    }

    fn classify(&self, fit: TrendFit) -> Trend {
        if fit.p_value >= self.significance_level {
            Trend::Stable
        } else if fit.slope > 0.0 {
            Trend::Increasing
        } else if fit.slope < 0.0 {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    /// Grows with sample count, capped lower when any sample is synthetic
    fn confidence(&self, samples: &[HistoricalSample]) -> f64 {
        let n = samples.len() as f64;
        let ceiling = if samples.iter().any(|s| s.is_synthetic) {
            SYNTHETIC_CONFIDENCE_CEILING
        } else {
            OBSERVED_CONFIDENCE_CEILING
        };
        let expected = MIN_HISTORY_YEARS * f64::from(2 * self.window_days + 1);
        let coverage = (n / expected).min(1.0);
        round_to(ceiling * (1.0 - (-n / CONFIDENCE_SCALE).exp()) * coverage, 3).clamp(0.0, 1.0)
    }
}

fn yearly_means(samples: &[HistoricalSample]) -> Vec<(f64, f64)> {
    let mut years: BTreeMap<i32, (f64, u32)> = BTreeMap::new();
    for sample in samples {
        let entry = years.entry(sample.year).or_insert((0.0, 0));
        entry.0 += sample.value;
        entry.1 += 1;
    }
    years
        .into_iter()
        .map(|(year, (sum, count))| (f64::from(year), sum / f64::from(count)))
        .collect()
}

/// OLS fit of (year, mean) points.
///
/// Fewer than [`MIN_TREND_YEARS`] points keep the slope but report p = 1.
#[must_use]
pub fn fit_trend(points: &[(f64, f64)]) -> TrendFit {
    let k = points.len();
    if k < 2 {
        return TrendFit {
            slope: 0.0,
            p_value: 1.0,
        };
    }

    let kf = k as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / kf;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / kf;
    let sxx: f64 = points.iter().map(|(x, _)| (x - x_mean).powi(2)).sum();
    let sxy: f64 = points.iter().map(|(x, y)| (x - x_mean) * (y - y_mean)).sum();
    if sxx <= f64::EPSILON {
        return TrendFit {
            slope: 0.0,
            p_value: 1.0,
        };
    }

    let slope = sxy / sxx;
    if k < MIN_TREND_YEARS {
        return TrendFit { slope, p_value: 1.0 };
    }

    let intercept = y_mean - slope * x_mean;
    let sse: f64 = points
        .iter()
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();
    let df = kf - 2.0;
    let standard_error = (sse / df / sxx).sqrt();

    let p_value = if standard_error <= 1e-12 {
        if slope.abs() > 1e-12 { 0.0 } else { 1.0 }
    } else {
        let t = slope / standard_error;
        match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => 2.0 * dist.sf(t.abs()),
            Err(_) => 1.0,
        }
    };

    TrendFit {
        slope,
        p_value: if p_value.is_finite() { p_value.clamp(0.0, 1.0) } else { 1.0 },
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
