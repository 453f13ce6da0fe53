//! Aggregate, analyse and score one target on one date

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::warn;

use super::{AggregatedSeries, ComfortScorer, VariableAnalyzer, WindowAggregator};
use crate::models::{ClimateVariable, DayWindow, HistoricalSample, Target, Thresholds, VariableStatistics};
use crate::sources::SourceChain;
use crate::{RaincheckError, Result};

/// Which sources a variable's samples came from
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub variable: ClimateVariable,
    pub sources: Vec<String>,
    pub synthetic: bool,
}

impl From<&AggregatedSeries> for Provenance {
    fn from(series: &AggregatedSeries) -> Self {
        Self {
            variable: series.variable,
            sources: series.sources.clone(),
            synthetic: series.synthetic,
        }
    }
}

/// Outcome of evaluating one date
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub date: NaiveDate,
    pub statistics: Vec<VariableStatistics>,
    pub comfort_index: u8,
    pub provenance: Vec<Provenance>,
    /// First and last nominal year of the analysed samples
    pub years_covered: Option<(i32, i32)>,
}

/// Series for every variable of a request, fetched once and sliced per date
#[derive(Debug, Clone, PartialEq)]
pub struct Prefetched {
    series: Vec<AggregatedSeries>,
}

impl Prefetched {
    #[must_use]
    pub fn series(&self, variable: ClimateVariable) -> Option<&AggregatedSeries> {
        self.series.iter().find(|s| s.variable == variable)
    }
}

pub struct Pipeline {
    aggregator: WindowAggregator,
    analyzer: VariableAnalyzer,
    window_days: u32,
    years: RangeInclusive<i32>,
}

impl Pipeline {
    #[must_use]
    pub fn new(chain: Arc<SourceChain>, window_days: u32, years: RangeInclusive<i32>) -> Self {
        Self {
            aggregator: WindowAggregator::new(chain),
            analyzer: VariableAnalyzer::new(window_days),
            window_days,
            years,
        }
    }

    #[must_use]
    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Fetch every needed variable once, concurrently, over a window wide
    /// enough to slice any date up to `reach_days` from `event_date`.
    pub async fn prefetch(
        &self,
        target: &Target,
        event_date: NaiveDate,
        thresholds: &Thresholds,
        reach_days: u32,
    ) -> Result<Prefetched> {
        let window = DayWindow::around(event_date, self.window_days);
        let (window, years) = if reach_days == 0 {
            (window, self.years.clone())
        } else {
            // Leap years move anchors by a day, and an offset across New Year
            // lands in the neighbouring year group.
            (
                window.widened(reach_days.saturating_add(1)),
                (self.years.start() - 1)..=(self.years.end() + 1),
            )
        };

        let variables = thresholds.variables();
        let fetched = join_all(
            variables
                .iter()
                .map(|variable| self.aggregator.aggregate(*variable, target, window, years.clone())),
        )
        .await;
        let series = fetched.into_iter().collect::<Result<Vec<AggregatedSeries>>>()?;
        Ok(Prefetched { series })
    }

    /// Analyse and score one date from prefetched series.
    ///
    /// Conditions without samples are left out.
    pub fn evaluate_prefetched(
        &self,
        prefetched: &Prefetched,
        date: NaiveDate,
        thresholds: &Thresholds,
    ) -> Result<Evaluation> {
        let window = DayWindow::around(date, self.window_days);
        let mut provenance = Vec::new();
        let mut selected: HashMap<ClimateVariable, Vec<HistoricalSample>> = HashMap::new();
        for variable in thresholds.variables() {
            let Some(series) = prefetched.series(variable) else {
                continue;
            };
            provenance.push(Provenance::from(series));
            selected.insert(variable, window.select(self.years.clone(), &series.samples));
        }

        let mut statistics = Vec::with_capacity(thresholds.len());
        for threshold in thresholds.iter() {
            let Some(samples) = selected.get(&threshold.condition.variable()) else {
                continue;
            };
            match self.analyzer.analyze(threshold, samples) {
                Ok(stats) => statistics.push(stats),
                Err(RaincheckError::InsufficientData { condition }) => {
                    warn!(%condition, %date, "no samples, condition omitted");
                }
                Err(e) => return Err(e),
            }
        }

        let mut years = selected.values().flatten().map(|s| s.year);
        let years_covered = years
            .next()
            .map(|first| years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))));

        Ok(Evaluation {
            date,
            comfort_index: ComfortScorer::score(&statistics),
            statistics,
            provenance,
            years_covered,
        })
    }

    /// Fetch, analyse and score a single date
    pub async fn evaluate(&self, target: &Target, date: NaiveDate, thresholds: &Thresholds) -> Result<Evaluation> {
        let prefetched = self.prefetch(target, date, thresholds, 0).await?;
        self.evaluate_prefetched(&prefetched, date, thresholds)
    }
}
