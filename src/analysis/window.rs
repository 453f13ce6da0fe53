//! Day-of-year window aggregation over a point or an area

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use tracing::debug;

use crate::Result;
use crate::models::{ClimateVariable, DayWindow, HistoricalSample, SampleQuery, Target};
use crate::sources::{SourceChain, SourcedSamples};

/// Pooled samples for one variable and where they came from
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSeries {
    pub variable: ClimateVariable,
    pub samples: Vec<HistoricalSample>,
    /// Distinct sources that supplied data, in sample-point order
    pub sources: Vec<String>,
    /// Whether any sample point fell back to synthetic data
    pub synthetic: bool,
}

pub struct WindowAggregator {
    chain: Arc<SourceChain>,
}

impl WindowAggregator {
    #[must_use]
    pub fn new(chain: Arc<SourceChain>) -> Self {
        Self { chain }
    }

    /// Collect every day of `window` for each year, averaged across the
    /// target's sample points.
    pub async fn aggregate(
        &self,
        variable: ClimateVariable,
        target: &Target,
        window: DayWindow,
        years: RangeInclusive<i32>,
    ) -> Result<AggregatedSeries> {
        let queries: Vec<SampleQuery> = target
            .sample_points()
            .into_iter()
            .map(|point| SampleQuery::new(variable, point, window, years.clone()))
            .collect();

        let fetched = join_all(queries.iter().map(|query| self.chain.fetch(query))).await;
        let sourced = fetched.into_iter().collect::<Result<Vec<SourcedSamples>>>()?;

        debug!(
            %variable,
            points = sourced.len(),
            "aggregated window samples"
        );
        Ok(pool_points(variable, sourced))
    }
}

/// Average per (nominal year, date) across sample points
fn pool_points(variable: ClimateVariable, sourced: Vec<SourcedSamples>) -> AggregatedSeries {
    let mut sources: Vec<String> = Vec::new();
    for point in &sourced {
        if !sources.contains(&point.source) {
            sources.push(point.source.clone());
        }
    }
    let synthetic = sourced.iter().any(|point| point.synthetic);

    if sourced.len() == 1 {
        let samples = sourced.into_iter().flat_map(|point| point.samples).collect();
        return AggregatedSeries {
            variable,
            samples,
            sources,
            synthetic,
        };
    }

    struct Accumulator {
        sum: f64,
        count: u32,
        synthetic: bool,
        sources: Vec<String>,
    }

    let mut order: Vec<(i32, NaiveDate)> = Vec::new();
    let mut days: HashMap<(i32, NaiveDate), Accumulator> = HashMap::new();
    for sample in sourced.iter().flat_map(|point| &point.samples) {
        let key = (sample.year, sample.date);
        let acc = days.entry(key).or_insert_with(|| {
            order.push(key);
            Accumulator {
                sum: 0.0,
                count: 0,
                synthetic: false,
                sources: Vec::new(),
            }
        });
        acc.sum += sample.value;
        acc.count += 1;
        acc.synthetic |= sample.is_synthetic;
        if !acc.sources.contains(&sample.source_id) {
            acc.sources.push(sample.source_id.clone());
        }
    }

    let samples = order
        .into_iter()
        .filter_map(|key| {
            let acc = days.remove(&key)?;
            Some(HistoricalSample {
                variable,
                year: key.0,
                date: key.1,
                day_of_year: key.1.ordinal(),
                value: acc.sum / f64::from(acc.count),
                source_id: acc.sources.join("+"),
                is_synthetic: acc.synthetic,
            })
        })
        .collect();

    AggregatedSeries {
        variable,
        samples,
        sources,
        synthetic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn sample(year: i32, day_of_year: u32, value: f64, source: &str) -> HistoricalSample {
        HistoricalSample {
            variable: ClimateVariable::WindSpeed,
            year,
            date: NaiveDate::from_yo_opt(year, day_of_year).unwrap(),
            day_of_year,
            value,
            source_id: source.to_string(),
            is_synthetic: source == "Synthetic",
        }
    }

    fn sourced(source: &str, samples: Vec<HistoricalSample>) -> SourcedSamples {
        SourcedSamples {
            samples,
            source: source.to_string(),
            synthetic: source == "Synthetic",
        }
    }

    #[test]
    fn test_single_point_passes_samples_through() {
        let series = pool_points(
            ClimateVariable::WindSpeed,
            vec![sourced("NASA POWER", vec![sample(2000, 185, 4.0, "NASA POWER")])],
        );
        assert_eq!(series.samples.len(), 1);
        assert_eq!(series.sources, vec!["NASA POWER"]);
        assert!(!series.synthetic);
    }

    #[test]
    fn test_points_are_averaged_per_day() {
        let series = pool_points(
            ClimateVariable::WindSpeed,
            vec![
                sourced(
                    "NASA POWER",
                    vec![sample(2000, 185, 4.0, "NASA POWER"), sample(2000, 186, 6.0, "NASA POWER")],
                ),
                sourced("Synthetic", vec![sample(2000, 185, 8.0, "Synthetic")]),
            ],
        );

        assert_eq!(series.samples.len(), 2);
        assert_eq!(series.samples[0].value, 6.0);
        assert_eq!(series.samples[0].source_id, "NASA POWER+Synthetic");
        assert!(series.samples[0].is_synthetic);
        assert_eq!(series.samples[1].value, 6.0);
        assert!(!series.samples[1].is_synthetic);
        assert_eq!(series.sources, vec!["NASA POWER", "Synthetic"]);
        assert!(series.synthetic);
    }

    #[tokio::test]
    async fn test_circle_target_offline_is_averaged() {
        let aggregator = WindowAggregator::new(Arc::new(SourceChain::offline()));
        let target = Target::circle(Coordinate::new(48.85, 2.35), 30.0);
        let event = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let series = aggregator
            .aggregate(
                ClimateVariable::Temperature,
                &target,
                DayWindow::around(event, 3),
                2015..=2024,
            )
            .await
            .unwrap();

        assert_eq!(series.samples.len(), 10 * 7);
        assert_eq!(series.sources, vec!["Synthetic"]);
        assert!(series.synthetic);
        assert!(series.samples.iter().all(|s| s.source_id == "Synthetic"));
    }
}
