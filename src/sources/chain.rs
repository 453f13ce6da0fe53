//! Preference-ordered source chain with a synthetic last resort

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{
    MeteomaticsAdapter, PowerAdapter, SourceAdapter, SourceError, SourceInfo, SourceKind,
    SyntheticGenerator, http, meteomatics, power, synthetic,
};
use crate::config::SourcesConfig;
use crate::fallback::{Fallback, Provider};
use crate::models::{HistoricalSample, SampleQuery};
use crate::{RaincheckError, Result};

/// Samples for one query together with their provenance
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedSamples {
    pub samples: Vec<HistoricalSample>,
    /// Name of the single source that supplied every sample
    pub source: String,
    pub synthetic: bool,
}

pub struct SourceChain {
    adapters: Fallback<Arc<dyn SourceAdapter>>,
    synthetic: SyntheticGenerator,
    timeout: Duration,
    /// Caps adapter calls in flight, shared by every request using the chain
    permits: Semaphore,
    /// Known sources left out of the chain, reported as disabled
    inactive: Vec<String>,
}

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

impl SourceChain {
    /// Chain over `adapters` in the given order; each call is bounded by `timeout`
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, timeout: Duration) -> Self {
        Self {
            adapters: Fallback::new("source", adapters),
            synthetic: SyntheticGenerator::new(),
            timeout,
            permits: Semaphore::new(DEFAULT_MAX_CONCURRENT_FETCHES),
            inactive: Vec::new(),
        }
    }

    /// Allow at most `limit` adapter calls in flight at once
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.permits = Semaphore::new(limit.max(1));
        self
    }

    /// Chain that only ever uses the synthetic generator
    #[must_use]
    pub fn offline() -> Self {
        Self::new(Vec::new(), Duration::from_secs(1))
    }

    /// Meteomatics when credentials are configured, then NASA POWER when enabled
    pub fn from_config(config: &SourcesConfig) -> AnyResult<Self> {
        let client = http::build_client(config)?;
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        let mut inactive = Vec::new();

        match config.meteomatics.credentials() {
            Some((username, password)) => adapters.push(Arc::new(
                MeteomaticsAdapter::new(
                    client.clone(),
                    config.meteomatics.base_url.clone(),
                    username,
                    password,
                )
                .with_cutoff(config.meteomatics.cutoff),
            )),
            None => inactive.push(meteomatics::NAME.to_string()),
        }

        if config.power.enabled {
            adapters.push(Arc::new(PowerAdapter::new(
                client,
                config.power.base_url.clone(),
            )));
        } else {
            inactive.push(power::NAME.to_string());
        }

        let mut chain = Self::new(adapters, config.fetch_timeout())
            .with_max_concurrent_fetches(config.max_concurrent_fetches);
        chain.inactive = inactive;
        Ok(chain)
    }

    /// The chain in preference order, synthetic generator last
    #[must_use]
    pub fn describe(&self) -> Vec<SourceInfo> {
        let active = self.adapters.providers().iter().map(|a| SourceInfo {
            name: a.name().to_string(),
            kind: SourceKind::Observed,
            enabled: true,
        });
        let inactive = self.inactive.iter().map(|name| SourceInfo {
            name: name.clone(),
            kind: SourceKind::Observed,
            enabled: false,
        });
        active
            .chain(inactive)
            .chain(std::iter::once(SourceInfo {
                name: synthetic::NAME.to_string(),
                kind: SourceKind::Synthetic,
                enabled: true,
            }))
            .collect()
    }

    /// Samples from the first source with plausible data, else synthetic ones.
    ///
    /// Source failures never surface; only an empty synthetic series is an error.
    pub async fn fetch(&self, query: &SampleQuery) -> Result<SourcedSamples> {
        let timeout = self.timeout;
        let permits = &self.permits;
        let accepted = self
            .adapters
            .first_success(|adapter| async move {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|_| SourceError::disabled("source chain shut down"))?;
                let samples = tokio::time::timeout(timeout, adapter.fetch(query))
                    .await
                    .map_err(|_| SourceError::Timeout {
                        seconds: timeout.as_secs(),
                    })??;
                let fetched = samples.len();
                let plausible: Vec<HistoricalSample> = samples
                    .into_iter()
                    .filter(|s| s.variable == query.variable && query.variable.is_plausible(s.value))
                    .collect();
                if plausible.len() < fetched {
                    debug!(
                        source = adapter.name(),
                        dropped = fetched - plausible.len(),
                        "dropped implausible samples"
                    );
                }
                Ok::<_, SourceError>((!plausible.is_empty()).then_some(plausible))
            })
            .await;

        if let Some((adapter, samples)) = accepted {
            return Ok(SourcedSamples {
                samples,
                source: adapter.name().to_string(),
                synthetic: false,
            });
        }

        if !self.adapters.is_empty() {
            warn!(
                variable = %query.variable,
                lat = query.coordinate.latitude,
                lon = query.coordinate.longitude,
                "all sources unavailable, using synthetic data"
            );
        }
        let samples = self.synthetic.generate(query);
        if samples.is_empty() {
            return Err(RaincheckError::engine_invariant(format!(
                "synthetic generator produced no {} samples",
                query.variable
            )));
        }
        Ok(SourcedSamples {
            samples,
            source: synthetic::NAME.to_string(),
            synthetic: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClimateVariable, Coordinate, DayWindow};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct Failing;

    impl Provider for Failing {
        fn name(&self) -> &str {
            "Failing"
        }
    }

    #[async_trait]
    impl SourceAdapter for Failing {
        async fn fetch(&self, _query: &SampleQuery) -> std::result::Result<Vec<HistoricalSample>, SourceError> {
            Err(SourceError::Http { status: 503 })
        }
    }

    struct Slow;

    impl Provider for Slow {
        fn name(&self) -> &str {
            "Slow"
        }
    }

    #[async_trait]
    impl SourceAdapter for Slow {
        async fn fetch(&self, query: &SampleQuery) -> std::result::Result<Vec<HistoricalSample>, SourceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Fixed("Slow", 20.0).samples(query))
        }
    }

    /// Returns the same value for every window date
    struct Fixed(&'static str, f64);

    impl Fixed {
        fn samples(&self, query: &SampleQuery) -> Vec<HistoricalSample> {
            let series = query
                .years
                .clone()
                .flat_map(|year| query.window.dates(year))
                .map(|date| (date, self.1));
            query.samples_from_series(series, self.0)
        }
    }

    impl Provider for Fixed {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[async_trait]
    impl SourceAdapter for Fixed {
        async fn fetch(&self, query: &SampleQuery) -> std::result::Result<Vec<HistoricalSample>, SourceError> {
            Ok(self.samples(query))
        }
    }

    fn query() -> SampleQuery {
        SampleQuery::new(
            ClimateVariable::Temperature,
            Coordinate::new(28.61, 77.21),
            DayWindow::around(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(), 2),
            2020..=2024,
        )
    }

    #[tokio::test]
    async fn test_first_plausible_source_wins() {
        let chain = SourceChain::new(
            vec![
                Arc::new(Failing),
                Arc::new(Fixed("Implausible", 500.0)),
                Arc::new(Fixed("Good", 25.0)),
                Arc::new(Fixed("Unused", 30.0)),
            ],
            Duration::from_secs(5),
        );
        let sourced = chain.fetch(&query()).await.unwrap();

        assert_eq!(sourced.source, "Good");
        assert!(!sourced.synthetic);
        assert_eq!(sourced.samples.len(), 5 * 5);
        assert!(sourced.samples.iter().all(|s| s.source_id == "Good" && s.value == 25.0));
    }

    #[tokio::test]
    async fn test_timeout_falls_through() {
        let chain = SourceChain::new(
            vec![Arc::new(Slow), Arc::new(Fixed("Fast", 18.0))],
            Duration::from_millis(50),
        );
        let sourced = chain.fetch(&query()).await.unwrap();
        assert_eq!(sourced.source, "Fast");
    }

    #[tokio::test]
    async fn test_all_failures_bottom_out_in_synthetic() {
        let chain = SourceChain::new(vec![Arc::new(Failing)], Duration::from_secs(5));
        let sourced = chain.fetch(&query()).await.unwrap();

        assert_eq!(sourced.source, "Synthetic");
        assert!(sourced.synthetic);
        assert!(sourced.samples.iter().all(|s| s.is_synthetic));
    }

    /// Records how many calls overlap
    #[derive(Default)]
    struct Counting {
        inflight: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    impl Provider for Counting {
        fn name(&self) -> &str {
            "Counting"
        }
    }

    #[async_trait]
    impl SourceAdapter for Counting {
        async fn fetch(&self, query: &SampleQuery) -> std::result::Result<Vec<HistoricalSample>, SourceError> {
            use std::sync::atomic::Ordering;
            let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            Ok(Fixed("Counting", 20.0).samples(query))
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_capped() {
        let counting = Arc::new(Counting::default());
        let adapter: Arc<dyn SourceAdapter> = counting.clone();
        let chain = SourceChain::new(vec![adapter], Duration::from_secs(5))
            .with_max_concurrent_fetches(2);
        let query = query();

        let results = futures::future::join_all((0..10).map(|_| chain.fetch(&query))).await;

        assert!(results.iter().all(|r| r.as_ref().is_ok_and(|s| s.source == "Counting")));
        assert!(counting.peak.load(std::sync::atomic::Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_describe_lists_synthetic_last() {
        let chain = SourceChain::new(vec![Arc::new(Fixed("Primary", 0.0))], Duration::from_secs(5));
        let names: Vec<String> = chain.describe().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Primary", "Synthetic"]);
    }

    #[test]
    fn test_from_config_without_credentials_skips_meteomatics() {
        let chain = SourceChain::from_config(&SourcesConfig::default()).unwrap();
        let sources = chain.describe();
        assert_eq!(sources[0].name, power::NAME);
        assert!(sources[0].enabled);
        assert!(
            sources
                .iter()
                .any(|s| s.name == meteomatics::NAME && !s.enabled)
        );
    }
}
