//! Ordered first-success fallback over a list of providers
//!
//! Both historical data sources and geocoders are tried in preference order
//! until one produces a usable answer. Errors and empty answers fall through
//! to the next provider and are only logged.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

/// Anything that can take part in a fallback chain
pub trait Provider: Send + Sync {
    /// Name reported in logs and provenance metadata
    fn name(&self) -> &str;
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Providers tried in order; the first non-empty success wins
#[derive(Debug, Clone)]
pub struct Fallback<T> {
    kind: &'static str,
    providers: Vec<T>,
}

impl<T: Provider> Fallback<T> {
    /// `kind` labels log lines, e.g. "source" or "geocoder"
    #[must_use]
    pub fn new(kind: &'static str, providers: Vec<T>) -> Self {
        Self { kind, providers }
    }

    #[must_use]
    pub fn providers(&self) -> &[T] {
        &self.providers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run `attempt` against each provider until one returns `Ok(Some(_))`.
    ///
    /// Returns the winning provider with its value, or `None` when every
    /// provider failed or had nothing.
    pub async fn first_success<'a, R, E, F, Fut>(&'a self, mut attempt: F) -> Option<(&'a T, R)>
    where
        F: FnMut(&'a T) -> Fut,
        Fut: Future<Output = Result<Option<R>, E>>,
        E: Display,
    {
        for provider in &self.providers {
            match attempt(provider).await {
                Ok(Some(value)) => {
                    debug!(kind = self.kind, provider = provider.name(), "provider succeeded");
                    return Some((provider, value));
                }
                Ok(None) => {
                    debug!(
                        kind = self.kind,
                        provider = provider.name(),
                        "provider had no usable data, trying next"
                    );
                }
                Err(e) => {
                    warn!(
                        kind = self.kind,
                        provider = provider.name(),
                        error = %e,
                        "provider failed, trying next"
                    );
                }
            }
        }
        None
    }
}
