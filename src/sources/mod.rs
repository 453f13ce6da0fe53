//! Historical weather data sources
//!
//! Every provider sits behind [`SourceAdapter`]. [`SourceChain`] tries the
//! configured adapters in preference order and bottoms out in the
//! deterministic [`SyntheticGenerator`].

pub mod chain;
pub mod error;
pub mod http;
pub mod meteomatics;
pub mod power;
pub mod synthetic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use chain::{SourceChain, SourcedSamples};
pub use error::SourceError;
pub use meteomatics::MeteomaticsAdapter;
pub use power::PowerAdapter;
pub use synthetic::SyntheticGenerator;

use crate::fallback::Provider;
use crate::models::{HistoricalSample, SampleQuery};

/// Uniform interface to one historical-data provider
#[async_trait]
pub trait SourceAdapter: Provider {
    /// Daily samples for every window date of the query's years.
    ///
    /// Returning an empty list is allowed and means "nothing here".
    async fn fetch(&self, query: &SampleQuery) -> Result<Vec<HistoricalSample>, SourceError>;
}

/// Whether a source reports measurements or invented values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Observed,
    Synthetic,
}

/// Description of one entry of the configured chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: SourceKind,
    pub enabled: bool,
}
