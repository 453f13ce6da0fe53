//! Climate variables, adverse conditions and user thresholds

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RaincheckError;

/// A measured climate quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateVariable {
    Temperature,
    Precipitation,
    WindSpeed,
    Humidity,
    AirQuality,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 5] = [
        ClimateVariable::Temperature,
        ClimateVariable::Precipitation,
        ClimateVariable::WindSpeed,
        ClimateVariable::Humidity,
        ClimateVariable::AirQuality,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature => "temperature",
            ClimateVariable::Precipitation => "precipitation",
            ClimateVariable::WindSpeed => "wind_speed",
            ClimateVariable::Humidity => "humidity",
            ClimateVariable::AirQuality => "air_quality",
        }
    }

    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature => "°C",
            ClimateVariable::Precipitation => "mm",
            ClimateVariable::WindSpeed => "m/s",
            ClimateVariable::Humidity => "%",
            ClimateVariable::AirQuality => "μg/m³",
        }
    }

    /// Physically plausible value range for daily observations
    #[must_use]
    pub fn plausible_range(&self) -> (f64, f64) {
        match self {
            ClimateVariable::Temperature => (-90.0, 60.0),
            ClimateVariable::Precipitation => (0.0, 1000.0),
            ClimateVariable::WindSpeed => (0.0, 120.0),
            ClimateVariable::Humidity => (0.0, 100.0),
            ClimateVariable::AirQuality => (0.0, 2000.0),
        }
    }

    #[must_use]
    pub fn is_plausible(&self, value: f64) -> bool {
        let (min, max) = self.plausible_range();
        value.is_finite() && value >= min && value <= max
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a threshold counts as adverse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Above,
    Below,
}

/// An adverse weather condition evaluated against one threshold
///
/// Serialized as its response label, e.g. `"Very Hot"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "Very Hot")]
    VeryHot,
    #[serde(rename = "Very Cold")]
    VeryCold,
    #[serde(rename = "Heavy Rain")]
    HeavyRain,
    #[serde(rename = "Strong Wind")]
    StrongWind,
    #[serde(rename = "High Humidity")]
    HighHumidity,
    #[serde(rename = "Poor Air Quality")]
    PoorAirQuality,
}

impl Condition {
    #[must_use]
    pub fn variable(&self) -> ClimateVariable {
        match self {
            Condition::VeryHot | Condition::VeryCold => ClimateVariable::Temperature,
            Condition::HeavyRain => ClimateVariable::Precipitation,
            Condition::StrongWind => ClimateVariable::WindSpeed,
            Condition::HighHumidity => ClimateVariable::Humidity,
            Condition::PoorAirQuality => ClimateVariable::AirQuality,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Condition::VeryCold => Direction::Below,
            _ => Direction::Above,
        }
    }

    /// Human-readable label used in responses
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Condition::VeryHot => "Very Hot",
            Condition::VeryCold => "Very Cold",
            Condition::HeavyRain => "Heavy Rain",
            Condition::StrongWind => "Strong Wind",
            Condition::HighHumidity => "High Humidity",
            Condition::PoorAirQuality => "Poor Air Quality",
        }
    }

    /// Key used for this condition in a request's threshold map
    #[must_use]
    pub fn request_key(&self) -> &'static str {
        match self {
            Condition::VeryHot => "hot_temp",
            Condition::VeryCold => "cold_temp",
            Condition::HeavyRain => "precipitation",
            Condition::StrongWind => "wind_speed",
            Condition::HighHumidity => "humidity",
            Condition::PoorAirQuality => "air_quality",
        }
    }

    #[must_use]
    pub fn default_threshold(&self) -> f64 {
        match self {
            Condition::VeryHot => 32.0,
            Condition::VeryCold => 0.0,
            Condition::HeavyRain => 5.0,
            Condition::StrongWind => 15.0,
            Condition::HighHumidity => 85.0,
            Condition::PoorAirQuality => 25.0,
        }
    }

    /// Weight of this condition in the comfort index
    #[must_use]
    pub fn comfort_weight(&self) -> f64 {
        match self {
            Condition::VeryHot => 0.30,
            Condition::VeryCold => 0.20,
            Condition::HeavyRain => 0.25,
            Condition::StrongWind => 0.10,
            Condition::PoorAirQuality => 0.10,
            Condition::HighHumidity => 0.05,
        }
    }

    fn from_request_key(key: &str) -> Option<Self> {
        match key {
            "hot_temp" => Some(Condition::VeryHot),
            "cold_temp" => Some(Condition::VeryCold),
            "precipitation" => Some(Condition::HeavyRain),
            "wind_speed" => Some(Condition::StrongWind),
            "humidity" => Some(Condition::HighHumidity),
            "air_quality" => Some(Condition::PoorAirQuality),
            _ => None,
        }
    }

    /// Conditions evaluated for every request, at their defaults unless overridden
    pub const DEFAULT_SET: [Condition; 4] = [
        Condition::VeryHot,
        Condition::VeryCold,
        Condition::HeavyRain,
        Condition::StrongWind,
    ];

    /// Evaluation order within a response
    const ORDER: [Condition; 6] = [
        Condition::VeryHot,
        Condition::VeryCold,
        Condition::HeavyRain,
        Condition::StrongWind,
        Condition::PoorAirQuality,
        Condition::HighHumidity,
    ];
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A cutoff for one condition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub condition: Condition,
    pub value: f64,
}

impl Threshold {
    #[must_use]
    pub fn new(condition: Condition, value: f64) -> Self {
        Self { condition, value }
    }

    /// Whether a sample value is adverse for this threshold
    #[must_use]
    pub fn is_violated_by(&self, value: f64) -> bool {
        match self.condition.direction() {
            Direction::Above => value > self.value,
            Direction::Below => value < self.value,
        }
    }

    /// Label such as `>32°C` or `<0°C`
    #[must_use]
    pub fn label(&self) -> String {
        let sign = match self.condition.direction() {
            Direction::Above => '>',
            Direction::Below => '<',
        };
        format!("{sign}{}{}", self.value, self.condition.variable().unit())
    }
}

/// The ordered set of thresholds evaluated for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds(Vec<Threshold>);

impl Default for Thresholds {
    fn default() -> Self {
        Self(
            Condition::DEFAULT_SET
                .into_iter()
                .map(|c| Threshold::new(c, c.default_threshold()))
                .collect(),
        )
    }
}

impl Thresholds {
    /// Build thresholds from a request map.
    ///
    /// The default set is always evaluated, with request values overriding
    /// its cutoffs. Humidity and air quality are evaluated only when named.
    pub fn from_request(map: &HashMap<String, f64>) -> crate::Result<Self> {
        let mut requested: HashMap<Condition, f64> = Condition::DEFAULT_SET
            .into_iter()
            .map(|c| (c, c.default_threshold()))
            .collect();

        for (key, value) in map {
            let condition = Condition::from_request_key(key).ok_or_else(|| {
                RaincheckError::invalid_request(format!("Unknown threshold '{key}'"))
            })?;
            if !value.is_finite() {
                return Err(RaincheckError::invalid_request(format!(
                    "Threshold '{key}' must be a finite number"
                )));
            }
            requested.insert(condition, *value);
        }

        Ok(Self(
            Condition::ORDER
                .iter()
                .filter_map(|c| requested.get(c).map(|v| Threshold::new(*c, *v)))
                .collect(),
        ))
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Threshold> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct variables needed to evaluate these thresholds, in order
    #[must_use]
    pub fn variables(&self) -> Vec<ClimateVariable> {
        let mut variables = Vec::new();
        for threshold in &self.0 {
            let variable = threshold.condition.variable();
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        variables
    }
}

impl From<Vec<Threshold>> for Thresholds {
    fn from(thresholds: Vec<Threshold>) -> Self {
        Self(thresholds)
    }
}
