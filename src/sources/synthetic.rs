//! Deterministic synthetic stand-in for historical observations
//!
//! Used only after every real source failed. Values follow a simple
//! latitude/season heuristic, not real climatology, and every sample is
//! stamped `is_synthetic = true`.

use std::f64::consts::PI;

use chrono::Datelike;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::models::{ClimateVariable, Coordinate, HistoricalSample, SampleQuery};

pub const NAME: &str = "Synthetic";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Warming applied to synthetic temperatures, °C per year after 2000
const TEMPERATURE_TREND: f64 = 0.02;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticGenerator;

impl SyntheticGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Samples for every window date of every year, reproducible per query
    #[must_use]
    pub fn generate(&self, query: &SampleQuery) -> Vec<HistoricalSample> {
        let mut rng = StdRng::seed_from_u64(seed(query));
        let climate = LocalClimate::new(query.coordinate);

        query
            .years
            .clone()
            .flat_map(|year| {
                query
                    .window
                    .dates(year)
                    .into_iter()
                    .map(move |date| (year, date))
            })
            .map(|(year, date)| {
                let day_of_year = date.ordinal();
                let raw = climate.draw(query.variable, day_of_year, year, &mut rng);
                let (min, max) = query.variable.plausible_range();
                HistoricalSample {
                    variable: query.variable,
                    year,
                    date,
                    day_of_year,
                    value: raw.clamp(min, max),
                    source_id: NAME.to_string(),
                    is_synthetic: true,
                }
            })
            .collect()
    }
}

/// FNV-1a over variable, coordinate rounded to 0.01° and the window's day-of-year
fn seed(query: &SampleQuery) -> u64 {
    let (lat, lon) = query.coordinate.rounded_coordinates(2);
    let key = format!(
        "{}|{lat:.2}|{lon:.2}|{}",
        query.variable.as_str(),
        query.day_of_year()
    );
    key.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Location-dependent parameters of the heuristic
struct LocalClimate {
    abs_lat: f64,
    /// +1 north, -1 south; flips the seasonal cycle
    hemisphere: f64,
    tropical: bool,
    urban: bool,
}

impl LocalClimate {
    fn new(coordinate: Coordinate) -> Self {
        let abs_lat = coordinate.latitude.abs();
        Self {
            abs_lat,
            hemisphere: if coordinate.latitude >= 0.0 { 1.0 } else { -1.0 },
            tropical: abs_lat < 30.0,
            urban: abs_lat < 40.0 && coordinate.longitude.abs() < 100.0,
        }
    }

    /// +1 at local midsummer, -1 at local midwinter
    fn summer(&self, day_of_year: u32) -> f64 {
        self.hemisphere * (2.0 * PI * (f64::from(day_of_year) - 200.0) / 365.0).cos()
    }

    fn draw(&self, variable: ClimateVariable, day_of_year: u32, year: i32, rng: &mut StdRng) -> f64 {
        match variable {
            ClimateVariable::Temperature => {
                let base = 30.0 - 0.45 * self.abs_lat;
                let amplitude = (0.3 * self.abs_lat).min(18.0);
                let trend = TEMPERATURE_TREND * f64::from(year - 2000);
                base + amplitude * self.summer(day_of_year) + trend + normal(rng, 0.0, 3.0)
            }
            ClimateVariable::Precipitation => {
                let mut monsoon = 1.0 + (2.0 * PI * (f64::from(day_of_year) - 150.0) / 365.0).sin();
                if self.tropical {
                    monsoon *= 1.6;
                }
                let wet_probability = (0.2 * monsoon).clamp(0.03, 0.85);
                if rng.random::<f64>() < wet_probability {
                    let mean = if self.tropical { 9.0 } else { 6.0 };
                    exponential(rng, mean)
                } else {
                    0.0
                }
            }
            ClimateVariable::WindSpeed => {
                let winter_boost = 1.0 - 0.3 * self.summer(day_of_year);
                let latitude_boost = if self.abs_lat > 45.0 { 1.4 } else { 1.0 };
                // gamma(2, 2) as the sum of two exponentials
                (exponential(rng, 2.0) + exponential(rng, 2.0)) * winter_boost * latitude_boost
            }
            ClimateVariable::Humidity => {
                let base = if self.tropical { 72.0 } else { 62.0 };
                let wet_season = 8.0 * (2.0 * PI * (f64::from(day_of_year) - 150.0) / 365.0).sin();
                (base + wet_season + normal(rng, 0.0, 8.0)).clamp(5.0, 100.0)
            }
            ClimateVariable::AirQuality => {
                let urban_factor = if self.urban { 1.5 } else { 1.0 };
                let winter_factor = 1.0 - 0.3 * self.summer(day_of_year);
                let base = exponential(rng, 8.0) + exponential(rng, 4.0);
                (base * urban_factor * winter_factor).max(5.0)
            }
        }
    }
}

/// Box-Muller normal draw
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn exponential(rng: &mut StdRng, mean: f64) -> f64 {
    let u: f64 = rng.random();
    -mean * (1.0 - u).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayWindow;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn query(variable: ClimateVariable, lat: f64, lon: f64, month: u32, day: u32) -> SampleQuery {
        SampleQuery::new(
            variable,
            Coordinate::new(lat, lon),
            DayWindow::around(NaiveDate::from_ymd_opt(2025, month, day).unwrap(), 7),
            1990..=2024,
        )
    }

    fn mean(samples: &[HistoricalSample]) -> f64 {
        samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64
    }

    #[test]
    fn test_generation_is_deterministic() {
        let q = query(ClimateVariable::Temperature, 28.61, 77.21, 7, 4);
        let first = SyntheticGenerator::new().generate(&q);
        let second = SyntheticGenerator::new().generate(&q);
        assert_eq!(first, second);
        assert_eq!(first.len(), 35 * 15);
    }

    #[test]
    fn test_samples_are_flagged_synthetic() {
        let samples =
            SyntheticGenerator::new().generate(&query(ClimateVariable::WindSpeed, 52.5, 13.4, 1, 15));
        assert!(
            samples
                .iter()
                .all(|s| s.is_synthetic && s.source_id == NAME)
        );
    }

    #[test]
    fn test_variables_get_distinct_seeds() {
        let a = seed(&query(ClimateVariable::Temperature, 10.0, 10.0, 3, 1));
        let b = seed(&query(ClimateVariable::Humidity, 10.0, 10.0, 3, 1));
        let c = seed(&query(ClimateVariable::Temperature, 10.0, 10.0, 3, 2));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_equator_warmer_than_high_latitude_in_july() {
        let generator = SyntheticGenerator::new();
        let tropics = generator.generate(&query(ClimateVariable::Temperature, 5.0, 20.0, 7, 4));
        let arctic = generator.generate(&query(ClimateVariable::Temperature, 70.0, 20.0, 7, 4));
        assert!(mean(&tropics) > mean(&arctic));
    }

    #[test]
    fn test_southern_hemisphere_seasons_are_flipped() {
        let generator = SyntheticGenerator::new();
        let july = generator.generate(&query(ClimateVariable::Temperature, -40.0, 145.0, 7, 4));
        let january = generator.generate(&query(ClimateVariable::Temperature, -40.0, 145.0, 1, 15));
        assert!(mean(&january) > mean(&july));
    }

    #[rstest]
    #[case(ClimateVariable::Temperature)]
    #[case(ClimateVariable::Precipitation)]
    #[case(ClimateVariable::WindSpeed)]
    #[case(ClimateVariable::Humidity)]
    #[case(ClimateVariable::AirQuality)]
    fn test_values_are_plausible(#[case] variable: ClimateVariable) {
        let samples = SyntheticGenerator::new().generate(&query(variable, -33.9, 18.4, 12, 30));
        assert!(!samples.is_empty());
        assert!(samples.iter().all(|s| variable.is_plausible(s.value)));
    }

    #[test]
    fn test_air_quality_floor() {
        let samples =
            SyntheticGenerator::new().generate(&query(ClimateVariable::AirQuality, 28.61, 77.21, 11, 1));
        assert!(samples.iter().all(|s| s.value >= 5.0));
    }
}
