//! Composite 0-100 comfort index

use crate::models::VariableStatistics;

pub struct ComfortScorer;

impl ComfortScorer {
    /// `round(100 * (1 - Σ w·p/100))` with weights re-normalised over the
    /// conditions present; no statistics means nothing adverse, i.e. 100.
    #[must_use]
    pub fn score(stats: &[VariableStatistics]) -> u8 {
        let weighted: Vec<(f64, f64)> = stats
            .iter()
            .map(|s| (s.condition.comfort_weight(), s.probability))
            .collect();

        let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
        if total_weight <= 0.0 {
            return 100;
        }

        let risk: f64 = weighted
            .iter()
            .map(|(w, p)| w / total_weight * p.clamp(0.0, 100.0) / 100.0)
            .sum();
        (100.0 * (1.0 - risk)).round().clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, Trend};
    use rstest::rstest;

    fn stat(condition: Condition, probability: f64) -> VariableStatistics {
        VariableStatistics {
            condition,
            variable: condition.variable(),
            probability,
            threshold_label: String::new(),
            trend: Trend::Stable,
            confidence: 0.5,
            historical_mean: 0.0,
            trend_slope: 0.0,
            p_value: 1.0,
            sample_count: 1,
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_empty_input_is_fully_comfortable() {
        assert_eq!(ComfortScorer::score(&[]), 100);
    }

    #[test]
    fn test_full_weight_table() {
        let stats = vec![
            stat(Condition::VeryHot, 50.0),
            stat(Condition::VeryCold, 0.0),
            stat(Condition::HeavyRain, 20.0),
            stat(Condition::StrongWind, 10.0),
            stat(Condition::PoorAirQuality, 0.0),
            stat(Condition::HighHumidity, 100.0),
        ];
        // 0.30*0.5 + 0.25*0.2 + 0.10*0.1 + 0.05*1.0 = 0.26
        assert_eq!(ComfortScorer::score(&stats), 74);
    }

    #[test]
    fn test_weights_renormalise_over_present_conditions() {
        // 0.30 and 0.25 re-normalised to 0.545 and 0.455
        let stats = vec![stat(Condition::VeryHot, 100.0), stat(Condition::HeavyRain, 0.0)];
        assert_eq!(ComfortScorer::score(&stats), 45);
    }

    #[rstest]
    #[case(0.0, 100)]
    #[case(100.0, 0)]
    #[case(33.3, 67)]
    fn test_single_condition(#[case] probability: f64, #[case] expected: u8) {
        assert_eq!(ComfortScorer::score(&[stat(Condition::StrongWind, probability)]), expected);
    }
}
