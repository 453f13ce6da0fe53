//! Nearby dates re-evaluated and ranked against the requested one

use chrono::{NaiveDate, TimeDelta};

use super::pipeline::{Evaluation, Pipeline, Prefetched};
use crate::Result;
use crate::models::{AlternativeDateEntry, Recommendation, Thresholds};

pub const DEFAULT_OFFSETS: [i64; 6] = [-7, -2, -1, 1, 2, 7];

/// Comfort points a candidate must differ by to be Better or Risky
pub const DEFAULT_MARGIN: u8 = 5;

/// A scored candidate date prior to classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub date: NaiveDate,
    pub offset_days: i64,
    pub comfort_index: u8,
}

#[derive(Debug, Clone)]
pub struct AlternativeDateSearch {
    offsets: Vec<i64>,
    margin: u8,
}

impl Default for AlternativeDateSearch {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSETS.to_vec(), DEFAULT_MARGIN)
    }
}

impl AlternativeDateSearch {
    /// Zero and repeated offsets are dropped
    #[must_use]
    pub fn new(offsets: Vec<i64>, margin: u8) -> Self {
        let mut unique = Vec::with_capacity(offsets.len());
        for offset in offsets {
            if offset != 0 && !unique.contains(&offset) {
                unique.push(offset);
            }
        }
        Self {
            offsets: unique,
            margin,
        }
    }

    #[must_use]
    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    #[must_use]
    pub fn classify(&self, baseline: u8, candidate: u8) -> Recommendation {
        let (baseline, candidate, margin) = (i16::from(baseline), i16::from(candidate), i16::from(self.margin));
        if candidate > baseline + margin {
            Recommendation::Better
        } else if candidate < baseline - margin {
            Recommendation::Risky
        } else {
            Recommendation::Monitor
        }
    }

    /// Largest distance from the event date that any candidate reaches
    #[must_use]
    pub fn reach_days(&self) -> u32 {
        self.offsets
            .iter()
            .map(|offset| u32::try_from(offset.unsigned_abs()).unwrap_or(u32::MAX))
            .max()
            .unwrap_or(0)
    }

    /// Run the shared pipeline for every offset date on prefetched series
    pub fn evaluate_candidates(
        &self,
        pipeline: &Pipeline,
        prefetched: &Prefetched,
        event_date: NaiveDate,
        thresholds: &Thresholds,
    ) -> Result<Vec<(i64, Evaluation)>> {
        self.offsets
            .iter()
            .filter_map(|offset| {
                event_date
                    .checked_add_signed(TimeDelta::days(*offset))
                    .map(|date| (*offset, date))
            })
            .map(|(offset, date)| {
                pipeline
                    .evaluate_prefetched(prefetched, date, thresholds)
                    .map(|evaluation| (offset, evaluation))
            })
            .collect()
    }

    /// Classify against the baseline and sort by comfort, then closeness
    #[must_use]
    pub fn rank(&self, baseline_comfort: u8, candidates: Vec<Candidate>) -> Vec<AlternativeDateEntry> {
        let mut candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| c.offset_days != 0)
            .collect();
        candidates.sort_by(|a, b| {
            b.comfort_index
                .cmp(&a.comfort_index)
                .then(a.offset_days.abs().cmp(&b.offset_days.abs()))
                .then(a.offset_days.cmp(&b.offset_days))
        });

        candidates
            .into_iter()
            .map(|c| AlternativeDateEntry {
                date: c.date,
                comfort_index: c.comfort_index,
                offset_days: c.offset_days,
                recommendation: self.classify(baseline_comfort, c.comfort_index),
            })
            .collect()
    }
}

/// Strip evaluations down to what ranking needs
#[must_use]
pub fn candidates(evaluated: &[(i64, Evaluation)]) -> Vec<Candidate> {
    evaluated
        .iter()
        .map(|(offset, evaluation)| Candidate {
            date: evaluation.date,
            offset_days: *offset,
            comfort_index: evaluation.comfort_index,
        })
        .collect()
}
