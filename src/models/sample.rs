//! Historical samples and the day-of-year windows they are drawn from

use std::collections::HashMap;
use std::ops::RangeInclusive;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{ClimateVariable, Coordinate};

/// One historical daily observation (or synthetic stand-in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub variable: ClimateVariable,
    /// Nominal year group; a December day in a window around early January
    /// belongs to the following year's group
    pub year: i32,
    /// Calendar date of the observation
    pub date: NaiveDate,
    /// Calendar day-of-year of the observation (1-366)
    pub day_of_year: u32,
    pub value: f64,
    pub source_id: String,
    pub is_synthetic: bool,
}

/// Symmetric window of calendar days around a month/day, repeated every year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    month: u32,
    day: u32,
    half_width: u32,
}

impl DayWindow {
    /// Window of `half_width` days either side of the event's month and day
    #[must_use]
    pub fn around(event_date: NaiveDate, half_width: u32) -> Self {
        Self {
            month: event_date.month(),
            day: event_date.day(),
            half_width,
        }
    }

    /// Same center, `extra_days` wider on each side
    #[must_use]
    pub fn widened(&self, extra_days: u32) -> Self {
        Self {
            half_width: self.half_width.saturating_add(extra_days),
            ..*self
        }
    }

    /// Number of days in one year's window
    #[must_use]
    pub fn days_per_year(&self) -> usize {
        2 * self.half_width as usize + 1
    }

    /// The window's center date in `year`; Feb 29 maps to Feb 28 in common years
    #[must_use]
    pub fn anchor(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, self.month, 28))
    }

    /// All calendar dates belonging to the `year` group, in order
    #[must_use]
    pub fn dates(&self, year: i32) -> Vec<NaiveDate> {
        let Some(anchor) = self.anchor(year) else {
            return Vec::new();
        };
        let Some(start) = anchor.checked_sub_days(Days::new(u64::from(self.half_width))) else {
            return Vec::new();
        };
        start.iter_days().take(self.days_per_year()).collect()
    }

    /// Map from every window date in `years` to its nominal year group
    #[must_use]
    pub fn group_dates(&self, years: RangeInclusive<i32>) -> HashMap<NaiveDate, i32> {
        years
            .flat_map(|year| self.dates(year).into_iter().map(move |d| (d, year)))
            .collect()
    }

    /// Samples falling inside this window for `years`, restamped with this
    /// window's year groups and kept in input order
    #[must_use]
    pub fn select(&self, years: RangeInclusive<i32>, samples: &[HistoricalSample]) -> Vec<HistoricalSample> {
        let dates = self.group_dates(years);
        samples
            .iter()
            .filter_map(|sample| {
                dates.get(&sample.date).map(|year| HistoricalSample {
                    year: *year,
                    ..sample.clone()
                })
            })
            .collect()
    }
}

/// Everything a source needs to produce samples for one variable at one point
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuery {
    pub variable: ClimateVariable,
    pub coordinate: Coordinate,
    pub window: DayWindow,
    pub years: RangeInclusive<i32>,
}

impl SampleQuery {
    #[must_use]
    pub fn new(
        variable: ClimateVariable,
        coordinate: Coordinate,
        window: DayWindow,
        years: RangeInclusive<i32>,
    ) -> Self {
        Self {
            variable,
            coordinate,
            window,
            years,
        }
    }

    /// Day-of-year of the window center, as used for seeding
    #[must_use]
    pub fn day_of_year(&self) -> u32 {
        self.window
            .anchor(*self.years.start())
            .map_or(1, |d| d.ordinal())
    }

    /// First and last calendar date touched by any year's window
    #[must_use]
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.window.dates(*self.years.start()).first().copied()?;
        let last = self.window.dates(*self.years.end()).last().copied()?;
        Some((first, last))
    }

    /// Map from every window date to its nominal year group
    #[must_use]
    pub fn window_dates(&self) -> HashMap<NaiveDate, i32> {
        self.window.group_dates(self.years.clone())
    }

    /// Keep only window dates from a daily series and stamp them as samples
    pub fn samples_from_series<I>(&self, series: I, source_id: &str) -> Vec<HistoricalSample>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let dates = self.window_dates();
        let mut kept: Vec<(NaiveDate, i32, f64)> = series
            .into_iter()
            .filter_map(|(date, value)| dates.get(&date).map(|year| (date, *year, value)))
            .collect();
        kept.sort_by_key(|(date, _, _)| *date);

        kept.into_iter()
            .map(|(date, year, value)| HistoricalSample {
                variable: self.variable,
                year,
                date,
                day_of_year: date.ordinal(),
                value,
                source_id: source_id.to_string(),
                is_synthetic: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_dates_are_symmetric() {
        let window = DayWindow::around(date(2025, 7, 4), 7);
        let dates = window.dates(2000);
        assert_eq!(dates.len(), 15);
        assert_eq!(dates.first(), Some(&date(2000, 6, 27)));
        assert_eq!(dates.last(), Some(&date(2000, 7, 11)));
    }

    #[test]
    fn test_window_wraps_into_previous_december() {
        let window = DayWindow::around(date(2025, 1, 2), 3);
        let dates = window.dates(2000);
        assert_eq!(
            dates,
            vec![
                date(1999, 12, 30),
                date(1999, 12, 31),
                date(2000, 1, 1),
                date(2000, 1, 2),
                date(2000, 1, 3),
                date(2000, 1, 4),
                date(2000, 1, 5),
            ]
        );
    }

    #[test]
    fn test_leap_day_anchor_in_common_year() {
        let window = DayWindow::around(date(2024, 2, 29), 1);
        assert_eq!(window.anchor(2023), Some(date(2023, 2, 28)));
        assert_eq!(window.anchor(2020), Some(date(2020, 2, 29)));
    }

    #[test]
    fn test_series_filtered_to_nominal_years() {
        let query = SampleQuery::new(
            ClimateVariable::Temperature,
            Coordinate::new(0.0, 0.0),
            DayWindow::around(date(2025, 1, 2), 3),
            2000..=2001,
        );
        let series = vec![
            (date(1999, 12, 30), 1.0),
            (date(2000, 6, 1), 99.0),
            (date(2000, 12, 31), 2.0),
            (date(2001, 1, 5), 3.0),
        ];
        let samples = query.samples_from_series(series, "test");

        assert_eq!(samples.len(), 3);
        assert_eq!((samples[0].year, samples[0].value), (2000, 1.0));
        assert_eq!(samples[0].date, date(1999, 12, 30));
        assert_eq!((samples[1].year, samples[1].value), (2001, 2.0));
        assert_eq!((samples[2].year, samples[2].value), (2001, 3.0));
        assert!(samples.iter().all(|s| s.source_id == "test" && !s.is_synthetic));
    }

    #[test]
    fn test_select_slices_a_wider_series() {
        let event = date(2025, 12, 30);
        let wide = SampleQuery::new(
            ClimateVariable::Temperature,
            Coordinate::new(0.0, 0.0),
            DayWindow::around(event, 3).widened(10),
            1999..=2002,
        );
        let series: Vec<(NaiveDate, f64)> = wide
            .window_dates()
            .into_keys()
            .map(|d| (d, f64::from(d.ordinal())))
            .collect();
        let samples = wide.samples_from_series(series, "test");

        let shifted = DayWindow::around(date(2026, 1, 6), 3);
        let selected = shifted.select(2000..=2001, &samples);

        assert_eq!(selected.len(), 2 * 7);
        assert!(selected.iter().all(|s| s.date.month() == 1 && (3..=9).contains(&s.date.day())));
        assert!(selected.iter().all(|s| s.date.year() == s.year));
        assert_eq!(selected[0].date, date(2000, 1, 3));
    }

    #[test]
    fn test_widened_keeps_center() {
        let window = DayWindow::around(date(2025, 7, 4), 7).widened(8);
        assert_eq!(window.days_per_year(), 31);
        assert_eq!(window.anchor(2000), Some(date(2000, 7, 4)));
    }

    #[test]
    fn test_date_span_covers_all_windows() {
        let query = SampleQuery::new(
            ClimateVariable::Precipitation,
            Coordinate::new(0.0, 0.0),
            DayWindow::around(date(2025, 12, 30), 5),
            1990..=2024,
        );
        let (first, last) = query.date_span().unwrap();
        assert_eq!(first, date(1990, 12, 25));
        assert_eq!(last, date(2025, 1, 4));
    }
}
