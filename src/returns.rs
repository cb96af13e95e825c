//! Point-in-time trailing returns with backward as-of matching.
//!
//! Daily series are irregular (weekends, holidays, listing gaps), so a
//! window's start price is the latest observation on or before the target
//! date rather than an exact-date lookup. This module is the single source of
//! truth for that resolution; the batch evaluator reuses it so the two can
//! never drift.

use crate::lookback::{LookbackWindow, OffsetConvention};
use crate::observation::{InstrumentSeries, Observation};
use chrono::{Datelike, NaiveDate};

/// Result of a trailing-return computation for one window.
///
/// `value` is a percentage. Absent when the series has fewer than two
/// observations, when a year-to-date window finds no observation in the
/// reference year, or when the resolved start price is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnResult {
    pub window: LookbackWindow,
    pub value: Option<f64>,
}

/// Resolves the starting observation for a window against a reference date.
///
/// Offset windows match backward from `reference − offset` and fall back to
/// the series' earliest observation when every observation is later than the
/// target, so young series still report against their first recorded price.
/// Year-to-date targets the first observation of the reference year and has
/// no fallback. Series with fewer than two observations resolve to nothing.
pub(crate) fn resolve_start<'a>(
    series: &'a InstrumentSeries,
    reference: NaiveDate,
    window: LookbackWindow,
    convention: OffsetConvention,
) -> Option<&'a Observation> {
    if series.len() < 2 {
        return None;
    }

    match window.target_date(reference, convention) {
        Some(target) => series
            .last_on_or_before(target)
            .or_else(|| series.earliest()),
        None => series.first_in_year(reference.year()),
    }
}

/// Percentage change from `start` to `current`.
///
/// A zero start price is an undefined ratio and yields absent, never
/// infinity; non-finite inputs also yield absent.
pub(crate) fn pct_change(current: f64, start: f64) -> Option<f64> {
    if !current.is_finite() || !start.is_finite() || start == 0.0 {
        return None;
    }
    Some((current - start) / start * 100.0)
}

/// Computes the trailing return for one window, referenced to the series'
/// own latest observation date.
pub fn compute_return(series: &InstrumentSeries, window: LookbackWindow) -> ReturnResult {
    let reference = match series.latest() {
        Some(obs) => obs.date,
        None => return ReturnResult { window, value: None },
    };
    compute_return_at(series, reference, window, OffsetConvention::default())
}

/// Computes the trailing return for one window against an explicit reference
/// date and offset convention.
///
/// The change is always measured against the series' latest close; the
/// reference date only positions the window's start. Deterministic and free
/// of side effects.
pub fn compute_return_at(
    series: &InstrumentSeries,
    reference: NaiveDate,
    window: LookbackWindow,
    convention: OffsetConvention,
) -> ReturnResult {
    let value = series.latest().and_then(|latest| {
        resolve_start(series, reference, window, convention)
            .and_then(|start| pct_change(latest.close, start.close))
    });
    ReturnResult { window, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, f64)]) -> InstrumentSeries {
        InstrumentSeries::from_observations(
            "TEST",
            points
                .iter()
                .map(|(date, close)| Observation::new(*date, *close, 1000))
                .collect(),
        )
    }

    #[test]
    fn one_month_return_matches_exact_target() {
        // Scenario: [(2024-01-01, 100), (2024-02-01, 110)], 1 month -> 10.0
        let s = series(&[(d(2024, 1, 1), 100.0), (d(2024, 2, 1), 110.0)]);
        let result = compute_return(&s, LookbackWindow::OneMonth);
        assert_eq!(result.value, Some(10.0));
    }

    #[test]
    fn backward_match_skips_gap_days() {
        // Target 2024-02-14 has no observation; the match is 2024-02-12.
        let s = series(&[
            (d(2024, 2, 12), 100.0),
            (d(2024, 2, 16), 102.0),
            (d(2024, 3, 14), 120.0),
        ]);
        let result = compute_return(&s, LookbackWindow::OneMonth);
        assert_eq!(result.value, Some(20.0));
    }

    #[test]
    fn young_series_falls_back_to_earliest_observation() {
        // Nothing on or before the 12-month target; use the first price.
        let s = series(&[(d(2024, 5, 1), 50.0), (d(2024, 6, 1), 60.0)]);
        let result = compute_return(&s, LookbackWindow::TwelveMonths);
        assert_eq!(result.value, Some(20.0));
    }

    #[test]
    fn single_observation_is_absent_for_every_window() {
        let s = series(&[(d(2024, 6, 1), 50.0)]);
        for window in LookbackWindow::ALL {
            assert_eq!(compute_return(&s, window).value, None, "{:?}", window);
        }
    }

    #[test]
    fn empty_series_is_absent() {
        let s = InstrumentSeries::new("TEST");
        assert_eq!(compute_return(&s, LookbackWindow::OneDay).value, None);
    }

    #[test]
    fn zero_start_price_is_absent_not_infinite() {
        let s = series(&[(d(2024, 1, 1), 0.0), (d(2024, 2, 1), 110.0)]);
        let result = compute_return(&s, LookbackWindow::OneMonth);
        assert_eq!(result.value, None);
    }

    #[test]
    fn non_finite_prices_are_absent() {
        let s = series(&[(d(2024, 1, 1), f64::NAN), (d(2024, 2, 1), 110.0)]);
        assert_eq!(compute_return(&s, LookbackWindow::OneMonth).value, None);
    }

    #[test]
    fn ytd_measures_from_first_observation_of_the_year() {
        let s = series(&[
            (d(2023, 12, 29), 90.0),
            (d(2024, 1, 2), 100.0),
            (d(2024, 3, 1), 125.0),
        ]);
        let result = compute_return(&s, LookbackWindow::YearToDate);
        assert_eq!(result.value, Some(25.0));
    }

    #[test]
    fn ytd_without_current_year_data_is_absent() {
        // Latest observation is in 2023; a 2024 reference year has no data.
        let s = series(&[(d(2023, 11, 1), 90.0), (d(2023, 12, 1), 95.0)]);
        let result = compute_return_at(
            &s,
            d(2024, 1, 15),
            LookbackWindow::YearToDate,
            OffsetConvention::default(),
        );
        assert_eq!(result.value, None);
    }

    #[test]
    fn ytd_with_only_the_latest_in_year_is_zero() {
        let s = series(&[(d(2023, 12, 29), 90.0), (d(2024, 1, 2), 100.0)]);
        let result = compute_return(&s, LookbackWindow::YearToDate);
        assert_eq!(result.value, Some(0.0));
    }

    #[test]
    fn one_day_return_uses_previous_calendar_day_match() {
        let s = series(&[(d(2024, 2, 1), 100.0), (d(2024, 2, 2), 103.0)]);
        let result = compute_return(&s, LookbackWindow::OneDay);
        assert_eq!(result.value, Some(3.0));
    }

    #[test]
    fn convention_changes_the_resolved_start() {
        // Calendar: 2024-03-31 - 1 month = 2024-02-29 -> matches 2024-02-29.
        // Fixed 30d: 2024-03-31 - 30 days = 2024-03-01 -> matches 2024-03-01.
        let s = series(&[
            (d(2024, 2, 29), 100.0),
            (d(2024, 3, 1), 104.0),
            (d(2024, 3, 31), 110.0),
        ]);
        let calendar = compute_return_at(
            &s,
            d(2024, 3, 31),
            LookbackWindow::OneMonth,
            OffsetConvention::CalendarMonths,
        );
        let fixed = compute_return_at(
            &s,
            d(2024, 3, 31),
            LookbackWindow::OneMonth,
            OffsetConvention::FixedThirtyDayMonths,
        );
        assert_eq!(calendar.value, Some(10.0));
        assert!((fixed.value.unwrap() - (110.0 - 104.0) / 104.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn negative_returns_are_preserved() {
        let s = series(&[(d(2024, 1, 1), 200.0), (d(2024, 2, 1), 150.0)]);
        let result = compute_return(&s, LookbackWindow::OneMonth);
        assert_eq!(result.value, Some(-25.0));
    }
}
