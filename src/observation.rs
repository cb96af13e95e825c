use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily price observation: calendar date, close price, and volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar date of the observation
    pub date: NaiveDate,
    /// Close price on that date
    pub close: f64,
    /// Traded volume (non-negative)
    pub volume: i64,
}

impl Observation {
    /// Creates a new Observation.
    pub fn new(date: NaiveDate, close: f64, volume: i64) -> Self {
        Observation { date, close, volume }
    }
}

/// Ordered daily price series for one instrument.
///
/// Invariant: observations are strictly increasing by date with unique dates.
/// The constructors enforce this (a later entry for the same date replaces
/// the earlier one, matching the store's upsert semantics), so lookups can
/// rely on binary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSeries {
    symbol: String,
    observations: Vec<Observation>,
}

impl InstrumentSeries {
    /// Creates an empty series for a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        InstrumentSeries {
            symbol: symbol.into(),
            observations: Vec::new(),
        }
    }

    /// Builds a series from observations in any order.
    ///
    /// Observations are sorted ascending by date; when two observations share
    /// a date, the one appearing later in the input wins.
    pub fn from_observations(symbol: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        // Stable sort keeps input order within a date, so the last write wins
        // after deduplication below.
        observations.sort_by_key(|obs| obs.date);

        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.date == obs.date => *last = obs,
                _ => deduped.push(obs),
            }
        }

        InstrumentSeries {
            symbol: symbol.into(),
            observations: deduped,
        }
    }

    /// Inserts a single observation, preserving the sorted/unique invariant.
    ///
    /// An observation for an existing date replaces the stored one.
    pub fn push(&mut self, obs: Observation) {
        match self
            .observations
            .binary_search_by_key(&obs.date, |existing| existing.date)
        {
            Ok(index) => self.observations[index] = obs,
            Err(index) => self.observations.insert(index, obs),
        }
    }

    /// Returns the instrument symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the observations, ascending by date.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations in the series.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// True when the series holds no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The most recent observation, if any.
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// The oldest observation, if any.
    pub fn earliest(&self) -> Option<&Observation> {
        self.observations.first()
    }

    /// Backward as-of match: the observation with the greatest date on or
    /// before `target`, or `None` when every observation is later.
    pub fn last_on_or_before(&self, target: NaiveDate) -> Option<&Observation> {
        let idx = self
            .observations
            .partition_point(|obs| obs.date <= target);
        if idx == 0 {
            None
        } else {
            self.observations.get(idx - 1)
        }
    }

    /// The first observation whose date falls in `year`, if any.
    pub fn first_in_year(&self, year: i32) -> Option<&Observation> {
        use chrono::Datelike;
        self.observations.iter().find(|obs| obs.date.year() == year)
    }

    /// The most recent `max` observations, ascending by date.
    pub fn tail(&self, max: usize) -> &[Observation] {
        let start = self.observations.len().saturating_sub(max);
        &self.observations[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn from_observations_sorts_by_date() {
        let series = InstrumentSeries::from_observations(
            "AAPL",
            vec![
                Observation::new(d(2024, 1, 17), 152.0, 300),
                Observation::new(d(2024, 1, 15), 150.0, 100),
                Observation::new(d(2024, 1, 16), 151.0, 200),
            ],
        );

        let dates: Vec<NaiveDate> = series.observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 15), d(2024, 1, 16), d(2024, 1, 17)]);
    }

    #[test]
    fn duplicate_dates_keep_the_later_entry() {
        let series = InstrumentSeries::from_observations(
            "AAPL",
            vec![
                Observation::new(d(2024, 1, 15), 150.0, 100),
                Observation::new(d(2024, 1, 15), 155.0, 400),
            ],
        );

        assert_eq!(series.len(), 1);
        assert_eq!(series.latest().unwrap().close, 155.0);
        assert_eq!(series.latest().unwrap().volume, 400);
    }

    #[test]
    fn push_replaces_existing_date() {
        let mut series = InstrumentSeries::new("MSFT");
        series.push(Observation::new(d(2024, 1, 15), 400.0, 100));
        series.push(Observation::new(d(2024, 1, 16), 405.0, 200));
        series.push(Observation::new(d(2024, 1, 15), 402.0, 150));

        assert_eq!(series.len(), 2);
        assert_eq!(series.earliest().unwrap().close, 402.0);
    }

    #[test]
    fn push_keeps_sorted_order_for_out_of_order_input() {
        let mut series = InstrumentSeries::new("MSFT");
        series.push(Observation::new(d(2024, 1, 17), 410.0, 100));
        series.push(Observation::new(d(2024, 1, 15), 400.0, 100));

        let dates: Vec<NaiveDate> = series.observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 15), d(2024, 1, 17)]);
    }

    #[test]
    fn last_on_or_before_matches_exact_and_gap_dates() {
        let series = InstrumentSeries::from_observations(
            "GOOG",
            vec![
                Observation::new(d(2024, 1, 15), 100.0, 1),
                Observation::new(d(2024, 1, 18), 101.0, 1),
            ],
        );

        // Exact hit
        assert_eq!(series.last_on_or_before(d(2024, 1, 15)).unwrap().close, 100.0);
        // Gap date falls back to the previous observation
        assert_eq!(series.last_on_or_before(d(2024, 1, 17)).unwrap().close, 100.0);
        // Before the series starts
        assert!(series.last_on_or_before(d(2024, 1, 14)).is_none());
        // After the series ends
        assert_eq!(series.last_on_or_before(d(2024, 2, 1)).unwrap().close, 101.0);
    }

    #[test]
    fn first_in_year_skips_prior_years() {
        let series = InstrumentSeries::from_observations(
            "GOOG",
            vec![
                Observation::new(d(2023, 12, 29), 98.0, 1),
                Observation::new(d(2024, 1, 2), 100.0, 1),
                Observation::new(d(2024, 1, 3), 101.0, 1),
            ],
        );

        assert_eq!(series.first_in_year(2024).unwrap().date, d(2024, 1, 2));
        assert_eq!(series.first_in_year(2023).unwrap().date, d(2023, 12, 29));
        assert!(series.first_in_year(2022).is_none());
    }

    #[test]
    fn tail_returns_most_recent_observations_ascending() {
        let series = InstrumentSeries::from_observations(
            "AMZN",
            vec![
                Observation::new(d(2024, 1, 15), 1.0, 1),
                Observation::new(d(2024, 1, 16), 2.0, 1),
                Observation::new(d(2024, 1, 17), 3.0, 1),
            ],
        );

        let tail = series.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].close, 2.0);
        assert_eq!(tail[1].close, 3.0);

        // Cap larger than the series returns everything
        assert_eq!(series.tail(10).len(), 3);
    }
}
