//! Lookback windows for trailing-return computations.
//!
//! Each window maps the reference date to a target date by a fixed calendar
//! offset; `YearToDate` instead targets the first observation of the
//! reference date's calendar year and is resolved by the caller.

use chrono::{Days, Months, NaiveDate};

/// The fixed set of lookback windows served by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookbackWindow {
    OneDay,
    OneMonth,
    TwoMonths,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
    YearToDate,
}

/// How month-denominated windows are subtracted from the reference date.
///
/// Calendar months match the report's historical behavior (end-of-month
/// dates clamp, e.g. Mar 31 minus one month is Feb 28/29). The fixed
/// thirty-day convention exists for consumers that expect day-based offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetConvention {
    #[default]
    CalendarMonths,
    FixedThirtyDayMonths,
}

impl LookbackWindow {
    /// Every window, in report column order.
    pub const ALL: [LookbackWindow; 7] = [
        LookbackWindow::OneDay,
        LookbackWindow::OneMonth,
        LookbackWindow::TwoMonths,
        LookbackWindow::ThreeMonths,
        LookbackWindow::SixMonths,
        LookbackWindow::TwelveMonths,
        LookbackWindow::YearToDate,
    ];

    /// The wire key for this window in the report's `returns` object.
    pub fn key(&self) -> &'static str {
        match self {
            LookbackWindow::OneDay => "1d",
            LookbackWindow::OneMonth => "1m",
            LookbackWindow::TwoMonths => "2m",
            LookbackWindow::ThreeMonths => "3m",
            LookbackWindow::SixMonths => "6m",
            LookbackWindow::TwelveMonths => "12m",
            LookbackWindow::YearToDate => "ytd",
        }
    }

    /// Month count for month-denominated windows.
    fn months(&self) -> Option<u32> {
        match self {
            LookbackWindow::OneMonth => Some(1),
            LookbackWindow::TwoMonths => Some(2),
            LookbackWindow::ThreeMonths => Some(3),
            LookbackWindow::SixMonths => Some(6),
            LookbackWindow::TwelveMonths => Some(12),
            LookbackWindow::OneDay | LookbackWindow::YearToDate => None,
        }
    }

    /// Computes the as-of target date for this window.
    ///
    /// Returns `None` for `YearToDate`, which is not an offset window: its
    /// start is the first observation of the reference date's calendar year.
    pub fn target_date(
        &self,
        reference: NaiveDate,
        convention: OffsetConvention,
    ) -> Option<NaiveDate> {
        match self {
            LookbackWindow::OneDay => reference.checked_sub_days(Days::new(1)),
            LookbackWindow::YearToDate => None,
            _ => {
                let months = self.months().unwrap_or(0);
                match convention {
                    OffsetConvention::CalendarMonths => {
                        reference.checked_sub_months(Months::new(months))
                    }
                    OffsetConvention::FixedThirtyDayMonths => {
                        reference.checked_sub_days(Days::new(30 * months as u64))
                    }
                }
            }
        }
    }
}
