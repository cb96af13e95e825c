//! Per-industry report assembly.
//!
//! `build_group_report` walks the fixed pipeline FETCHING_GROUP →
//! FETCHING_SERIES → COMPUTING → AGGREGATING → DONE. An unresolvable
//! industry name is the terminal NOT_FOUND outcome (`ReportError::
//! GroupNotFound`); a group with no members or no price coverage is the
//! terminal EMPTY outcome, which still yields a well-formed zero-valued
//! report. Per-instrument anomalies never abort the group: an instrument
//! with insufficient history simply carries absent windows.

use crate::batch::{self, WindowValues};
use crate::concentration;
use crate::lookback::{LookbackWindow, OffsetConvention};
use crate::observation::{InstrumentSeries, Observation};
use crate::sanitize::{safe_float, safe_int};
use crate::store::{InstrumentRecord, MarketStore, StoreError};
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-window trailing returns as they appear on the wire.
///
/// Absent results serialize as `null`; consumers rely on the keys being
/// present for every window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReturnTable {
    #[serde(rename = "1d")]
    pub one_day: Option<f64>,
    #[serde(rename = "1m")]
    pub one_month: Option<f64>,
    #[serde(rename = "2m")]
    pub two_months: Option<f64>,
    #[serde(rename = "3m")]
    pub three_months: Option<f64>,
    #[serde(rename = "6m")]
    pub six_months: Option<f64>,
    #[serde(rename = "12m")]
    pub twelve_months: Option<f64>,
    #[serde(rename = "ytd")]
    pub year_to_date: Option<f64>,
}

impl ReturnTable {
    /// A table with every window absent.
    pub fn absent() -> Self {
        ReturnTable::default()
    }

    fn from_values(values: &WindowValues) -> Self {
        let get = |window: LookbackWindow| safe_float(values.get(&window).copied().flatten());
        ReturnTable {
            one_day: get(LookbackWindow::OneDay),
            one_month: get(LookbackWindow::OneMonth),
            two_months: get(LookbackWindow::TwoMonths),
            three_months: get(LookbackWindow::ThreeMonths),
            six_months: get(LookbackWindow::SixMonths),
            twelve_months: get(LookbackWindow::TwelveMonths),
            year_to_date: get(LookbackWindow::YearToDate),
        }
    }
}

/// One point of an instrument's bounded display history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Everything the report carries for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentMetrics {
    pub symbol: String,
    pub company: String,
    pub market_cap: i64,
    pub pe_ratio: Option<f64>,
    pub revenue: i64,
    pub volume: i64,
    pub returns: ReturnTable,
    pub history: Vec<HistoryPoint>,
}

/// Top-K market-cap contributors plus the "Others" remainder.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Concentration {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// The assembled per-industry report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub industry: String,
    pub total_market_cap: f64,
    pub ticker_count: usize,
    pub concentration: Concentration,
    pub instruments: Vec<InstrumentMetrics>,
}

/// Tunables for report assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// How far back prices are loaded, in calendar days
    pub lookback_days: u64,
    /// Maximum history points per instrument
    pub history_cap: usize,
    /// Individual entries kept in the concentration summary
    pub top_k: usize,
    /// Reference "today" for the price query; `None` uses the current UTC date
    pub as_of: Option<NaiveDate>,
    /// Month-offset convention for the lookback windows
    pub convention: OffsetConvention,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            lookback_days: 730,
            history_cap: 1000,
            top_k: 5,
            as_of: None,
            convention: OffsetConvention::default(),
        }
    }
}

/// Errors escaping report assembly.
///
/// Only group-resolution failures and upstream store failures escape;
/// everything per-instrument is absorbed locally as absent values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Industry name unresolvable, even case-insensitively
    GroupNotFound(String),
    /// The store failed; never conflated with an empty group
    Store(StoreError),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::GroupNotFound(name) => write!(f, "industry not found: {}", name),
            ReportError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<StoreError> for ReportError {
    fn from(err: StoreError) -> Self {
        ReportError::Store(err)
    }
}

/// Builds the report for one industry.
///
/// # Arguments
/// * `store` - The market store to read the roster and prices from
/// * `industry_name` - Requested industry; exact match first, then
///   case-insensitive
/// * `options` - Assembly tunables
///
/// # Errors
/// `GroupNotFound` when the name resolves to nothing; `Store` when the
/// store fails. An existing-but-empty group is not an error.
pub fn build_group_report<S: MarketStore + ?Sized>(
    store: &S,
    industry_name: &str,
    options: &ReportOptions,
) -> Result<GroupReport, ReportError> {
    // FETCHING_GROUP: exact match, then case-insensitive fallback.
    let industry = match store.industry_by_name(industry_name)? {
        Some(found) => found,
        None => store
            .industry_by_name_ci(industry_name)?
            .ok_or_else(|| ReportError::GroupNotFound(industry_name.to_string()))?,
    };

    // FETCHING_SERIES
    let roster = store.list_instruments(industry.id)?;
    if roster.is_empty() {
        return Ok(empty_report(industry.name, &roster));
    }

    let as_of = options.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let since = as_of
        .checked_sub_days(Days::new(options.lookback_days))
        .unwrap_or(as_of);
    let symbols: Vec<String> = roster.iter().map(|r| r.symbol.clone()).collect();
    let rows = store.get_prices(&symbols, since)?;
    if rows.is_empty() {
        return Ok(empty_report(industry.name, &roster));
    }

    let mut series_by_symbol: BTreeMap<String, InstrumentSeries> = roster
        .iter()
        .map(|r| (r.symbol.clone(), InstrumentSeries::new(r.symbol.as_str())))
        .collect();
    for row in rows {
        // Rows for symbols outside the roster are tolerated and ignored.
        if let Some(series) = series_by_symbol.get_mut(&row.symbol) {
            series.push(Observation::new(row.date, row.close, row.volume));
        }
    }

    // COMPUTING
    let returns = batch::evaluate_with(&series_by_symbol, &LookbackWindow::ALL, options.convention);

    // AGGREGATING
    let weights: Vec<(String, Option<f64>)> = roster
        .iter()
        .map(|r| (r.symbol.clone(), safe_float(r.market_cap)))
        .collect();
    let (labels, values) = concentration::aggregate(&weights, options.top_k);
    let total_market_cap: f64 = weights.iter().filter_map(|(_, w)| *w).sum();

    let instruments: Vec<InstrumentMetrics> = roster
        .iter()
        .map(|record| {
            let series = series_by_symbol.get(&record.symbol);
            let windows = returns.get(&record.symbol);
            instrument_metrics(record, series, windows, options.history_cap)
        })
        .collect();

    // DONE
    Ok(GroupReport {
        industry: industry.name,
        total_market_cap: safe_float(Some(total_market_cap)).unwrap_or(0.0),
        ticker_count: roster.len(),
        concentration: Concentration { labels, values },
        instruments,
    })
}

/// The terminal EMPTY outcome: a zero-valued report that still lists every
/// registered instrument with all-absent returns.
fn empty_report(industry: String, roster: &[InstrumentRecord]) -> GroupReport {
    let instruments = roster
        .iter()
        .map(|record| instrument_metrics(record, None, None, 0))
        .collect();
    GroupReport {
        industry,
        total_market_cap: 0.0,
        ticker_count: roster.len(),
        concentration: Concentration::default(),
        instruments,
    }
}

fn instrument_metrics(
    record: &InstrumentRecord,
    series: Option<&InstrumentSeries>,
    windows: Option<&WindowValues>,
    history_cap: usize,
) -> InstrumentMetrics {
    let history: Vec<HistoryPoint> = series
        .map(|s| {
            s.tail(history_cap)
                .iter()
                .filter_map(|obs| {
                    safe_float(Some(obs.close)).map(|close| HistoryPoint {
                        date: obs.date,
                        close,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    InstrumentMetrics {
        symbol: record.symbol.clone(),
        company: record
            .company_name
            .clone()
            .unwrap_or_else(|| record.symbol.clone()),
        market_cap: safe_int(record.market_cap),
        pe_ratio: safe_float(record.pe_ratio),
        revenue: safe_int(record.revenue),
        volume: series
            .and_then(|s| s.latest())
            .map(|obs| obs.volume)
            .unwrap_or(0),
        returns: windows.map(ReturnTable::from_values).unwrap_or_default(),
        history,
    }
}
