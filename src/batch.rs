//! Cross-sectional batch evaluation of trailing returns.
//!
//! Computing `compute_return` independently per (instrument, window) re-reads
//! each series' latest observation seven times across a universe of hundreds
//! of symbols. This evaluator computes the latest observation per instrument
//! once, then makes one ordered pass across the instrument map per window,
//! resolving each start through the same `resolve_start` function the direct
//! calculator uses. Batching is a performance optimization, never a semantic
//! change: for any (instrument, window) the result is numerically identical
//! to calling `compute_return` directly.

use crate::lookback::{LookbackWindow, OffsetConvention};
use crate::observation::InstrumentSeries;
use crate::returns::{pct_change, resolve_start};
use std::collections::BTreeMap;

/// Per-window values for one instrument.
pub type WindowValues = BTreeMap<LookbackWindow, Option<f64>>;

/// Evaluates every window for every instrument with the default offset
/// convention.
///
/// Every symbol present in the input appears in the output, including
/// instruments with zero observations (an all-absent row, never an omitted
/// row). One instrument's missing data never affects another's result.
pub fn evaluate(
    series_by_symbol: &BTreeMap<String, InstrumentSeries>,
    windows: &[LookbackWindow],
) -> BTreeMap<String, WindowValues> {
    evaluate_with(series_by_symbol, windows, OffsetConvention::default())
}

/// Evaluates every window for every instrument under an explicit offset
/// convention.
pub fn evaluate_with(
    series_by_symbol: &BTreeMap<String, InstrumentSeries>,
    windows: &[LookbackWindow],
    convention: OffsetConvention,
) -> BTreeMap<String, WindowValues> {
    // Latest observation per instrument, computed once for all windows.
    let latests: BTreeMap<&str, Option<&crate::observation::Observation>> = series_by_symbol
        .iter()
        .map(|(symbol, series)| (symbol.as_str(), series.latest()))
        .collect();

    let mut results: BTreeMap<String, WindowValues> = series_by_symbol
        .keys()
        .map(|symbol| (symbol.clone(), WindowValues::new()))
        .collect();

    for &window in windows {
        // One ordered backward-match pass across the universe for this window.
        for (symbol, series) in series_by_symbol {
            let value = latests
                .get(symbol.as_str())
                .copied()
                .flatten()
                .and_then(|latest| {
                    resolve_start(series, latest.date, window, convention)
                        .and_then(|start| pct_change(latest.close, start.close))
                });
            if let Some(row) = results.get_mut(symbol) {
                row.insert(window, value);
            }
        }
    }

    results
}
