use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Roster entry for one instrument: symbol plus fundamentals as stored.
///
/// Every fundamental is optional; absence policies are applied by the
/// sanitizer when the report is assembled, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRecord {
    pub symbol: String,
    pub company_name: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub revenue: Option<f64>,
}

/// One stored daily price row for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
}

/// A daily bar as produced by the downloader and written by the ingest path.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub volume: i64,
}

/// An industry resolved to its internal identifier and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndustryRef {
    pub id: i64,
    pub name: String,
}

/// Errors surfaced by a market store.
///
/// Both variants are unrecoverable by the core: they propagate to the caller
/// as a generic internal failure, never silently replaced by zeros or stale
/// data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store is unreachable, or no connection could be acquired in time
    Unavailable(String),
    /// The store returned data the core cannot interpret
    Malformed(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::Malformed(msg) => write!(f, "malformed store data: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Query interface to the time-series store.
///
/// The core treats the store as a synchronous, possibly-slow collaborator:
/// no retries here, and no I/O anywhere else in the pipeline.
/// Implementations can be an in-memory map (tests) or SQLite.
pub trait MarketStore {
    /// All industry names, sorted ascending.
    fn list_industries(&self) -> Result<Vec<String>, StoreError>;

    /// Resolves an industry by exact name.
    fn industry_by_name(&self, name: &str) -> Result<Option<IndustryRef>, StoreError>;

    /// Resolves an industry ignoring ASCII case.
    fn industry_by_name_ci(&self, name: &str) -> Result<Option<IndustryRef>, StoreError>;

    /// The roster of instruments registered under an industry, ordered by
    /// descending market cap with absent caps last, then by symbol.
    fn list_instruments(&self, industry_id: i64) -> Result<Vec<InstrumentRecord>, StoreError>;

    /// Price rows for the given symbols on or after `since`, ordered by
    /// (symbol, date) ascending. A symbol present in the roster but absent
    /// here is not an error; callers must tolerate it.
    fn get_prices(&self, symbols: &[String], since: NaiveDate)
        -> Result<Vec<PriceRow>, StoreError>;
}

/// In-memory market store for testing.
///
/// Mirrors the ordering guarantees of the SQLite store so tests exercise the
/// same contract the server sees.
#[derive(Debug, Clone)]
pub struct InMemoryMarketStore {
    industries: Vec<IndustryRef>,
    instruments: BTreeMap<i64, Vec<InstrumentRecord>>,
    prices: BTreeMap<String, Vec<PriceRow>>,
    next_id: i64,
}

impl InMemoryMarketStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        InMemoryMarketStore {
            industries: Vec::new(),
            instruments: BTreeMap::new(),
            prices: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers an industry and returns its identifier. Re-registering an
    /// existing name returns the existing identifier.
    pub fn add_industry(&mut self, name: impl Into<String>) -> i64 {
        let name = name.into();
        if let Some(existing) = self.industries.iter().find(|i| i.name == name) {
            return existing.id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.industries.push(IndustryRef { id, name });
        id
    }

    /// Registers an instrument under an industry.
    pub fn add_instrument(&mut self, industry_id: i64, record: InstrumentRecord) {
        self.instruments.entry(industry_id).or_default().push(record);
    }

    /// Adds price rows for a symbol. Rows may arrive in any order; a row for
    /// an existing date replaces it (upsert semantics).
    pub fn add_prices(&mut self, symbol: impl Into<String>, rows: Vec<(NaiveDate, f64, i64)>) {
        let symbol = symbol.into();
        let stored = self.prices.entry(symbol.clone()).or_default();
        for (date, close, volume) in rows {
            let row = PriceRow {
                symbol: symbol.clone(),
                date,
                close,
                volume,
            };
            match stored.iter_mut().find(|existing| existing.date == date) {
                Some(existing) => *existing = row,
                None => stored.push(row),
            }
        }
        stored.sort_by_key(|row| row.date);
    }
}

impl Default for InMemoryMarketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketStore for InMemoryMarketStore {
    fn list_industries(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.industries.iter().map(|i| i.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    fn industry_by_name(&self, name: &str) -> Result<Option<IndustryRef>, StoreError> {
        Ok(self.industries.iter().find(|i| i.name == name).cloned())
    }

    fn industry_by_name_ci(&self, name: &str) -> Result<Option<IndustryRef>, StoreError> {
        Ok(self
            .industries
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn list_instruments(&self, industry_id: i64) -> Result<Vec<InstrumentRecord>, StoreError> {
        let mut roster = self
            .instruments
            .get(&industry_id)
            .cloned()
            .unwrap_or_default();
        roster.sort_by(|a, b| match (a.market_cap, b.market_cap) {
            (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.symbol.cmp(&b.symbol)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.symbol.cmp(&b.symbol),
        });
        Ok(roster)
    }

    fn get_prices(
        &self,
        symbols: &[String],
        since: NaiveDate,
    ) -> Result<Vec<PriceRow>, StoreError> {
        let mut rows = Vec::new();
        let mut requested: Vec<&String> = symbols.iter().collect();
        requested.sort();
        for symbol in requested {
            if let Some(stored) = self.prices.get(symbol) {
                rows.extend(stored.iter().filter(|row| row.date >= since).cloned());
            }
        }
        Ok(rows)
    }
}
