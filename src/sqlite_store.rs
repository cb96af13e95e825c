//! SQLite-backed market store.
//!
//! Owns a bounded pool of connections shared across concurrent requests.
//! Acquisition blocks (up to a timeout) when every connection is checked
//! out; a checked-out connection returns to the pool when its guard drops,
//! on every exit path. Schema is created idempotently on open.

use crate::store::{DailyBar, IndustryRef, InstrumentRecord, MarketStore, PriceRow, StoreError};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct PoolInner {
    connections: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

/// SQLite market store with a bounded connection pool.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct SqliteMarketStore {
    inner: Arc<PoolInner>,
    acquire_timeout: Duration,
}

impl SqliteMarketStore {
    /// Opens (creating if needed) a file-based store with `pool_size`
    /// connections.
    ///
    /// # Errors
    /// Returns an error if any connection cannot be opened or the schema
    /// cannot be created.
    pub fn open<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Self, StoreError> {
        let size = pool_size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open(&db_path).map_err(sql_err)?;
            conn.busy_timeout(BUSY_TIMEOUT).map_err(sql_err)?;
            connections.push(conn);
        }
        ensure_schema(&connections[0])?;
        Ok(Self::from_connections(connections))
    }

    /// Opens an in-memory store. Useful for testing.
    ///
    /// In-memory databases are private to their connection, so the pool
    /// holds exactly one.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        ensure_schema(&conn)?;
        Ok(Self::from_connections(vec![conn]))
    }

    fn from_connections(connections: Vec<Connection>) -> Self {
        let size = connections.len();
        SqliteMarketStore {
            inner: Arc::new(PoolInner {
                connections: Mutex::new(connections),
                permits: Arc::new(Semaphore::new(size)),
            }),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Sets how long `acquire` blocks when the pool is exhausted.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Acquires one connection from the pool, blocking up to the acquire
    /// timeout when every connection is checked out.
    ///
    /// # Errors
    /// `StoreError::Unavailable` when the timeout elapses first.
    pub async fn acquire(&self) -> Result<StoreConnection, StoreError> {
        let permit = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        .map_err(|_| {
            StoreError::Unavailable("timed out waiting for a database connection".to_string())
        })?
        .map_err(|_| StoreError::Unavailable("connection pool is closed".to_string()))?;

        let conn = {
            let mut connections = self
                .inner
                .connections
                .lock()
                .map_err(|_| StoreError::Unavailable("connection pool poisoned".to_string()))?;
            connections
                .pop()
                .ok_or_else(|| StoreError::Unavailable("connection pool drained".to_string()))?
        };

        Ok(StoreConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }
}

/// A pooled SQLite connection, returned to the pool on drop.
pub struct StoreConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConnection").finish_non_exhaustive()
    }
}

impl StoreConnection {
    /// Returns a reference to the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        // Present from construction until drop; take() happens only in Drop.
        self.conn.as_ref().expect("connection taken before drop")
    }

    /// Retrieves the industry id for `name`, creating the row if absent.
    pub fn get_or_create_industry(&self, name: &str) -> Result<i64, StoreError> {
        let conn = self.connection();
        conn.execute(
            "INSERT OR IGNORE INTO industries (name) VALUES (?1)",
            params![name],
        )
        .map_err(sql_err)?;
        conn.query_row(
            "SELECT id FROM industries WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(sql_err)
    }

    /// Registers an instrument under an industry, updating every provided
    /// fundamental on conflict.
    pub fn register_instrument(
        &self,
        industry_id: i64,
        record: &InstrumentRecord,
    ) -> Result<(), StoreError> {
        self.connection()
            .execute(
                "INSERT INTO tickers (symbol, industry_id, company_name, market_cap, pe_ratio, revenue)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(symbol) DO UPDATE SET
                     industry_id = excluded.industry_id,
                     company_name = excluded.company_name,
                     market_cap = excluded.market_cap,
                     pe_ratio = excluded.pe_ratio,
                     revenue = excluded.revenue",
                params![
                    record.symbol,
                    industry_id,
                    record.company_name,
                    record.market_cap,
                    record.pe_ratio,
                    record.revenue,
                ],
            )
            .map_err(sql_err)?;
        Ok(())
    }

    /// Upserts daily bars for one symbol: insert new (symbol, date) rows,
    /// update existing ones. Returns the number of rows written.
    pub fn upsert_daily_prices(
        &self,
        symbol: &str,
        bars: &[DailyBar],
    ) -> Result<usize, StoreError> {
        if bars.is_empty() {
            return Ok(0);
        }

        let conn = self.connection();
        let tx = conn.unchecked_transaction().map_err(sql_err)?;
        let mut written = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO daily_prices (symbol, date, close, adj_close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(symbol, date) DO UPDATE SET
                         close = excluded.close,
                         adj_close = excluded.adj_close,
                         volume = excluded.volume",
                )
                .map_err(sql_err)?;
            for bar in bars {
                written += stmt
                    .execute(params![symbol, bar.date, bar.close, bar.adj_close, bar.volume])
                    .map_err(sql_err)?;
            }
        }
        tx.commit().map_err(sql_err)?;
        log::debug!("upserted {} price rows for {}", written, symbol);
        Ok(written)
    }
}

impl Drop for StoreConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Ok(mut connections) = self.pool.connections.lock() {
                connections.push(conn);
            }
            // The semaphore permit is released when `_permit` drops.
        }
    }
}

impl MarketStore for StoreConnection {
    fn list_industries(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn
            .prepare("SELECT DISTINCT name FROM industries ORDER BY name")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
    }

    fn industry_by_name(&self, name: &str) -> Result<Option<IndustryRef>, StoreError> {
        industry_query(
            self.connection(),
            "SELECT id, name FROM industries WHERE name = ?1 LIMIT 1",
            name,
        )
    }

    fn industry_by_name_ci(&self, name: &str) -> Result<Option<IndustryRef>, StoreError> {
        industry_query(
            self.connection(),
            "SELECT id, name FROM industries WHERE LOWER(name) = LOWER(?1) LIMIT 1",
            name,
        )
    }

    fn list_instruments(&self, industry_id: i64) -> Result<Vec<InstrumentRecord>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn
            .prepare(
                "SELECT symbol, company_name, market_cap, pe_ratio, revenue
                 FROM tickers
                 WHERE industry_id = ?1
                 ORDER BY market_cap DESC NULLS LAST, symbol",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![industry_id], |row| {
                Ok(InstrumentRecord {
                    symbol: row.get(0)?,
                    company_name: row.get(1)?,
                    market_cap: row.get(2)?,
                    pe_ratio: row.get(3)?,
                    revenue: row.get(4)?,
                })
            })
            .map_err(sql_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
    }

    fn get_prices(
        &self,
        symbols: &[String],
        since: NaiveDate,
    ) -> Result<Vec<PriceRow>, StoreError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; symbols.len()].join(", ");
        let sql = format!(
            "SELECT symbol, date, close, volume FROM daily_prices
             WHERE symbol IN ({}) AND date >= ?
             ORDER BY symbol, date",
            placeholders
        );

        let conn = self.connection();
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let since_text = since.format("%Y-%m-%d").to_string();
        let rows = stmt
            .query_map(
                params_from_iter(
                    symbols
                        .iter()
                        .map(|s| s.as_str())
                        .chain(std::iter::once(since_text.as_str())),
                ),
                |row| {
                    Ok(PriceRow {
                        symbol: row.get(0)?,
                        date: row.get(1)?,
                        close: row.get(2)?,
                        volume: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    })
                },
            )
            .map_err(sql_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
    }
}

fn industry_query(
    conn: &Connection,
    sql: &str,
    name: &str,
) -> Result<Option<IndustryRef>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(sql_err)?;
    let mut rows = stmt
        .query_map(params![name], |row| {
            Ok(IndustryRef {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .map_err(sql_err)?;
    match rows.next() {
        Some(row) => row.map(Some).map_err(sql_err),
        None => Ok(None),
    }
}

/// Creates the schema if it does not exist. Idempotent.
fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS industries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .map_err(sql_err)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tickers (
            symbol TEXT PRIMARY KEY,
            industry_id INTEGER NOT NULL REFERENCES industries(id),
            company_name TEXT,
            market_cap INTEGER,
            revenue INTEGER,
            gross_profit INTEGER,
            net_income INTEGER,
            pe_ratio REAL,
            profit_margin REAL
        )",
        [],
    )
    .map_err(sql_err)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_prices (
            symbol TEXT NOT NULL REFERENCES tickers(symbol),
            date TEXT NOT NULL,
            close REAL NOT NULL,
            adj_close REAL,
            volume INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (symbol, date)
        )",
        [],
    )
    .map_err(sql_err)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_daily_prices_symbol ON daily_prices(symbol)",
        [],
    )
    .map_err(sql_err)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_daily_prices_date ON daily_prices(date)",
        [],
    )
    .map_err(sql_err)?;

    Ok(())
}

fn sql_err(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => {
            StoreError::Malformed(err.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}
