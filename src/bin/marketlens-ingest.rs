//! Roster ingest binary: register industries and tickers from a CSV roster,
//! download each symbol's daily closes, and upsert them into the store.
//!
//! Run with: `cargo run --bin marketlens-ingest -- roster.csv`
//!
//! Roster columns: industry,symbol,company_name,market_cap,pe_ratio,revenue
//! (fundamental columns may be empty).

use chrono::{Days, Utc};
use marketlens::{DownloaderConfig, InstrumentRecord, PriceDownloader, SqliteMarketStore};
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
struct RosterRow {
    industry: String,
    symbol: String,
    company_name: Option<String>,
    market_cap: Option<f64>,
    pe_ratio: Option<f64>,
    revenue: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let roster_path = std::env::args()
        .nth(1)
        .ok_or("usage: marketlens-ingest <roster.csv>")?;
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "marketlens.db".to_string());
    let lookback_days = std::env::var("LOOKBACK_DAYS")
        .unwrap_or_else(|_| "730".to_string())
        .parse::<u64>()
        .unwrap_or(730);

    let mut reader = csv::Reader::from_path(&roster_path)?;
    let rows: Vec<RosterRow> = reader.deserialize().collect::<Result<_, _>>()?;
    println!("Loaded {} roster rows from {}", rows.len(), roster_path);

    let store = SqliteMarketStore::open(&database_path, 1)?;
    let conn = store.acquire().await?;
    let downloader = PriceDownloader::with_config(DownloaderConfig::default())?;

    let end = Utc::now().date_naive();
    let start = end.checked_sub_days(Days::new(lookback_days)).unwrap_or(end);

    let mut fetched = 0usize;
    let mut failed = 0usize;
    for (index, row) in rows.iter().enumerate() {
        let industry_id = conn.get_or_create_industry(&row.industry)?;
        conn.register_instrument(
            industry_id,
            &InstrumentRecord {
                symbol: row.symbol.clone(),
                company_name: row.company_name.clone(),
                market_cap: row.market_cap,
                pe_ratio: row.pe_ratio,
                revenue: row.revenue,
            },
        )?;

        println!("[{}/{}] {} ({})", index + 1, rows.len(), row.symbol, row.industry);
        match downloader.fetch_daily_bars(&row.symbol, start, end).await {
            Ok(bars) => {
                let written = conn.upsert_daily_prices(&row.symbol, &bars)?;
                println!("  upserted {} rows", written);
                fetched += 1;
            }
            Err(err) => {
                log::warn!("skipping {}: {}", row.symbol, err);
                failed += 1;
            }
        }

        // Stay under the provider's rate limit between symbols.
        tokio::time::sleep(downloader.request_pause()).await;
    }

    println!();
    println!("Done: {} fetched, {} failed", fetched, failed);
    Ok(())
}
