use crate::store::DailyBar;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the daily price downloader.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: u32,
    /// Rate limit: requests per second (default: 1.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        DownloaderConfig {
            max_retries: 3,
            requests_per_second: 1.0,
            timeout_seconds: 30,
        }
    }
}

/// Downloads historical daily closes from the upstream CSV endpoint.
///
/// Retries and rate limiting live here, in the collaborator; the core
/// pipeline never performs network I/O.
#[derive(Debug)]
pub struct PriceDownloader {
    client: Client,
    config: DownloaderConfig,
}

impl PriceDownloader {
    /// Creates a downloader with default configuration.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_config(DownloaderConfig::default())
    }

    /// Creates a downloader with custom configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::ClientCreation(e.to_string()))?;

        Ok(PriceDownloader { client, config })
    }

    /// Maps a stored symbol to the provider's format.
    ///
    /// Class shares use a dash upstream: "BRK.B" -> "BRK-B".
    pub fn provider_symbol(symbol: &str) -> String {
        symbol.replace('.', "-")
    }

    /// Minimum pause between consecutive requests under the configured rate
    /// limit. Callers iterating many symbols should sleep this long between
    /// downloads.
    pub fn request_pause(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.requests_per_second.max(0.01))
    }

    /// Downloads and parses daily bars for one symbol.
    ///
    /// # Arguments
    /// * `symbol` - Stored symbol (provider mapping is applied internally)
    /// * `start_date` - First date requested (inclusive)
    /// * `end_date` - Last date requested (inclusive)
    ///
    /// # Errors
    /// Returns `DownloadError` after exhausting the configured retries, or
    /// immediately on an unparseable response.
    pub async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, DownloadError> {
        let provider_symbol = Self::provider_symbol(symbol);
        let mut attempt = 0;
        loop {
            match self.fetch_csv(&provider_symbol, start_date, end_date).await {
                Ok(text) => {
                    let bars = parse_daily_csv(&text)?;
                    log::info!("fetched {} rows for {}", bars.len(), symbol);
                    return Ok(bars);
                }
                Err(err) if attempt < self.config.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "download attempt {} for {} failed: {}",
                        attempt,
                        symbol,
                        err
                    );
                    tokio::time::sleep(self.request_pause()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_csv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<String, DownloadError> {
        let start_timestamp = start_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| DownloadError::InvalidDate("invalid start date".to_string()))?
            .and_utc()
            .timestamp();
        let end_timestamp = end_date
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| DownloadError::InvalidDate("invalid end date".to_string()))?
            .and_utc()
            .timestamp();

        let url = format!(
            "https://query1.finance.yahoo.com/v7/finance/download/{}?period1={}&period2={}&interval=1d&events=history",
            symbol, start_timestamp, end_timestamp
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::ApiError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown error")
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DownloadError::ParseError(e.to_string()))
    }

    /// Returns a reference to the HTTP client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: String,
    #[serde(rename = "Adj Close")]
    adj_close: String,
    #[serde(rename = "Volume")]
    volume: String,
}

/// Parses the provider's daily-history CSV into bars.
///
/// Rows with a `null` close are skipped (holidays and halted sessions emit
/// them); a `null` or empty volume stores as 0.
fn parse_daily_csv(data: &str) -> Result<Vec<DailyBar>, DownloadError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut bars = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result.map_err(|e| DownloadError::ParseError(e.to_string()))?;

        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| DownloadError::ParseError(format!("bad date '{}': {}", row.date, e)))?;

        if row.close == "null" || row.close.is_empty() {
            continue;
        }
        let close: f64 = row
            .close
            .parse()
            .map_err(|e| DownloadError::ParseError(format!("bad close '{}': {}", row.close, e)))?;

        let adj_close = match row.adj_close.as_str() {
            "null" | "" => None,
            text => Some(text.parse::<f64>().map_err(|e| {
                DownloadError::ParseError(format!("bad adj close '{}': {}", text, e))
            })?),
        };

        let volume = match row.volume.as_str() {
            "null" | "" => 0,
            text => text.parse::<i64>().map_err(|e| {
                DownloadError::ParseError(format!("bad volume '{}': {}", text, e))
            })?,
        };

        bars.push(DailyBar {
            date,
            close,
            adj_close,
            volume,
        });
    }

    Ok(bars)
}

/// Errors that can occur while downloading daily prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// HTTP client creation failed
    ClientCreation(String),
    /// Network error occurred
    NetworkError(String),
    /// The endpoint returned an error response
    ApiError(String),
    /// Failed to parse response data
    ParseError(String),
    /// Invalid date provided
    InvalidDate(String),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadError::ClientCreation(msg) => write!(f, "client creation error: {}", msg),
            DownloadError::NetworkError(msg) => write!(f, "network error: {}", msg),
            DownloadError::ApiError(msg) => write!(f, "API error: {}", msg),
            DownloadError::ParseError(msg) => write!(f, "parse error: {}", msg),
            DownloadError::InvalidDate(msg) => write!(f, "invalid date: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}
