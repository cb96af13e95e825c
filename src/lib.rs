pub mod observation;
pub mod lookback;
pub mod returns;
pub mod batch;
pub mod concentration;
pub mod sanitize;
pub mod store;
pub mod sqlite_store;
pub mod report;
pub mod fetcher;
pub mod server;

#[cfg(test)]
mod integration_tests;

pub use observation::{InstrumentSeries, Observation};
pub use lookback::{LookbackWindow, OffsetConvention};
pub use returns::{compute_return, compute_return_at, ReturnResult};
pub use batch::{evaluate, evaluate_with, WindowValues};
pub use concentration::aggregate;
pub use sanitize::{safe_float, safe_int};
pub use store::{
    DailyBar, IndustryRef, InMemoryMarketStore, InstrumentRecord, MarketStore, PriceRow,
    StoreError,
};
pub use sqlite_store::{SqliteMarketStore, StoreConnection};
pub use report::{
    build_group_report, Concentration, GroupReport, HistoryPoint, InstrumentMetrics, ReportError,
    ReportOptions, ReturnTable,
};
pub use fetcher::{DownloadError, DownloaderConfig, PriceDownloader};
pub use server::{run_server, ApiError, AppState, ServerConfig};
