//! Shared application state for the API server

use crate::report::ReportOptions;
use crate::sqlite_store::SqliteMarketStore;

/// Shared application state
///
/// The store owns the bounded connection pool; each request acquires one
/// connection for its lifetime and releases it on every exit path. Report
/// computation itself holds no shared mutable state.
#[derive(Clone)]
pub struct AppState {
    /// SQLite market store with its connection pool
    pub store: SqliteMarketStore,
    /// Assembly tunables applied to every report request
    pub options: ReportOptions,
}

impl AppState {
    /// Creates a new application state
    pub fn new(store: SqliteMarketStore, options: ReportOptions) -> Self {
        AppState { store, options }
    }
}
