//! # Bankrev - Bank App Review Store
//!
//! Persistence core for a mobile-banking review analytics pipeline.
//!
//! Bankrev provides:
//! - A two-table relational schema (banks, reviews) with declarative
//!   integrity constraints enforced by SQLite
//! - An idempotent batch loader that reconciles processed review records
//!   into the schema without duplicating data across re-runs
//! - CSV ingestion for record batches produced by the upstream
//!   scraping/cleaning/analysis stages
//! - Read paths for downstream reporting (per-bank counts, rating and
//!   sentiment breakdowns)

pub mod bank;
pub mod config;
pub mod ingest;
pub mod loader;
pub mod output;
pub mod review;
pub mod storage;

// Re-exports for convenient access
pub use bank::Bank;
pub use loader::{LoadSummary, Loader, Rejection};
pub use review::{ProcessedRecord, Review, DEFAULT_SOURCE};
pub use storage::ReviewStore;

/// Result type alias for Bankrev operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Bankrev operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Unique-constraint violation on `banks.bank_name`. Recoverable: the
    /// loader treats this as "someone already created it" and re-resolves
    /// by lookup.
    #[error("bank already exists: {0}")]
    DuplicateBank(String),

    #[error("bank not found: {0}")]
    BankNotFound(String),

    /// A record violates a declared invariant (rating range, score range,
    /// missing required field). Detected before storage is attempted.
    #[error("invalid record: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
