//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - banks(bank_id, bank_name, app_name, created_at)
//! - reviews(review_id, bank_id, review_text, rating, review_date,
//!   sentiment_label, sentiment_score, source, processed_at)
//!
//! Integrity constraints (unique bank name, rating/score range checks,
//! cascade delete) live in the DDL, not in application code.

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, ReviewStore};
