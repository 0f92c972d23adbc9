//! Loader - idempotent batch reconciliation into the review store
//!
//! Takes a batch of processed review records and reconciles them into the
//! schema: banks are looked up or created (the storage-layer uniqueness
//! constraint is the arbiter), records are validated before storage, and
//! every input record lands in exactly one of inserted / updated / skipped /
//! rejected. One malformed record never aborts its siblings.

use std::collections::HashMap;

use serde::Serialize;

use crate::bank;
use crate::review::{NewReview, ProcessedRecord};
use crate::storage::ReviewStore;
use crate::{Error, Result};

/// Why one record was not written, keyed by its position in the batch.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    /// Zero-based index of the record in the input batch
    pub index: usize,
    pub bank: String,
    /// Leading characters of the review text, for identification
    pub excerpt: String,
    pub reason: String,
}

const EXCERPT_CHARS: usize = 40;

impl Rejection {
    fn new(index: usize, record: &ProcessedRecord, reason: impl ToString) -> Self {
        Self {
            index,
            bank: record.bank.clone(),
            excerpt: record.review_text.chars().take(EXCERPT_CHARS).collect(),
            reason: reason.to_string(),
        }
    }
}

/// Per-batch accounting. Every input record is counted exactly once.
#[derive(Debug, Default, Serialize)]
pub struct LoadSummary {
    /// New review rows created
    pub inserted: usize,
    /// Existing rows whose sentiment fields were rewritten
    pub updated: usize,
    /// Records matching an existing row with nothing new to write
    pub skipped: usize,
    /// Records refused, with reasons
    pub rejected: Vec<Rejection>,
}

impl LoadSummary {
    /// Total records accounted for
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.skipped + self.rejected.len()
    }

    /// True when nothing was rejected
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl std::fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Load Summary:")?;
        writeln!(f, "  Inserted: {}", self.inserted)?;
        writeln!(f, "  Updated: {}", self.updated)?;
        writeln!(f, "  Skipped (duplicates): {}", self.skipped)?;
        writeln!(f, "  Rejected: {}", self.rejected.len())?;
        for r in &self.rejected {
            writeln!(f, "    [{}] {} \"{}\": {}", r.index, r.bank, r.excerpt, r.reason)?;
        }
        Ok(())
    }
}

enum Outcome {
    Inserted,
    Updated,
    Skipped,
}

/// Batch loader over an open [`ReviewStore`].
///
/// Bank ids resolved during a batch are cached, so each distinct bank name
/// costs at most one lookup-or-create round trip.
pub struct Loader<'a> {
    store: &'a ReviewStore,
    bank_ids: HashMap<String, i64>,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a ReviewStore) -> Self {
        Self {
            store,
            bank_ids: HashMap::new(),
        }
    }

    /// Reconcile a batch of records into the store.
    ///
    /// Per-record failures are collected into the summary rather than
    /// propagated; by the time this returns, `summary.total()` equals
    /// `records.len()`.
    pub fn load(&mut self, records: &[ProcessedRecord]) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for (index, record) in records.iter().enumerate() {
            match self.load_record(index, record) {
                Ok(Outcome::Inserted) => summary.inserted += 1,
                Ok(Outcome::Updated) => summary.updated += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(rejection) => {
                    tracing::warn!(
                        index = rejection.index,
                        bank = %rejection.bank,
                        reason = %rejection.reason,
                        "record rejected"
                    );
                    summary.rejected.push(rejection);
                }
            }
        }

        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            rejected = summary.rejected.len(),
            "batch loaded"
        );
        summary
    }

    fn load_record(
        &mut self,
        index: usize,
        record: &ProcessedRecord,
    ) -> std::result::Result<Outcome, Rejection> {
        // Validate before touching storage so failures carry the record
        let review_date = record
            .validate()
            .map_err(|e| Rejection::new(index, record, e))?;

        let bank_id = self
            .resolve_bank(record)
            .map_err(|e| Rejection::new(index, record, e))?;

        let review_text = record.clipped_text();
        let sentiment_score = record.rounded_score();

        let existing = self
            .store
            .find_review_by_key(bank_id, &review_text, review_date)
            .map_err(|e| Rejection::new(index, record, e))?;

        if let Some(existing) = existing {
            // Already loaded: rewrite sentiment if this batch brings new
            // analysis output, otherwise it is an exact duplicate.
            let changed = record.has_sentiment()
                && (existing.sentiment_label != record.sentiment_label
                    || existing.sentiment_score != sentiment_score);
            if changed {
                self.store
                    .update_review_sentiment(
                        existing.review_id,
                        record.sentiment_label.as_deref(),
                        sentiment_score,
                    )
                    .map_err(|e| Rejection::new(index, record, e))?;
                tracing::debug!(review_id = existing.review_id, "sentiment updated");
                return Ok(Outcome::Updated);
            }
            tracing::debug!(review_id = existing.review_id, "duplicate skipped");
            return Ok(Outcome::Skipped);
        }

        let new_review = NewReview {
            bank_id,
            review_text,
            rating: record.rating as u8,
            review_date,
            sentiment_label: record.sentiment_label.clone(),
            sentiment_score,
            source: record.source_or_default().to_string(),
        };
        self.store
            .insert_review(&new_review)
            .map_err(|e| Rejection::new(index, record, e))?;
        Ok(Outcome::Inserted)
    }

    /// Resolve a bank name to its id, creating the bank on first sight.
    ///
    /// Insert first; a uniqueness violation means another writer (or an
    /// earlier batch) created it, so fall back to lookup instead of
    /// propagating the failure. Check-then-insert would race.
    fn resolve_bank(&mut self, record: &ProcessedRecord) -> Result<i64> {
        let name = record.bank.trim();
        if let Some(&id) = self.bank_ids.get(name) {
            return Ok(id);
        }

        let app_name = record
            .app_name
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .or_else(|| bank::known_app_id(name));

        let id = match self.store.insert_bank(name, app_name) {
            Ok(id) => {
                tracing::debug!(bank = name, id, "bank created");
                id
            }
            Err(Error::DuplicateBank(_)) => self
                .store
                .find_bank_by_name(name)?
                .ok_or_else(|| Error::BankNotFound(name.to_string()))?
                .bank_id,
            Err(e) => return Err(e),
        };

        self.bank_ids.insert(name.to_string(), id);
        Ok(id)
    }
}
