//! SQLite storage implementation

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::schema;
use crate::bank::Bank;
use crate::review::{NewReview, Review};
use crate::{Error, Result};

/// SQLite-backed storage for banks and their reviews.
///
/// One `ReviewStore` is the scoped handle to the database for a run: open
/// it once, pass it into the loader, and let it drop on every exit path.
pub struct ReviewStore {
    conn: Connection,
}

impl ReviewStore {
    /// Open a database file (creates and migrates if it doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    ///
    /// SQLite leaves foreign keys off per connection, so the cascade
    /// behavior depends on the pragma being set here.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Bank Operations ==========

    /// Insert a new bank, returning its assigned id.
    ///
    /// A uniqueness violation on `bank_name` maps to [`Error::DuplicateBank`]
    /// so callers can recover by re-resolving instead of failing the batch.
    pub fn insert_bank(&self, bank_name: &str, app_name: Option<&str>) -> Result<i64> {
        match self.conn.execute(
            "INSERT INTO banks (bank_name, app_name) VALUES (?1, ?2)",
            params![bank_name, app_name],
        ) {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(Error::DuplicateBank(bank_name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a bank by its unique name
    pub fn find_bank_by_name(&self, bank_name: &str) -> Result<Option<Bank>> {
        self.conn
            .query_row(
                "SELECT bank_id, bank_name, app_name, created_at FROM banks WHERE bank_name = ?1",
                [bank_name],
                row_to_bank,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a bank by id
    pub fn get_bank(&self, bank_id: i64) -> Result<Option<Bank>> {
        self.conn
            .query_row(
                "SELECT bank_id, bank_name, app_name, created_at FROM banks WHERE bank_id = ?1",
                [bank_id],
                row_to_bank,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all banks ordered by name
    pub fn list_banks(&self) -> Result<Vec<Bank>> {
        let mut stmt = self.conn.prepare(
            "SELECT bank_id, bank_name, app_name, created_at FROM banks ORDER BY bank_name",
        )?;
        let banks = stmt
            .query_map([], row_to_bank)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(banks)
    }

    /// Delete a bank; its reviews are removed by the cascade.
    ///
    /// Returns the number of bank rows deleted (0 or 1).
    pub fn delete_bank(&self, bank_id: i64) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM banks WHERE bank_id = ?1", [bank_id])?;
        Ok(deleted)
    }

    /// Count all banks
    pub fn count_banks(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM banks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Review Operations ==========

    /// Insert a review row, returning its assigned id.
    ///
    /// Constraint violations (range checks, FK, natural-key collision) come
    /// back as storage errors; the loader pre-validates what it can and
    /// reports the rest per record.
    pub fn insert_review(&self, review: &NewReview) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO reviews
            (bank_id, review_text, rating, review_date, sentiment_label, sentiment_score, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                review.bank_id,
                review.review_text,
                review.rating,
                review.review_date,
                review.sentiment_label,
                review.sentiment_score,
                review.source,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Find a review by its natural key (bank, text, date).
    ///
    /// This is how loader re-runs recognize an already-loaded record.
    pub fn find_review_by_key(
        &self,
        bank_id: i64,
        review_text: &str,
        review_date: NaiveDate,
    ) -> Result<Option<Review>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {REVIEW_COLUMNS} FROM reviews
                     WHERE bank_id = ?1 AND review_text = ?2 AND review_date = ?3"
                ),
                params![bank_id, review_text, review_date],
                row_to_review,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Rewrite the sentiment fields of an existing review (reanalysis)
    pub fn update_review_sentiment(
        &self,
        review_id: i64,
        sentiment_label: Option<&str>,
        sentiment_score: Option<f64>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE reviews
             SET sentiment_label = ?1, sentiment_score = ?2, processed_at = CURRENT_TIMESTAMP
             WHERE review_id = ?3",
            params![sentiment_label, sentiment_score, review_id],
        )?;
        Ok(())
    }

    /// All reviews for one bank (uses idx_reviews_bank_id)
    pub fn reviews_for_bank(&self, bank_id: i64) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE bank_id = ?1 ORDER BY review_date"
        ))?;
        let reviews = stmt
            .query_map([bank_id], row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// All reviews with a given star rating (uses idx_reviews_rating)
    pub fn reviews_by_rating(&self, rating: u8) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE rating = ?1 ORDER BY review_date"
        ))?;
        let reviews = stmt
            .query_map([rating], row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// All reviews with a given sentiment label (uses idx_reviews_sentiment_label)
    pub fn reviews_by_sentiment(&self, sentiment_label: &str) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE sentiment_label = ?1 ORDER BY review_date"
        ))?;
        let reviews = stmt
            .query_map([sentiment_label], row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// All reviews in a date range, inclusive (uses idx_reviews_review_date)
    pub fn reviews_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE review_date BETWEEN ?1 AND ?2 ORDER BY review_date"
        ))?;
        let reviews = stmt
            .query_map(params![from, to], row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// Count all reviews
    pub fn count_reviews(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count reviews owned by one bank
    pub fn count_reviews_for_bank(&self, bank_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE bank_id = ?1",
            [bank_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== Reporting Reads ==========

    /// Review count per bank, including banks with no reviews yet
    pub fn reviews_per_bank(&self) -> Result<Vec<(Bank, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.bank_id, b.bank_name, b.app_name, b.created_at, COUNT(r.review_id)
             FROM banks b LEFT JOIN reviews r ON r.bank_id = b.bank_id
             GROUP BY b.bank_id ORDER BY b.bank_name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let bank = row_to_bank(row)?;
                let count: i64 = row.get(4)?;
                Ok((bank, count as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Review count per star rating, highest first
    pub fn rating_distribution(&self) -> Result<Vec<(u8, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT rating, COUNT(*) FROM reviews GROUP BY rating ORDER BY rating DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let rating: u8 = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((rating, count as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Review count per sentiment label; unscored reviews appear as `None`
    pub fn sentiment_breakdown(&self) -> Result<Vec<(Option<String>, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT sentiment_label, COUNT(*) FROM reviews
             GROUP BY sentiment_label ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let label: Option<String> = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((label, count as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let scored: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE sentiment_label IS NOT NULL OR sentiment_score IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let avg_rating: Option<f64> =
            self.conn
                .query_row("SELECT AVG(rating) FROM reviews", [], |row| row.get(0))?;
        Ok(DbStats {
            banks: self.count_banks()?,
            reviews: self.count_reviews()?,
            scored: scored as usize,
            avg_rating,
        })
    }
}

const REVIEW_COLUMNS: &str = "review_id, bank_id, review_text, rating, review_date, \
                              sentiment_label, sentiment_score, source, processed_at";

fn row_to_bank(row: &rusqlite::Row) -> rusqlite::Result<Bank> {
    Ok(Bank {
        bank_id: row.get(0)?,
        bank_name: row.get(1)?,
        app_name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_review(row: &rusqlite::Row) -> rusqlite::Result<Review> {
    Ok(Review {
        review_id: row.get(0)?,
        bank_id: row.get(1)?,
        review_text: row.get(2)?,
        rating: row.get(3)?,
        review_date: row.get(4)?,
        sentiment_label: row.get(5)?,
        sentiment_score: row.get(6)?,
        source: row.get(7)?,
        processed_at: row.get(8)?,
    })
}

/// True when the error is a UNIQUE (or PK) constraint violation
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub banks: usize,
    pub reviews: usize,
    /// Reviews carrying sentiment output
    pub scored: usize,
    pub avg_rating: Option<f64>,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Banks: {}", self.banks)?;
        writeln!(f, "  Reviews: {}", self.reviews)?;
        writeln!(f, "  With sentiment: {}", self.scored)?;
        match self.avg_rating {
            Some(avg) => writeln!(f, "  Average rating: {:.2}", avg),
            None => writeln!(f, "  Average rating: n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_review(bank_id: i64, text: &str, rating: u8, day: &str) -> NewReview {
        NewReview {
            bank_id,
            review_text: text.to_string(),
            rating,
            review_date: date(day),
            sentiment_label: None,
            sentiment_score: None,
            source: crate::DEFAULT_SOURCE.to_string(),
        }
    }

    #[test]
    fn test_bank_crud() {
        let store = ReviewStore::open_in_memory().unwrap();

        let id = store.insert_bank("CBE", Some("com.combanketh.mobilebanking")).unwrap();
        let bank = store.find_bank_by_name("CBE").unwrap().unwrap();
        assert_eq!(bank.bank_id, id);
        assert_eq!(bank.app_name.as_deref(), Some("com.combanketh.mobilebanking"));
        assert!(!bank.created_at.is_empty());

        let by_id = store.get_bank(id).unwrap().unwrap();
        assert_eq!(by_id.bank_name, "CBE");

        assert!(store.find_bank_by_name("BOA").unwrap().is_none());
        assert!(store.get_bank(999).unwrap().is_none());
        assert_eq!(store.count_banks().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_bank_name_is_distinct_error() {
        let store = ReviewStore::open_in_memory().unwrap();
        store.insert_bank("CBE", None).unwrap();

        // Same name with a different app name still violates uniqueness
        let err = store.insert_bank("CBE", Some("other.app")).unwrap_err();
        assert!(matches!(err, Error::DuplicateBank(name) if name == "CBE"));
        assert_eq!(store.count_banks().unwrap(), 1);
    }

    #[test]
    fn test_review_roundtrip() {
        let store = ReviewStore::open_in_memory().unwrap();
        let bank_id = store.insert_bank("CBE", None).unwrap();

        let mut review = sample_review(bank_id, "Great app", 5, "2024-01-01");
        review.sentiment_label = Some("POSITIVE".to_string());
        review.sentiment_score = Some(0.9876);
        store.insert_review(&review).unwrap();

        let stored = store
            .find_review_by_key(bank_id, "Great app", date("2024-01-01"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.rating, 5);
        assert_eq!(stored.review_date, date("2024-01-01"));
        assert_eq!(stored.sentiment_label.as_deref(), Some("POSITIVE"));
        assert_eq!(stored.sentiment_score, Some(0.9876));
        assert_eq!(stored.source, crate::DEFAULT_SOURCE);
    }

    #[test]
    fn test_rating_check_enforced_by_storage() {
        let store = ReviewStore::open_in_memory().unwrap();
        let bank_id = store.insert_bank("CBE", None).unwrap();

        let bad = sample_review(bank_id, "bad", 7, "2024-01-02");
        let err = store.insert_review(&bad).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        ));
        assert_eq!(store.count_reviews().unwrap(), 0);
    }

    #[test]
    fn test_score_check_enforced_by_storage() {
        let store = ReviewStore::open_in_memory().unwrap();
        let bank_id = store.insert_bank("CBE", None).unwrap();

        let mut bad = sample_review(bank_id, "meh", 3, "2024-01-02");
        bad.sentiment_score = Some(1.5);
        assert!(store.insert_review(&bad).is_err());
        assert_eq!(store.count_reviews().unwrap(), 0);
    }

    #[test]
    fn test_referential_integrity_enforced() {
        let store = ReviewStore::open_in_memory().unwrap();

        let orphan = sample_review(999, "no such bank", 3, "2024-01-02");
        assert!(store.insert_review(&orphan).is_err());
    }

    #[test]
    fn test_natural_key_collision_rejected() {
        let store = ReviewStore::open_in_memory().unwrap();
        let bank_id = store.insert_bank("CBE", None).unwrap();

        let review = sample_review(bank_id, "Great app", 5, "2024-01-01");
        store.insert_review(&review).unwrap();
        assert!(store.insert_review(&review).is_err());
        assert_eq!(store.count_reviews().unwrap(), 1);
    }

    #[test]
    fn test_cascade_delete() {
        let store = ReviewStore::open_in_memory().unwrap();
        let cbe = store.insert_bank("CBE", None).unwrap();
        let boa = store.insert_bank("BOA", None).unwrap();

        store.insert_review(&sample_review(cbe, "one", 4, "2024-01-01")).unwrap();
        store.insert_review(&sample_review(cbe, "two", 2, "2024-01-02")).unwrap();
        store.insert_review(&sample_review(boa, "three", 5, "2024-01-03")).unwrap();

        assert_eq!(store.delete_bank(cbe).unwrap(), 1);
        assert_eq!(store.count_banks().unwrap(), 1);
        // No orphan reviews remain
        assert_eq!(store.count_reviews().unwrap(), 1);
        assert!(store.reviews_for_bank(cbe).unwrap().is_empty());
    }

    #[test]
    fn test_indexed_lookup_paths() {
        let store = ReviewStore::open_in_memory().unwrap();
        let cbe = store.insert_bank("CBE", None).unwrap();
        let boa = store.insert_bank("BOA", None).unwrap();

        store.insert_review(&sample_review(cbe, "love it", 5, "2024-01-01")).unwrap();
        store.insert_review(&sample_review(cbe, "crashes", 1, "2024-02-01")).unwrap();
        let mut scored = sample_review(boa, "ok", 3, "2024-03-01");
        scored.sentiment_label = Some("NEUTRAL".to_string());
        scored.sentiment_score = Some(0.5);
        store.insert_review(&scored).unwrap();

        assert_eq!(store.reviews_for_bank(cbe).unwrap().len(), 2);
        assert_eq!(store.reviews_by_rating(5).unwrap().len(), 1);
        assert_eq!(store.reviews_by_sentiment("NEUTRAL").unwrap().len(), 1);
        let january = store
            .reviews_between(date("2024-01-01"), date("2024-01-31"))
            .unwrap();
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].review_text, "love it");
    }

    #[test]
    fn test_update_sentiment() {
        let store = ReviewStore::open_in_memory().unwrap();
        let bank_id = store.insert_bank("CBE", None).unwrap();
        let review_id = store
            .insert_review(&sample_review(bank_id, "fine", 4, "2024-01-01"))
            .unwrap();

        store
            .update_review_sentiment(review_id, Some("POSITIVE"), Some(0.8123))
            .unwrap();

        let stored = store
            .find_review_by_key(bank_id, "fine", date("2024-01-01"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.sentiment_label.as_deref(), Some("POSITIVE"));
        assert_eq!(stored.sentiment_score, Some(0.8123));
    }

    #[test]
    fn test_stats_and_breakdowns() {
        let store = ReviewStore::open_in_memory().unwrap();
        let cbe = store.insert_bank("CBE", None).unwrap();
        let boa = store.insert_bank("BOA", None).unwrap();

        store.insert_review(&sample_review(cbe, "one", 5, "2024-01-01")).unwrap();
        store.insert_review(&sample_review(cbe, "two", 5, "2024-01-02")).unwrap();
        let mut scored = sample_review(boa, "three", 1, "2024-01-03");
        scored.sentiment_label = Some("NEGATIVE".to_string());
        scored.sentiment_score = Some(0.1);
        store.insert_review(&scored).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.banks, 2);
        assert_eq!(stats.reviews, 3);
        assert_eq!(stats.scored, 1);
        assert!((stats.avg_rating.unwrap() - 11.0 / 3.0).abs() < 1e-9);

        let per_bank = store.reviews_per_bank().unwrap();
        assert_eq!(per_bank.len(), 2);
        // Ordered by bank name: BOA then CBE
        assert_eq!(per_bank[0].1, 1);
        assert_eq!(per_bank[1].1, 2);

        let ratings = store.rating_distribution().unwrap();
        assert_eq!(ratings, vec![(5, 2), (1, 1)]);

        let sentiments = store.sentiment_breakdown().unwrap();
        assert_eq!(sentiments[0], (None, 2));
        assert_eq!(sentiments[1], (Some("NEGATIVE".to_string()), 1));
    }
}
