//! Review types - stored rows and the loader's input records
//!
//! `ProcessedRecord` is what the upstream cleaning/analysis stages hand to
//! the loader (one CSV row); `Review` is a row of the `reviews` table.
//! Validation of the declared invariants happens here, before any storage
//! is attempted, so a bad record is reported with the offending fields
//! rather than as an opaque storage error.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Source platform recorded when a record carries none.
pub const DEFAULT_SOURCE: &str = "Google Play Store";

/// Review text longer than this is truncated on load, matching the
/// upstream pipeline's cap.
pub const MAX_REVIEW_TEXT_CHARS: usize = 10_000;

const MAX_BANK_NAME_CHARS: usize = 100;
const MAX_APP_NAME_CHARS: usize = 200;
const MAX_SENTIMENT_LABEL_CHARS: usize = 20;
const MAX_SOURCE_CHARS: usize = 50;

/// One processed review record as supplied to the loader.
///
/// Field aliases accept the header names used by the upstream CSV exports
/// (`bank`, `review`, `date`). Sentiment fields are absent when a batch is
/// loaded before analysis and present when reloading after analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    #[serde(alias = "bank_name")]
    pub bank: String,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(alias = "review")]
    pub review_text: String,
    pub rating: i64,
    #[serde(alias = "date")]
    pub review_date: String,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ProcessedRecord {
    /// Create a record with the minimal required fields (tests and
    /// programmatic callers; CSV input deserializes directly).
    pub fn new(
        bank: impl Into<String>,
        review_text: impl Into<String>,
        rating: i64,
        review_date: impl Into<String>,
    ) -> Self {
        Self {
            bank: bank.into(),
            app_name: None,
            review_text: review_text.into(),
            rating,
            review_date: review_date.into(),
            sentiment_label: None,
            sentiment_score: None,
            source: None,
        }
    }

    /// Attach sentiment fields (the reanalysis-reload case)
    pub fn with_sentiment(mut self, label: impl Into<String>, score: f64) -> Self {
        self.sentiment_label = Some(label.into());
        self.sentiment_score = Some(score);
        self
    }

    /// Validate every declared invariant and return the parsed review date.
    ///
    /// Checks: non-empty bank name and review text, rating in [1,5],
    /// sentiment score (if any) finite and in [0,1], parseable ISO date,
    /// and the schema's column length limits.
    pub fn validate(&self) -> Result<NaiveDate> {
        if self.bank.trim().is_empty() {
            return Err(Error::Validation("bank name is required".into()));
        }
        if self.bank.chars().count() > MAX_BANK_NAME_CHARS {
            return Err(Error::Validation(format!(
                "bank name exceeds {} characters",
                MAX_BANK_NAME_CHARS
            )));
        }
        if let Some(app) = &self.app_name {
            if app.chars().count() > MAX_APP_NAME_CHARS {
                return Err(Error::Validation(format!(
                    "app name exceeds {} characters",
                    MAX_APP_NAME_CHARS
                )));
            }
        }
        if self.review_text.trim().is_empty() {
            return Err(Error::Validation("review text is required".into()));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(Error::Validation(format!(
                "rating {} outside valid range 1-5",
                self.rating
            )));
        }
        if let Some(score) = self.sentiment_score {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(Error::Validation(format!(
                    "sentiment score {} outside valid range 0.0-1.0",
                    score
                )));
            }
        }
        if let Some(label) = &self.sentiment_label {
            if label.chars().count() > MAX_SENTIMENT_LABEL_CHARS {
                return Err(Error::Validation(format!(
                    "sentiment label exceeds {} characters",
                    MAX_SENTIMENT_LABEL_CHARS
                )));
            }
        }
        if let Some(source) = &self.source {
            if source.chars().count() > MAX_SOURCE_CHARS {
                return Err(Error::Validation(format!(
                    "source exceeds {} characters",
                    MAX_SOURCE_CHARS
                )));
            }
        }
        NaiveDate::parse_from_str(self.review_date.trim(), "%Y-%m-%d").map_err(|_| {
            Error::Validation(format!(
                "review date '{}' is not a valid YYYY-MM-DD date",
                self.review_date
            ))
        })
    }

    /// Review text trimmed and capped at [`MAX_REVIEW_TEXT_CHARS`]
    pub fn clipped_text(&self) -> String {
        let trimmed = self.review_text.trim();
        if trimmed.chars().count() > MAX_REVIEW_TEXT_CHARS {
            trimmed.chars().take(MAX_REVIEW_TEXT_CHARS).collect()
        } else {
            trimmed.to_string()
        }
    }

    /// Source platform, falling back to [`DEFAULT_SOURCE`]
    pub fn source_or_default(&self) -> &str {
        self.source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SOURCE)
    }

    /// Sentiment score rounded to the 4 fractional digits the schema keeps
    pub fn rounded_score(&self) -> Option<f64> {
        self.sentiment_score.map(|s| (s * 10_000.0).round() / 10_000.0)
    }

    /// True when the record carries any sentiment output
    pub fn has_sentiment(&self) -> bool {
        self.sentiment_label.is_some() || self.sentiment_score.is_some()
    }
}

/// A review as stored in the `reviews` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Surrogate id, assigned by the database
    pub review_id: i64,
    /// Owning bank (FK to `banks.bank_id`, cascades on delete)
    pub bank_id: i64,
    pub review_text: String,
    /// Star rating, 1-5 inclusive
    pub rating: u8,
    pub review_date: NaiveDate,
    pub sentiment_label: Option<String>,
    /// In [0.0, 1.0] when present, 4 fractional digits
    pub sentiment_score: Option<f64>,
    pub source: String,
    /// Timestamp of the last load/update, set by the database
    pub processed_at: String,
}

/// Field set for inserting a new review row (ids and timestamps are
/// assigned by the database).
#[derive(Debug, Clone)]
pub struct NewReview {
    pub bank_id: i64,
    pub review_text: String,
    pub rating: u8,
    pub review_date: NaiveDate,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> ProcessedRecord {
        ProcessedRecord::new("CBE", "Great app", 5, "2024-01-01")
    }

    #[test]
    fn test_valid_record_passes() {
        let date = valid_record().validate().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        for rating in [0, 6, -1, 7] {
            let mut rec = valid_record();
            rec.rating = rating;
            let err = rec.validate().unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "rating {} should fail", rating);
        }
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        for score in [-0.1, 1.5, f64::NAN] {
            let mut rec = valid_record();
            rec.sentiment_score = Some(score);
            assert!(rec.validate().is_err(), "score {} should fail", score);
        }
    }

    #[test]
    fn test_score_boundaries_accepted() {
        for score in [0.0, 1.0, 0.5] {
            let mut rec = valid_record();
            rec.sentiment_score = Some(score);
            assert!(rec.validate().is_ok(), "score {} should pass", score);
        }
    }

    #[test]
    fn test_empty_text_rejected() {
        let mut rec = valid_record();
        rec.review_text = "   ".into();
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_empty_bank_rejected() {
        let mut rec = valid_record();
        rec.bank = String::new();
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut rec = valid_record();
        rec.review_date = "01/02/2024".into();
        assert!(rec.validate().is_err());

        rec.review_date = "2024-13-40".into();
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_overlong_label_rejected() {
        let mut rec = valid_record();
        rec.sentiment_label = Some("X".repeat(21));
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_text_clipping() {
        let mut rec = valid_record();
        rec.review_text = "a".repeat(MAX_REVIEW_TEXT_CHARS + 500);
        assert_eq!(rec.clipped_text().chars().count(), MAX_REVIEW_TEXT_CHARS);

        rec.review_text = "  short  ".into();
        assert_eq!(rec.clipped_text(), "short");
    }

    #[test]
    fn test_source_default() {
        let mut rec = valid_record();
        assert_eq!(rec.source_or_default(), DEFAULT_SOURCE);

        rec.source = Some("App Store".into());
        assert_eq!(rec.source_or_default(), "App Store");

        rec.source = Some("".into());
        assert_eq!(rec.source_or_default(), DEFAULT_SOURCE);
    }

    #[test]
    fn test_score_rounding() {
        let mut rec = valid_record();
        rec.sentiment_score = Some(0.123456);
        assert_eq!(rec.rounded_score(), Some(0.1235));
    }
}
