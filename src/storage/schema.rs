//! Database schema definitions

/// SQL to create the banks table
pub const CREATE_BANKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS banks (
    bank_id INTEGER PRIMARY KEY AUTOINCREMENT,
    bank_name TEXT NOT NULL UNIQUE
        CHECK (length(bank_name) > 0 AND length(bank_name) <= 100),
    app_name TEXT
        CHECK (app_name IS NULL OR length(app_name) <= 200),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the reviews table
///
/// The UNIQUE(bank_id, review_text, review_date) constraint is the natural
/// key used for duplicate detection across loader re-runs.
pub const CREATE_REVIEWS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reviews (
    review_id INTEGER PRIMARY KEY AUTOINCREMENT,
    bank_id INTEGER NOT NULL
        REFERENCES banks(bank_id) ON DELETE CASCADE,
    review_text TEXT NOT NULL
        CHECK (length(review_text) > 0),
    rating INTEGER NOT NULL
        CHECK (rating BETWEEN 1 AND 5),
    review_date TEXT NOT NULL,
    sentiment_label TEXT
        CHECK (sentiment_label IS NULL OR length(sentiment_label) <= 20),
    sentiment_score REAL
        CHECK (sentiment_score IS NULL
               OR (sentiment_score >= 0.0 AND sentiment_score <= 1.0)),
    source TEXT NOT NULL DEFAULT 'Google Play Store'
        CHECK (length(source) <= 50),
    processed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (bank_id, review_text, review_date)
)
"#;

/// SQL to create indexes
///
/// Downstream reporting filters/aggregates on each of these independently.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_reviews_bank_id ON reviews(bank_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_rating ON reviews(rating)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_sentiment_label ON reviews(sentiment_label)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_review_date ON reviews(review_date)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_BANKS_TABLE, CREATE_REVIEWS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
