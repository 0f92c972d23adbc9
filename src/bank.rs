//! Bank entity and the known-bank registry
//!
//! A `Bank` row represents one banking institution whose app reviews are
//! tracked. Names are globally unique; the storage layer is the arbiter.

use serde::{Deserialize, Serialize};

/// A bank as stored in the `banks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    /// Surrogate id, assigned by the database and immutable once set
    pub bank_id: i64,
    /// Human-readable name, unique across all banks
    pub bank_name: String,
    /// Play Store package name of the bank's app, when known
    pub app_name: Option<String>,
    /// Insertion timestamp, set by the database
    pub created_at: String,
}

/// Banks tracked by the original collection run, with their verified
/// Play Store app ids. Keyed by short code and full name.
pub const KNOWN_BANKS: &[(&str, &str, &str)] = &[
    ("CBE", "Commercial Bank of Ethiopia", "com.combanketh.mobilebanking"),
    ("BOA", "Bank of Abyssinia", "com.boa.boaMobileBanking"),
    ("DASHEN", "Dashen Bank", "com.dashen.dashensuperapp"),
];

/// Look up the Play Store app id for a bank by short code or full name.
///
/// Used to backfill `app_name` when an input batch omits it. Matching is
/// case-insensitive; unknown banks return `None` and are stored without
/// an app name.
pub fn known_app_id(bank_name: &str) -> Option<&'static str> {
    let needle = bank_name.trim();
    KNOWN_BANKS
        .iter()
        .find(|(code, name, _)| code.eq_ignore_ascii_case(needle) || name.eq_ignore_ascii_case(needle))
        .map(|(_, _, app_id)| *app_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_app_id_by_code() {
        assert_eq!(known_app_id("CBE"), Some("com.combanketh.mobilebanking"));
        assert_eq!(known_app_id("boa"), Some("com.boa.boaMobileBanking"));
    }

    #[test]
    fn test_known_app_id_by_full_name() {
        assert_eq!(known_app_id("Dashen Bank"), Some("com.dashen.dashensuperapp"));
        assert_eq!(
            known_app_id("commercial bank of ethiopia"),
            Some("com.combanketh.mobilebanking")
        );
    }

    #[test]
    fn test_unknown_bank() {
        assert_eq!(known_app_id("Awash Bank"), None);
        assert_eq!(known_app_id(""), None);
    }
}
