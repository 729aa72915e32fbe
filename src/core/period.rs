//! Quarter keys (`YYYYQ#`)
//!
//! A period key names one snapshot. Keys are normalized (trimmed, upper-cased)
//! so `2010q1` and ` 2010Q1 ` address the same document, and because the
//! format is fixed-width their lexicographic order is also chronological.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Sentinel key for source files whose name carries no quarter token
pub const UNKNOWN_PERIOD: &str = "unknown";

static FILENAME_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]{4})Q([0-9])").expect("period pattern is valid"));

static STRICT_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}Q[0-9]$").expect("period pattern is valid"));

/// A normalized quarter key such as `2010Q1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Normalize any text into a key without validating its shape
    ///
    /// Used for cache lookups where a malformed key should simply miss.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// The `"unknown"` sentinel
    pub fn unknown() -> Self {
        Self(UNKNOWN_PERIOD.to_string())
    }

    /// Extract the first `YYYYQ#` token found anywhere in a file name
    pub fn from_filename(filename: &str) -> Option<Self> {
        FILENAME_PERIOD
            .captures(filename)
            .map(|caps| Self(format!("{}Q{}", &caps[1], &caps[2])))
    }

    pub fn is_unknown(&self) -> bool {
        self.0.eq_ignore_ascii_case(UNKNOWN_PERIOD)
    }

    /// True when the key has the `YYYYQ#` shape
    pub fn is_well_formed(&self) -> bool {
        STRICT_PERIOD.is_match(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PeriodKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PeriodKey {
    type Err = PeriodError;

    /// Strict parse used for user input: the normalized text must be `YYYYQ#`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = Self::normalize(s);
        if key.is_well_formed() {
            Ok(key)
        } else {
            Err(PeriodError::Invalid(s.to_string()))
        }
    }
}

/// Errors from parsing a period key
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid period '{0}' (expected YYYYQ#, e.g. 2010Q1)")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename_finds_token_anywhere() {
        assert_eq!(
            PeriodKey::from_filename("brand_tracker_2010Q1_final.csv").unwrap().as_str(),
            "2010Q1"
        );
        assert_eq!(
            PeriodKey::from_filename("export-2012q4.tsv").unwrap().as_str(),
            "2012Q4"
        );
    }

    #[test]
    fn test_from_filename_without_token() {
        assert!(PeriodKey::from_filename("brands_latest.csv").is_none());
        assert!(PeriodKey::from_filename("2010-Q1.csv").is_none());
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(PeriodKey::normalize("  2010q3 ").as_str(), "2010Q3");
    }

    #[test]
    fn test_strict_parse() {
        assert_eq!("2011q2".parse::<PeriodKey>().unwrap().as_str(), "2011Q2");
        assert!("2011".parse::<PeriodKey>().is_err());
        assert!("11Q2".parse::<PeriodKey>().is_err());
        assert!("2011Q12".parse::<PeriodKey>().is_err());
    }

    #[test]
    fn test_ordering_is_chronological() {
        let mut keys: Vec<PeriodKey> = ["2011Q1", "2010Q4", "2010Q1", "2010Q2"]
            .iter()
            .map(|k| PeriodKey::normalize(k))
            .collect();
        keys.sort();
        let ordered: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(ordered, vec!["2010Q1", "2010Q2", "2010Q4", "2011Q1"]);
    }

    #[test]
    fn test_unknown_sentinel() {
        let key = PeriodKey::unknown();
        assert!(key.is_unknown());
        assert!(!key.is_well_formed());
    }

    #[test]
    fn test_only_ascii_digits_form_a_key() {
        // Arabic-Indic digits never form a year
        assert_eq!(PeriodKey::from_filename("brands_\u{0662}\u{0660}\u{0661}\u{0660}Q1.csv"), None);
        assert!(!PeriodKey::normalize("\u{0662}\u{0660}\u{0661}\u{0660}Q1").is_well_formed());
        assert!("\u{0662}\u{0660}\u{0661}\u{0660}Q1".parse::<PeriodKey>().is_err());
        assert!(PeriodKey::normalize("2010Q3").is_well_formed());
    }
}
