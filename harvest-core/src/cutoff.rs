//! Cutoff timestamp used to rewind clones to an earlier commit

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{Error, Result};

/// Accepted cutoff layout, e.g. `2024-03-01 23:59:59`
pub const CUTOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An instant in UTC; commits strictly earlier than it qualify for checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cutoff(DateTime<Utc>);

impl Cutoff {
    /// Parse a `YYYY-MM-DD HH:MM:SS` timestamp, interpreted as UTC
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        NaiveDateTime::parse_from_str(input, CUTOFF_FORMAT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| {
                Error::Config(format!(
                    "Invalid cutoff '{}': {}. Expected format YYYY-MM-DD HH:MM:SS",
                    input, e
                ))
            })
    }

    /// Parse an optional cutoff; blank input means no cutoff
    pub fn parse_optional(input: Option<&str>) -> Result<Option<Self>> {
        match input.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    /// Seconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// Whether a commit made at `seconds` (Unix time) is strictly before the cutoff
    pub fn admits(&self, seconds: i64) -> bool {
        seconds < self.timestamp()
    }
}

impl From<DateTime<Utc>> for Cutoff {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl FromStr for Cutoff {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CUTOFF_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let cutoff = Cutoff::parse("2024-03-01 12:00:00").unwrap();
        assert_eq!(cutoff.timestamp(), 1_709_294_400);
        assert_eq!(cutoff.to_string(), "2024-03-01 12:00:00");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(Cutoff::parse("  2024-03-01 12:00:00\n").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Cutoff::parse("2024-03-01").is_err());
        assert!(Cutoff::parse("2024-03-01T12:00:00").is_err());
        assert!(Cutoff::parse("yesterday").is_err());
    }

    #[test]
    fn test_parse_optional_blank_is_none() {
        assert!(Cutoff::parse_optional(None).unwrap().is_none());
        assert!(Cutoff::parse_optional(Some("   ")).unwrap().is_none());
        assert!(Cutoff::parse_optional(Some("2024-01-01 00:00:00"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_admits_is_strict() {
        let cutoff = Cutoff::parse("2024-03-01 12:00:00").unwrap();
        assert!(cutoff.admits(cutoff.timestamp() - 1));
        assert!(!cutoff.admits(cutoff.timestamp()));
        assert!(!cutoff.admits(cutoff.timestamp() + 1));
    }
}
