//! Shared timestamp parsing (§4.3): a single ordered list of format
//! attempts, returning the first match and failing the row on none -
//! consolidating what the upstream source does ad hoc per transformer
//! (§9 "Ad-hoc timestamp parsing").

use chrono::{NaiveDateTime, Timelike};

const FORMATS: &[&str] =
  &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses `raw` against each format in turn, returning the first match.
/// Returns `None` (a per-row `ParseWarning`, not a hard failure) rather than
/// an error, so callers can skip the row and keep a running counter.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  #[test]
  fn parses_us_slash_format_with_seconds() {
    let ts = parse_timestamp("11/13/2025 00:00:00").unwrap();
    assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2025, 11, 13).unwrap());
  }

  #[test]
  fn parses_us_slash_format_without_seconds() {
    let ts = parse_timestamp("11/13/2025 14:05").unwrap();
    assert_eq!(ts.minute(), 5);
  }

  #[test]
  fn parses_iso_format_with_seconds() {
    let ts = parse_timestamp("2025-11-13 14:05:30").unwrap();
    assert_eq!(ts.second(), 30);
  }

  #[test]
  fn returns_none_for_unparseable_or_empty_input() {
    assert!(parse_timestamp("not a timestamp").is_none());
    assert!(parse_timestamp("").is_none());
    assert!(parse_timestamp("   ").is_none());
  }
}
