//! Shared CSV-shape helpers for the C3 transformers (§4.3): header lookup by
//! fuzzy (case-insensitive substring) name, since upstream report headers
//! vary their exact wording release to release but not their rough meaning.
//! "Unknown columns are ignored, not an error" (§4.3) falls out naturally -
//! this only ever looks a header up by name, never iterates unclaimed ones.

use csv::StringRecord;

use crate::error::{IngestError, Result};

/// A parsed header row, queryable by any of several candidate substrings.
pub struct HeaderIndex {
  lower: Vec<String>,
}

impl HeaderIndex {
  pub fn new(headers: &StringRecord) -> Self {
    HeaderIndex { lower: headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect() }
  }

  /// Index of the first header containing any of `candidates`
  /// (case-insensitive substring match).
  pub fn find(&self, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|needle| {
      let needle = needle.to_ascii_lowercase();
      self.lower.iter().position(|h| h.contains(&needle))
    })
  }

  /// Same as [`Self::find`], but fails the whole job with a `SchemaError`
  /// when no header matches - the "missing required column" policy in
  /// §4.3 and §4.7 step 3.
  pub fn require(&self, family: &str, candidates: &[&str]) -> Result<usize> {
    self.find(candidates).ok_or_else(|| {
      IngestError::SchemaError(format!(
        "{family}: no column matching any of {candidates:?} in header {:?}",
        self.lower
      ))
    })
  }

  /// All header indices not matched by `exclude` - used by the wide→long
  /// reshape in `load_forecast`, where every non-timestamp column names a
  /// zone.
  pub fn all_except(&self, exclude: &[usize]) -> Vec<usize> {
    (0..self.lower.len()).filter(|i| !exclude.contains(i)).collect()
  }

  pub fn name_at(&self, idx: usize) -> Option<&str> {
    self.lower.get(idx).map(|s| s.as_str())
  }

  pub fn raw_name_at<'a>(&self, headers: &'a StringRecord, idx: usize) -> Option<&'a str> {
    headers.get(idx)
  }
}

pub fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
  record.get(idx).unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn find_matches_case_insensitive_substring() {
    let headers = StringRecord::from(vec!["Time Stamp", "Name", "LBMP ($/MWHr)"]);
    let index = HeaderIndex::new(&headers);
    assert_eq!(index.find(&["time stamp", "timestamp"]), Some(0));
    assert_eq!(index.find(&["lbmp"]), Some(2));
    assert_eq!(index.find(&["does not exist"]), None);
  }

  #[test]
  fn require_fails_with_schema_error_when_absent() {
    let headers = StringRecord::from(vec!["A", "B"]);
    let index = HeaderIndex::new(&headers);
    assert!(index.require("rt_lbmp", &["zone"]).is_err());
  }

  #[test]
  fn all_except_excludes_given_indices() {
    let headers = StringRecord::from(vec!["Time Stamp", "WEST", "EAST"]);
    let index = HeaderIndex::new(&headers);
    assert_eq!(index.all_except(&[0]), vec![1, 2]);
  }
}
