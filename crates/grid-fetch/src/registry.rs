use std::collections::HashMap;
use std::path::Path;

use grid_core::Cadence;
use grid_models::Source;

use crate::error::{FetchError, Result};

/// C1: the process-global, immutable-after-boot mapping from source code to
/// [`Source`]. Parsed once from the plain-text registry file (§6).
#[derive(Debug, Clone)]
pub struct Registry {
  sources: HashMap<String, Source>,
}

impl Registry {
  /// Loads and parses the registry file. Fails the whole load with
  /// `ConfigError` if any non-comment, non-blank line is missing a required
  /// field or carries an unrecognized cadence tag (§4.1).
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let contents = std::fs::read_to_string(path.as_ref())
      .map_err(|e| FetchError::ConfigError(format!("reading registry file: {e}")))?;
    Self::parse(&contents)
  }

  /// Parses registry contents already in memory (used by `load` and by
  /// tests that don't want a fixture file on disk).
  pub fn parse(contents: &str) -> Result<Self> {
    let mut sources = HashMap::new();

    for (line_no, raw_line) in contents.lines().enumerate() {
      let line = raw_line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }

      let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(line.as_bytes());
      let record = reader
        .records()
        .next()
        .ok_or_else(|| FetchError::ConfigError(format!("registry line {}: empty record", line_no + 1)))?
        .map_err(|e| FetchError::ConfigError(format!("registry line {}: {e}", line_no + 1)))?;

      if record.len() != 9 {
        return Err(FetchError::ConfigError(format!(
          "registry line {}: expected 9 fields, found {}",
          line_no + 1,
          record.len()
        )));
      }

      let field = |idx: usize| record.get(idx).unwrap().trim().to_string();

      let human_name = field(0);
      let code = field(1);
      let _directory_tag = field(2);
      let filename_stem = field(3);
      let direct_url_template = field(4);
      let archive_url_template = field(5);
      let snapshot_url_template = field(6);
      let cadence_tag = field(7);
      let category_tag = field(8);

      if code.is_empty() {
        return Err(FetchError::ConfigError(format!("registry line {}: missing code", line_no + 1)));
      }

      let cadence: Cadence = cadence_tag.parse().map_err(|e: grid_core::Error| {
        FetchError::ConfigError(format!("registry line {}: {e}", line_no + 1))
      })?;

      // Snapshot sources carry their static URL in `snapshot_url_template`;
      // dated sources carry theirs (with the {YYYYMMDD} placeholder) in
      // `direct_url_template`. When both are present, prefer the dated
      // template so a source can still be re-pointed at a one-off static
      // mirror without losing its cadence behavior.
      let direct_url_template = if direct_url_template.is_empty() {
        snapshot_url_template
      } else {
        direct_url_template
      };

      if direct_url_template.is_empty() {
        return Err(FetchError::ConfigError(format!(
          "registry line {}: missing direct_url_template/snapshot_url_template",
          line_no + 1
        )));
      }

      let archive_url_template =
        if archive_url_template.is_empty() { None } else { Some(archive_url_template) };

      let source = Source {
        code: code.clone(),
        human_name,
        category: category_tag,
        cadence: cadence.into(),
        direct_url_template,
        archive_url_template,
        transformer_tag: filename_stem,
      };

      sources.insert(code, source);
    }

    Ok(Registry { sources })
  }

  pub fn get(&self, code: &str) -> Option<&Source> {
    self.sources.get(code)
  }

  pub fn all(&self) -> impl Iterator<Item = &Source> {
    self.sources.values()
  }

  pub fn len(&self) -> usize {
    self.sources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sources.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "\
# comment lines and blank lines are skipped

Real-Time LBMP,RT-LBMP,pub,rtlbmp,https://example.test/{YYYYMMDD}rt.csv,https://example.test/archive/{YYYYMM01}rt_csv.zip,,rt5,pricing
Current External Limits,EXT-LIMITS,pub,currentlimits,,,https://example.test/currentExternalLimitsFlows.csv,snapshot,interface
";

  #[test]
  fn parses_dated_and_snapshot_sources() {
    let registry = Registry::parse(SAMPLE).unwrap();
    assert_eq!(registry.len(), 2);

    let rt = registry.get("RT-LBMP").unwrap();
    assert_eq!(rt.direct_url_template, "https://example.test/{YYYYMMDD}rt.csv");
    assert_eq!(*rt.cadence, grid_core::Cadence::Rt5);
    assert!(rt.archive_url_template.is_some());

    let snap = registry.get("EXT-LIMITS").unwrap();
    assert_eq!(snap.direct_url_template, "https://example.test/currentExternalLimitsFlows.csv");
    assert_eq!(*snap.cadence, grid_core::Cadence::Snapshot);
    assert!(snap.archive_url_template.is_none());
  }

  #[test]
  fn unknown_source_lookup_returns_none() {
    let registry = Registry::parse(SAMPLE).unwrap();
    assert!(registry.get("NOPE").is_none());
  }

  #[test]
  fn rejects_unrecognized_cadence_tag() {
    let bad = "Name,CODE,dir,stem,https://x/{YYYYMMDD}.csv,,,fortnightly,cat\n";
    assert!(Registry::parse(bad).is_err());
  }

  #[test]
  fn rejects_missing_url_templates() {
    let bad = "Name,CODE,dir,stem,,,,rt5,cat\n";
    assert!(Registry::parse(bad).is_err());
  }
}
