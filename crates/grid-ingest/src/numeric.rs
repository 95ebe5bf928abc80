//! Numeric cleanup (§4.3): empty strings, whitespace-only tokens, and
//! non-numeric garbage become `None`, never `0.0` - a zero in the source
//! CSV means the upstream reported zero, not "no value".

/// Parses `raw` as `f64`, treating anything that isn't a clean numeric
/// token as "no value" rather than a parse failure.
pub fn parse_numeric(raw: &str) -> Option<f64> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  trimmed.parse::<f64>().ok()
}

/// Parses `raw` as a boolean flag. Accepts the usual CSV spellings
/// (`true`/`false`, `1`/`0`, `yes`/`no`) case-insensitively.
pub fn parse_bool(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "" => None,
    "true" | "1" | "yes" | "y" => Some(true),
    "false" | "0" | "no" | "n" => Some(false),
    _ => None,
  }
}

/// Returns `None` for an empty/whitespace-only string, otherwise the
/// trimmed string. Used for optional text columns.
pub fn clean_text(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_numeric_treats_blank_and_garbage_as_none_not_zero() {
    assert_eq!(parse_numeric(""), None);
    assert_eq!(parse_numeric("   "), None);
    assert_eq!(parse_numeric("N/A"), None);
    assert_eq!(parse_numeric("42.10"), Some(42.10));
    assert_eq!(parse_numeric("0"), Some(0.0));
  }

  #[test]
  fn parse_bool_accepts_common_spellings() {
    assert_eq!(parse_bool("TRUE"), Some(true));
    assert_eq!(parse_bool("0"), Some(false));
    assert_eq!(parse_bool(""), None);
    assert_eq!(parse_bool("maybe"), None);
  }

  #[test]
  fn clean_text_collapses_blank_to_none() {
    assert_eq!(clean_text("  "), None);
    assert_eq!(clean_text(" WEST "), Some("WEST".to_string()));
  }
}
