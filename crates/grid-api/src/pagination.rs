/// Orders `rows` newest-first by `key` and truncates to `limit` (§6 "Response
/// is a JSON array (newest-first)... `limit` caps the row count"). Generic
/// over the row type so every family/metric row shape can reuse it; the
/// caller supplies the timestamp projection since row shapes differ.
pub fn paginate<T, K, F>(mut rows: Vec<T>, limit: usize, key: F) -> Vec<T>
where
  K: Ord,
  F: Fn(&T) -> K,
{
  rows.sort_by(|a, b| key(b).cmp(&key(a)));
  rows.truncate(limit);
  rows
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn orders_newest_first_and_truncates_to_limit() {
    let rows = vec![(1, "a"), (3, "c"), (2, "b")];
    let out = paginate(rows, 2, |r| r.0);
    assert_eq!(out, vec![(3, "c"), (2, "b")]);
  }

  #[test]
  fn limit_larger_than_input_keeps_everything() {
    let rows = vec![(1, "a"), (2, "b")];
    let out = paginate(rows, 100, |r| r.0);
    assert_eq!(out.len(), 2);
  }

  #[test]
  fn empty_input_stays_empty() {
    let rows: Vec<(i32, &str)> = vec![];
    assert!(paginate(rows, 10, |r| r.0).is_empty());
  }
}
