use serde::{Deserialize, Serialize};

/// Surrogate-keyed pricing zone (§3 `Zone`). Created on first observation by
/// the Reference Resolver (C4); never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
  pub id: i32,
  /// Canonical-cased (upper, trimmed) per the naming invariant in §3.
  pub name: String,
}

/// Surrogate-keyed transmission interface (§3 `Interface`). Same lifecycle
/// as [`Zone`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
  pub id: i32,
  pub name: String,
}
