use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Upstream publishing frequency of a [`Source`](crate) registry entry.
/// Drives both the scheduler's next-fire rule (§4.8) and, for `snapshot`
/// sources, the Orchestrator's 404-handling policy (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
  Rt5,
  Hourly,
  Daily,
  MultiDaily,
  Snapshot,
}

impl Cadence {
  pub fn as_str(&self) -> &'static str {
    match self {
      Cadence::Rt5 => "rt5",
      Cadence::Hourly => "hourly",
      Cadence::Daily => "daily",
      Cadence::MultiDaily => "multi_daily",
      Cadence::Snapshot => "snapshot",
    }
  }
}

impl fmt::Display for Cadence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Cadence {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "rt5" => Ok(Cadence::Rt5),
      "hourly" => Ok(Cadence::Hourly),
      "daily" => Ok(Cadence::Daily),
      "multi_daily" => Ok(Cadence::MultiDaily),
      "snapshot" => Ok(Cadence::Snapshot),
      other => Err(Error::Config(format!("unrecognized cadence tag: {other}"))),
    }
  }
}

/// Terminal and non-terminal states of a [`Job`](crate). Once a Job reaches
/// `Succeeded`, `Failed`, or `Skipped` it is never mutated again (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
  Pending,
  Running,
  Succeeded,
  Failed,
  Skipped,
}

impl JobStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      JobStatus::Pending => "pending",
      JobStatus::Running => "running",
      JobStatus::Succeeded => "succeeded",
      JobStatus::Failed => "failed",
      JobStatus::Skipped => "skipped",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Skipped)
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for JobStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "pending" => Ok(JobStatus::Pending),
      "running" => Ok(JobStatus::Running),
      "succeeded" => Ok(JobStatus::Succeeded),
      "failed" => Ok(JobStatus::Failed),
      "skipped" => Ok(JobStatus::Skipped),
      other => Err(Error::Unexpected(format!("unrecognized job status: {other}"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cadence_round_trips_through_display_and_from_str() {
    for c in [Cadence::Rt5, Cadence::Hourly, Cadence::Daily, Cadence::MultiDaily, Cadence::Snapshot] {
      let parsed: Cadence = c.to_string().parse().unwrap();
      assert_eq!(parsed, c);
    }
  }

  #[test]
  fn cadence_rejects_unknown_tag() {
    assert!("fortnightly".parse::<Cadence>().is_err());
  }

  #[test]
  fn job_status_terminal_states() {
    assert!(JobStatus::Succeeded.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Skipped.is_terminal());
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
  }
}
