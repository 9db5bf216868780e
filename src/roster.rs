//! Roster checker: runs the status probe for every tracked member, one at a time.

use tracing::{info, instrument};

use crate::config::RosterConfig;
use crate::domain::{RosterMember, RosterReport, SolveStatus};
use crate::judge::StatusProbe;

pub struct RosterChecker {
  roster: RosterConfig,
}

impl RosterChecker {
  pub fn new(roster: RosterConfig) -> Self {
    Self { roster }
  }

  /// Probes members sequentially in roster order. A failed probe lands the
  /// member in `errored` and the loop continues.
  #[instrument(level = "info", skip(self, prober), fields(%problem_id, roster = self.roster.members.len()))]
  pub async fn check(&self, prober: &dyn StatusProbe, problem_id: &str) -> RosterReport {
    let mut report = RosterReport::default();
    for member in &self.roster.members {
      match prober.probe(&member.id, problem_id).await {
        Ok(SolveStatus::Solved) => report.solved.push(member.clone()),
        Ok(SolveStatus::Unsolved) => report.unsolved.push(member.clone()),
        Err(_) => report.errored.push(member.clone()),
      }
    }
    info!(
      target: "judge",
      %problem_id,
      solved = report.solved.len(),
      unsolved = report.unsolved.len(),
      errored = report.errored.len(),
      "Roster check finished"
    );
    report
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::error::{ProbeError, UpstreamError};
  use async_trait::async_trait;
  use std::collections::{HashMap, HashSet};
  use std::sync::Mutex;

  /// Scripted prober; unknown users fail. Records call order.
  #[derive(Default)]
  pub struct ScriptedProbe {
    pub answers: HashMap<String, SolveStatus>,
    pub calls: Mutex<Vec<String>>,
  }

  impl ScriptedProbe {
    pub fn new(answers: &[(&str, SolveStatus)]) -> Self {
      Self {
        answers: answers.iter().map(|(u, s)| (u.to_string(), *s)).collect(),
        calls: Mutex::new(Vec::new()),
      }
    }
  }

  #[async_trait]
  impl StatusProbe for ScriptedProbe {
    async fn probe(&self, user_id: &str, problem_id: &str) -> Result<SolveStatus, ProbeError> {
      self.calls.lock().unwrap().push(user_id.to_string());
      self.answers.get(user_id).copied().ok_or_else(|| ProbeError {
        user_id: user_id.into(),
        problem_id: problem_id.into(),
        source: UpstreamError::Format("scripted failure".into()),
      })
    }
  }

  pub fn roster(ids: &[&str]) -> RosterConfig {
    RosterConfig {
      members: ids.iter().map(|id| RosterMember { id: id.to_string(), name: id.to_uppercase() }).collect(),
    }
  }

  #[tokio::test]
  async fn solved_and_unsolved_are_bucketed() {
    let checker = RosterChecker::new(roster(&["a", "b"]));
    let probe = ScriptedProbe::new(&[("a", SolveStatus::Solved), ("b", SolveStatus::Unsolved)]);

    let report = checker.check(&probe, "1000").await;
    assert_eq!(report.solved.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(report.unsolved.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    assert!(report.errored.is_empty());
  }

  #[tokio::test]
  async fn errors_do_not_abort_and_buckets_partition_roster() {
    let ids = ["a", "b", "c", "d", "e"];
    let checker = RosterChecker::new(roster(&ids));
    let probe = ScriptedProbe::new(&[
      ("a", SolveStatus::Unsolved),
      ("c", SolveStatus::Solved),
      ("e", SolveStatus::Solved),
    ]);

    let report = checker.check(&probe, "42").await;
    assert_eq!(*probe.calls.lock().unwrap(), ids.to_vec());
    assert_eq!(report.solved.len() + report.unsolved.len() + report.errored.len(), ids.len());

    let mut seen = HashSet::new();
    for m in report.solved.iter().chain(&report.unsolved).chain(&report.errored) {
      assert!(seen.insert(m.id.clone()), "{} appears twice", m.id);
    }
    assert_eq!(report.errored.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["b", "d"]);
    assert_eq!(report.solved.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["c", "e"]);
  }
}
