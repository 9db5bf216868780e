//! Domain models: roster members, problems, difficulty bands, and pipeline results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A tracked study-group member.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterMember {
  pub id: String,
  pub name: String,
}

/// A problem as seen through the search API. Immutable once fetched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRef {
  pub problem_id: u64,
  #[serde(rename = "title", default)]
  pub title_localized: String,
  #[serde(default)]
  pub tier: u32,
  #[serde(default)]
  pub tags: Vec<String>,
}

/// Outcome of a single status probe that reached the judge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
  Solved,
  Unsolved,
}

/// Named difficulty level requested by the client.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
  Low,
  #[default]
  Mid,
  High,
}

impl std::str::FromStr for DifficultyLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "low" => Ok(Self::Low),
      "mid" => Ok(Self::Mid),
      "high" => Ok(Self::High),
      other => Err(format!("알 수 없는 난이도입니다: {other}")),
    }
  }
}

/// Highest tier on the solved.ac scale (Ruby I).
pub const MAX_TIER: u32 = 30;

/// Inclusive tier range plus the label shown to the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DifficultyBand {
  pub min: u32,
  pub max: u32,
  pub label: String,
}

impl DifficultyBand {
  pub fn new(min: u32, max: u32, label: impl Into<String>) -> Self {
    Self { min, max, label: label.into() }
  }

  /// min <= max and both on the 1..=30 scale.
  pub fn validate(&self) -> Result<(), String> {
    if self.min == 0 || self.max > MAX_TIER {
      return Err(format!("band '{}' outside tier scale 1..={MAX_TIER}: {}..={}", self.label, self.min, self.max));
    }
    if self.min > self.max {
      return Err(format!("band '{}' has min {} > max {}", self.label, self.min, self.max));
    }
    Ok(())
  }

  pub fn tiers(&self) -> std::ops::RangeInclusive<u32> {
    self.min..=self.max
  }
}

/// Everything the collector managed to read for one user.
#[derive(Clone, Debug, Default)]
pub struct SolvedSet {
  /// Concatenation of pages in fetch order (ascending problem id).
  pub problems: Vec<ProblemRef>,
  pub ids: HashSet<u64>,
  /// False when pagination stopped on a failed page rather than an empty one.
  pub complete: bool,
}

/// Roster check outcome, each bucket in roster order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterReport {
  pub solved: Vec<RosterMember>,
  pub unsolved: Vec<RosterMember>,
  pub errored: Vec<RosterMember>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
  pub weaknesses: Vec<String>,
  pub recommended: Vec<ProblemRef>,
  pub total_solved: usize,
  pub total_candidates: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn band_validation_rejects_inverted_and_out_of_scale() {
    assert!(DifficultyBand::new(11, 13, "g").validate().is_ok());
    assert!(DifficultyBand::new(13, 11, "g").validate().is_err());
    assert!(DifficultyBand::new(0, 3, "g").validate().is_err());
    assert!(DifficultyBand::new(29, 31, "r").validate().is_err());
  }

  #[test]
  fn difficulty_parses_known_names_only() {
    assert_eq!("low".parse::<DifficultyLevel>(), Ok(DifficultyLevel::Low));
    assert_eq!("high".parse::<DifficultyLevel>(), Ok(DifficultyLevel::High));
    assert!("extreme".parse::<DifficultyLevel>().is_err());
    assert_eq!(DifficultyLevel::default(), DifficultyLevel::Mid);
  }

  #[test]
  fn problem_ref_serializes_with_wire_names() {
    let p = ProblemRef { problem_id: 1000, title_localized: "A+B".into(), tier: 1, tags: vec!["수학".into()] };
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["problemId"], 1000);
    assert_eq!(v["title"], "A+B");
    assert_eq!(v["tier"], 1);
  }
}
