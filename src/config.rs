//! Process-wide configuration: upstream endpoints and pacing from the environment,
//! roster / difficulty bands / prompts from an optional TOML file.
//!
//! TOML schema (every table optional):
//!
//! ```toml
//! [[roster.members]]
//! id = "dooley957"
//! name = "나영"
//!
//! [bands.mid]
//! min = 11
//! max = 13
//! label = "골드 5~3"
//!
//! [prompts]
//! recommend_user_template = "..."
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{DifficultyBand, DifficultyLevel, RosterMember};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TrackerConfig {
  #[serde(default)]
  pub roster: RosterConfig,
  #[serde(default)]
  pub bands: DifficultyBands,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Fixed list of tracked handles and their display names, in check order.
#[derive(Clone, Debug, Deserialize)]
pub struct RosterConfig {
  pub members: Vec<RosterMember>,
}

impl Default for RosterConfig {
  fn default() -> Self {
    let member = |id: &str, name: &str| RosterMember { id: id.into(), name: name.into() };
    Self {
      members: vec![
        member("dooley957", "나영"),
        member("pss6161", "지원"),
        member("zcbm1998", "경보"),
        member("yhwon12", "하영"),
        member("falseman", "규영"),
      ],
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DifficultyBands {
  pub low: DifficultyBand,
  pub mid: DifficultyBand,
  pub high: DifficultyBand,
}

impl Default for DifficultyBands {
  fn default() -> Self {
    Self {
      low: DifficultyBand::new(6, 8, "실버 3~1"),
      mid: DifficultyBand::new(11, 13, "골드 5~3"),
      high: DifficultyBand::new(14, 16, "골드 3~1"),
    }
  }
}

impl DifficultyBands {
  pub fn get(&self, level: DifficultyLevel) -> &DifficultyBand {
    match level {
      DifficultyLevel::Low => &self.low,
      DifficultyLevel::Mid => &self.mid,
      DifficultyLevel::High => &self.high,
    }
  }

  pub fn validate(&self) -> Result<(), String> {
    self.low.validate()?;
    self.mid.validate()?;
    self.high.validate()
  }
}

/// Prompts used by the recommendation engine.
/// Placeholders: {user_id}, {sample_json}, {difficulty_label}, {candidates_json}.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Sent as a system message when non-empty.
  pub recommend_system: String,
  pub recommend_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      recommend_system: String::new(),
      recommend_user_template: r#"당신은 백준 온라인 저지 문제를 분석하는 코치입니다.

[1단계] 유저 {user_id}가 푼 문제 샘플입니다:
{sample_json}

샘플의 문제 제목과 태그를 근거로 이 유저가 상대적으로 약한 알고리즘 유형을 정확히 3개 고르세요.
유형 이름은 샘플에 쓰인 언어로 적습니다. (예: "다이나믹 프로그래밍", "그래프 탐색", "그리디 알고리즘")

[2단계] 유저가 아직 풀지 않은 {difficulty_label} 난이도 문제 목록입니다:
{candidates_json}

이 목록 안에서만 약점 유형에 맞는 문제를 정확히 3개 고르세요.

다른 설명 없이 아래 형식의 JSON만 출력하세요:
{"weaknesses": ["유형1", "유형2", "유형3"], "recommended": [{"problemId": 1234, "title": "문제 제목", "tier": 12, "tags": ["태그1", "태그2"]}]}

problemId, title, tier, tags 값은 위 목록에 있는 값을 그대로 사용하세요."#
        .into(),
    }
  }
}

/// Fixed delays between upstream calls. `none()` is for tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
  /// After every status probe, success or not.
  pub probe: Duration,
  /// After every successful search page.
  pub page: Duration,
}

impl Default for Pacing {
  fn default() -> Self {
    Self { probe: Duration::from_millis(500), page: Duration::from_millis(300) }
  }
}

impl Pacing {
  #[cfg(test)]
  pub fn none() -> Self {
    Self { probe: Duration::ZERO, page: Duration::ZERO }
  }

  pub async fn after_probe(&self) {
    pause(self.probe).await
  }

  pub async fn after_page(&self) {
    pause(self.page).await
  }
}

async fn pause(d: Duration) {
  if !d.is_zero() {
    tokio::time::sleep(d).await;
  }
}

/// Upstream base URLs; overridable so tests and mirrors can point elsewhere.
#[derive(Clone, Debug)]
pub struct Endpoints {
  pub judge_base_url: String,
  pub solvedac_base_url: String,
}

impl Endpoints {
  pub fn from_env() -> Self {
    Self {
      judge_base_url: env_or("JUDGE_BASE_URL", "https://www.acmicpc.net"),
      solvedac_base_url: env_or("SOLVEDAC_BASE_URL", "https://solved.ac/api/v3"),
    }
  }
}

pub fn env_or(key: &str, default: &str) -> String {
  std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load TOML from TRACKER_CONFIG_PATH. Any IO/parse/validation failure logs and
/// falls back to the built-in defaults.
pub fn load_tracker_config_from_env() -> TrackerConfig {
  let Ok(path) = std::env::var("TRACKER_CONFIG_PATH") else {
    info!(target: "judge_tracker", "TRACKER_CONFIG_PATH not set; using built-in roster and bands");
    return TrackerConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_tracker_config(&s) {
      Ok(cfg) => {
        info!(target: "judge_tracker", %path, roster = cfg.roster.members.len(), "Loaded tracker config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "judge_tracker", %path, error = %e, "Invalid tracker config; using defaults");
        TrackerConfig::default()
      }
    },
    Err(e) => {
      error!(target: "judge_tracker", %path, error = %e, "Failed to read tracker config file");
      TrackerConfig::default()
    }
  }
}

pub fn parse_tracker_config(s: &str) -> Result<TrackerConfig, String> {
  let cfg = toml::from_str::<TrackerConfig>(s).map_err(|e| e.to_string())?;
  cfg.bands.validate()?;
  if cfg.roster.members.iter().any(|m| m.id.trim().is_empty()) {
    return Err("roster member with empty id".into());
  }
  if cfg.roster.members.is_empty() {
    warn!(target: "judge_tracker", "Roster is empty; roster checks will return empty buckets");
  }
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_study_group() {
    let cfg = TrackerConfig::default();
    assert_eq!(cfg.roster.members.len(), 5);
    assert_eq!(cfg.roster.members[0].id, "dooley957");
    assert_eq!(cfg.bands.get(DifficultyLevel::Mid).tiers(), 11..=13);
    assert!(cfg.bands.validate().is_ok());
  }

  #[test]
  fn toml_overrides_roster_and_keeps_other_defaults() {
    let cfg = parse_tracker_config(
      r#"
      [[roster.members]]
      id = "alice"
      name = "Alice"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.roster.members, vec![RosterMember { id: "alice".into(), name: "Alice".into() }]);
    assert_eq!(cfg.bands.get(DifficultyLevel::Low).min, 6);
    assert!(cfg.prompts.recommend_user_template.contains("{candidates_json}"));
  }

  #[test]
  fn inverted_band_is_rejected() {
    let err = parse_tracker_config(
      r#"
      [bands.low]
      min = 8
      max = 6
      label = "x"
      [bands.mid]
      min = 11
      max = 13
      label = "y"
      [bands.high]
      min = 14
      max = 16
      label = "z"
      "#,
    )
    .unwrap_err();
    assert!(err.contains("min 8 > max 6"));
  }
}
