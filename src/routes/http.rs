//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, Path, Query, State},
  response::IntoResponse,
  Json,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::DifficultyLevel;
use crate::error::{ApiError, GenerationError};
use crate::protocol::*;
use crate::recommend::{build_candidates, collect_solved, recommend};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

const INVALID_PROBLEM_ID: &str = "유효한 문제 번호를 입력해주세요.";

/// Accepts a digit string, or a JSON number for lenient clients.
fn problem_id_from(raw: Option<&Value>) -> Result<String, ApiError> {
  let id = match raw {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Number(n)) if n.is_u64() => n.to_string(),
    _ => String::new(),
  };
  if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
    return Err(ApiError::BadRequest(INVALID_PROBLEM_ID.into()));
  }
  Ok(id)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_check_problem_roster(
  State(state): State<Arc<AppState>>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RosterCheckOut>, ApiError> {
  let Json(body) = body.map_err(|rejection| {
    debug!(target: "judge", error = %rejection, "Roster check body rejected");
    ApiError::BadRequest(INVALID_PROBLEM_ID.into())
  })?;
  let problem_id = problem_id_from(body.get("problemId"))?;
  let report = state.roster.check(state.prober.as_ref(), &problem_id).await;
  info!(target: "judge", %problem_id, solved = report.solved.len(), "HTTP roster check served");
  Ok(Json(RosterCheckOut::new(problem_id, report)))
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_user_info(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let profile = state.profiles.user_show(&user_id).await.map_err(ApiError::Profile)?;
  Ok(Json(profile))
}

#[instrument(level = "info", skip(state), fields(%user_id, difficulty = ?q.difficulty))]
pub async fn http_analyze_and_recommend(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
  Query(q): Query<RecommendQuery>,
) -> Result<Json<RecommendOut>, ApiError> {
  let level = match q.difficulty.as_deref() {
    None | Some("") => DifficultyLevel::default(),
    Some(s) => s.parse::<DifficultyLevel>().map_err(ApiError::BadRequest)?,
  };
  let band = state.bands.get(level);
  let generator = state.generator.clone().ok_or(GenerationError::Disabled)?;

  let solved = collect_solved(state.search.as_ref(), &user_id, state.pacing).await;
  let candidates = build_candidates(state.search.as_ref(), band, &solved.ids, state.pacing).await;
  if candidates.is_empty() {
    return Err(ApiError::EmptyCandidatePool { total_solved: solved.problems.len() });
  }

  let result = recommend(generator.as_ref(), &state.prompts, &user_id, &solved, &candidates, band).await?;
  info!(target: "recommend", %user_id, ?level, kept = result.recommended.len(), "HTTP recommendation served");
  Ok(Json(RecommendOut::new(result, solved.complete)))
}
