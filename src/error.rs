//! Error types for upstream calls, the model client, and the HTTP surface.
//!
//! Per-probe and per-page failures are downgraded by their callers; only
//! `ApiError` ever reaches a client.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;

/// Failure talking to the judge site or the search API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("upstream returned HTTP {0}")]
  Status(reqwest::StatusCode),

  #[error("unexpected upstream format: {0}")]
  Format(String),
}

/// A single status probe failed. Kept apart from a negative answer.
#[derive(Debug, thiserror::Error)]
#[error("probe {user_id}/{problem_id} failed: {source}")]
pub struct ProbeError {
  pub user_id: String,
  pub problem_id: String,
  #[source]
  pub source: UpstreamError,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("OPENAI_API_KEY is not configured")]
  Disabled,

  #[error("model request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("OpenAI HTTP {status}: {message}")]
  Upstream { status: reqwest::StatusCode, message: String },

  #[error("model returned an empty reply")]
  EmptyReply,

  #[error("JSON parse error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("추천할 수 있는 문제가 없습니다.")]
  EmptyCandidatePool { total_solved: usize },

  #[error("유저 정보를 가져올 수 없습니다.")]
  Profile(#[source] UpstreamError),

  #[error("AI 분석 및 추천 생성 실패: {0}")]
  Generation(#[from] GenerationError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    match self {
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response(),
      ApiError::EmptyCandidatePool { total_solved } => (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": message, "totalSolved": total_solved })),
      )
        .into_response(),
      ApiError::Profile(_) | ApiError::Generation(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generation_error_message_includes_cause() {
    let err = ApiError::from(GenerationError::EmptyReply);
    assert!(err.to_string().ends_with("model returned an empty reply"));
  }

  #[test]
  fn empty_pool_maps_to_not_found() {
    let res = ApiError::EmptyCandidatePool { total_solved: 7 }.into_response();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn bad_request_maps_to_400() {
    let res = ApiError::BadRequest("nope".into()).into_response();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  }
}
