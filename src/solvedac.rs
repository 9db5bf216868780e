//! solved.ac API client: paginated problem search and profile lookup.
//!
//! Search pages are consumed through `PageCursor`, a lazy cursor that fetches
//! one page per call and can be restarted from page 1.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::Pacing;
use crate::domain::ProblemRef;
use crate::error::UpstreamError;

const API_TIMEOUT: Duration = Duration::from_secs(10);

/// One search request, minus the page number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
  pub query: String,
  pub sort: &'static str,
  pub direction: &'static str,
}

impl SearchQuery {
  /// Everything `handle` has solved, ascending by problem id.
  pub fn solved_by(handle: &str) -> Self {
    Self { query: format!("solved_by:{handle}"), sort: "id", direction: "asc" }
  }

  /// Problems of exactly `tier`, in random order.
  pub fn random_in_tier(tier: u32) -> Self {
    Self { query: format!("tier:{tier}"), sort: "random", direction: "asc" }
  }
}

#[async_trait]
pub trait ProblemSearch: Send + Sync {
  async fn search_page(&self, query: &SearchQuery, page: u32) -> Result<Vec<ProblemRef>, UpstreamError>;
}

#[async_trait]
pub trait ProfileLookup: Send + Sync {
  async fn user_show(&self, handle: &str) -> Result<UserProfile, UpstreamError>;
}

/// Public profile fields we pass through.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub tier: u32,
  pub handle: String,
  pub bio: Option<String>,
  pub solved_count: u64,
  pub rating: u64,
}

// --- Wire DTOs ---

#[derive(Deserialize)]
struct SearchResponse {
  items: Vec<ApiProblem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProblem {
  problem_id: u64,
  #[serde(default)]
  title_ko: Option<String>,
  #[serde(default)]
  level: u32,
  #[serde(default)]
  tags: Vec<ApiTag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTag {
  key: String,
  #[serde(default)]
  display_names: Vec<ApiTagName>,
}

#[derive(Deserialize)]
struct ApiTagName {
  name: String,
}

impl From<ApiProblem> for ProblemRef {
  fn from(p: ApiProblem) -> Self {
    let tags = p
      .tags
      .into_iter()
      .map(|t| match t.display_names.into_iter().next() {
        Some(n) if !n.name.is_empty() => n.name,
        _ => t.key,
      })
      .collect();
    ProblemRef {
      problem_id: p.problem_id,
      title_localized: p.title_ko.unwrap_or_default(),
      tier: p.level,
      tags,
    }
  }
}

#[derive(Clone)]
pub struct SolvedAcClient {
  client: reqwest::Client,
  base_url: String,
}

impl SolvedAcClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
    let client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;
    Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, UpstreamError> {
    let url = format!("{}{}", self.base_url, path);
    let res = self
      .client
      .get(&url)
      .header(USER_AGENT, "judge-tracker/0.1")
      .query(query)
      .send()
      .await?;
    if !res.status().is_success() {
      return Err(UpstreamError::Status(res.status()));
    }
    let body = res.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| UpstreamError::Format(format!("{path}: {e}")))
  }
}

#[async_trait]
impl ProblemSearch for SolvedAcClient {
  #[instrument(level = "debug", skip(self), fields(query = %query.query))]
  async fn search_page(&self, query: &SearchQuery, page: u32) -> Result<Vec<ProblemRef>, UpstreamError> {
    let params = [
      ("query", query.query.clone()),
      ("sort", query.sort.to_string()),
      ("direction", query.direction.to_string()),
      ("page", page.to_string()),
    ];
    let res: SearchResponse = self.get_json("/search/problem", &params).await?;
    Ok(res.items.into_iter().map(ProblemRef::from).collect())
  }
}

#[async_trait]
impl ProfileLookup for SolvedAcClient {
  #[instrument(level = "info", skip(self), fields(%handle))]
  async fn user_show(&self, handle: &str) -> Result<UserProfile, UpstreamError> {
    self.get_json("/user/show", &[("handle", handle.to_string())]).await
  }
}

/// Lazy page-by-page view over one search query.
///
/// `next_page` yields non-empty pages starting at page 1. The sequence ends on
/// the first empty page, after the first failed page (yielded once as `Err`),
/// or when the page limit is reached. Each yielded page is followed by the
/// page pacing delay.
pub struct PageCursor<'a> {
  api: &'a dyn ProblemSearch,
  query: SearchQuery,
  pacing: Pacing,
  next: u32,
  max_pages: Option<u32>,
  done: bool,
}

impl<'a> PageCursor<'a> {
  pub fn new(api: &'a dyn ProblemSearch, query: SearchQuery, pacing: Pacing) -> Self {
    Self { api, query, pacing, next: 1, max_pages: None, done: false }
  }

  pub fn limit(mut self, max_pages: u32) -> Self {
    self.max_pages = Some(max_pages);
    self
  }

  /// Start over from page 1.
  #[cfg(test)]
  pub fn restart(&mut self) {
    self.next = 1;
    self.done = false;
  }

  pub async fn next_page(&mut self) -> Option<(u32, Result<Vec<ProblemRef>, UpstreamError>)> {
    if self.done || self.max_pages.is_some_and(|max| self.next > max) {
      return None;
    }
    let page = self.next;
    match self.api.search_page(&self.query, page).await {
      Ok(items) if items.is_empty() => {
        debug!(target: "recommend", query = %self.query.query, page, "Empty page; pagination finished");
        self.done = true;
        None
      }
      Ok(items) => {
        self.next += 1;
        self.pacing.after_page().await;
        Some((page, Ok(items)))
      }
      Err(e) => {
        warn!(target: "recommend", query = %self.query.query, page, error = %e, "Search page failed; pagination stopped");
        self.done = true;
        Some((page, Err(e)))
      }
    }
  }
}
