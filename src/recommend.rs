//! Recommendation pipeline: collect solved problems, build the candidate pool
//! for a difficulty band, ask the model for weaknesses and picks, and keep
//! only picks that exist in the pool.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{Pacing, Prompts};
use crate::domain::{DifficultyBand, ProblemRef, RecommendationResult, SolvedSet};
use crate::error::GenerationError;
use crate::openai::{Prompt, StructuredGenerator};
use crate::solvedac::{PageCursor, ProblemSearch, SearchQuery};
use crate::util::{contains_hangul, fill_template};

/// Tail of the solved list shown to the model.
pub const SAMPLE_SIZE: usize = 100;
/// Head of the candidate pool offered to the model.
pub const SELECTION_SIZE: usize = 50;
/// Random-order pages fetched per tier.
pub const PAGES_PER_TIER: u32 = 3;

/// Pages through `solved_by:{user}` until an empty page. A failed page stops
/// pagination and marks the set incomplete.
#[instrument(level = "info", skip(api, pacing), fields(%user_id))]
pub async fn collect_solved(api: &dyn ProblemSearch, user_id: &str, pacing: Pacing) -> SolvedSet {
  let mut set = SolvedSet { complete: true, ..Default::default() };
  let mut cursor = PageCursor::new(api, SearchQuery::solved_by(user_id), pacing);

  while let Some((page, items)) = cursor.next_page().await {
    match items {
      Ok(items) => {
        set.ids.extend(items.iter().map(|p| p.problem_id));
        set.problems.extend(items);
        debug!(target: "recommend", %user_id, page, total = set.problems.len(), "Solved page collected");
      }
      Err(_) => {
        set.complete = false;
        warn!(target: "recommend", %user_id, page, collected = set.problems.len(), "Solved set is partial");
      }
    }
  }

  info!(target: "recommend", %user_id, total = set.problems.len(), complete = set.complete, "Solved set collected");
  set
}

/// Candidate filter: non-empty title containing Hangul, not already solved.
pub fn is_candidate(p: &ProblemRef, exclude: &HashSet<u64>) -> bool {
  !p.title_localized.trim().is_empty() && !exclude.contains(&p.problem_id) && contains_hangul(&p.title_localized)
}

/// Up to `PAGES_PER_TIER` random pages for every tier in the band, filtered and
/// concatenated without deduplication. A failed page drops that whole tier.
#[instrument(level = "info", skip(api, exclude, pacing), fields(band = %band.label, min = band.min, max = band.max))]
pub async fn build_candidates(
  api: &dyn ProblemSearch,
  band: &DifficultyBand,
  exclude: &HashSet<u64>,
  pacing: Pacing,
) -> Vec<ProblemRef> {
  let mut pool = Vec::new();
  for tier in band.tiers() {
    let mut cursor = PageCursor::new(api, SearchQuery::random_in_tier(tier), pacing).limit(PAGES_PER_TIER);
    let mut from_tier = Vec::new();
    let mut failed = false;

    while let Some((page, items)) = cursor.next_page().await {
      match items {
        Ok(items) => from_tier.extend(items.into_iter().filter(|p| is_candidate(p, exclude))),
        Err(e) => {
          warn!(target: "recommend", tier, page, error = %e, "Tier search failed; skipping tier");
          failed = true;
        }
      }
    }

    if failed {
      continue;
    }
    debug!(target: "recommend", tier, found = from_tier.len(), "Tier candidates collected");
    pool.extend(from_tier);
  }

  info!(target: "recommend", total = pool.len(), "Candidate pool built");
  pool
}

/// Compact view of a problem as embedded in the prompt.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptProblem<'a> {
  problem_id: u64,
  title: &'a str,
  tier: u32,
  tags: &'a [String],
}

impl<'a> From<&'a ProblemRef> for PromptProblem<'a> {
  fn from(p: &'a ProblemRef) -> Self {
    Self { problem_id: p.problem_id, title: &p.title_localized, tier: p.tier, tags: &p.tags }
  }
}

fn to_prompt_json(problems: &[ProblemRef]) -> String {
  let view: Vec<PromptProblem<'_>> = problems.iter().map(PromptProblem::from).collect();
  serde_json::to_string_pretty(&view).unwrap_or_else(|_| "[]".into())
}

/// Render the prompt from the last `SAMPLE_SIZE` solves and the first
/// `SELECTION_SIZE` candidates.
pub fn build_prompt(
  prompts: &Prompts,
  user_id: &str,
  solved: &[ProblemRef],
  candidates: &[ProblemRef],
  band: &DifficultyBand,
) -> Prompt {
  let sample = &solved[solved.len().saturating_sub(SAMPLE_SIZE)..];
  let selection = &candidates[..candidates.len().min(SELECTION_SIZE)];
  let user = fill_template(
    &prompts.recommend_user_template,
    &[
      ("user_id", user_id),
      ("difficulty_label", &band.label),
      ("sample_json", &to_prompt_json(sample)),
      ("candidates_json", &to_prompt_json(selection)),
    ],
  );
  Prompt { system: prompts.recommend_system.clone(), user }
}

/// Keep a pick only if its `problemId` is a pool id and the rest of it reads
/// as a problem.
fn validate_pick(pick: Value, pool_ids: &HashSet<u64>) -> Option<ProblemRef> {
  let Some(id) = pick.get("problemId").and_then(Value::as_u64).filter(|id| pool_ids.contains(id)) else {
    debug!(target: "recommend", pick = %pick, "Dropping pick outside candidate pool");
    return None;
  };
  match serde_json::from_value::<ProblemRef>(pick) {
    Ok(p) => Some(p),
    Err(e) => {
      debug!(target: "recommend", problem_id = id, error = %e, "Dropping malformed pick");
      None
    }
  }
}

/// One model call; picks not present in the full candidate pool are dropped.
#[instrument(level = "info", skip_all, fields(%user_id, solved = solved.problems.len(), candidates = candidates.len()))]
pub async fn recommend(
  generator: &dyn StructuredGenerator,
  prompts: &Prompts,
  user_id: &str,
  solved: &SolvedSet,
  candidates: &[ProblemRef],
  band: &DifficultyBand,
) -> Result<RecommendationResult, GenerationError> {
  let prompt = build_prompt(prompts, user_id, &solved.problems, candidates, band);
  let reply = generator.generate_structured(&prompt).await?;

  let pool_ids: HashSet<u64> = candidates.iter().map(|p| p.problem_id).collect();
  let offered = reply.recommended.len();
  let recommended: Vec<ProblemRef> = reply
    .recommended
    .into_iter()
    .filter_map(|pick| validate_pick(pick, &pool_ids))
    .collect();

  info!(target: "recommend", %user_id, offered, kept = recommended.len(), "Recommendation validated");
  Ok(RecommendationResult {
    weaknesses: reply.weaknesses,
    recommended,
    total_solved: solved.problems.len(),
    total_candidates: candidates.len(),
  })
}
