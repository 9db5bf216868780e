//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ProblemRef, RecommendationResult, RosterMember, RosterReport};

#[derive(Debug, Serialize)]
pub struct MemberOut {
    pub id: String,
    pub name: String,
}

impl From<RosterMember> for MemberOut {
    fn from(m: RosterMember) -> Self {
        Self { id: m.id, name: m.name }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterCheckOut {
    pub problem_id: String,
    pub solved: Vec<MemberOut>,
    pub unsolved: Vec<MemberOut>,
    pub errors: Vec<MemberOut>,
}

impl RosterCheckOut {
    pub fn new(problem_id: String, report: RosterReport) -> Self {
        let members = |v: Vec<RosterMember>| v.into_iter().map(MemberOut::from).collect();
        Self {
            problem_id,
            solved: members(report.solved),
            unsolved: members(report.unsolved),
            errors: members(report.errored),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendOut {
    pub weaknesses: Vec<String>,
    pub recommended: Vec<ProblemRef>,
    pub total_solved: usize,
    pub total_candidates: usize,
    /// False when the solved-set scan stopped on a failed page.
    pub solved_complete: bool,
}

impl RecommendOut {
    pub fn new(result: RecommendationResult, solved_complete: bool) -> Self {
        Self {
            weaknesses: result.weaknesses,
            recommended: result.recommended,
            total_solved: result.total_solved,
            total_candidates: result.total_candidates,
            solved_complete,
        }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
