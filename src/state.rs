//! Application state: configuration plus the upstream clients, all read-only
//! after startup.
//!
//! Upstream clients are held behind their traits so router tests can swap in
//! scripted fakes.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_tracker_config_from_env, DifficultyBands, Endpoints, Pacing, Prompts, TrackerConfig};
use crate::error::UpstreamError;
use crate::judge::{JudgeProber, StatusProbe};
use crate::openai::{OpenAI, StructuredGenerator};
use crate::roster::RosterChecker;
use crate::solvedac::{ProblemSearch, ProfileLookup, SolvedAcClient};

pub struct AppState {
    pub roster: RosterChecker,
    pub bands: DifficultyBands,
    pub prompts: Prompts,
    pub pacing: Pacing,
    pub prober: Arc<dyn StatusProbe>,
    pub search: Arc<dyn ProblemSearch>,
    pub profiles: Arc<dyn ProfileLookup>,
    pub generator: Option<Arc<dyn StructuredGenerator>>,
}

impl AppState {
    /// Build state from env: TOML config, upstream clients, optional OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, UpstreamError> {
        let cfg = load_tracker_config_from_env();
        let endpoints = Endpoints::from_env();
        let pacing = Pacing::default();

        let prober = JudgeProber::new(&endpoints.judge_base_url, pacing)?;
        let solvedac = Arc::new(SolvedAcClient::new(&endpoints.solvedac_base_url)?);
        info!(
            target: "judge_tracker",
            judge = %endpoints.judge_base_url,
            solvedac = %endpoints.solvedac_base_url,
            roster = cfg.roster.members.len(),
            "Upstream clients ready"
        );

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "judge_tracker", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "judge_tracker", "OpenAI disabled (no OPENAI_API_KEY). Recommendations will fail.");
        }

        Ok(Self::new(
            cfg,
            pacing,
            Arc::new(prober),
            solvedac.clone(),
            solvedac,
            openai.map(|oa| Arc::new(oa) as Arc<dyn StructuredGenerator>),
        ))
    }

    pub fn new(
        cfg: TrackerConfig,
        pacing: Pacing,
        prober: Arc<dyn StatusProbe>,
        search: Arc<dyn ProblemSearch>,
        profiles: Arc<dyn ProfileLookup>,
        generator: Option<Arc<dyn StructuredGenerator>>,
    ) -> Self {
        Self {
            roster: RosterChecker::new(cfg.roster),
            bands: cfg.bands,
            prompts: cfg.prompts,
            pacing,
            prober,
            search,
            profiles,
            generator,
        }
    }
}
