//! Plan caching and persistence.
//!
//! A plan is requested once per cadence window and reused until it expires.
//! The in-memory cache covers the running session; a [`PlanStore`] carries
//! plans across process restarts so a resumed game does not re-query the
//! endpoint mid-window.

use anyhow::{Context, Result};
use hegemon_core::{AdvisoryPlan, CountryId, GameId, SimConfig};
use std::collections::HashMap;
use std::path::PathBuf;

/// Whether `turn` is one the advisory endpoint should be consulted on.
pub fn is_advisory_turn(turn: u32, sim: &SimConfig) -> bool {
    if turn < sim.advisory_first_turn || sim.advisory_cadence == 0 {
        return false;
    }
    (turn - sim.advisory_first_turn) % sim.advisory_cadence == 0
}

/// Session-local plan cache keyed by game and country.
#[derive(Default)]
pub struct AdvisoryPlanCache {
    plans: HashMap<(GameId, CountryId), AdvisoryPlan>,
}

impl AdvisoryPlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached plan if it is still inside its validity window, evicting
    /// it otherwise.
    pub fn get_valid(&mut self, game_id: GameId, country_id: &str, turn: u32) -> Option<&AdvisoryPlan> {
        let key = (game_id, country_id.to_string());
        if let Some(plan) = self.plans.get(&key) {
            if !plan.is_valid_at(turn) {
                log::debug!(
                    "{}: plan from turn {} expired at turn {}, evicting",
                    country_id,
                    plan.turn_analyzed,
                    turn
                );
                self.plans.remove(&key);
                return None;
            }
        }
        self.plans.get(&key)
    }

    /// Insert a plan, refusing to replace a newer or same-turn one.
    pub fn insert(&mut self, game_id: GameId, country_id: &str, plan: AdvisoryPlan) {
        let key = (game_id, country_id.to_string());
        if let Some(existing) = self.plans.get(&key) {
            if existing.turn_analyzed >= plan.turn_analyzed {
                log::debug!(
                    "{}: keeping plan from turn {}, rejecting one from turn {}",
                    country_id,
                    existing.turn_analyzed,
                    plan.turn_analyzed
                );
                return;
            }
        }
        self.plans.insert(key, plan);
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Durable plan storage, one record per (game, country).
pub trait PlanStore: Send {
    fn load(&self, game_id: GameId, country_id: &str) -> Result<Option<AdvisoryPlan>>;
    fn save(&self, game_id: GameId, country_id: &str, plan: &AdvisoryPlan) -> Result<()>;
}

/// File-backed store: one pretty-printed JSON file per (game, country) under
/// a directory.
pub struct JsonPlanStore {
    dir: PathBuf,
}

impl JsonPlanStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, game_id: GameId, country_id: &str) -> PathBuf {
        // Country ids come from scenario data and may not be path-safe.
        let safe: String = country_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("plan-{}-{}.json", game_id, safe))
    }
}

impl PlanStore for JsonPlanStore {
    fn load(&self, game_id: GameId, country_id: &str) -> Result<Option<AdvisoryPlan>> {
        let path = self.path(game_id, country_id);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let plan = serde_json::from_str(&text)
            .with_context(|| format!("Corrupt plan file {}", path.display()))?;
        Ok(Some(plan))
    }

    fn save(&self, game_id: GameId, country_id: &str, plan: &AdvisoryPlan) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path(game_id, country_id);
        let text = serde_json::to_string_pretty(plan).context("Failed to serialize plan")?;
        std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))
    }
}
