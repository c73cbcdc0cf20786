//! The advisory link served to the simulation core.
//!
//! On cadence turns it queries the endpoint, parses the response and caches
//! the plan; between cadence turns it serves the cached plan with its age.
//! Every failure mode (no endpoint, network error, unparseable response)
//! degrades to `None`, which the core treats as rule-based play.

use crate::cache::{self, AdvisoryPlanCache, PlanStore};
use crate::client::AdvisoryClient;
use crate::parse;
use crate::prompt::PromptBuilder;
use hegemon_core::situation::SituationMetrics;
use hegemon_core::step::AdvisorLink;
use hegemon_core::{ActivePlan, AdvisoryPlan, CountryState, GameId, PlanProvenance, SimConfig};

const MAX_TOKENS: usize = 1024;

pub struct TurnAdvisor {
    client: Option<AdvisoryClient>,
    cache: AdvisoryPlanCache,
    store: Option<Box<dyn PlanStore>>,
    sim: SimConfig,
    prompt: PromptBuilder,
}

impl TurnAdvisor {
    pub fn new(client: Option<AdvisoryClient>, sim: SimConfig) -> Self {
        Self {
            client,
            cache: AdvisoryPlanCache::new(),
            store: None,
            sim,
            prompt: PromptBuilder::new(),
        }
    }

    /// Endpoint and key from the environment; no endpoint configured means a
    /// purely rule-based game.
    pub fn from_env(sim: SimConfig) -> Self {
        let client = AdvisoryClient::from_env();
        if client.is_none() {
            log::info!(
                "{} not set, advisory endpoint disabled",
                crate::client::ADDR_ENV
            );
        }
        Self::new(client, sim)
    }

    /// Attach durable plan storage, used to survive process restarts.
    pub fn with_store(mut self, store: Box<dyn PlanStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn has_endpoint(&self) -> bool {
        self.client.is_some()
    }

    fn fetch_fresh(
        &mut self,
        country_id: &str,
        country: &CountryState,
        metrics: &SituationMetrics,
        turn: u32,
    ) -> Option<AdvisoryPlan> {
        let client = self.client.as_mut()?;
        let prompt = self.prompt.build(country_id, country, metrics, turn);
        let response = match client.advise(country_id, turn, prompt, MAX_TOKENS) {
            Ok((text, latency_ms)) => {
                log::info!("{}: advisory response in {}ms", country_id, latency_ms);
                text
            }
            Err(err) => {
                log::warn!("{}: advisory request failed: {:#}", country_id, err);
                return None;
            }
        };
        match parse::parse_plan(&response, turn, self.sim.advisory_cadence) {
            Ok(plan) => Some(plan),
            Err(err) => {
                log::warn!("{}: discarding advisory response: {}", country_id, err);
                None
            }
        }
    }

    /// Cached plan from the store, validated against the current turn.
    fn load_stored(&mut self, game_id: GameId, country_id: &str, turn: u32) -> Option<AdvisoryPlan> {
        let store = self.store.as_ref()?;
        match store.load(game_id, country_id) {
            Ok(Some(plan)) if plan.is_valid_at(turn) => Some(plan),
            Ok(_) => None,
            Err(err) => {
                log::warn!("{}: plan store load failed: {:#}", country_id, err);
                None
            }
        }
    }

    fn persist(&self, game_id: GameId, country_id: &str, plan: &AdvisoryPlan) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save(game_id, country_id, plan) {
                log::warn!("{}: plan store save failed: {:#}", country_id, err);
            }
        }
    }
}

impl AdvisorLink for TurnAdvisor {
    fn active_plan(
        &mut self,
        game_id: GameId,
        country_id: &str,
        country: &CountryState,
        metrics: &SituationMetrics,
        turn: u32,
    ) -> Option<ActivePlan> {
        if cache::is_advisory_turn(turn, &self.sim) && self.client.is_some() {
            if let Some(plan) = self.fetch_fresh(country_id, country, metrics, turn) {
                self.persist(game_id, country_id, &plan);
                self.cache.insert(game_id, country_id, plan);
            }
        }

        if let Some(plan) = self.cache.get_valid(game_id, country_id, turn) {
            let provenance = if plan.turn_analyzed == turn {
                PlanProvenance::Fresh
            } else {
                PlanProvenance::Cached {
                    age_turns: turn - plan.turn_analyzed,
                }
            };
            return Some(ActivePlan {
                plan: plan.clone(),
                provenance,
            });
        }

        // Session cache empty (e.g. resumed game): fall back to the store.
        if let Some(plan) = self.load_stored(game_id, country_id, turn) {
            log::info!(
                "{}: resuming plan from turn {} out of the store",
                country_id,
                plan.turn_analyzed
            );
            self.cache.insert(game_id, country_id, plan.clone());
            let provenance = PlanProvenance::Cached {
                age_turns: turn - plan.turn_analyzed,
            };
            return Some(ActivePlan { plan, provenance });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::JsonPlanStore;
    use hegemon_core::config::{CostConfig, EconomyConfig};
    use hegemon_core::testing::WorldStateBuilder;
    use hegemon_core::{situation, Focus};

    fn plan(turn_analyzed: u32, cadence: u32) -> AdvisoryPlan {
        AdvisoryPlan {
            turn_analyzed,
            valid_until_turn: turn_analyzed + cadence - 1,
            strategic_focus: Focus::Research,
            rationale: "labs".to_string(),
            threats: String::new(),
            opportunities: String::new(),
            confidence: 0.8,
            diplomacy: Default::default(),
            recommended_actions: vec![],
        }
    }

    fn metrics_for(country: &CountryState) -> SituationMetrics {
        situation::analyze(country, &[], &EconomyConfig::default(), &CostConfig::default())
    }

    #[test]
    fn test_no_endpoint_no_store_yields_none() {
        let world = WorldStateBuilder::new().with_country("arcadia").build();
        let country = &world.countries["arcadia"];
        let metrics = metrics_for(country);
        let mut advisor = TurnAdvisor::new(None, SimConfig::default());
        assert!(!advisor.has_endpoint());
        assert!(advisor
            .active_plan(1, "arcadia", country, &metrics, 3)
            .is_none());
    }

    #[test]
    fn test_cached_plan_served_with_age() {
        let world = WorldStateBuilder::new().with_country("arcadia").build();
        let country = &world.countries["arcadia"];
        let metrics = metrics_for(country);
        let mut advisor = TurnAdvisor::new(None, SimConfig::default());
        advisor.cache.insert(1, "arcadia", plan(3, 5));

        let active = advisor
            .active_plan(1, "arcadia", country, &metrics, 3)
            .unwrap();
        assert_eq!(active.provenance, PlanProvenance::Fresh);

        let active = advisor
            .active_plan(1, "arcadia", country, &metrics, 5)
            .unwrap();
        assert_eq!(active.provenance, PlanProvenance::Cached { age_turns: 2 });

        assert!(advisor
            .active_plan(1, "arcadia", country, &metrics, 8)
            .is_none());
    }

    #[test]
    fn test_store_fallback_on_resume() {
        let world = WorldStateBuilder::new().with_country("arcadia").build();
        let country = &world.countries["arcadia"];
        let metrics = metrics_for(country);
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlanStore::new(dir.path());
        store.save(1, "arcadia", &plan(3, 5)).unwrap();

        // Fresh session, empty cache: the stored plan carries the window.
        let mut advisor =
            TurnAdvisor::new(None, SimConfig::default()).with_store(Box::new(store));
        let active = advisor
            .active_plan(1, "arcadia", country, &metrics, 5)
            .unwrap();
        assert_eq!(active.plan.turn_analyzed, 3);
        assert_eq!(active.provenance, PlanProvenance::Cached { age_turns: 2 });

        // An expired stored plan is not resurrected.
        let mut advisor = TurnAdvisor::new(None, SimConfig::default())
            .with_store(Box::new(JsonPlanStore::new(dir.path())));
        assert!(advisor
            .active_plan(1, "arcadia", country, &metrics, 20)
            .is_none());
    }
}
