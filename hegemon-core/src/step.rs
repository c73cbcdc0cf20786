//! Turn orchestration.
//!
//! A turn runs in fixed phases: advisory fetch (sequential, the only phase
//! that may touch the network), planning (parallel, pure against a snapshot),
//! resolution (sequential, deterministic order), combat, then the economy
//! tick. Planning never sees mid-turn mutations, so every country decides
//! against the same snapshot.

use crate::action::{Action, ActionData, ActionStatus};
use crate::combat::{self, CombatReport};
use crate::config::{CostConfig, EconomyConfig, SimConfig};
use crate::economy;
use crate::intent;
use crate::interpret;
use crate::plan::{ActivePlan, Intent, PlanProgress};
use crate::resolve;
use crate::situation::{self, SituationMetrics};
use crate::state::{CountryId, CountryState, GameId, WorldState};
use crate::synth::{self, SynthesisInput};
use crate::weights;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Source of advisory plans for the planning phase.
///
/// Implementations own caching and transport; the orchestrator only asks
/// "what plan, if any, is active for this country right now". Returning
/// `None` degrades that country to rule-based play for the turn.
pub trait AdvisorLink: Send {
    fn active_plan(
        &mut self,
        game_id: GameId,
        country_id: &str,
        country: &CountryState,
        metrics: &SituationMetrics,
        turn: u32,
    ) -> Option<ActivePlan>;
}

/// Immutable per-run configuration.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub sim: SimConfig,
    pub economy: EconomyConfig,
    pub costs: CostConfig,
}

/// Everything one turn produced, for display and persistence.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn: u32,
    pub intents: BTreeMap<CountryId, Intent>,
    pub actions: Vec<Action>,
    pub combats: Vec<CombatReport>,
}

/// Per-country output of the parallel planning phase.
struct CountryDecision {
    country_id: CountryId,
    intent: Intent,
    actions: Vec<Action>,
    progress: Option<PlanProgress>,
}

/// Advance the world by one turn.
pub fn run_turn(
    world: &mut WorldState,
    ctx: &TurnContext,
    mut advisor: Option<&mut dyn AdvisorLink>,
) -> TurnReport {
    let turn = world.turn;
    let _span = tracing::info_span!("turn", turn).entered();
    let ai_ids = world.ai_country_ids();
    log::info!("Turn {}: {} AI countries", turn, ai_ids.len());

    // Phase 1: advisory fetch, sequential. Network latency and cache state
    // live behind the link; planning below stays pure.
    let mut plans: HashMap<CountryId, ActivePlan> = HashMap::new();
    if let Some(advisor) = advisor.as_deref_mut() {
        for id in &ai_ids {
            let Some(country) = world.countries.get(id) else {
                continue;
            };
            let neighbors = world.neighbors(id);
            let metrics = situation::analyze(country, &neighbors, &ctx.economy, &ctx.costs);
            if let Some(plan) =
                advisor.active_plan(world.game_id, id, country, &metrics, turn)
            {
                plans.insert(id.clone(), plan);
            }
        }
    }

    // Phase 2: planning, parallel against one snapshot.
    let snapshot = world.clone();
    let mut decisions: Vec<CountryDecision> = ai_ids
        .par_iter()
        .filter_map(|id| plan_country(id, &snapshot, &plans, ctx, turn))
        .collect();
    decisions.sort_by(|a, b| a.country_id.cmp(&b.country_id));

    // Phase 3: resolution, sequential in country order.
    let mut intents = BTreeMap::new();
    let mut actions = Vec::new();
    for mut decision in decisions {
        if let Some(country) = world.countries.get_mut(&decision.country_id) {
            country.plan_progress = decision.progress.take();
        } else {
            log::warn!(
                "Country '{}' vanished between planning and resolution",
                decision.country_id
            );
            continue;
        }
        for mut action in decision.actions {
            resolve::resolve_action(world, &mut action, &ctx.costs);
            actions.push(action);
        }
        intents.insert(decision.country_id, decision.intent);
    }

    // Phase 4: combat, seeded per turn for reproducibility.
    let mut rng = StdRng::seed_from_u64(world.rng_seed ^ u64::from(turn));
    let mut combats = Vec::new();
    for action in &actions {
        if action.status != ActionStatus::Executed {
            continue;
        }
        if let ActionData::Attack {
            target, allocation, ..
        } = &action.action_data
        {
            if let Some(report) =
                combat::resolve_attack(world, &action.country_id, target, *allocation, &mut rng)
            {
                combats.push(report);
            }
        }
    }

    // Phase 5: income, upkeep and food.
    economy::run_economy_tick(world, &ctx.economy);

    world.turn += 1;
    TurnReport {
        turn,
        intents,
        actions,
        combats,
    }
}

/// Decide one country's turn against the snapshot. Pure.
fn plan_country(
    id: &str,
    snapshot: &WorldState,
    plans: &HashMap<CountryId, ActivePlan>,
    ctx: &TurnContext,
    turn: u32,
) -> Option<CountryDecision> {
    let Some(base) = snapshot.countries.get(id) else {
        log::warn!("AI country '{}' missing from snapshot, skipping", id);
        return None;
    };
    let active = plans.get(id);

    // Work on a local copy so progress bookkeeping (plan rollover, stop
    // conditions) is visible to synthesis without touching the snapshot.
    let mut country = base.clone();
    country.plan_progress = synced_progress(&country, active);

    let neighbors = snapshot.neighbors(id);
    let metrics = situation::analyze(&country, &neighbors, &ctx.economy, &ctx.costs);
    let weights = weights::calculate(&metrics, &country.personality, &country.profile_modifiers());
    let bans = active
        .map(|a| interpret::extract_bans(&a.plan.recommended_actions))
        .unwrap_or_default();
    let intent = intent::derive_intent(&country, &metrics, &weights, active, turn, &ctx.sim);

    let input = SynthesisInput {
        game_id: snapshot.game_id,
        country_id: id,
        country: &country,
        world: snapshot,
        turn,
        intent: &intent,
        plan: active.map(|a| &a.plan),
        bans: &bans,
        weights: &weights,
        metrics: &metrics,
        costs: &ctx.costs,
    };
    let actions = synth::synthesize(&input);

    Some(CountryDecision {
        country_id: id.to_string(),
        intent,
        actions,
        progress: country.plan_progress,
    })
}

/// Progress record aligned with the active plan: rolled over when a newer
/// plan supersedes the old one, with satisfied stop conditions marked
/// complete. Without a plan the stale record is dropped.
fn synced_progress(country: &CountryState, active: Option<&ActivePlan>) -> Option<PlanProgress> {
    let plan = &active?.plan;
    let mut progress = country
        .plan_progress
        .clone()
        .filter(|p| p.plan_turn == plan.turn_analyzed)
        .unwrap_or_else(|| PlanProgress::for_plan(plan.turn_analyzed));
    for step in plan.steps() {
        if let Some(stop) = &step.stop_when {
            if stop.satisfied_by(country) {
                progress.completed_steps.insert(step.id.clone());
            }
        }
    }
    Some(progress)
}
