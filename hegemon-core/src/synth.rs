//! Action synthesis.
//!
//! Turns an intent into concrete priced actions. Three synthesizers run in a
//! fixed order (economic, military, diplomatic) against one shared budget
//! tracker, so a turn can never overspend the treasury snapshot. Each
//! synthesizer tries, in order: structured plan steps (as many as the budget
//! allows), free-text plan steps, then its rule-based fallback.
//!
//! Focus suppression applies to the fallback paths only. An explicit
//! executable step from the advisory plan always flows through (bans still
//! win), and an economic crisis keeps survival spending flowing regardless of
//! focus.

use crate::action::{Action, ActionData, AdvisoryTrace};
use crate::config::CostConfig;
use crate::interpret::{self, InstructionKind};
use crate::plan::{
    AdvisoryPlan, Bans, Focus, Intent, PlanProgress, Stance, StepActionType, StepItem,
};
use crate::pricing;
use crate::situation::SituationMetrics;
use crate::state::{CountryState, GameId, WorldState};
use crate::weights::PriorityWeights;

/// Weight above which a rule-based fallback in that domain is worth acting on.
const FALLBACK_WEIGHT_THRESHOLD: f32 = 0.4;
/// ROI horizon for rule-based research.
const RESEARCH_ROI_HORIZON: u32 = 50;
/// Adjusted aggression needed for an opportunistic rule-based attack.
const ATTACK_AGGRESSION_THRESHOLD: f32 = 0.8;
/// A neighbor this much weaker (effective) is a viable target.
const ATTACK_SUPERIORITY_RATIO: f64 = 0.6;
const ATTACK_ALLOCATION: f64 = 0.6;

/// Everything the synthesizers need for one country-turn, read-only.
pub struct SynthesisInput<'a> {
    pub game_id: GameId,
    pub country_id: &'a str,
    pub country: &'a CountryState,
    pub world: &'a WorldState,
    pub turn: u32,
    pub intent: &'a Intent,
    pub plan: Option<&'a AdvisoryPlan>,
    pub bans: &'a Bans,
    pub weights: &'a PriorityWeights,
    pub metrics: &'a SituationMetrics,
    pub costs: &'a CostConfig,
}

/// Running spend tracker for one country-turn.
///
/// Normal spending keeps the remainder at or above the safety buffer;
/// survival spending only has to stay non-negative.
struct BudgetTracker {
    remaining: i64,
    safety_buffer: i64,
}

impl BudgetTracker {
    fn new(budget: i64, safety_buffer: i64) -> Self {
        Self {
            remaining: budget,
            safety_buffer,
        }
    }

    fn can_spend(&self, cost: i64, survival: bool) -> bool {
        let floor = if survival { 0 } else { self.safety_buffer };
        cost >= 0 && self.remaining - cost >= floor
    }

    fn spend(&mut self, cost: i64) {
        self.remaining -= cost;
    }
}

/// Synthesize this turn's actions for one country. Pure with respect to world
/// state; pricing is a quote against the snapshot and is re-verified at
/// resolution time.
pub fn synthesize(input: &SynthesisInput) -> Vec<Action> {
    let mut tracker = BudgetTracker::new(input.country.budget, input.weights.safety_buffer);
    let mut actions = Vec::new();

    for data in economic_actions(input, &mut tracker) {
        actions.push(make_action(input, data));
    }
    for data in military_actions(input, &mut tracker) {
        actions.push(make_action(input, data));
    }
    for data in diplomatic_actions(input, &mut tracker) {
        actions.push(make_action(input, data));
    }

    log::debug!(
        "{}: synthesized {} action(s), {} budget uncommitted",
        input.country_id,
        actions.len(),
        tracker.remaining
    );
    actions
}

fn make_action(input: &SynthesisInput, data: ActionData) -> Action {
    Action::new(input.game_id, input.country_id.to_string(), input.turn, data)
}

/// Plan progress for the active plan, or an empty record when none matches.
fn progress_for(input: &SynthesisInput) -> PlanProgress {
    let plan_turn = input.plan.map(|p| p.turn_analyzed);
    input
        .country
        .plan_progress
        .as_ref()
        .filter(|p| Some(p.plan_turn) == plan_turn)
        .cloned()
        .unwrap_or_default()
}

/// Structured steps of the given types, eligible this turn, most urgent first.
fn eligible_steps<'a>(
    input: &'a SynthesisInput,
    progress: &PlanProgress,
    types: &[StepActionType],
) -> Vec<&'a StepItem> {
    let Some(plan) = input.plan else {
        return Vec::new();
    };
    let mut steps: Vec<(usize, &StepItem)> = plan
        .steps()
        .enumerate()
        .filter(|(_, s)| {
            let Some(exec) = &s.execution else {
                return false;
            };
            if !types.contains(&exec.action_type) {
                return false;
            }
            if progress.is_done(s) || input.bans.blocks(exec.action_type) {
                return false;
            }
            match &s.when {
                Some(gate) => gate.satisfied_by(input.country),
                // Conditional wording without a machine gate is skipped, not
                // treated as always-true.
                None => !interpret::reads_conditional(&s.instruction),
            }
        })
        .collect();
    steps.sort_by_key(|(idx, s)| (s.priority.unwrap_or(u32::MAX), *idx));
    steps.into_iter().map(|(_, s)| s).collect()
}

fn trace_for(input: &SynthesisInput, step: &StepItem) -> Option<AdvisoryTrace> {
    input.plan.map(|p| AdvisoryTrace {
        step_id: step.id.clone(),
        plan_turn: p.turn_analyzed,
    })
}

fn research_data(
    input: &SynthesisInput,
    target_level: Option<u32>,
    trace: Option<AdvisoryTrace>,
) -> Option<ActionData> {
    // An already-reached target level has nothing left to do.
    if target_level.is_some_and(|t| input.country.technology_level >= t) {
        return None;
    }
    let quote = pricing::price_research(input.country, input.costs);
    Some(ActionData::Research {
        cost: quote.cost,
        target_level: target_level.unwrap_or(input.country.technology_level + 1),
        trace,
    })
}

fn infrastructure_data(
    input: &SynthesisInput,
    target_level: Option<u32>,
    trace: Option<AdvisoryTrace>,
) -> Option<ActionData> {
    if target_level.is_some_and(|t| input.country.infrastructure_level >= t) {
        return None;
    }
    let quote = pricing::price_infrastructure(input.country, input.costs);
    Some(ActionData::Infrastructure {
        cost: quote.cost,
        target_level: target_level.unwrap_or(input.country.infrastructure_level + 1),
        trace,
    })
}

/// Research or infrastructure. Structured steps keep executing while the
/// tracker can afford the next one; the fallback paths emit at most one.
fn economic_actions(input: &SynthesisInput, tracker: &mut BudgetTracker) -> Vec<ActionData> {
    let progress = progress_for(input);
    let survival = input.metrics.starvation_soon();
    let mut out = Vec::new();

    // Structured steps bypass focus suppression.
    for step in eligible_steps(
        input,
        &progress,
        &[StepActionType::Research, StepActionType::Infrastructure],
    ) {
        let Some(exec) = step.execution.as_ref() else {
            continue;
        };
        let data = match exec.action_type {
            StepActionType::Research => {
                research_data(input, exec.action_data.target_level, trace_for(input, step))
            }
            StepActionType::Infrastructure => infrastructure_data(
                input,
                exec.action_data.target_level,
                trace_for(input, step),
            ),
            _ => None,
        };
        // Scan past unaffordable steps to the next one rather than stalling.
        if let Some(data) = data {
            let step_survival =
                survival && matches!(data, ActionData::Infrastructure { .. });
            if tracker.can_spend(data.cost(), step_survival) {
                tracker.spend(data.cost());
                out.push(data);
                continue;
            }
            log::debug!(
                "{}: step '{}' unaffordable at {}, scanning on",
                input.country_id,
                step.id,
                data.cost()
            );
        }
    }
    if !out.is_empty() {
        return out;
    }

    // Fallback paths respect focus suppression, except in a crisis.
    let suppressed = input.intent.focus == Focus::Military && !input.metrics.economic_crisis();
    if suppressed {
        return out;
    }

    // Free-text steps that read as economic instructions.
    for step in free_text_steps(input, &progress) {
        let data = match interpret::classify_instruction(&step.instruction) {
            Some(InstructionKind::TechUpgrade) if !input.bans.tech_upgrades => research_data(
                input,
                interpret::extract_target_level(&step.instruction),
                trace_for(input, step),
            ),
            Some(InstructionKind::InfrastructureUpgrade)
                if !input.bans.infrastructure_upgrades =>
            {
                infrastructure_data(
                    input,
                    interpret::extract_target_level(&step.instruction),
                    trace_for(input, step),
                )
            }
            _ => None,
        };
        if let Some(data) = data {
            if tracker.can_spend(data.cost(), survival) {
                tracker.spend(data.cost());
                out.push(data);
                return out;
            }
        }
    }

    // Rule-based fallback. Starvation forces infrastructure for food yield.
    if survival && !input.bans.infrastructure_upgrades {
        if let Some(data) = infrastructure_data(input, None, None) {
            if tracker.can_spend(data.cost(), true) {
                tracker.spend(data.cost());
                out.push(data);
            }
        }
        return out;
    }
    if input.metrics.bankruptcy_soon() {
        return out;
    }

    let research_worthwhile = input.weights.research >= FALLBACK_WEIGHT_THRESHOLD
        && input
            .metrics
            .research_roi_turns
            .is_some_and(|t| t < RESEARCH_ROI_HORIZON)
        && !input.bans.tech_upgrades;
    if research_worthwhile {
        if let Some(data) = research_data(input, None, None) {
            if tracker.can_spend(data.cost(), false) {
                tracker.spend(data.cost());
                out.push(data);
                return out;
            }
        }
    }

    let infra_worthwhile = input.weights.infrastructure >= FALLBACK_WEIGHT_THRESHOLD
        && !input.bans.infrastructure_upgrades;
    if infra_worthwhile {
        if let Some(data) = infrastructure_data(input, None, None) {
            if tracker.can_spend(data.cost(), false) {
                tracker.spend(data.cost());
                out.push(data);
            }
        }
    }
    out
}

/// Recruit or attack. Structured steps keep executing while the tracker can
/// afford the next one; the fallback paths emit at most one.
fn military_actions(input: &SynthesisInput, tracker: &mut BudgetTracker) -> Vec<ActionData> {
    let progress = progress_for(input);
    let mut out = Vec::new();

    for step in eligible_steps(
        input,
        &progress,
        &[StepActionType::Recruit, StepActionType::Attack],
    ) {
        let Some(exec) = step.execution.as_ref() else {
            continue;
        };
        let data = match exec.action_type {
            StepActionType::Recruit => {
                let amount = exec.action_data.amount.unwrap_or(10).max(1);
                let quote = pricing::price_recruitment(input.country, amount, input.costs);
                Some(ActionData::Recruit {
                    cost: quote.cost,
                    amount,
                    trace: trace_for(input, step),
                })
            }
            StepActionType::Attack => exec.action_data.target.as_ref().map(|target| {
                let allocation = exec.action_data.allocation.unwrap_or(0.5).clamp(0.0, 1.0);
                let quote = pricing::price_attack(input.country, allocation, input.costs);
                ActionData::Attack {
                    cost: quote.cost,
                    target: target.clone(),
                    allocation,
                    trace: trace_for(input, step),
                }
            }),
            _ => None,
        };
        if let Some(data) = data {
            if tracker.can_spend(data.cost(), false) {
                tracker.spend(data.cost());
                out.push(data);
            }
        }
    }
    if !out.is_empty() {
        return out;
    }

    // Free-text military instructions map to a standing recruit order.
    if input.intent.focus != Focus::Diplomacy && !input.bans.recruitment {
        for step in free_text_steps(input, &progress) {
            if interpret::reads_military(&step.instruction) {
                let amount = recruit_amount(input);
                let quote = pricing::price_recruitment(input.country, amount, input.costs);
                if tracker.can_spend(quote.cost, false) {
                    tracker.spend(quote.cost);
                    out.push(ActionData::Recruit {
                        cost: quote.cost,
                        amount,
                        trace: trace_for(input, step),
                    });
                    return out;
                }
            }
        }
    }

    // Fallbacks are suppressed under a diplomacy focus and during austerity.
    if input.intent.focus == Focus::Diplomacy || input.metrics.economic_crisis() {
        return out;
    }

    if input.metrics.under_defended
        && input.weights.military >= FALLBACK_WEIGHT_THRESHOLD
        && !input.bans.recruitment
    {
        let mut amount = recruit_amount(input);
        // Halve the order until it fits the budget.
        while amount >= 10 {
            let quote = pricing::price_recruitment(input.country, amount, input.costs);
            if tracker.can_spend(quote.cost, false) {
                tracker.spend(quote.cost);
                out.push(ActionData::Recruit {
                    cost: quote.cost,
                    amount,
                    trace: None,
                });
                return out;
            }
            amount = round_to_ten(amount / 2);
        }
        return out;
    }

    let posture = input
        .country
        .personality
        .adjusted_for_focus(input.intent.focus);
    if posture.aggression() >= ATTACK_AGGRESSION_THRESHOLD && !input.metrics.under_defended {
        let own = input.country.effective_strength();
        let Some(target) = input
            .world
            .neighbors(input.country_id)
            .into_iter()
            .filter(|n| n.effective_strength() < own * ATTACK_SUPERIORITY_RATIO)
            .min_by(|a, b| {
                a.effective_strength()
                    .partial_cmp(&b.effective_strength())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|n| n.name.clone())
        else {
            return out;
        };
        let quote = pricing::price_attack(input.country, ATTACK_ALLOCATION, input.costs);
        if tracker.can_spend(quote.cost, false) {
            tracker.spend(quote.cost);
            out.push(ActionData::Attack {
                cost: quote.cost,
                target,
                allocation: ATTACK_ALLOCATION,
                trace: None,
            });
        }
    }
    out
}

/// Stance declarations. Structured steps keep executing while the tracker
/// can afford the next one; the fallback paths emit at most one.
fn diplomatic_actions(input: &SynthesisInput, tracker: &mut BudgetTracker) -> Vec<ActionData> {
    let progress = progress_for(input);
    let cost = input.costs.diplomacy_cost;
    let mut out = Vec::new();

    for step in eligible_steps(input, &progress, &[StepActionType::Diplomacy]) {
        let Some(exec) = step.execution.as_ref() else {
            continue;
        };
        if let (Some(target), Some(stance)) =
            (exec.action_data.target.clone(), exec.action_data.stance)
        {
            if tracker.can_spend(cost, false) {
                tracker.spend(cost);
                out.push(ActionData::Diplomacy {
                    cost,
                    target,
                    stance,
                    trace: trace_for(input, step),
                });
            }
        }
    }
    if !out.is_empty() {
        return out;
    }

    // The plan's diplomacy map: declare the first stance that differs from
    // the currently declared one.
    if let Some(plan) = input.plan {
        for (target, &stance) in &plan.diplomacy {
            if target.as_str() == input.country_id || !input.world.countries.contains_key(target) {
                continue;
            }
            if current_stance(input, target) == stance {
                continue;
            }
            if tracker.can_spend(cost, false) {
                tracker.spend(cost);
                out.push(ActionData::Diplomacy {
                    cost,
                    target: target.clone(),
                    stance,
                    trace: None,
                });
                return out;
            }
        }
    }

    if input.metrics.economic_crisis() {
        return out;
    }

    // Cooperative leadership under a diplomacy focus courts its strongest
    // neighbor.
    let posture = input
        .country
        .personality
        .adjusted_for_focus(input.intent.focus);
    if input.intent.focus == Focus::Diplomacy && posture.cooperativeness() > 0.6 {
        let target = input
            .world
            .adjacency
            .get(input.country_id)
            .and_then(|neighbors| {
                neighbors
                    .iter()
                    .filter(|id| current_stance(input, id) != Stance::Friendly)
                    .max_by(|a, b| {
                        let sa = input
                            .world
                            .countries
                            .get(*a)
                            .map(|c| c.effective_strength())
                            .unwrap_or(0.0);
                        let sb = input
                            .world
                            .countries
                            .get(*b)
                            .map(|c| c.effective_strength())
                            .unwrap_or(0.0);
                        sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
                    })
            })
            .cloned();
        if let Some(target) = target {
            if tracker.can_spend(cost, false) {
                tracker.spend(cost);
                out.push(ActionData::Diplomacy {
                    cost,
                    target,
                    stance: Stance::Friendly,
                    trace: None,
                });
            }
        }
    }
    out
}

fn current_stance(input: &SynthesisInput, target: &str) -> Stance {
    input
        .world
        .stances
        .get(input.country_id)
        .and_then(|m| m.get(target))
        .copied()
        .unwrap_or(Stance::Neutral)
}

/// Plan steps without an execution payload, eligible this turn, in order.
fn free_text_steps<'a>(
    input: &'a SynthesisInput,
    progress: &PlanProgress,
) -> Vec<&'a StepItem> {
    let Some(plan) = input.plan else {
        return Vec::new();
    };
    plan.steps()
        .filter(|s| {
            s.execution.is_none()
                && !progress.is_done(s)
                && !interpret::reads_conditional(&s.instruction)
        })
        .collect()
}

/// Size a recruit order to the current deficit, in raw units, rounded to tens.
fn recruit_amount(input: &SynthesisInput) -> i64 {
    let raw_needed = input.metrics.military_deficit.max(0.0) / input.country.tech_multiplier();
    round_to_ten(raw_needed.ceil() as i64).max(10)
}

fn round_to_ten(n: i64) -> i64 {
    (n + 9) / 10 * 10
}
