//! Strategic intent derivation.
//!
//! Merges the advisory plan (fresh or cached) with the rule-based focus
//! derivation into a single per-country, per-turn [`Intent`]. Crisis
//! conditions always override the plan: safety floors are non-negotiable.

use crate::config::SimConfig;
use crate::plan::{ActivePlan, Focus, Intent, PlanProvenance, PlanRef};
use crate::situation::SituationMetrics;
use crate::state::{CountryState, Personality};
use crate::weights::PriorityWeights;

const GOOD_RESEARCH_ROI_TURNS: u32 = 50;
const WEALTH_THRESHOLD: i64 = 10_000;

/// Derive the turn intent, in priority order: crisis, advisory plan,
/// rule-based heuristics, balanced fallback.
pub fn derive_intent(
    country: &CountryState,
    metrics: &SituationMetrics,
    weights: &PriorityWeights,
    active: Option<&ActivePlan>,
    turn: u32,
    sim: &SimConfig,
) -> Intent {
    let plan_ref = active.map(|a| plan_ref(a, country));

    if metrics.starvation_soon() {
        return Intent {
            focus: Focus::Economy,
            rationale: format!(
                "Starvation in {} turns; food supply takes priority over everything",
                metrics.food_turns_remaining.unwrap_or(0)
            ),
            plan: plan_ref,
        };
    }
    if metrics.bankruptcy_soon() {
        return Intent {
            focus: Focus::Economy,
            rationale: format!(
                "Bankruptcy in {} turns; austerity overrides the advisory plan",
                metrics.turns_to_bankruptcy.unwrap_or(0)
            ),
            plan: plan_ref,
        };
    }
    if metrics.under_defended && metrics.military_deficit > 30.0 {
        return Intent {
            focus: Focus::Military,
            rationale: format!(
                "Effective strength {:.0} short of the neighbor baseline",
                metrics.military_deficit
            ),
            plan: plan_ref,
        };
    }

    if let Some(active) = active {
        let provenance = match active.provenance {
            PlanProvenance::Fresh => "fresh advisory plan".to_string(),
            PlanProvenance::Cached { age_turns } => {
                format!("cached advisory plan, {} turns old", age_turns)
            }
        };
        return Intent {
            focus: active.plan.strategic_focus,
            rationale: format!("{} ({})", active.plan.rationale, provenance),
            plan: plan_ref,
        };
    }

    rule_based_intent(country, metrics, weights, turn, sim)
}

fn rule_based_intent(
    country: &CountryState,
    metrics: &SituationMetrics,
    weights: &PriorityWeights,
    turn: u32,
    sim: &SimConfig,
) -> Intent {
    let personality: &Personality = &country.personality;

    // Early game bootstraps the economy and research base.
    if turn < sim.early_game_turns {
        let focus = if metrics.can_afford_research
            && metrics
                .research_roi_turns
                .is_some_and(|t| t < GOOD_RESEARCH_ROI_TURNS)
        {
            Focus::Research
        } else {
            Focus::Economy
        };
        return Intent {
            focus,
            rationale: "Early-game bootstrapping".to_string(),
            plan: None,
        };
    }

    if metrics
        .research_roi_turns
        .is_some_and(|t| t < GOOD_RESEARCH_ROI_TURNS)
        && metrics.can_afford_research
        && weights.research >= weights.military
    {
        return Intent {
            focus: Focus::Research,
            rationale: format!(
                "Research pays back in {} turns",
                metrics.research_roi_turns.unwrap_or(0)
            ),
            plan: None,
        };
    }

    if metrics.under_defended || personality.aggression() > 0.7 {
        return Intent {
            focus: Focus::Military,
            rationale: if metrics.under_defended {
                "Closing the defense gap".to_string()
            } else {
                "Aggressive posture".to_string()
            },
            plan: None,
        };
    }

    if personality.cooperativeness() > 0.7 {
        return Intent {
            focus: Focus::Diplomacy,
            rationale: "Cooperative leadership courts its neighbors".to_string(),
            plan: None,
        };
    }

    if metrics.budget > WEALTH_THRESHOLD && metrics.can_afford_infrastructure {
        return Intent {
            focus: Focus::Economy,
            rationale: "Surplus treasury reinvested".to_string(),
            plan: None,
        };
    }

    Intent {
        focus: Focus::Balanced,
        rationale: "No dominant pressure".to_string(),
        plan: None,
    }
}

fn plan_ref(active: &ActivePlan, country: &CountryState) -> PlanRef {
    let executed = country
        .plan_progress
        .as_ref()
        .filter(|p| p.plan_turn == active.plan.turn_analyzed)
        .map(|p| p.executed_steps.clone())
        .unwrap_or_default();
    PlanRef {
        provenance: active.provenance,
        turn_analyzed: active.plan.turn_analyzed,
        valid_until_turn: active.plan.valid_until_turn,
        recommended: active
            .plan
            .recommended_actions
            .iter()
            .map(|i| i.instruction().to_string())
            .collect(),
        executed_steps: executed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::AdvisoryPlan;
    use std::collections::BTreeMap;

    fn metrics() -> SituationMetrics {
        SituationMetrics {
            budget: 20_000,
            net_income: 1_000,
            turns_to_bankruptcy: None,
            food_balance: 100,
            food_turns_remaining: None,
            can_afford_research: true,
            can_afford_infrastructure: true,
            can_afford_military: true,
            research_roi_turns: Some(80),
            infrastructure_roi_turns: Some(80),
            raw_strength: 500,
            effective_strength: 600.0,
            military_deficit: -50.0,
            under_defended: false,
        }
    }

    fn weights() -> PriorityWeights {
        PriorityWeights {
            research: 0.3,
            infrastructure: 0.3,
            military: 0.3,
            safety_buffer: 1_000,
        }
    }

    fn military_plan() -> ActivePlan {
        ActivePlan {
            plan: AdvisoryPlan {
                turn_analyzed: 10,
                valid_until_turn: 14,
                strategic_focus: Focus::Military,
                rationale: "Strike while they are weak".to_string(),
                threats: String::new(),
                opportunities: String::new(),
                confidence: 0.9,
                diplomacy: BTreeMap::new(),
                recommended_actions: vec![],
            },
            provenance: PlanProvenance::Fresh,
        }
    }

    #[test]
    fn test_starvation_overrides_advisory_plan() {
        let mut m = metrics();
        m.food_turns_remaining = Some(3);
        m.food_balance = -40;
        let country = CountryState {
            personality: Personality::new(1.0, 0.0, 1.0, 0.5),
            ..Default::default()
        };
        let intent = derive_intent(
            &country,
            &m,
            &weights(),
            Some(&military_plan()),
            12,
            &SimConfig::default(),
        );
        // Focus = economy regardless of advisory plan or personality.
        assert_eq!(intent.focus, Focus::Economy);
        // The plan reference is still carried for display.
        assert!(intent.plan.is_some());
    }

    #[test]
    fn test_active_plan_sets_focus_with_provenance() {
        let country = CountryState::default();
        let intent = derive_intent(
            &country,
            &metrics(),
            &weights(),
            Some(&military_plan()),
            12,
            &SimConfig::default(),
        );
        assert_eq!(intent.focus, Focus::Military);
        assert!(intent.rationale.contains("fresh advisory plan"));

        let cached = ActivePlan {
            provenance: PlanProvenance::Cached { age_turns: 2 },
            ..military_plan()
        };
        let intent = derive_intent(
            &country,
            &metrics(),
            &weights(),
            Some(&cached),
            12,
            &SimConfig::default(),
        );
        assert!(intent.rationale.contains("2 turns old"));
    }

    #[test]
    fn test_early_game_bootstraps() {
        let mut m = metrics();
        m.research_roi_turns = Some(20);
        let intent = derive_intent(
            &CountryState::default(),
            &m,
            &weights(),
            None,
            4,
            &SimConfig::default(),
        );
        assert_eq!(intent.focus, Focus::Research);
    }

    #[test]
    fn test_personality_fallbacks() {
        let aggressive = CountryState {
            personality: Personality::new(0.9, 0.2, 0.5, 0.5),
            ..Default::default()
        };
        let intent = derive_intent(
            &aggressive,
            &metrics(),
            &weights(),
            None,
            20,
            &SimConfig::default(),
        );
        assert_eq!(intent.focus, Focus::Military);

        let cooperative = CountryState {
            personality: Personality::new(0.2, 0.9, 0.5, 0.5),
            ..Default::default()
        };
        let intent = derive_intent(
            &cooperative,
            &metrics(),
            &weights(),
            None,
            20,
            &SimConfig::default(),
        );
        assert_eq!(intent.focus, Focus::Diplomacy);
    }

    #[test]
    fn test_balanced_fallback() {
        let mut m = metrics();
        m.budget = 500;
        m.can_afford_infrastructure = false;
        let intent = derive_intent(
            &CountryState::default(),
            &m,
            &weights(),
            None,
            20,
            &SimConfig::default(),
        );
        assert_eq!(intent.focus, Focus::Balanced);
    }
}
