//! Action resolution.
//!
//! Applies a pending action to the world, re-pricing against the current
//! state rather than trusting the quote the synthesizer computed from its
//! snapshot. A failed action is marked [`ActionStatus::Failed`] and leaves
//! the world untouched; failures never abort the turn.

use crate::action::{Action, ActionData, ActionStatus, AdvisoryTrace};
use crate::config::CostConfig;
use crate::plan::PlanProgress;
use crate::pricing;
use crate::state::{CountryState, WorldState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("unknown country '{0}'")]
    UnknownCountry(String),
}

/// Resolve one action in place, updating its status and cost to what was
/// actually charged.
pub fn resolve_action(world: &mut WorldState, action: &mut Action, costs: &CostConfig) {
    match apply(world, action, costs) {
        Ok(()) => {
            action.status = ActionStatus::Executed;
        }
        Err(err) => {
            log::warn!(
                "{}: {:?} action failed: {}",
                action.country_id,
                action.action_type,
                err
            );
            action.status = ActionStatus::Failed;
        }
    }
}

fn apply(world: &mut WorldState, action: &mut Action, costs: &CostConfig) -> Result<(), ActionError> {
    let country_id = action.country_id.clone();

    // Stance declarations touch world-level state, handled before the
    // mutable country borrow.
    if let ActionData::Diplomacy {
        cost,
        target,
        stance,
        ..
    } = &action.action_data
    {
        let (cost, target, stance) = (*cost, target.clone(), *stance);
        if !world.countries.contains_key(&target) {
            return Err(ActionError::UnknownCountry(target));
        }
        let country = country_mut(world, &country_id)?;
        charge(country, cost)?;
        world
            .stances
            .entry(country_id.clone())
            .or_default()
            .insert(target.clone(), stance);
        let country = country_mut(world, &country_id)?;
        record_trace(country, action.action_data.trace());
        log::info!("{} declares {:?} toward {}", country_id, stance, target);
        return Ok(());
    }

    let country = country_mut(world, &country_id)?;
    match &mut action.action_data {
        ActionData::Research { cost, .. } => {
            let quote = pricing::price_research(country, costs);
            charge(country, quote.cost)?;
            deduct_resources(country, &quote.required_resources);
            country.technology_level += 1;
            *cost = quote.cost;
            log::info!(
                "{} researched to tech level {} for {}",
                country_id,
                country.technology_level,
                quote.cost
            );
        }
        ActionData::Infrastructure { cost, .. } => {
            let quote = pricing::price_infrastructure(country, costs);
            charge(country, quote.cost)?;
            deduct_resources(country, &quote.required_resources);
            country.infrastructure_level += 1;
            *cost = quote.cost;
            log::info!(
                "{} built infrastructure level {} for {}",
                country_id,
                country.infrastructure_level,
                quote.cost
            );
        }
        ActionData::Recruit { cost, amount, .. } => {
            let quote = pricing::price_recruitment(country, *amount, costs);
            charge(country, quote.cost)?;
            deduct_resources(country, &quote.required_resources);
            country.military_strength += *amount;
            *cost = quote.cost;
            log::info!(
                "{} recruited {} units for {} (strength now {})",
                country_id,
                amount,
                quote.cost,
                country.military_strength
            );
        }
        ActionData::Attack {
            cost, allocation, ..
        } => {
            // Mobilization is paid at declaration; the battle itself is
            // resolved in the combat phase.
            let quote = pricing::price_attack(country, *allocation, costs);
            charge(country, quote.cost)?;
            *cost = quote.cost;
        }
        ActionData::Diplomacy { .. } => unreachable!("handled above"),
    }
    let country = country_mut(world, &country_id)?;
    record_trace(country, action.action_data.trace());
    Ok(())
}

fn country_mut<'a>(
    world: &'a mut WorldState,
    id: &str,
) -> Result<&'a mut CountryState, ActionError> {
    world
        .countries
        .get_mut(id)
        .ok_or_else(|| ActionError::UnknownCountry(id.to_string()))
}

fn charge(country: &mut CountryState, cost: i64) -> Result<(), ActionError> {
    if cost > country.budget {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: country.budget,
        });
    }
    country.budget -= cost;
    Ok(())
}

/// Stockpiles are drained down to zero, never below. A shortfall was already
/// priced in through the shortage multiplier.
fn deduct_resources(country: &mut CountryState, required: &[(crate::state::ResourceKind, i64)]) {
    for &(kind, amount) in required {
        let stock = country.resources.entry(kind).or_insert(0);
        *stock -= amount.min(*stock);
    }
}

/// Remember that a plan step produced an executed action.
fn record_trace(country: &mut CountryState, trace: Option<&AdvisoryTrace>) {
    let Some(trace) = trace else {
        return;
    };
    let progress = country
        .plan_progress
        .get_or_insert_with(|| PlanProgress::for_plan(trace.plan_turn));
    if progress.plan_turn != trace.plan_turn {
        *progress = PlanProgress::for_plan(trace.plan_turn);
    }
    progress.executed_steps.insert(trace.step_id.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Stance;
    use crate::testing::WorldStateBuilder;
    use proptest::prelude::*;

    fn world() -> WorldState {
        WorldStateBuilder::new()
            .with_country("arcadia")
            .with_country("borovia")
            .with_adjacency("arcadia", "borovia")
            .build()
    }

    fn pending(world: &WorldState, data: ActionData) -> Action {
        Action::new(world.game_id, "arcadia".to_string(), world.turn, data)
    }

    #[test]
    fn test_research_executes_and_reprices() {
        let mut w = world();
        let before = w.countries["arcadia"].clone();
        let quote = pricing::price_research(&before, &CostConfig::default());

        let mut action = pending(
            &w,
            ActionData::Research {
                // A stale snapshot quote is ignored in favor of the re-price.
                cost: 1,
                target_level: before.technology_level + 1,
                trace: None,
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());

        assert_eq!(action.status, ActionStatus::Executed);
        assert_eq!(action.cost(), quote.cost);
        let after = &w.countries["arcadia"];
        assert_eq!(after.technology_level, before.technology_level + 1);
        assert_eq!(after.budget, before.budget - quote.cost);
    }

    #[test]
    fn test_insufficient_funds_fails_without_side_effects() {
        let mut w = world();
        w.countries.get_mut("arcadia").unwrap().budget = 0;
        let before = w.countries["arcadia"].clone();

        let mut action = pending(
            &w,
            ActionData::Recruit {
                cost: 0,
                amount: 100,
                trace: None,
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());

        assert_eq!(action.status, ActionStatus::Failed);
        let after = &w.countries["arcadia"];
        assert_eq!(after.military_strength, before.military_strength);
        assert_eq!(after.budget, 0);
        assert_eq!(after.resources, before.resources);
    }

    #[test]
    fn test_recruit_adds_strength_and_drains_resources() {
        let mut w = world();
        let before = w.countries["arcadia"].clone();
        let mut action = pending(
            &w,
            ActionData::Recruit {
                cost: 0,
                amount: 50,
                trace: None,
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());

        assert_eq!(action.status, ActionStatus::Executed);
        let after = &w.countries["arcadia"];
        assert_eq!(after.military_strength, before.military_strength + 50);
        assert!(
            after.resource(crate::state::ResourceKind::Iron)
                < before.resource(crate::state::ResourceKind::Iron)
        );
    }

    #[test]
    fn test_diplomacy_sets_stance() {
        let mut w = world();
        let mut action = pending(
            &w,
            ActionData::Diplomacy {
                cost: 50,
                target: "borovia".to_string(),
                stance: Stance::Friendly,
                trace: None,
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());
        assert_eq!(action.status, ActionStatus::Executed);
        assert_eq!(w.stances["arcadia"]["borovia"], Stance::Friendly);
    }

    #[test]
    fn test_diplomacy_toward_unknown_country_fails() {
        let mut w = world();
        let before = w.countries["arcadia"].budget;
        let mut action = pending(
            &w,
            ActionData::Diplomacy {
                cost: 50,
                target: "nowhere".to_string(),
                stance: Stance::Hostile,
                trace: None,
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());
        assert_eq!(action.status, ActionStatus::Failed);
        assert_eq!(w.countries["arcadia"].budget, before);
    }

    #[test]
    fn test_attack_deducts_mobilization_only() {
        let mut w = world();
        let before = w.countries["arcadia"].clone();
        let quote = pricing::price_attack(&before, 0.5, &CostConfig::default());

        let mut action = pending(
            &w,
            ActionData::Attack {
                cost: 0,
                target: "borovia".to_string(),
                allocation: 0.5,
                trace: None,
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());

        assert_eq!(action.status, ActionStatus::Executed);
        let after = &w.countries["arcadia"];
        assert_eq!(after.budget, before.budget - quote.cost);
        // Strength is not touched until the combat phase.
        assert_eq!(after.military_strength, before.military_strength);
    }

    #[test]
    fn test_executed_trace_is_recorded_in_progress() {
        let mut w = world();
        let mut action = pending(
            &w,
            ActionData::Recruit {
                cost: 0,
                amount: 10,
                trace: Some(AdvisoryTrace {
                    step_id: "s1".to_string(),
                    plan_turn: 4,
                }),
            },
        );
        resolve_action(&mut w, &mut action, &CostConfig::default());
        let progress = w.countries["arcadia"].plan_progress.as_ref().unwrap();
        assert_eq!(progress.plan_turn, 4);
        assert!(progress.executed_steps.contains("s1"));
    }

    proptest! {
        // A rejected charge leaves the treasury untouched, so no sequence of
        // actions can take it below zero.
        #[test]
        fn prop_resolution_never_drives_budget_negative(
            budget in 0i64..20_000,
            specs in prop::collection::vec((0u8..4, 1i64..500, 0.01f64..1.0), 1..24),
        ) {
            let mut w = world();
            w.countries.get_mut("arcadia").unwrap().budget = budget;
            for (kind, amount, allocation) in specs {
                let me = &w.countries["arcadia"];
                let data = match kind {
                    0 => ActionData::Research {
                        cost: 0,
                        target_level: me.technology_level + 1,
                        trace: None,
                    },
                    1 => ActionData::Infrastructure {
                        cost: 0,
                        target_level: me.infrastructure_level + 1,
                        trace: None,
                    },
                    2 => ActionData::Recruit {
                        cost: 0,
                        amount,
                        trace: None,
                    },
                    _ => ActionData::Attack {
                        cost: 0,
                        target: "borovia".to_string(),
                        allocation,
                        trace: None,
                    },
                };
                let mut action = pending(&w, data);
                resolve_action(&mut w, &mut action, &CostConfig::default());
                prop_assert!(w.countries["arcadia"].budget >= 0);
            }
        }
    }
}
