//! Per-turn income and food model.
//!
//! The same formulas back both the situational analysis (read-only) and the
//! end-of-turn tick (mutating), so the planner's projections match what the
//! tick will actually apply.

use crate::config::EconomyConfig;
use crate::state::{CountryState, WorldState};

/// Net income per turn: tax + production minus upkeep.
pub fn net_income(country: &CountryState, cfg: &EconomyConfig) -> i64 {
    let kilopop = country.population as f64 / 1000.0;
    let tax = kilopop
        * cfg.tax_per_kilopop
        * (1.0 + cfg.tech_income_bonus * country.technology_level as f64);
    let production =
        (country.infrastructure_level as i64) * cfg.production_income_per_level;
    let upkeep = country.military_strength as f64 * cfg.upkeep_per_strength
        + (country.infrastructure_level as i64 * cfg.upkeep_per_infrastructure_level) as f64;
    (tax + production as f64 - upkeep).floor() as i64
}

pub fn food_produced(country: &CountryState, cfg: &EconomyConfig) -> i64 {
    let kilopop = country.population as f64 / 1000.0;
    let yield_per_kilopop = cfg.base_food_yield
        + cfg.food_yield_per_infrastructure * country.infrastructure_level as f64;
    (kilopop * yield_per_kilopop * country.profile_modifiers().food_output).floor() as i64
}

pub fn food_consumed(country: &CountryState, cfg: &EconomyConfig) -> i64 {
    (country.population as f64 / 1000.0 * cfg.food_consumption_per_kilopop).floor() as i64
}

/// Food produced minus consumed this turn.
pub fn food_balance(country: &CountryState, cfg: &EconomyConfig) -> i64 {
    food_produced(country, cfg) - food_consumed(country, cfg)
}

/// Applies income and food flows to every country.
///
/// Budgets and stockpiles floor at zero: a shortfall is austerity, not debt.
pub fn run_economy_tick(state: &mut WorldState, cfg: &EconomyConfig) {
    for (id, country) in state.countries.iter_mut() {
        let income = net_income(country, cfg);
        let new_budget = country.budget + income;
        if new_budget < 0 {
            log::warn!("{}: treasury exhausted (income {})", id, income);
        }
        country.budget = new_budget.max(0);

        let balance = food_balance(country, cfg);
        country.food_stockpile = (country.food_stockpile + balance).max(0);
    }
}
