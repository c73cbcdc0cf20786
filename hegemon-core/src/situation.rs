//! Deterministic situational analysis.
//!
//! Pure function: country state plus neighbor snapshots in, derived
//! economic/military metrics out. Computed fresh every turn and never
//! persisted; safe to call any number of times without side effects.

use crate::config::{CostConfig, EconomyConfig};
use crate::economy;
use crate::pricing;
use crate::state::CountryState;
use serde::Serialize;

/// Effective-strength deficit beyond which a country counts as under-defended.
const UNDER_DEFENDED_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SituationMetrics {
    pub budget: i64,
    pub net_income: i64,
    /// `floor(budget / |net income|)` when income is negative, else None.
    pub turns_to_bankruptcy: Option<u32>,
    pub food_balance: i64,
    /// `floor(stockpile / |balance|)` when the balance is negative, else None.
    pub food_turns_remaining: Option<u32>,
    pub can_afford_research: bool,
    pub can_afford_infrastructure: bool,
    pub can_afford_military: bool,
    /// Turns for the next research upgrade to pay for itself; None when the
    /// per-turn benefit is zero or negative.
    pub research_roi_turns: Option<u32>,
    pub infrastructure_roi_turns: Option<u32>,
    pub raw_strength: i64,
    pub effective_strength: f64,
    /// Recommended strength minus own effective strength.
    pub military_deficit: f64,
    pub under_defended: bool,
}

impl SituationMetrics {
    /// Bankruptcy within three turns.
    pub fn bankruptcy_soon(&self) -> bool {
        self.turns_to_bankruptcy.is_some_and(|t| t <= 3)
    }

    /// Starvation within five turns.
    pub fn starvation_soon(&self) -> bool {
        self.food_turns_remaining.is_some_and(|t| t <= 5)
    }

    /// An economic crisis keeps survival actions flowing regardless of focus.
    pub fn economic_crisis(&self) -> bool {
        self.bankruptcy_soon() || self.starvation_soon()
    }
}

fn turns_until_exhausted(stock: i64, flow: i64) -> Option<u32> {
    if flow >= 0 {
        return None;
    }
    Some((stock / flow.abs()).max(0) as u32)
}

fn roi_turns(cost: i64, benefit_per_turn: i64) -> Option<u32> {
    if benefit_per_turn <= 0 {
        return None;
    }
    // Ceiling division; `i64::div_ceil` is still unstable (int_roundings).
    Some((cost + benefit_per_turn - 1).div_euclid(benefit_per_turn) as u32)
}

/// Derive the full situational picture for one country.
pub fn analyze(
    country: &CountryState,
    neighbors: &[&CountryState],
    econ: &EconomyConfig,
    costs: &CostConfig,
) -> SituationMetrics {
    let net_income = economy::net_income(country, econ);
    let food_balance = economy::food_balance(country, econ);

    let research = pricing::price_research(country, costs);
    let infrastructure = pricing::price_infrastructure(country, costs);
    // Military affordability is judged on a modest standing order.
    let recruit = pricing::price_recruitment(country, 10, costs);

    // Per-turn benefit of one more tech level: the tax bump.
    let kilopop = country.population as f64 / 1000.0;
    let research_benefit = (kilopop * econ.tax_per_kilopop * econ.tech_income_bonus).floor() as i64;
    let infrastructure_benefit =
        econ.production_income_per_level - econ.upkeep_per_infrastructure_level;

    let effective = country.effective_strength();
    let avg_neighbor_effective = if neighbors.is_empty() {
        0.0
    } else {
        neighbors.iter().map(|n| n.effective_strength()).sum::<f64>() / neighbors.len() as f64
    };
    let recommended = (0.7 * avg_neighbor_effective)
        .max(country.population as f64 / 2000.0)
        .max(50.0);
    let deficit = recommended - effective;

    SituationMetrics {
        budget: country.budget,
        net_income,
        turns_to_bankruptcy: turns_until_exhausted(country.budget, net_income),
        food_balance,
        food_turns_remaining: turns_until_exhausted(country.food_stockpile, food_balance),
        can_afford_research: research.cost <= country.budget,
        can_afford_infrastructure: infrastructure.cost <= country.budget,
        can_afford_military: recruit.cost <= country.budget,
        research_roi_turns: roi_turns(research.cost, research_benefit),
        infrastructure_roi_turns: roi_turns(infrastructure.cost, infrastructure_benefit),
        raw_strength: country.military_strength,
        effective_strength: effective,
        military_deficit: deficit,
        under_defended: deficit > UNDER_DEFENDED_THRESHOLD,
    }
}
