use serde::{Deserialize, Serialize};

/// Simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// First turn on which an advisory plan is requested.
    pub advisory_first_turn: u32,
    /// Turns between advisory plan refreshes. A plan analyzed at turn T is
    /// valid for turns `[T, T + cadence)`.
    pub advisory_cadence: u32,
    /// Turns considered "early game" for bootstrapping heuristics.
    pub early_game_turns: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            advisory_first_turn: 3,
            advisory_cadence: 5,
            early_game_turns: 10,
        }
    }
}

/// Cost constants for action pricing.
///
/// A single immutable struct injected into the pricing functions, so tests can
/// override individual constants deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    pub research_base_cost: i64,
    pub research_cost_multiplier: f64,
    /// Technology levels above this switch to a logarithmic growth curve.
    pub research_soft_cap_level: u32,
    /// Research cost reduction from external effects, capped at
    /// `research_speed_bonus_cap`.
    pub research_speed_bonus: f64,
    pub research_speed_bonus_cap: f64,
    pub infrastructure_base_cost: i64,
    pub infrastructure_cost_multiplier: f64,
    pub recruit_cost_per_unit: i64,
    /// Recruitment discount per technology level.
    pub recruit_tech_discount: f64,
    pub recruit_tech_discount_cap: f64,
    /// Mobilization cost per raw unit committed to an attack.
    pub attack_cost_per_unit: i64,
    pub diplomacy_cost: i64,
    /// Cost inflation per missing required resource type.
    pub shortage_penalty_step: f64,
    pub shortage_penalty_cap: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            research_base_cost: 400,
            research_cost_multiplier: 1.5,
            research_soft_cap_level: 10,
            research_speed_bonus: 0.0,
            research_speed_bonus_cap: 0.5,
            infrastructure_base_cost: 300,
            infrastructure_cost_multiplier: 1.4,
            recruit_cost_per_unit: 25,
            recruit_tech_discount: 0.03,
            recruit_tech_discount_cap: 0.3,
            attack_cost_per_unit: 5,
            diplomacy_cost: 50,
            shortage_penalty_step: 0.4,
            shortage_penalty_cap: 2.5,
        }
    }
}

/// Configuration for the per-turn economy tick and income model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Tax income per 1000 population.
    pub tax_per_kilopop: f64,
    /// Tax bonus per technology level.
    pub tech_income_bonus: f64,
    /// Production income per infrastructure level.
    pub production_income_per_level: i64,
    /// Upkeep per raw military strength unit.
    pub upkeep_per_strength: f64,
    /// Upkeep per infrastructure level.
    pub upkeep_per_infrastructure_level: i64,
    /// Base food yield per 1000 population.
    pub base_food_yield: f64,
    /// Additional food yield per infrastructure level (per 1000 population).
    pub food_yield_per_infrastructure: f64,
    /// Food consumed per 1000 population.
    pub food_consumption_per_kilopop: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            tax_per_kilopop: 2.0,
            tech_income_bonus: 0.05,
            production_income_per_level: 150,
            upkeep_per_strength: 0.5,
            upkeep_per_infrastructure_level: 100,
            base_food_yield: 0.9,
            food_yield_per_infrastructure: 0.15,
            food_consumption_per_kilopop: 1.0,
        }
    }
}
