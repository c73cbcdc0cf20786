//! Action pricing.
//!
//! Pure cost functions per action type. Resource availability affects price
//! through the shortage penalty, not eligibility; the affordability check for
//! the decision to attempt is budget-only.

use crate::config::CostConfig;
use crate::state::{CountryState, ResourceKind};

/// Priced action: integer cost, required resource amounts, and the shortage
/// penalty already folded into the cost.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingResult {
    pub cost: i64,
    pub required_resources: Vec<(ResourceKind, i64)>,
    /// >= 1.0; the black-market surcharge when required resources are short.
    pub penalty_multiplier: f64,
}

/// Resource basket for a research step at the country's current tech tier.
fn research_basket(tech_level: u32) -> Vec<(ResourceKind, i64)> {
    if tech_level < 4 {
        vec![(ResourceKind::Timber, 20), (ResourceKind::Stone, 10)]
    } else if tech_level < 8 {
        vec![(ResourceKind::Iron, 25), (ResourceKind::Coal, 15)]
    } else {
        vec![
            (ResourceKind::Oil, 20),
            (ResourceKind::RareEarths, 10),
            (ResourceKind::Electronics, 5),
        ]
    }
}

/// Infrastructure basket scales with the current infrastructure tier.
fn infrastructure_basket(infra_level: u32) -> Vec<(ResourceKind, i64)> {
    let tier = 1 + infra_level as i64 / 3;
    if infra_level < 4 {
        vec![
            (ResourceKind::Timber, 15 * tier),
            (ResourceKind::Stone, 15 * tier),
        ]
    } else {
        vec![
            (ResourceKind::Stone, 10 * tier),
            (ResourceKind::Iron, 15 * tier),
            (ResourceKind::Coal, 10 * tier),
        ]
    }
}

fn recruitment_basket(amount: i64) -> Vec<(ResourceKind, i64)> {
    vec![
        (ResourceKind::Iron, (amount / 10).max(1)),
        (ResourceKind::Food, (amount / 5).max(1)),
    ]
}

/// `min(1 + step * missing_types, cap)`, so a shortage is never free and
/// never runaway.
fn shortage_multiplier(
    country: &CountryState,
    required: &[(ResourceKind, i64)],
    cfg: &CostConfig,
) -> f64 {
    let missing = required
        .iter()
        .filter(|(kind, amount)| country.resource(*kind) < *amount)
        .count();
    (1.0 + cfg.shortage_penalty_step * missing as f64).min(cfg.shortage_penalty_cap)
}

/// Price the next research (technology) upgrade.
pub fn price_research(country: &CountryState, cfg: &CostConfig) -> PricingResult {
    let level = country.technology_level;
    let cap = cfg.research_soft_cap_level;
    // Exponential up to the soft cap, then a gentler logarithmic curve so
    // high-level costs stay bounded.
    let growth = if level <= cap {
        cfg.research_cost_multiplier.powi(level as i32)
    } else {
        cfg.research_cost_multiplier.powi(cap as i32)
            * (1.0 + 0.5 * ((level - cap) as f64).ln_1p())
    };
    let speed_bonus = cfg.research_speed_bonus.min(cfg.research_speed_bonus_cap);
    let required = research_basket(level);
    let penalty = shortage_multiplier(country, &required, cfg);
    let cost = (cfg.research_base_cost as f64
        * growth
        * country.profile_modifiers().research_cost
        * (1.0 - speed_bonus)
        * penalty)
        .floor() as i64;
    PricingResult {
        cost,
        required_resources: required,
        penalty_multiplier: penalty,
    }
}

/// Price the next infrastructure upgrade.
pub fn price_infrastructure(country: &CountryState, cfg: &CostConfig) -> PricingResult {
    let level = country.infrastructure_level;
    let required = infrastructure_basket(level);
    let penalty = shortage_multiplier(country, &required, cfg);
    let cost = (cfg.infrastructure_base_cost as f64
        * cfg.infrastructure_cost_multiplier.powi(level as i32)
        * country.profile_modifiers().infrastructure_cost
        * penalty)
        .floor() as i64;
    PricingResult {
        cost,
        required_resources: required,
        penalty_multiplier: penalty,
    }
}

/// Price recruiting `amount` raw units.
pub fn price_recruitment(country: &CountryState, amount: i64, cfg: &CostConfig) -> PricingResult {
    let discount = (cfg.recruit_tech_discount * country.technology_level as f64)
        .min(cfg.recruit_tech_discount_cap);
    let required = recruitment_basket(amount);
    let penalty = shortage_multiplier(country, &required, cfg);
    let cost = (cfg.recruit_cost_per_unit as f64
        * amount as f64
        * (1.0 - discount)
        * country.profile_modifiers().recruit_cost
        * penalty)
        .floor() as i64;
    PricingResult {
        cost,
        required_resources: required,
        penalty_multiplier: penalty,
    }
}

/// Price mobilizing a fraction of the army for an attack. Deducted at
/// declaration time; no resource basket.
pub fn price_attack(country: &CountryState, allocation: f64, cfg: &CostConfig) -> PricingResult {
    let committed = (country.military_strength as f64 * allocation.clamp(0.0, 1.0)).round() as i64;
    PricingResult {
        cost: committed * cfg.attack_cost_per_unit,
        required_resources: Vec::new(),
        penalty_multiplier: 1.0,
    }
}
