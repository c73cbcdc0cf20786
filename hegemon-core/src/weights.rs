//! Priority weighting.
//!
//! Pure function combining metrics, personality, and profile bonuses into
//! spending priorities. Crisis overrides replace the baseline outright rather
//! than blending with it: safety floors are non-negotiable.

use crate::situation::SituationMetrics;
use crate::state::{Personality, ProfileModifiers};
use serde::Serialize;

/// Acute under-defense: deficit beyond this forces the military override.
const ACUTE_DEFICIT: f64 = 30.0;

const GOOD_RESEARCH_ROI_TURNS: u32 = 50;
const GOOD_INFRA_ROI_TURNS: u32 = 40;
const WEALTH_THRESHOLD: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityWeights {
    pub research: f32,
    pub infrastructure: f32,
    pub military: f32,
    /// Currency the synthesizers keep untouched for non-survival spending.
    pub safety_buffer: i64,
}

/// Compute turn priorities for one country.
pub fn calculate(
    metrics: &SituationMetrics,
    personality: &Personality,
    profile: &ProfileModifiers,
) -> PriorityWeights {
    let safety_buffer = safety_buffer(metrics);

    // Crisis overrides replace baseline weights entirely.
    if metrics.starvation_soon() {
        return PriorityWeights {
            research: 0.05,
            infrastructure: 0.95,
            military: 0.1,
            safety_buffer,
        };
    }
    if metrics.bankruptcy_soon() {
        return PriorityWeights {
            research: 0.05,
            infrastructure: 0.1,
            military: 0.05,
            safety_buffer,
        };
    }
    if metrics.under_defended && metrics.military_deficit > ACUTE_DEFICIT {
        return PriorityWeights {
            research: 0.1,
            infrastructure: 0.1,
            military: 0.95,
            safety_buffer,
        };
    }

    let mut research: f32 = 0.3;
    let mut infrastructure: f32 = 0.3;
    let mut military: f32 = 0.3;

    if metrics
        .research_roi_turns
        .is_some_and(|t| t < GOOD_RESEARCH_ROI_TURNS)
    {
        research += 0.2;
    }
    if metrics
        .infrastructure_roi_turns
        .is_some_and(|t| t < GOOD_INFRA_ROI_TURNS)
    {
        infrastructure += 0.2;
    }
    if metrics.budget > WEALTH_THRESHOLD {
        research += 0.1;
    }
    if metrics.under_defended {
        military += 0.2;
    }

    research += profile.research_priority;
    infrastructure += profile.infrastructure_priority;
    military += profile.military_priority;

    military += personality.aggression() * 0.4;
    research += personality.risk_tolerance() * 0.3;

    PriorityWeights {
        research: research.clamp(0.0, 1.0),
        infrastructure: infrastructure.clamp(0.0, 1.0),
        military: military.clamp(0.0, 1.0),
        safety_buffer,
    }
}

fn safety_buffer(metrics: &SituationMetrics) -> i64 {
    if metrics.net_income > 0 {
        (3 * metrics.net_income).max(1_000)
    } else if metrics.turns_to_bankruptcy.is_some() {
        ((0.3 * metrics.budget as f64) as i64).max(2_000)
    } else {
        1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_metrics() -> SituationMetrics {
        SituationMetrics {
            budget: 20_000,
            net_income: 1_500,
            turns_to_bankruptcy: None,
            food_balance: 200,
            food_turns_remaining: None,
            can_afford_research: true,
            can_afford_infrastructure: true,
            can_afford_military: true,
            research_roi_turns: Some(30),
            infrastructure_roi_turns: Some(60),
            raw_strength: 500,
            effective_strength: 600.0,
            military_deficit: -100.0,
            under_defended: false,
        }
    }

    #[test]
    fn test_starvation_override_replaces_baseline() {
        let mut m = calm_metrics();
        m.food_turns_remaining = Some(4);
        m.food_balance = -50;
        // Aggressive personality must not dilute the survival weighting.
        let aggressive = Personality::new(1.0, 0.0, 1.0, 0.5);
        let w = calculate(&m, &aggressive, &ProfileModifiers::NEUTRAL);
        assert_eq!(w.infrastructure, 0.95);
        assert_eq!(w.military, 0.1);
    }

    #[test]
    fn test_bankruptcy_override_minimizes_spending() {
        let mut m = calm_metrics();
        m.net_income = -2_000;
        m.turns_to_bankruptcy = Some(2);
        let w = calculate(&m, &Personality::default(), &ProfileModifiers::NEUTRAL);
        assert!(w.research <= 0.1 && w.infrastructure <= 0.1 && w.military <= 0.1);
    }

    #[test]
    fn test_acute_deficit_override() {
        let mut m = calm_metrics();
        m.under_defended = true;
        m.military_deficit = 80.0;
        let w = calculate(&m, &Personality::default(), &ProfileModifiers::NEUTRAL);
        assert_eq!(w.military, 0.95);
    }

    #[test]
    fn test_mild_deficit_nudges_without_override() {
        let mut m = calm_metrics();
        m.under_defended = true;
        m.military_deficit = 25.0;
        let w = calculate(&m, &Personality::new(0.0, 0.5, 0.0, 0.5), &ProfileModifiers::NEUTRAL);
        assert!(w.military < 0.95);
        assert!(w.military > 0.3);
    }

    #[test]
    fn test_personality_and_profile_nudges() {
        let m = calm_metrics();
        let timid = calculate(&m, &Personality::new(0.0, 0.5, 0.0, 0.5), &ProfileModifiers::NEUTRAL);
        let warlike = calculate(&m, &Personality::new(1.0, 0.5, 0.0, 0.5), &ProfileModifiers::NEUTRAL);
        assert!(warlike.military > timid.military);

        let tech_profile = ProfileModifiers::for_profile(Some("technological"));
        let boosted = calculate(&m, &Personality::new(0.0, 0.5, 0.0, 0.5), &tech_profile);
        assert!(boosted.research > timid.research);
    }

    #[test]
    fn test_weights_clamped() {
        let mut m = calm_metrics();
        m.research_roi_turns = Some(5);
        m.budget = 1_000_000;
        let maxed = calculate(
            &m,
            &Personality::new(1.0, 1.0, 1.0, 1.0),
            &ProfileModifiers::for_profile(Some("technological")),
        );
        assert!(maxed.research <= 1.0 && maxed.military <= 1.0);
    }

    #[test]
    fn test_safety_buffer_rules() {
        let mut m = calm_metrics();
        assert_eq!(safety_buffer(&m), 4_500);
        m.net_income = 100;
        assert_eq!(safety_buffer(&m), 1_000);
        m.net_income = -500;
        m.turns_to_bankruptcy = Some(40);
        m.budget = 20_000;
        assert_eq!(safety_buffer(&m), 6_000);
        m.budget = 1_000;
        assert_eq!(safety_buffer(&m), 2_000);
    }
}
