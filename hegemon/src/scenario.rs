//! Built-in demo scenario.
//!
//! Six AI countries on a ring, with enough variety in profiles and
//! personalities that every decision path gets exercised over a short run.
//! Fully deterministic for a given seed.

use hegemon_core::state::{Personality, ResourceKind};
use hegemon_core::{CountryState, GameId, WorldState};
use rustc_hash::FxHashMap;

struct Blueprint {
    id: &'static str,
    population: i64,
    budget: i64,
    technology_level: u32,
    infrastructure_level: u32,
    military_strength: i64,
    food_stockpile: i64,
    profile: Option<&'static str>,
    // aggression, cooperativeness, risk tolerance, honesty
    personality: (f32, f32, f32, f32),
}

const ROSTER: &[Blueprint] = &[
    Blueprint {
        id: "arcadia",
        population: 900_000,
        budget: 14_000,
        technology_level: 3,
        infrastructure_level: 2,
        military_strength: 220,
        food_stockpile: 7_000,
        profile: Some("technological"),
        personality: (0.3, 0.6, 0.7, 0.8),
    },
    Blueprint {
        id: "borovia",
        population: 1_200_000,
        budget: 11_000,
        technology_level: 2,
        infrastructure_level: 2,
        military_strength: 420,
        food_stockpile: 6_000,
        profile: Some("militarist"),
        personality: (0.85, 0.2, 0.6, 0.4),
    },
    Blueprint {
        id: "cassia",
        population: 1_500_000,
        budget: 9_000,
        technology_level: 1,
        infrastructure_level: 3,
        military_strength: 180,
        food_stockpile: 12_000,
        profile: Some("agricultural"),
        personality: (0.2, 0.8, 0.3, 0.7),
    },
    Blueprint {
        id: "dorn",
        population: 1_000_000,
        budget: 16_000,
        technology_level: 2,
        infrastructure_level: 3,
        military_strength: 260,
        food_stockpile: 6_500,
        profile: Some("industrial"),
        personality: (0.5, 0.5, 0.5, 0.6),
    },
    Blueprint {
        id: "elyria",
        population: 700_000,
        budget: 12_000,
        technology_level: 3,
        infrastructure_level: 1,
        military_strength: 150,
        food_stockpile: 5_000,
        profile: Some("balanced"),
        personality: (0.4, 0.75, 0.5, 0.9),
    },
    Blueprint {
        id: "feldmark",
        population: 1_300_000,
        budget: 8_000,
        technology_level: 1,
        infrastructure_level: 2,
        military_strength: 340,
        food_stockpile: 8_000,
        profile: None,
        personality: (0.7, 0.35, 0.8, 0.3),
    },
];

/// Starting stockpile per resource, biased by profile.
fn starting_resources(profile: Option<&str>) -> FxHashMap<ResourceKind, i64> {
    let mut resources = FxHashMap::default();
    for kind in ResourceKind::ALL {
        resources.insert(kind, 800);
    }
    match profile {
        Some("agricultural") => {
            resources.insert(ResourceKind::Food, 3_000);
            resources.insert(ResourceKind::Timber, 1_500);
        }
        Some("industrial") => {
            resources.insert(ResourceKind::Iron, 2_000);
            resources.insert(ResourceKind::Coal, 2_000);
            resources.insert(ResourceKind::Stone, 1_500);
        }
        Some("technological") => {
            resources.insert(ResourceKind::Electronics, 1_200);
            resources.insert(ResourceKind::RareEarths, 1_000);
        }
        Some("militarist") => {
            resources.insert(ResourceKind::Iron, 2_500);
            resources.insert(ResourceKind::Oil, 1_200);
        }
        _ => {}
    }
    resources
}

/// Build the demo world: the roster above on a ring, everyone AI-controlled.
pub fn demo_world(game_id: GameId, seed: u64) -> WorldState {
    let mut world = WorldState {
        game_id,
        turn: 0,
        rng_seed: seed,
        ..Default::default()
    };

    for bp in ROSTER {
        let (aggression, cooperativeness, risk, honesty) = bp.personality;
        world.countries.insert(
            bp.id.to_string(),
            CountryState {
                name: bp.id.to_string(),
                population: bp.population,
                budget: bp.budget,
                technology_level: bp.technology_level,
                infrastructure_level: bp.infrastructure_level,
                military_strength: bp.military_strength,
                food_stockpile: bp.food_stockpile,
                resources: starting_resources(bp.profile),
                profile: bp.profile.map(str::to_string),
                personality: Personality::new(aggression, cooperativeness, risk, honesty),
                is_ai: true,
                plan_progress: None,
            },
        );
    }

    // Ring adjacency: each country borders its two roster neighbors.
    let n = ROSTER.len();
    for (i, bp) in ROSTER.iter().enumerate() {
        let next = ROSTER[(i + 1) % n].id.to_string();
        let prev = ROSTER[(i + n - 1) % n].id.to_string();
        world.adjacency.insert(bp.id.to_string(), vec![prev, next]);
    }

    world
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_world_shape() {
        let world = demo_world(1, 42);
        assert_eq!(world.countries.len(), 6);
        assert_eq!(world.rng_seed, 42);
        for id in world.countries.keys() {
            let neighbors = world.neighbors(id);
            assert_eq!(neighbors.len(), 2, "{} should have two neighbors", id);
        }
    }

    #[test]
    fn test_demo_world_is_reproducible() {
        let a = demo_world(1, 7);
        let b = demo_world(1, 7);
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_demo_countries_start_solvent() {
        use hegemon_core::config::EconomyConfig;
        use hegemon_core::economy;
        let world = demo_world(1, 42);
        let econ = EconomyConfig::default();
        for (id, country) in &world.countries {
            assert!(
                economy::net_income(country, &econ) > 0,
                "{} starts with negative income",
                id
            );
            assert!(country.budget > 0);
        }
    }
}
