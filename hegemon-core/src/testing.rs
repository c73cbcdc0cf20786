//! Test world construction.
//!
//! Shared by the inline tests here and by downstream crates' tests. Default
//! countries are solvent, fed and evenly matched, so a test only has to
//! mutate the one quantity it is about.

use crate::state::{CountryState, ResourceKind, WorldState};

pub struct WorldStateBuilder {
    world: WorldState,
}

impl WorldStateBuilder {
    pub fn new() -> Self {
        Self {
            world: WorldState {
                game_id: 1,
                turn: 0,
                rng_seed: 42,
                ..Default::default()
            },
        }
    }

    /// Add a country with baseline stats under the given id (also its name).
    pub fn with_country(mut self, id: &str) -> Self {
        let mut resources = rustc_hash::FxHashMap::default();
        for kind in ResourceKind::ALL {
            resources.insert(kind, 1_000);
        }
        self.world.countries.insert(
            id.to_string(),
            CountryState {
                name: id.to_string(),
                population: 200_000,
                budget: 10_000,
                technology_level: 2,
                infrastructure_level: 2,
                military_strength: 100,
                food_stockpile: 5_000,
                resources,
                profile: None,
                personality: Default::default(),
                is_ai: true,
                plan_progress: None,
            },
        );
        self
    }

    /// Symmetric neighbor edge.
    pub fn with_adjacency(mut self, a: &str, b: &str) -> Self {
        self.world
            .adjacency
            .entry(a.to_string())
            .or_default()
            .push(b.to_string());
        self.world
            .adjacency
            .entry(b.to_string())
            .or_default()
            .push(a.to_string());
        self
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.world.turn = turn;
        self
    }

    pub fn build(self) -> WorldState {
        self.world
    }
}

impl Default for WorldStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
