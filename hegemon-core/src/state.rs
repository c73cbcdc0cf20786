use crate::plan::PlanProgress;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type CountryId = String;
pub type GameId = u32;

/// The eight tradeable resource types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResourceKind {
    Food,
    Timber,
    Stone,
    Iron,
    Coal,
    Oil,
    RareEarths,
    Electronics,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Food,
        ResourceKind::Timber,
        ResourceKind::Stone,
        ResourceKind::Iron,
        ResourceKind::Coal,
        ResourceKind::Oil,
        ResourceKind::RareEarths,
        ResourceKind::Electronics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Food => "food",
            ResourceKind::Timber => "timber",
            ResourceKind::Stone => "stone",
            ResourceKind::Iron => "iron",
            ResourceKind::Coal => "coal",
            ResourceKind::Oil => "oil",
            ResourceKind::RareEarths => "rare earths",
            ResourceKind::Electronics => "electronics",
        }
    }
}

/// Behavioral disposition of a country's leadership.
///
/// All four scalars are clamped to [0, 1] at construction; the fields stay
/// private so the invariant cannot be broken by direct mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    aggression: f32,
    cooperativeness: f32,
    risk_tolerance: f32,
    honesty: f32,
}

impl Personality {
    pub fn new(aggression: f32, cooperativeness: f32, risk_tolerance: f32, honesty: f32) -> Self {
        Self {
            aggression: aggression.clamp(0.0, 1.0),
            cooperativeness: cooperativeness.clamp(0.0, 1.0),
            risk_tolerance: risk_tolerance.clamp(0.0, 1.0),
            honesty: honesty.clamp(0.0, 1.0),
        }
    }

    pub fn aggression(&self) -> f32 {
        self.aggression
    }

    pub fn cooperativeness(&self) -> f32 {
        self.cooperativeness
    }

    pub fn risk_tolerance(&self) -> f32 {
        self.risk_tolerance
    }

    pub fn honesty(&self) -> f32 {
        self.honesty
    }

    /// Pure transform: a copy of this personality leaning into the given
    /// strategic focus. Never mutates shared state.
    pub fn adjusted_for_focus(&self, focus: crate::plan::Focus) -> Personality {
        use crate::plan::Focus;
        match focus {
            Focus::Military => Personality::new(
                self.aggression + 0.15,
                self.cooperativeness,
                self.risk_tolerance,
                self.honesty,
            ),
            Focus::Diplomacy => Personality::new(
                self.aggression,
                self.cooperativeness + 0.15,
                self.risk_tolerance,
                self.honesty,
            ),
            Focus::Research => Personality::new(
                self.aggression,
                self.cooperativeness,
                self.risk_tolerance + 0.1,
                self.honesty,
            ),
            Focus::Economy | Focus::Balanced => *self,
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5, 0.5)
    }
}

/// Cost and priority modifiers derived from a resource-specialization profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileModifiers {
    pub research_cost: f64,
    pub infrastructure_cost: f64,
    pub recruit_cost: f64,
    pub food_output: f64,
    pub research_priority: f32,
    pub infrastructure_priority: f32,
    pub military_priority: f32,
}

impl ProfileModifiers {
    pub const NEUTRAL: ProfileModifiers = ProfileModifiers {
        research_cost: 1.0,
        infrastructure_cost: 1.0,
        recruit_cost: 1.0,
        food_output: 1.0,
        research_priority: 0.0,
        infrastructure_priority: 0.0,
        military_priority: 0.0,
    };

    /// Resolve a profile name to its modifiers.
    ///
    /// Unrecognized names resolve to neutral modifiers explicitly rather than
    /// guessing intent (profile names have changed across data revisions).
    pub fn for_profile(name: Option<&str>) -> ProfileModifiers {
        let Some(name) = name else {
            return Self::NEUTRAL;
        };
        match name.to_ascii_lowercase().as_str() {
            "agricultural" => ProfileModifiers {
                food_output: 1.4,
                infrastructure_cost: 0.9,
                infrastructure_priority: 0.1,
                ..Self::NEUTRAL
            },
            "industrial" => ProfileModifiers {
                infrastructure_cost: 0.8,
                recruit_cost: 0.95,
                infrastructure_priority: 0.15,
                ..Self::NEUTRAL
            },
            "technological" => ProfileModifiers {
                research_cost: 0.75,
                research_priority: 0.2,
                ..Self::NEUTRAL
            },
            "militarist" => ProfileModifiers {
                recruit_cost: 0.8,
                military_priority: 0.2,
                ..Self::NEUTRAL
            },
            "balanced" => Self::NEUTRAL,
            other => {
                log::debug!("Unrecognized resource profile '{}', using neutral modifiers", other);
                Self::NEUTRAL
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CountryState {
    pub name: String,
    pub population: i64,
    /// Treasury balance. Never driven negative by resolved actions.
    pub budget: i64,
    pub technology_level: u32,
    pub infrastructure_level: u32,
    /// Raw troop count, before the technology multiplier.
    pub military_strength: i64,
    pub food_stockpile: i64,
    pub resources: FxHashMap<ResourceKind, i64>,
    /// Resource-specialization profile name (resolved via
    /// [`ProfileModifiers::for_profile`]).
    pub profile: Option<String>,
    pub personality: Personality,
    /// Whether this country is decided by the planner (vs. a human player).
    pub is_ai: bool,
    /// Bookkeeping for the active advisory plan's steps.
    pub plan_progress: Option<PlanProgress>,
}

impl CountryState {
    /// Technology multiplier applied to raw strength for all combat and
    /// threat comparisons.
    pub fn tech_multiplier(&self) -> f64 {
        1.0 + 0.1 * self.technology_level as f64
    }

    /// Tech-adjusted (effective) military strength.
    pub fn effective_strength(&self) -> f64 {
        self.military_strength as f64 * self.tech_multiplier()
    }

    pub fn resource(&self, kind: ResourceKind) -> i64 {
        self.resources.get(&kind).copied().unwrap_or(0)
    }

    pub fn profile_modifiers(&self) -> ProfileModifiers {
        ProfileModifiers::for_profile(self.profile.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    pub game_id: GameId,
    pub turn: u32,
    pub rng_seed: u64,
    pub countries: HashMap<CountryId, CountryState>,
    /// Neighbor relation, computed upstream from map proximity. Consumed,
    /// not owned, by this crate.
    pub adjacency: HashMap<CountryId, Vec<CountryId>>,
    /// Declared diplomatic stances: stances[from][to].
    pub stances: std::collections::BTreeMap<CountryId, std::collections::BTreeMap<CountryId, crate::plan::Stance>>,
}

impl WorldState {
    /// Neighbor snapshot for a country, in adjacency order.
    pub fn neighbors(&self, id: &str) -> Vec<&CountryState> {
        self.adjacency
            .get(id)
            .map(|ids| ids.iter().filter_map(|n| self.countries.get(n)).collect())
            .unwrap_or_default()
    }

    /// Country ids processed by the planner, sorted for determinism.
    pub fn ai_country_ids(&self) -> Vec<CountryId> {
        let mut ids: Vec<CountryId> = self
            .countries
            .iter()
            .filter(|(_, c)| c.is_ai)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Deterministic checksum over the full state.
    ///
    /// Identical states produce identical checksums; used by the runner's
    /// determinism check and the replay tests.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.game_id.hash(&mut hasher);
        self.turn.hash(&mut hasher);
        self.rng_seed.hash(&mut hasher);

        let mut ids: Vec<_> = self.countries.keys().collect();
        ids.sort();
        for id in ids {
            let c = &self.countries[id];
            id.hash(&mut hasher);
            c.name.hash(&mut hasher);
            c.population.hash(&mut hasher);
            c.budget.hash(&mut hasher);
            c.technology_level.hash(&mut hasher);
            c.infrastructure_level.hash(&mut hasher);
            c.military_strength.hash(&mut hasher);
            c.food_stockpile.hash(&mut hasher);
            for kind in ResourceKind::ALL {
                c.resource(kind).hash(&mut hasher);
            }
            c.profile.hash(&mut hasher);
            c.personality.aggression().to_bits().hash(&mut hasher);
            c.personality.cooperativeness().to_bits().hash(&mut hasher);
            c.personality.risk_tolerance().to_bits().hash(&mut hasher);
            c.personality.honesty().to_bits().hash(&mut hasher);
            c.is_ai.hash(&mut hasher);
            if let Some(progress) = &c.plan_progress {
                progress.plan_turn.hash(&mut hasher);
                for s in &progress.executed_steps {
                    s.hash(&mut hasher);
                }
                for s in &progress.completed_steps {
                    s.hash(&mut hasher);
                }
            }
        }

        let mut adj_ids: Vec<_> = self.adjacency.keys().collect();
        adj_ids.sort();
        for id in adj_ids {
            id.hash(&mut hasher);
            self.adjacency[id].hash(&mut hasher);
        }

        for (from, map) in &self.stances {
            from.hash(&mut hasher);
            for (to, stance) in map {
                to.hash(&mut hasher);
                (*stance as u8).hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::WorldStateBuilder;

    #[test]
    fn test_personality_clamped() {
        let p = Personality::new(1.5, -0.3, 0.5, 0.9);
        assert_eq!(p.aggression(), 1.0);
        assert_eq!(p.cooperativeness(), 0.0);
        assert_eq!(p.risk_tolerance(), 0.5);
        assert_eq!(p.honesty(), 0.9);
    }

    #[test]
    fn test_adjusted_for_focus_is_pure() {
        let p = Personality::new(0.5, 0.5, 0.5, 0.5);
        let adjusted = p.adjusted_for_focus(crate::plan::Focus::Military);
        assert!(adjusted.aggression() > p.aggression());
        // Original untouched
        assert_eq!(p.aggression(), 0.5);
    }

    #[test]
    fn test_unrecognized_profile_is_neutral() {
        let mods = ProfileModifiers::for_profile(Some("maritime_guild"));
        assert_eq!(mods, ProfileModifiers::NEUTRAL);
        assert_eq!(ProfileModifiers::for_profile(None), ProfileModifiers::NEUTRAL);
    }

    #[test]
    fn test_effective_strength_scales_with_tech() {
        let mut c = CountryState {
            military_strength: 100,
            technology_level: 5,
            ..Default::default()
        };
        assert_eq!(c.effective_strength(), 150.0);
        c.technology_level = 0;
        assert_eq!(c.effective_strength(), 100.0);
    }

    #[test]
    fn test_checksum_determinism() {
        let state = WorldStateBuilder::new()
            .with_country("arcadia")
            .with_country("borovia")
            .with_adjacency("arcadia", "borovia")
            .build();
        assert_eq!(state.checksum(), state.checksum());
    }

    #[test]
    fn test_checksum_sensitivity() {
        let base = WorldStateBuilder::new().with_country("arcadia").build();
        let mut changed = base.clone();
        changed.countries.get_mut("arcadia").unwrap().budget += 1;
        assert_ne!(base.checksum(), changed.checksum());
    }
}
