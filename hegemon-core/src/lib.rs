//! Deterministic strategy core for the Hegemon simulation.
//!
//! Everything in this crate is pure with respect to its inputs: the same
//! world snapshot, configuration and seed always produce the same actions
//! and the same post-turn checksum. Advisory plans arrive from outside
//! through the [`step::AdvisorLink`] seam; this crate treats them as
//! unreliable suggestions and re-validates everything they claim.
//!
//! A turn flows through the phases of [`step::run_turn`]:
//!
//! ```text
//!   advisory fetch        sequential, may block on the network
//!        |
//!   situation analysis    pure metrics per country   (situation)
//!   priority weights      crisis-aware budgets       (weights)
//!   intent derivation     plan vs. rules vs. crisis  (intent)
//!   action synthesis      priced, ban-checked        (synth)     [parallel]
//!        |
//!   resolution            re-priced, sequential      (resolve)
//!   combat                seeded rng                 (combat)
//!   economy tick          income, upkeep, food       (economy)
//! ```

pub mod action;
pub mod combat;
pub mod config;
pub mod economy;
pub mod intent;
pub mod interpret;
pub mod plan;
pub mod pricing;
pub mod resolve;
pub mod situation;
pub mod state;
pub mod step;
pub mod synth;
pub mod testing;
pub mod weights;

pub use action::{Action, ActionData, ActionKind, ActionStatus};
pub use config::{CostConfig, EconomyConfig, SimConfig};
pub use plan::{ActivePlan, AdvisoryPlan, Focus, Intent, PlanProvenance, Stance};
pub use state::{CountryId, CountryState, GameId, WorldState};
pub use step::{run_turn, AdvisorLink, TurnContext, TurnReport};
