//! # Hegemon advisory integration
//!
//! External strategic advice for the simulation core: a TCP client for the
//! advisory endpoint, prompt construction, tolerant response parsing, and
//! cadence-based plan caching. The whole crate sits behind the core's
//! `AdvisorLink` trait and is optional at runtime; without an endpoint the
//! simulation plays purely rule-based.

pub mod advisor;
pub mod cache;
pub mod client;
pub mod parse;
pub mod prompt;

pub use advisor::TurnAdvisor;
pub use cache::{AdvisoryPlanCache, JsonPlanStore, PlanStore};
pub use client::AdvisoryClient;
pub use prompt::PromptBuilder;
