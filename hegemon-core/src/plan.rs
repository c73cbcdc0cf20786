//! Advisory plan data model.
//!
//! The strict tagged-union schema ([`PlanItem`]) is the primary contract with
//! the advisory service; free-text parsing elsewhere is a best-effort fallback
//! decoder, never the primary path.

use crate::state::{CountryId, CountryState};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Strategic focus for a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Economy,
    Military,
    Diplomacy,
    Research,
    Balanced,
}

impl Focus {
    /// Loose parse for unstructured advisory text ("FOCUS: military buildup").
    pub fn parse_loose(s: &str) -> Option<Focus> {
        let s = s.to_ascii_lowercase();
        if s.contains("econom") {
            Some(Focus::Economy)
        } else if s.contains("milit") {
            Some(Focus::Military)
        } else if s.contains("diplo") {
            Some(Focus::Diplomacy)
        } else if s.contains("research") || s.contains("tech") {
            Some(Focus::Research)
        } else if s.contains("balanc") {
            Some(Focus::Balanced)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Focus::Economy => "economy",
            Focus::Military => "military",
            Focus::Diplomacy => "diplomacy",
            Focus::Research => "research",
            Focus::Balanced => "balanced",
        };
        write!(f, "{}", s)
    }
}

/// Diplomatic stance toward a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Friendly,
    Neutral,
    Hostile,
}

impl Stance {
    /// Parse a wire value; anything outside the enum is rejected (dropped by
    /// the caller, not guessed).
    pub fn parse(s: &str) -> Option<Stance> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" => Some(Stance::Friendly),
            "neutral" => Some(Stance::Neutral),
            "hostile" => Some(Stance::Hostile),
            _ => None,
        }
    }
}

/// Threshold gate on country state, used for both `when` and `stop_when`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePredicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tech_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tech_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_infrastructure_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_infrastructure_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_budget: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<i64>,
}

impl GatePredicate {
    pub fn satisfied_by(&self, country: &CountryState) -> bool {
        if let Some(min) = self.min_tech_level {
            if country.technology_level < min {
                return false;
            }
        }
        if let Some(max) = self.max_tech_level {
            if country.technology_level > max {
                return false;
            }
        }
        if let Some(min) = self.min_infrastructure_level {
            if country.infrastructure_level < min {
                return false;
            }
        }
        if let Some(max) = self.max_infrastructure_level {
            if country.infrastructure_level > max {
                return false;
            }
        }
        if let Some(min) = self.min_budget {
            if country.budget < min {
                return false;
            }
        }
        if let Some(max) = self.max_budget {
            if country.budget > max {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == GatePredicate::default()
    }
}

/// Action type an executable step maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepActionType {
    Research,
    Infrastructure,
    Recruit,
    Attack,
    Diplomacy,
}

/// Action-specific fields attached to a step's execution payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepActionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<CountryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecution {
    pub action_type: StepActionType,
    #[serde(default)]
    pub action_data: StepActionData,
}

/// An executable recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepItem {
    pub id: String,
    pub instruction: String,
    /// Lower is more urgent; `None` falls back to array order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<StepExecution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<GatePredicate>,
    /// Satisfying this marks the step permanently complete, even if it never
    /// executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_when: Option<GatePredicate>,
}

impl StepItem {
    pub fn from_instruction(id: String, instruction: String) -> Self {
        Self {
            id,
            instruction,
            priority: None,
            execution: None,
            when: None,
            stop_when: None,
        }
    }

    /// One-shot steps must not be re-selected after executing once; a step
    /// with a stop condition is repeatable until the condition holds, unless
    /// its wording marks it one-time.
    pub fn is_one_time(&self) -> bool {
        self.stop_when.is_none() || crate::interpret::reads_one_time(&self.instruction)
    }
}

/// A prohibition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintItem {
    pub id: String,
    pub instruction: String,
    /// Free-form category tokens ("recruit", "research", "infrastructure").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prohibit: Vec<String>,
}

/// The two plan item kinds: an executable recommendation vs. a prohibition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanItem {
    Step(StepItem),
    Constraint(ConstraintItem),
}

impl PlanItem {
    pub fn instruction(&self) -> &str {
        match self {
            PlanItem::Step(s) => &s.instruction,
            PlanItem::Constraint(c) => &c.instruction,
        }
    }
}

/// Stored plan rows may predate the tagged union and hold plain strings;
/// readers must support both forms on load.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPlanItem {
    Structured(PlanItem),
    Legacy(String),
}

fn deserialize_items<'de, D>(deserializer: D) -> Result<Vec<PlanItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<StoredPlanItem> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            StoredPlanItem::Structured(item) => item,
            StoredPlanItem::Legacy(text) => {
                PlanItem::Step(StepItem::from_instruction(format!("legacy-{}", i), text))
            }
        })
        .collect())
}

/// An externally generated, periodically refreshed strategic recommendation
/// with a fixed turn-count validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryPlan {
    pub turn_analyzed: u32,
    /// `turn_analyzed + cadence - 1`.
    pub valid_until_turn: u32,
    pub strategic_focus: Focus,
    pub rationale: String,
    #[serde(default)]
    pub threats: String,
    #[serde(default)]
    pub opportunities: String,
    /// Clamped to [0, 1] at parse time.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub diplomacy: BTreeMap<CountryId, Stance>,
    #[serde(deserialize_with = "deserialize_items", default)]
    pub recommended_actions: Vec<PlanItem>,
}

impl AdvisoryPlan {
    pub fn is_valid_at(&self, turn: u32) -> bool {
        turn >= self.turn_analyzed && turn <= self.valid_until_turn
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepItem> {
        self.recommended_actions.iter().filter_map(|i| match i {
            PlanItem::Step(s) => Some(s),
            PlanItem::Constraint(_) => None,
        })
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintItem> {
        self.recommended_actions.iter().filter_map(|i| match i {
            PlanItem::Constraint(c) => Some(c),
            PlanItem::Step(_) => None,
        })
    }
}

/// Hard constraints blocking whole action categories for the remainder of a
/// plan's validity window. Monotonic: derived from immutable plan items, a ban
/// is never auto-cleared mid-window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bans {
    pub recruitment: bool,
    pub tech_upgrades: bool,
    pub infrastructure_upgrades: bool,
    /// Source strings that triggered each ban, for observability.
    pub reasons: Vec<String>,
}

impl Bans {
    pub fn any(&self) -> bool {
        self.recruitment || self.tech_upgrades || self.infrastructure_upgrades
    }

    pub fn merge(&mut self, other: &Bans) {
        self.recruitment |= other.recruitment;
        self.tech_upgrades |= other.tech_upgrades;
        self.infrastructure_upgrades |= other.infrastructure_upgrades;
        self.reasons.extend(other.reasons.iter().cloned());
    }

    /// Whether an action type is blocked. A ban always wins over an explicit
    /// executable step.
    pub fn blocks(&self, action: StepActionType) -> bool {
        match action {
            StepActionType::Research => self.tech_upgrades,
            StepActionType::Infrastructure => self.infrastructure_upgrades,
            StepActionType::Recruit => self.recruitment,
            StepActionType::Attack | StepActionType::Diplomacy => false,
        }
    }
}

/// Where the plan backing an intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanProvenance {
    Fresh,
    Cached { age_turns: u32 },
}

/// An advisory plan together with its provenance for this turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePlan {
    pub plan: AdvisoryPlan,
    pub provenance: PlanProvenance,
}

/// Reference to the active plan, carried on the intent for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRef {
    pub provenance: PlanProvenance,
    pub turn_analyzed: u32,
    pub valid_until_turn: u32,
    pub recommended: Vec<String>,
    pub executed_steps: BTreeSet<String>,
}

/// The single per-country, per-turn decision the synthesizers execute against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub focus: Focus,
    pub rationale: String,
    pub plan: Option<PlanRef>,
}

/// Per-country bookkeeping for the active plan's steps. Stored on the country
/// so one-time and stop-condition semantics survive across turns; reset when a
/// newer `turn_analyzed` supersedes the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub plan_turn: u32,
    /// Steps that produced an executed action.
    pub executed_steps: BTreeSet<String>,
    /// Steps whose stop condition has been satisfied; never selected again.
    pub completed_steps: BTreeSet<String>,
}

impl PlanProgress {
    pub fn for_plan(plan_turn: u32) -> Self {
        Self {
            plan_turn,
            ..Default::default()
        }
    }

    /// Whether a step is finished for the rest of the validity window.
    pub fn is_done(&self, step: &StepItem) -> bool {
        if self.completed_steps.contains(&step.id) {
            return true;
        }
        step.is_one_time() && self.executed_steps.contains(&step.id)
    }
}
