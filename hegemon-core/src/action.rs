//! Concrete actions and their wire envelope.
//!
//! The envelope consumed by the turn-execution subsystem serializes camelCase:
//! `{gameId, countryId, turn, actionType, actionData, status}` with
//! `llmStepId`/`llmPlanTurn` traceability when an action derives from an
//! advisory step.

use crate::plan::Stance;
use crate::state::{CountryId, GameId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Research,
    Economic,
    Military,
    Diplomacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Executed,
    Failed,
}

/// Traceability back to the advisory step that produced an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryTrace {
    #[serde(rename = "llmStepId")]
    pub step_id: String,
    #[serde(rename = "llmPlanTurn")]
    pub plan_turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionData {
    Research {
        cost: i64,
        #[serde(rename = "targetLevel")]
        target_level: u32,
        #[serde(flatten)]
        trace: Option<AdvisoryTrace>,
    },
    Infrastructure {
        cost: i64,
        #[serde(rename = "targetLevel")]
        target_level: u32,
        #[serde(flatten)]
        trace: Option<AdvisoryTrace>,
    },
    Recruit {
        cost: i64,
        amount: i64,
        #[serde(flatten)]
        trace: Option<AdvisoryTrace>,
    },
    Attack {
        cost: i64,
        target: CountryId,
        /// Fraction of raw strength committed, in [0, 1].
        allocation: f64,
        #[serde(flatten)]
        trace: Option<AdvisoryTrace>,
    },
    Diplomacy {
        cost: i64,
        target: CountryId,
        stance: Stance,
        #[serde(flatten)]
        trace: Option<AdvisoryTrace>,
    },
}

impl ActionData {
    pub fn cost(&self) -> i64 {
        match self {
            ActionData::Research { cost, .. }
            | ActionData::Infrastructure { cost, .. }
            | ActionData::Recruit { cost, .. }
            | ActionData::Attack { cost, .. }
            | ActionData::Diplomacy { cost, .. } => *cost,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionData::Research { .. } => ActionKind::Research,
            ActionData::Infrastructure { .. } => ActionKind::Economic,
            ActionData::Recruit { .. } | ActionData::Attack { .. } => ActionKind::Military,
            ActionData::Diplomacy { .. } => ActionKind::Diplomacy,
        }
    }

    pub fn trace(&self) -> Option<&AdvisoryTrace> {
        match self {
            ActionData::Research { trace, .. }
            | ActionData::Infrastructure { trace, .. }
            | ActionData::Recruit { trace, .. }
            | ActionData::Attack { trace, .. }
            | ActionData::Diplomacy { trace, .. } => trace.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub game_id: GameId,
    pub country_id: CountryId,
    pub turn: u32,
    pub action_type: ActionKind,
    pub action_data: ActionData,
    pub status: ActionStatus,
}

impl Action {
    pub fn new(game_id: GameId, country_id: CountryId, turn: u32, data: ActionData) -> Self {
        Self {
            game_id,
            country_id,
            turn,
            action_type: data.kind(),
            action_data: data,
            status: ActionStatus::Pending,
        }
    }

    pub fn cost(&self) -> i64 {
        self.action_data.cost()
    }
}
