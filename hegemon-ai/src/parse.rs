//! Advisory response parsing.
//!
//! The endpoint is asked for strict JSON but real responses arrive fenced,
//! prefixed with prose, or as keyed plain text. Parsing tries strict JSON
//! first (with fence stripping and brace extraction), then a keyed-line
//! fallback. Anything unusable is an error; the caller degrades to
//! rule-based play rather than guessing.

use hegemon_core::plan::{
    ConstraintItem, Focus, GatePredicate, PlanItem, Stance, StepExecution, StepItem,
};
use hegemon_core::AdvisoryPlan;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("empty advisory response")]
    Empty,
    #[error("unrecognized advisory response format")]
    Unrecognized,
}

/// The JSON shape the directive asks for. Every field is optional; defaults
/// fill in what the endpoint omitted.
#[derive(Debug, Deserialize)]
struct WirePlan {
    focus: Option<String>,
    rationale: Option<String>,
    threats: Option<String>,
    opportunities: Option<String>,
    #[serde(default)]
    action_plan: Vec<WireStepOrText>,
    #[serde(default)]
    constraints: Vec<WireConstraintOrText>,
    #[serde(default)]
    diplomacy: BTreeMap<String, String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireStepOrText {
    Structured(WireStep),
    Text(String),
}

// Step keys are snake_case on the wire; predicate bodies are camelCase.
#[derive(Debug, Deserialize)]
struct WireStep {
    id: Option<String>,
    instruction: String,
    priority: Option<u32>,
    execution: Option<StepExecution>,
    when: Option<GatePredicate>,
    #[serde(alias = "stopWhen")]
    stop_when: Option<GatePredicate>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireConstraintOrText {
    Structured(WireConstraint),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct WireConstraint {
    id: Option<String>,
    instruction: String,
    #[serde(default)]
    prohibit: Vec<String>,
}

/// Parse an advisory response into a plan valid for the cadence window
/// starting at `turn`.
pub fn parse_plan(text: &str, turn: u32, cadence: u32) -> Result<AdvisoryPlan, PlanParseError> {
    let text = strip_fences(text);
    if text.trim().is_empty() {
        return Err(PlanParseError::Empty);
    }

    if let Some(wire) = parse_json(text) {
        return Ok(from_wire(wire, turn, cadence));
    }
    log::debug!("Advisory response is not JSON, trying keyed-line fallback");
    parse_keyed_lines(text, turn, cadence)
}

/// Content of the first fenced block if one exists, otherwise the whole text.
fn strip_fences(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip the language tag on the opening fence line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

fn parse_json(text: &str) -> Option<WirePlan> {
    if let Ok(wire) = serde_json::from_str(text.trim()) {
        return Some(wire);
    }
    // Prose around the object is common; retry on the outermost braces.
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn from_wire(wire: WirePlan, turn: u32, cadence: u32) -> AdvisoryPlan {
    let focus = wire
        .focus
        .as_deref()
        .and_then(Focus::parse_loose)
        .unwrap_or(Focus::Balanced);

    let mut items = Vec::new();
    for (i, item) in wire.action_plan.into_iter().enumerate() {
        items.push(match item {
            WireStepOrText::Structured(s) => PlanItem::Step(StepItem {
                id: s.id.unwrap_or_else(|| format!("step-{}", i)),
                instruction: s.instruction,
                priority: s.priority,
                execution: s.execution,
                when: s.when,
                stop_when: s.stop_when,
            }),
            WireStepOrText::Text(text) => {
                PlanItem::Step(StepItem::from_instruction(format!("step-{}", i), text))
            }
        });
    }
    for (i, item) in wire.constraints.into_iter().enumerate() {
        items.push(match item {
            WireConstraintOrText::Structured(c) => PlanItem::Constraint(ConstraintItem {
                id: c.id.unwrap_or_else(|| format!("constraint-{}", i)),
                instruction: c.instruction,
                prohibit: c.prohibit,
            }),
            WireConstraintOrText::Text(text) => PlanItem::Constraint(ConstraintItem {
                id: format!("constraint-{}", i),
                instruction: text,
                prohibit: Vec::new(),
            }),
        });
    }

    let mut diplomacy = BTreeMap::new();
    for (country, stance) in wire.diplomacy {
        match Stance::parse(&stance) {
            Some(stance) => {
                diplomacy.insert(recover_country_key(&country), stance);
            }
            None => log::debug!("Dropping unparseable stance '{}' for {}", stance, country),
        }
    }

    AdvisoryPlan {
        turn_analyzed: turn,
        valid_until_turn: turn + cadence.saturating_sub(1),
        strategic_focus: focus,
        rationale: wire.rationale.unwrap_or_default(),
        threats: wire.threats.unwrap_or_default(),
        opportunities: wire.opportunities.unwrap_or_default(),
        confidence: wire.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        diplomacy,
        recommended_actions: items,
    }
}

#[derive(PartialEq)]
enum Section {
    None,
    Actions,
    Constraints,
}

/// Keyed-line fallback: `FOCUS: military`, bullet lists under `ACTIONS:` and
/// `CONSTRAINTS:`, `DIPLOMACY: name=stance, ...`. Requires at least a
/// recognizable focus line.
fn parse_keyed_lines(text: &str, turn: u32, cadence: u32) -> Result<AdvisoryPlan, PlanParseError> {
    let mut focus = None;
    let mut rationale = String::new();
    let mut threats = String::new();
    let mut opportunities = String::new();
    let mut confidence = 0.5f64;
    let mut diplomacy = BTreeMap::new();
    let mut items = Vec::new();
    let mut section = Section::None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Keyed lines are checked before bullet stripping so a decorated key
        // like `**FOCUS**:` is not consumed as a section bullet.
        if let Some((raw_key, value)) = line.split_once(':') {
            let value = value.trim();
            match recover_key(raw_key).as_str() {
                "FOCUS" => {
                    focus = Focus::parse_loose(value);
                    section = Section::None;
                    continue;
                }
                "RATIONALE" => {
                    rationale = value.to_string();
                    section = Section::None;
                    continue;
                }
                "THREATS" => {
                    threats = value.to_string();
                    section = Section::None;
                    continue;
                }
                "OPPORTUNITIES" => {
                    opportunities = value.to_string();
                    section = Section::None;
                    continue;
                }
                "ACTIONS" => {
                    section = Section::Actions;
                    continue;
                }
                "CONSTRAINTS" => {
                    section = Section::Constraints;
                    continue;
                }
                "DIPLOMACY" => {
                    section = Section::None;
                    for pair in value.split(',') {
                        let Some((country, stance)) = pair.split_once('=') else {
                            continue;
                        };
                        if let Some(stance) = Stance::parse(stance.trim()) {
                            diplomacy.insert(recover_country_key(country.trim()), stance);
                        }
                    }
                    continue;
                }
                "CONFIDENCE" => {
                    section = Section::None;
                    if let Ok(v) = value.parse::<f64>() {
                        confidence = v.clamp(0.0, 1.0);
                    }
                    continue;
                }
                _ => {}
            }
        }

        if let Some(bullet) = line.strip_prefix('-').or_else(|| line.strip_prefix('*')) {
            let bullet = bullet.trim();
            if bullet.is_empty() {
                continue;
            }
            match section {
                Section::Actions => items.push(PlanItem::Step(StepItem::from_instruction(
                    format!("step-{}", items.len()),
                    bullet.to_string(),
                ))),
                Section::Constraints => items.push(PlanItem::Constraint(ConstraintItem {
                    id: format!("constraint-{}", items.len()),
                    instruction: bullet.to_string(),
                    prohibit: Vec::new(),
                })),
                Section::None => {}
            }
        }
    }

    let Some(focus) = focus else {
        return Err(PlanParseError::Unrecognized);
    };
    Ok(AdvisoryPlan {
        turn_analyzed: turn,
        valid_until_turn: turn + cadence.saturating_sub(1),
        strategic_focus: focus,
        rationale,
        threats,
        opportunities,
        confidence,
        diplomacy,
        recommended_actions: items,
    })
}

/// Best-effort cleanup of a diplomacy-map key: the longest embedded run of
/// identifier characters, so `**borovia**` resolves to `borovia`. A key with
/// no such run is kept verbatim and logged.
fn recover_country_key(raw: &str) -> String {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    let mut best: Option<(usize, usize)> = None;
    let mut start = None;
    for (i, c) in raw.char_indices() {
        if is_ident(c) {
            if start.is_none() {
                start = Some(i);
            }
            continue;
        }
        if let Some(s) = start.take() {
            if best.map_or(true, |(bs, be)| i - s > be - bs) {
                best = Some((s, i));
            }
        }
    }
    if let Some(s) = start {
        if best.map_or(true, |(bs, be)| raw.len() - s > be - bs) {
            best = Some((s, raw.len()));
        }
    }
    match best {
        Some((s, e)) => {
            let run = &raw[s..e];
            if run != raw {
                log::debug!("Recovered diplomacy key '{}' from '{}'", run, raw);
            }
            run.to_string()
        }
        None => {
            log::warn!("Keeping unrecoverable diplomacy key '{}'", raw);
            raw.to_string()
        }
    }
}

/// Key of a `KEY: value` line, tolerating decoration like `**FOCUS**` or
/// `3. FOCUS`: the trailing run of letters, uppercased.
fn recover_key(raw: &str) -> String {
    raw.chars()
        .rev()
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<String>()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hegemon_core::plan::StepActionType;

    #[test]
    fn test_fenced_json_plan() {
        let text = r#"Here is my analysis:
```json
{
  "focus": "military",
  "rationale": "Borovia is weak",
  "threats": "none",
  "opportunities": "expansion",
  "action_plan": [
    "Recruit 50 troops",
    {"instruction": "Reach tech level 4", "priority": 1,
     "execution": {"actionType": "research", "actionData": {"targetLevel": 4}}}
  ],
  "constraints": [{"instruction": "No infrastructure spending", "prohibit": ["infrastructure"]}],
  "diplomacy": {"borovia": "hostile", "cassia": "a mystery"},
  "confidence": 1.7
}
```
"#;
        let plan = parse_plan(text, 3, 5).unwrap();
        assert_eq!(plan.strategic_focus, Focus::Military);
        assert_eq!(plan.turn_analyzed, 3);
        assert_eq!(plan.valid_until_turn, 7);
        assert_eq!(plan.confidence, 1.0, "confidence clamps to [0, 1]");

        let steps: Vec<_> = plan.steps().collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, "step-0");
        assert!(steps[0].execution.is_none());
        let exec = steps[1].execution.as_ref().unwrap();
        assert_eq!(exec.action_type, StepActionType::Research);
        assert_eq!(exec.action_data.target_level, Some(4));

        let constraints: Vec<_> = plan.constraints().collect();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].prohibit, vec!["infrastructure"]);

        // The unparseable stance is dropped, the good one kept.
        assert_eq!(plan.diplomacy.len(), 1);
        assert_eq!(plan.diplomacy["borovia"], Stance::Hostile);
    }

    #[test]
    fn test_json_with_surrounding_prose() {
        let text = r#"Sure! {"focus": "economy", "rationale": "rebuild"} Hope that helps."#;
        let plan = parse_plan(text, 8, 5).unwrap();
        assert_eq!(plan.strategic_focus, Focus::Economy);
        assert!(plan.recommended_actions.is_empty());
    }

    #[test]
    fn test_keyed_line_fallback() {
        let text = "\
**FOCUS**: diplomacy and trade
RATIONALE: surrounded by stronger powers
ACTIONS:
- Improve relations with cassia
- Upgrade infrastructure to level 3
CONSTRAINTS:
- Do not recruit
DIPLOMACY: cassia=friendly, borovia=neutral
CONFIDENCE: 0.65";
        let plan = parse_plan(text, 13, 5).unwrap();
        assert_eq!(plan.strategic_focus, Focus::Diplomacy);
        assert_eq!(plan.steps().count(), 2);
        assert_eq!(plan.constraints().count(), 1);
        assert_eq!(plan.diplomacy.len(), 2);
        assert_eq!(plan.confidence, 0.65);
    }

    #[test]
    fn test_snake_case_stop_when_survives_parsing() {
        let text = r#"{
          "focus": "economy",
          "action_plan": [
            {"id": "s1", "instruction": "Recruit until tech reaches 5",
             "execution": {"actionType": "recruit", "actionData": {"amount": 30}},
             "stop_when": {"minTechLevel": 5}},
            {"id": "s2", "instruction": "Then hold budget",
             "when": {"minBudget": 2000},
             "stopWhen": {"minInfrastructureLevel": 4}}
          ]
        }"#;
        let plan = parse_plan(text, 3, 5).unwrap();
        let steps: Vec<_> = plan.steps().collect();
        assert_eq!(steps[0].stop_when.as_ref().unwrap().min_tech_level, Some(5));
        assert_eq!(steps[1].when.as_ref().unwrap().min_budget, Some(2000));
        assert_eq!(
            steps[1].stop_when.as_ref().unwrap().min_infrastructure_level,
            Some(4),
            "camelCase alias must also be accepted"
        );
    }

    #[test]
    fn test_decorated_diplomacy_keys_are_recovered() {
        let text = r#"{"focus": "diplomacy",
          "diplomacy": {"**borovia**": "hostile", "%%": "friendly"}}"#;
        let plan = parse_plan(text, 3, 5).unwrap();
        assert_eq!(plan.diplomacy.len(), 2);
        assert_eq!(plan.diplomacy["borovia"], Stance::Hostile);
        // No identifier run to extract; the key stays as sent.
        assert_eq!(plan.diplomacy["%%"], Stance::Friendly);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            parse_plan("I cannot help with that.", 3, 5),
            Err(PlanParseError::Unrecognized)
        ));
        assert!(matches!(parse_plan("", 3, 5), Err(PlanParseError::Empty)));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let plan = parse_plan(r#"{"focus": "research"}"#, 3, 5).unwrap();
        assert_eq!(plan.strategic_focus, Focus::Research);
        assert_eq!(plan.confidence, 0.5);
        assert!(plan.rationale.is_empty());
        assert!(plan.recommended_actions.is_empty());
    }
}
