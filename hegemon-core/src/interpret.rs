//! Classification of unreliable advisory text.
//!
//! Converts free text and structured constraint items into [`Bans`] and
//! classifies instructions as upgrade-like actions. The ban extractor is
//! deliberately conservative (false-negative-biased): silence is "no
//! constraint", never an implicit permission override of an existing ban.

use crate::plan::{Bans, PlanItem};

/// A string is a negation candidate only if it matches this lexicon.
const NEGATION_MARKERS: &[&str] = &["refrain", "avoid", "do not", "don't", "no "];

/// Ordered per category; first match wins, generic keywords last to catch
/// residual cases.
const MILITARY_KEYWORDS: &[&str] = &["recruit", "troop", "soldier", "army", "military"];
const TECH_KEYWORDS: &[&str] = &["research", "tech upgrade", "tech level", "technology", "tech"];
const INFRA_KEYWORDS: &[&str] = &["infrastructure", "infra"];

/// What a free-text step looks like it wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    TechUpgrade,
    InfrastructureUpgrade,
}

/// Derive bans from every item of a plan, OR-merging across sources.
pub fn extract_bans(items: &[PlanItem]) -> Bans {
    let mut bans = Bans::default();
    for item in items {
        match item {
            PlanItem::Step(step) => {
                scan_negated(&step.instruction, &mut bans);
            }
            PlanItem::Constraint(constraint) => {
                scan_negated(&constraint.instruction, &mut bans);
                // Prohibit tokens are already confirmed prohibitions; no
                // negation lexicon required.
                for token in &constraint.prohibit {
                    apply_prohibit_token(token, &constraint.instruction, &mut bans);
                }
            }
        }
    }
    if bans.any() {
        log::debug!(
            "Bans derived: recruitment={} tech={} infra={} ({} sources)",
            bans.recruitment,
            bans.tech_upgrades,
            bans.infrastructure_upgrades,
            bans.reasons.len()
        );
    }
    bans
}

fn scan_negated(instruction: &str, bans: &mut Bans) {
    let lower = instruction.to_ascii_lowercase();
    if !NEGATION_MARKERS.iter().any(|m| lower.contains(m)) {
        return;
    }
    let mut hit = false;
    if MILITARY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        bans.recruitment = true;
        hit = true;
    }
    if TECH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        bans.tech_upgrades = true;
        hit = true;
    }
    if INFRA_KEYWORDS.iter().any(|k| lower.contains(k)) {
        bans.infrastructure_upgrades = true;
        hit = true;
    }
    if hit {
        bans.reasons.push(instruction.to_string());
    }
}

fn apply_prohibit_token(token: &str, source: &str, bans: &mut Bans) {
    let lower = token.to_ascii_lowercase();
    let mut hit = false;
    if MILITARY_KEYWORDS.iter().any(|k| lower.contains(k) || k.contains(lower.as_str())) {
        bans.recruitment = true;
        hit = true;
    }
    if TECH_KEYWORDS.iter().any(|k| lower.contains(k) || k.contains(lower.as_str())) {
        bans.tech_upgrades = true;
        hit = true;
    }
    if INFRA_KEYWORDS.iter().any(|k| lower.contains(k) || k.contains(lower.as_str())) {
        bans.infrastructure_upgrades = true;
        hit = true;
    }
    if hit {
        bans.reasons.push(format!("{} [{}]", source, token));
    } else {
        log::debug!("Unmatched prohibit token '{}' ignored", token);
    }
}

/// Heuristic classification of a free-text step, for the fallback path when a
/// step carries no execution payload.
pub fn classify_instruction(instruction: &str) -> Option<InstructionKind> {
    let lower = instruction.to_ascii_lowercase();
    // Infrastructure first: "upgrade infrastructure technology" reads infra.
    if INFRA_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(InstructionKind::InfrastructureUpgrade);
    }
    if TECH_KEYWORDS.iter().any(|k| lower.contains(k))
        || (lower.contains("upgrade") && lower.contains("level"))
    {
        return Some(InstructionKind::TechUpgrade);
    }
    None
}

/// Whether a free-text step reads as a military instruction.
pub fn reads_military(instruction: &str) -> bool {
    let lower = instruction.to_ascii_lowercase();
    MILITARY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// One-time wording: "after", quantity words, or a numeric range ("10-15").
pub fn reads_one_time(instruction: &str) -> bool {
    let lower = instruction.to_ascii_lowercase();
    if lower.contains("after ")
        || lower.contains("additional")
        || lower.contains("extra")
        || lower.contains("more ")
        || lower.ends_with("more")
    {
        return true;
    }
    has_numeric_range(&lower)
}

/// A step that reads as conditional but carries no machine gate is skipped
/// rather than executed with an implicit always-true gate.
pub fn reads_conditional(instruction: &str) -> bool {
    let lower = instruction.to_ascii_lowercase();
    ["if ", "when ", "unless ", "once ", "in case "]
        .iter()
        .any(|m| lower.starts_with(m) || lower.contains(&format!(" {}", m)))
}

/// Extract an explicit target level from phrases like "Level 3".
pub fn extract_target_level(instruction: &str) -> Option<u32> {
    let lower = instruction.to_ascii_lowercase();
    let idx = lower.find("level")?;
    let rest = lower[idx + "level".len()..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn has_numeric_range(s: &str) -> bool {
    let bytes = s.as_bytes();
    for i in 1..bytes.len().saturating_sub(1) {
        if bytes[i] == b'-' && bytes[i - 1].is_ascii_digit() && bytes[i + 1].is_ascii_digit() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ConstraintItem, StepItem};

    fn step(instruction: &str) -> PlanItem {
        PlanItem::Step(StepItem::from_instruction("s".into(), instruction.into()))
    }

    fn constraint(instruction: &str, prohibit: &[&str]) -> PlanItem {
        PlanItem::Constraint(ConstraintItem {
            id: "c".into(),
            instruction: instruction.into(),
            prohibit: prohibit.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_negated_recruit_bans_recruitment() {
        let bans = extract_bans(&[step("Avoid recruiting troops until the treasury recovers")]);
        assert!(bans.recruitment);
        assert!(!bans.tech_upgrades);
        assert!(!bans.reasons.is_empty());
    }

    #[test]
    fn test_positive_mention_is_not_a_ban() {
        // No negation marker: silence is "no constraint".
        let bans = extract_bans(&[step("Recruit 20 additional troops")]);
        assert!(!bans.recruitment);
    }

    #[test]
    fn test_generic_infrastructure_keyword_in_negated_sentence() {
        let bans = extract_bans(&[step(
            "Do not spend anything on infrastructure this window",
        )]);
        assert!(bans.infrastructure_upgrades);
    }

    #[test]
    fn test_prohibit_tokens_need_no_negation() {
        let bans = extract_bans(&[constraint("Hold all spending", &["recruit", "research"])]);
        assert!(bans.recruitment);
        assert!(bans.tech_upgrades);
        assert!(!bans.infrastructure_upgrades);
    }

    #[test]
    fn test_unmatched_token_is_silence() {
        let bans = extract_bans(&[constraint("Hold trade", &["tariffs"])]);
        assert!(!bans.any());
    }

    #[test]
    fn test_bans_merge_across_sources() {
        let bans = extract_bans(&[
            step("Refrain from tech upgrades"),
            constraint("No new soldiers", &["recruit"]),
        ]);
        assert!(bans.tech_upgrades);
        assert!(bans.recruitment);
        assert_eq!(bans.reasons.len(), 3); // negated constraint text also matched
    }

    #[test]
    fn test_classify_instruction() {
        assert_eq!(
            classify_instruction("Upgrade infrastructure to Level 3"),
            Some(InstructionKind::InfrastructureUpgrade)
        );
        assert_eq!(
            classify_instruction("Research power technology"),
            Some(InstructionKind::TechUpgrade)
        );
        assert_eq!(classify_instruction("Hold a festival"), None);
    }

    #[test]
    fn test_one_time_detection() {
        assert!(reads_one_time("Recruit 10-15 units"));
        assert!(reads_one_time("Recruit additional troops"));
        assert!(reads_one_time("After the treaty, stand down"));
        assert!(!reads_one_time("Keep researching until level 5"));
    }

    #[test]
    fn test_conditional_detection() {
        assert!(reads_conditional("If attacked, recruit heavily"));
        assert!(reads_conditional("Recruit when the treasury allows"));
        assert!(!reads_conditional("Recruit 20 troops"));
    }

    #[test]
    fn test_target_level_extraction() {
        assert_eq!(extract_target_level("Upgrade infrastructure to Level 3"), Some(3));
        assert_eq!(extract_target_level("Reach tech level 12 quickly"), Some(12));
        assert_eq!(extract_target_level("Upgrade the port"), None);
    }
}
