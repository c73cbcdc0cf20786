//! Prompt building for advisory requests.
//!
//! Converts a country's state and situational metrics into the tagged text
//! format the advisory endpoint expects, ending with a directive describing
//! the JSON plan shape to respond with.

use hegemon_core::situation::SituationMetrics;
use hegemon_core::CountryState;
use std::fmt::Write;

/// Builds advisory prompts, reusing one buffer across turns.
pub struct PromptBuilder {
    buffer: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(4096),
        }
    }

    /// Build a prompt for one country.
    ///
    /// # Format
    /// ```text
    /// <|country|>arcadia<|/country|>
    /// <|state|>
    /// Turn: 12
    /// Population: 1,200,000
    /// ...
    /// <|/state|>
    /// <|directive|>
    /// ...
    /// <|/directive|>
    /// ```
    pub fn build(
        &mut self,
        country_id: &str,
        country: &CountryState,
        metrics: &SituationMetrics,
        turn: u32,
    ) -> &str {
        self.buffer.clear();

        writeln!(self.buffer, "<|country|>{}<|/country|>", country_id).unwrap();

        writeln!(self.buffer, "<|state|>").unwrap();
        writeln!(self.buffer, "Turn: {}", turn).unwrap();
        writeln!(
            self.buffer,
            "Population: {}",
            format_thousands(country.population)
        )
        .unwrap();
        writeln!(
            self.buffer,
            "Treasury: {} ({}{}/turn)",
            format_thousands(metrics.budget),
            if metrics.net_income >= 0 { "+" } else { "" },
            format_thousands(metrics.net_income)
        )
        .unwrap();
        if let Some(turns) = metrics.turns_to_bankruptcy {
            writeln!(self.buffer, "Bankruptcy in: {} turns", turns).unwrap();
        }
        writeln!(self.buffer, "Technology: level {}", country.technology_level).unwrap();
        writeln!(
            self.buffer,
            "Infrastructure: level {}",
            country.infrastructure_level
        )
        .unwrap();
        writeln!(
            self.buffer,
            "Military: {} raw, {:.0} effective{}",
            format_thousands(metrics.raw_strength),
            metrics.effective_strength,
            if metrics.under_defended {
                format!(" (deficit {:.0})", metrics.military_deficit)
            } else {
                String::new()
            }
        )
        .unwrap();
        writeln!(
            self.buffer,
            "Food: {} stockpiled, {}{}/turn",
            format_thousands(country.food_stockpile),
            if metrics.food_balance >= 0 { "+" } else { "" },
            format_thousands(metrics.food_balance)
        )
        .unwrap();
        if let Some(turns) = metrics.food_turns_remaining {
            writeln!(self.buffer, "Starvation in: {} turns", turns).unwrap();
        }
        if let Some(profile) = &country.profile {
            writeln!(self.buffer, "Profile: {}", profile).unwrap();
        }
        writeln!(self.buffer, "<|/state|>").unwrap();

        self.buffer.push_str("<|directive|>\n");
        self.buffer.push_str(
            "Respond with one JSON object:\n\
             {\"focus\": \"economy|military|diplomacy|research|balanced\",\n\
             \"rationale\": \"...\", \"threats\": \"...\", \"opportunities\": \"...\",\n\
             \"action_plan\": [\"...\" or {\"instruction\": \"...\", \"priority\": 1, \
             \"execution\": {...}}],\n\
             \"constraints\": [\"...\" or {\"instruction\": \"...\", \"prohibit\": [\"...\"]}],\n\
             \"diplomacy\": {\"country\": \"friendly|neutral|hostile\"},\n\
             \"confidence\": 0.0-1.0}\n",
        );
        self.buffer.push_str("<|/directive|>");

        &self.buffer
    }
}

/// 1234567 -> "1,234,567". Negative values keep their sign.
pub fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hegemon_core::config::{CostConfig, EconomyConfig};
    use hegemon_core::situation;
    use hegemon_core::testing::WorldStateBuilder;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_thousands(-42_000), "-42,000");
    }

    #[test]
    fn test_prompt_contains_tagged_sections() {
        let world = WorldStateBuilder::new().with_country("arcadia").build();
        let country = &world.countries["arcadia"];
        let metrics = situation::analyze(
            country,
            &[],
            &EconomyConfig::default(),
            &CostConfig::default(),
        );
        let mut builder = PromptBuilder::new();
        let prompt = builder.build("arcadia", country, &metrics, 12);

        assert!(prompt.starts_with("<|country|>arcadia<|/country|>"));
        assert!(prompt.contains("<|state|>"));
        assert!(prompt.contains("Turn: 12"));
        assert!(prompt.contains("Population: 200,000"));
        assert!(prompt.ends_with("<|/directive|>"));
    }

    #[test]
    fn test_prompt_surfaces_crises() {
        let world = WorldStateBuilder::new().with_country("arcadia").build();
        let mut country = world.countries["arcadia"].clone();
        country.population = 2_000_000;
        country.food_stockpile = 100;
        country.infrastructure_level = 0;
        let metrics = situation::analyze(
            &country,
            &[],
            &EconomyConfig::default(),
            &CostConfig::default(),
        );
        assert!(metrics.food_balance < 0);

        let mut builder = PromptBuilder::new();
        let prompt = builder.build("arcadia", &country, &metrics, 3);
        assert!(prompt.contains("Starvation in:"));
    }
}
