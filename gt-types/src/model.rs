//! Model catalog and step-type vocabulary used by the router.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Capability tier of a model, from cheapest to most capable.
///
/// Ordinal position (1-based: budget=1 .. premium=4) is used directly by
/// the router's capability score (`tier_ordinal / 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheapest tier available.
    Budget,
    /// Cheap, fast models suited to mechanical steps.
    Economy,
    /// General-purpose mid-tier models.
    Standard,
    /// The provider's most capable (and most expensive) models.
    Premium,
}

impl ModelTier {
    /// 1-based ordinal used in the router's capability score.
    pub fn ordinal(self) -> u8 {
        match self {
            ModelTier::Budget => 1,
            ModelTier::Economy => 2,
            ModelTier::Standard => 3,
            ModelTier::Premium => 4,
        }
    }
}

/// The kind of work a step performs, used to weight model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Deciding what to do next; benefits most from a capable model.
    Plan,
    /// Carrying out a decided action (editing a file, running a command).
    Execute,
    /// Checking whether prior work satisfied its goal.
    Verify,
    /// Small, mechanical turns (e.g. acknowledging a tool result).
    Simple,
}

impl StepType {
    /// How much a step of this kind benefits from model capability,
    /// relative to raw cost savings. Higher means "spend more to get it
    /// right"; used as the weight on the capability term of the router's
    /// selection score.
    pub fn capability_weight(self) -> f64 {
        match self {
            StepType::Plan => 0.6,
            StepType::Execute => 1.0,
            StepType::Verify => 0.5,
            StepType::Simple => 0.1,
        }
    }
}

/// Static description of one routable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Canonical model id as sent to the provider API.
    pub id: String,
    /// Which provider family this model belongs to (`anthropic`, `openai`, `google`).
    pub provider: String,
    /// Capability tier used by the router's scoring function.
    pub tier: ModelTier,
    /// Cost per million input tokens, in USD.
    pub input_cost_per_mtok: Decimal,
    /// Cost per million output tokens, in USD.
    pub output_cost_per_mtok: Decimal,
    /// Maximum context window, in tokens.
    pub context_window: u64,
}

impl ModelInfo {
    /// Estimated cost of one call with the given token counts, in USD.
    pub fn estimate_call_cost(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let million = Decimal::from(1_000_000u64);
        Decimal::from(input_tokens) * self.input_cost_per_mtok / million
            + Decimal::from(output_tokens) * self.output_cost_per_mtok / million
    }

    /// Capability score in `[0.25, 1.0]`, derived from the tier ordinal.
    pub fn capability_score(&self) -> f64 {
        f64::from(self.tier.ordinal()) / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(tier: ModelTier, input: &str, output: &str) -> ModelInfo {
        ModelInfo {
            id: "test-model".into(),
            provider: "anthropic".into(),
            tier,
            input_cost_per_mtok: input.parse().unwrap(),
            output_cost_per_mtok: output.parse().unwrap(),
            context_window: 200_000,
        }
    }

    #[test]
    fn premium_scores_higher_capability_than_budget() {
        let premium = model(ModelTier::Premium, "15.00", "75.00");
        let budget = model(ModelTier::Budget, "0.075", "0.30");
        assert!(premium.capability_score() > budget.capability_score());
    }

    #[test]
    fn execute_weighs_capability_higher_than_simple() {
        assert!(StepType::Execute.capability_weight() > StepType::Simple.capability_weight());
    }

    #[test]
    fn estimate_call_cost_matches_formula() {
        let m = model(ModelTier::Standard, "3.00", "15.00");
        let cost = m.estimate_call_cost(2000, 1000);
        assert_eq!(cost, "0.021".parse::<Decimal>().unwrap());
    }
}
