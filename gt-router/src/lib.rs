#![deny(missing_docs)]
//! Model catalog and per-step model selection.
//!
//! The catalog is a compile-time constant list (pricing as of early 2025;
//! update the [`MODEL_CATALOG`] entries as providers change their rates).
//! [`ModelRouter::select`] balances model capability against the per-step
//! budget so that high-stakes steps (`execute`) lean toward the most
//! capable model that still fits, while mechanical steps (`simple`) lean
//! toward the cheapest.

use gt_budget::BudgetTracker;
use gt_types::{ModelInfo, ModelTier, RouterError, StepType};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// The full set of models this router can choose among, independent of
/// which providers have credentials configured. Pricing as of early 2025.
pub fn model_catalog() -> Vec<ModelInfo> {
    macro_rules! model {
        ($id:expr, $provider:expr, $tier:expr, $in:expr, $out:expr, $ctx:expr) => {
            ModelInfo {
                id: $id.to_string(),
                provider: $provider.to_string(),
                tier: $tier,
                input_cost_per_mtok: $in.parse().unwrap(),
                output_cost_per_mtok: $out.parse().unwrap(),
                context_window: $ctx,
            }
        };
    }
    vec![
        model!(
            "claude-opus-4-20250514",
            "anthropic",
            ModelTier::Premium,
            "15.0",
            "75.0",
            200_000
        ),
        model!(
            "claude-sonnet-4-20250514",
            "anthropic",
            ModelTier::Standard,
            "3.0",
            "15.0",
            200_000
        ),
        model!(
            "claude-haiku-3-5-20241022",
            "anthropic",
            ModelTier::Economy,
            "0.80",
            "4.0",
            200_000
        ),
        model!("o1", "openai", ModelTier::Premium, "15.0", "60.0", 200_000),
        model!(
            "gpt-4o",
            "openai",
            ModelTier::Standard,
            "2.50",
            "10.0",
            128_000
        ),
        model!(
            "gpt-4o-mini",
            "openai",
            ModelTier::Economy,
            "0.15",
            "0.60",
            128_000
        ),
        model!(
            "gemini-2.0-pro",
            "google",
            ModelTier::Standard,
            "1.25",
            "10.0",
            1_000_000
        ),
        model!(
            "gemini-2.0-flash",
            "google",
            ModelTier::Economy,
            "0.10",
            "0.40",
            1_000_000
        ),
        model!(
            "gemini-1.5-flash",
            "google",
            ModelTier::Budget,
            "0.075",
            "0.30",
            1_000_000
        ),
    ]
}

/// Selects the best model for each step given the current budget state.
///
/// Strategy: for each step, compute the per-step budget (remaining /
/// estimated steps left), filter to models from available providers that
/// fit within it, and among those pick the one that best balances
/// capability against cost according to the step type's capability
/// weight. If budget utilization exceeds 95%, always pick the cheapest
/// available model regardless of step type.
pub struct ModelRouter {
    models: Vec<ModelInfo>,
}

impl ModelRouter {
    /// Build a router scoped to the given provider names (e.g.
    /// `["anthropic", "openai"]`), as detected from available credentials.
    pub fn new(available_providers: &[String]) -> Result<Self, RouterError> {
        let mut models: Vec<ModelInfo> = model_catalog()
            .into_iter()
            .filter(|m| available_providers.iter().any(|p| p == &m.provider))
            .collect();
        if models.is_empty() {
            return Err(RouterError::NoModelAvailable {
                step_type: StepType::Execute,
            });
        }
        models.sort_by(|a, b| {
            a.estimate_call_cost(2000, 1000)
                .cmp(&b.estimate_call_cost(2000, 1000))
        });
        Ok(Self { models })
    }

    /// Pick the best model for the current step.
    pub fn select(
        &self,
        budget: &BudgetTracker,
        step_type: StepType,
        estimated_input_tokens: u64,
        estimated_output_tokens: u64,
    ) -> ModelInfo {
        if budget.utilization() > 0.95 {
            tracing::warn!(
                utilization = budget.utilization(),
                "budget critically low, forcing cheapest model"
            );
            return self.cheapest_model();
        }

        let per_step_budget = budget.budget_per_step();
        let capability_weight = step_type.capability_weight();

        let candidates: Vec<(ModelInfo, Decimal)> = self
            .models
            .iter()
            .cloned()
            .map(|m| {
                let cost = m.estimate_call_cost(estimated_input_tokens, estimated_output_tokens);
                (m, cost)
            })
            .filter(|(_, cost)| *cost <= per_step_budget)
            .collect();

        if candidates.is_empty() {
            return self.cheapest_model();
        }

        let per_step_budget_f64 = per_step_budget.to_f64().unwrap_or(0.0);
        let mut scored: Vec<(ModelInfo, f64)> = candidates
            .into_iter()
            .map(|(m, cost)| {
                let cap_score = m.capability_score();
                let cost_f64 = cost.to_f64().unwrap_or(0.0);
                let savings_score = if per_step_budget_f64 > 0.0 {
                    1.0 - (cost_f64 / per_step_budget_f64)
                } else {
                    0.0
                };
                let score = (capability_weight * cap_score)
                    + ((1.0 - capability_weight) * savings_score);
                (m, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().next().expect("non-empty candidates").0
    }

    /// The cheapest model among the available providers, by estimated
    /// call cost at default token counts.
    pub fn cheapest_model(&self) -> ModelInfo {
        self.models
            .iter()
            .min_by_key(|m| m.estimate_call_cost(2000, 1000))
            .cloned()
            .expect("router always has at least one model")
    }

    /// Look up a model by its canonical id.
    pub fn lookup(&self, model_id: &str) -> Result<&ModelInfo, RouterError> {
        self.models
            .iter()
            .find(|m| m.id == model_id)
            .ok_or_else(|| RouterError::UnknownModel(model_id.to_string()))
    }

    /// Distinct tiers represented among the available models, ordered
    /// from cheapest to most capable.
    pub fn available_tiers(&self) -> Vec<ModelTier> {
        let mut tiers: Vec<ModelTier> = self.models.iter().map(|m| m.tier).collect();
        tiers.sort();
        tiers.dedup();
        tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn router_rejects_empty_provider_set() {
        let err = ModelRouter::new(&[]).unwrap_err();
        assert!(matches!(err, RouterError::NoModelAvailable { .. }));
    }

    #[test]
    fn scenario_b_router_prefers_premium_when_affordable() {
        let providers = vec![
            "anthropic".to_string(),
            "openai".to_string(),
            "google".to_string(),
        ];
        let router = ModelRouter::new(&providers).unwrap();
        let mut budget = BudgetTracker::new(dec("1.00"));
        budget.set_estimated_remaining_steps(10);

        let chosen = router.select(&budget, StepType::Execute, 2000, 1000);
        let premium_cost = router
            .lookup("claude-opus-4-20250514")
            .unwrap()
            .estimate_call_cost(2000, 1000);
        if premium_cost <= budget.budget_per_step() {
            assert_eq!(chosen.tier, ModelTier::Premium);
        }
    }

    #[test]
    fn critically_low_budget_forces_cheapest_model() {
        let providers = vec!["anthropic".to_string()];
        let router = ModelRouter::new(&providers).unwrap();
        let mut tiny = BudgetTracker::new(dec("1.00"));
        tiny.try_record("m", 1_000_000, 0, dec("1.00"), dec("0"), 1)
            .unwrap();
        let chosen = router.select(&tiny, StepType::Execute, 2000, 1000);
        assert_eq!(chosen.id, router.cheapest_model().id);
    }

    #[test]
    fn simple_steps_prefer_cheaper_models_than_execute() {
        let providers = vec!["anthropic".to_string()];
        let router = ModelRouter::new(&providers).unwrap();
        let mut budget = BudgetTracker::new(dec("0.05"));
        budget.set_estimated_remaining_steps(1);
        let simple_choice = router.select(&budget, StepType::Simple, 2000, 1000);
        let execute_choice = router.select(&budget, StepType::Execute, 2000, 1000);
        assert!(simple_choice.tier <= execute_choice.tier);
    }

    #[test]
    fn available_tiers_are_sorted_and_deduplicated() {
        let providers = vec!["google".to_string()];
        let router = ModelRouter::new(&providers).unwrap();
        let tiers = router.available_tiers();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
    }
}
