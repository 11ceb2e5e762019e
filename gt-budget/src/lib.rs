#![deny(missing_docs)]
//! Tracks spend against a USD budget and advises on remaining capacity.
//!
//! The tracker re-estimates how many steps remain after every recorded
//! call, using the running average cost per step. That estimate feeds
//! `budget_per_step`, which in turn bounds `max_output_tokens` so a single
//! expensive call can't starve the rest of the run.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub use gt_types::BudgetError;

const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const MIN_OUTPUT_TOKENS: u64 = 256;
const MAX_OUTPUT_TOKENS: u64 = 16_384;
const DEFAULT_ESTIMATED_REMAINING_STEPS: u64 = 10;
const DEFAULT_ESTIMATED_INPUT_TOKENS: u64 = 2_000;

/// A single recorded cost event, kept for the run's cost log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CostRecord {
    /// Id of the model billed for this call.
    pub model: String,
    /// Input tokens billed.
    pub input_tokens: u64,
    /// Output tokens billed.
    pub output_tokens: u64,
    /// Cost of this call, in USD.
    pub cost: Decimal,
    /// Step number this call occurred at.
    pub step: u64,
}

/// Tracks cumulative spend and advises on per-step budget.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    total_budget: Decimal,
    spent: Decimal,
    records: Vec<CostRecord>,
    estimated_remaining_steps: u64,
}

impl BudgetTracker {
    /// Start tracking against a fixed total budget, in USD.
    pub fn new(total_budget: Decimal) -> Self {
        Self {
            total_budget,
            spent: Decimal::ZERO,
            records: Vec::new(),
            estimated_remaining_steps: DEFAULT_ESTIMATED_REMAINING_STEPS,
        }
    }

    /// Total budget this tracker was constructed with.
    pub fn total_budget(&self) -> Decimal {
        self.total_budget
    }

    /// Total spend recorded so far.
    pub fn spent(&self) -> Decimal {
        self.spent
    }

    /// Budget left, floored at zero.
    pub fn remaining(&self) -> Decimal {
        (self.total_budget - self.spent).max(Decimal::ZERO)
    }

    /// Fraction of the total budget spent so far, in `[0, 1]` for a
    /// well-formed run (a budget of zero is treated as fully utilized).
    pub fn utilization(&self) -> f64 {
        if self.total_budget.is_zero() {
            return 1.0;
        }
        (self.spent / self.total_budget).to_f64().unwrap_or(1.0)
    }

    /// Current estimate of how many steps remain in the run, floored at 1.
    pub fn estimated_remaining_steps(&self) -> u64 {
        self.estimated_remaining_steps.max(1)
    }

    /// Override the remaining-step estimate, e.g. after the planning step
    /// produces a task list of known length. Floored at 1.
    pub fn set_estimated_remaining_steps(&mut self, value: u64) {
        self.estimated_remaining_steps = value.max(1);
    }

    /// Budget available for the next single step.
    pub fn budget_per_step(&self) -> Decimal {
        self.remaining() / Decimal::from(self.estimated_remaining_steps())
    }

    /// Average cost of a call so far, zero if no calls have been recorded.
    pub fn avg_cost_per_step(&self) -> Decimal {
        if self.records.is_empty() {
            return Decimal::ZERO;
        }
        self.spent / Decimal::from(self.records.len() as u64)
    }

    /// Record one completed provider call and return its cost in USD.
    ///
    /// Costs are quoted per million tokens, matching provider pricing
    /// pages. After recording, the remaining-step estimate is refreshed
    /// from the running average cost per step once at least two calls
    /// have been recorded.
    pub fn record(
        &mut self,
        model_id: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        input_cost_per_mtok: Decimal,
        output_cost_per_mtok: Decimal,
        step: u64,
    ) -> Decimal {
        let cost = Decimal::from(input_tokens) * input_cost_per_mtok / ONE_MILLION
            + Decimal::from(output_tokens) * output_cost_per_mtok / ONE_MILLION;
        self.spent += cost;
        self.records.push(CostRecord {
            model: model_id.into(),
            input_tokens,
            output_tokens,
            cost,
            step,
        });

        if self.records.len() >= 2 && self.avg_cost_per_step() > Decimal::ZERO {
            let projected = self.remaining() / self.avg_cost_per_step();
            let projected_steps = projected.to_u64().unwrap_or(1);
            self.estimated_remaining_steps = projected_steps.max(1);
        }

        tracing::debug!(
            model = %self.records.last().unwrap().model,
            cost = %cost,
            spent = %self.spent,
            remaining = %self.remaining(),
            "recorded budget spend"
        );

        cost
    }

    /// Whether the remaining budget covers an estimated cost.
    pub fn can_afford(&self, estimated_cost: Decimal) -> bool {
        self.remaining() >= estimated_cost
    }

    /// Record a call only if it fits the remaining budget, otherwise
    /// return a [`BudgetError::Exceeded`].
    pub fn try_record(
        &mut self,
        model_id: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        input_cost_per_mtok: Decimal,
        output_cost_per_mtok: Decimal,
        step: u64,
    ) -> Result<Decimal, BudgetError> {
        let estimated = Decimal::from(input_tokens) * input_cost_per_mtok / ONE_MILLION
            + Decimal::from(output_tokens) * output_cost_per_mtok / ONE_MILLION;
        if !self.can_afford(estimated) {
            return Err(BudgetError::Exceeded {
                spent: self.spent,
                cap: self.total_budget,
                requested: estimated,
            });
        }
        let model_id = model_id.into();
        Ok(self.record(
            model_id,
            input_tokens,
            output_tokens,
            input_cost_per_mtok,
            output_cost_per_mtok,
            step,
        ))
    }

    /// Max output tokens affordable for one call, reserving the rest of
    /// the per-step budget for input cost, clamped to `[256, 16384]`.
    pub fn max_output_tokens(
        &self,
        input_cost_per_mtok: Decimal,
        output_cost_per_mtok: Decimal,
        estimated_input_tokens: Option<u64>,
    ) -> u64 {
        let estimated_input_tokens =
            estimated_input_tokens.unwrap_or(DEFAULT_ESTIMATED_INPUT_TOKENS);
        let budget_for_call = self.budget_per_step();
        let input_cost = Decimal::from(estimated_input_tokens) * input_cost_per_mtok / ONE_MILLION;
        let budget_for_output = budget_for_call - input_cost;
        if budget_for_output <= Decimal::ZERO || output_cost_per_mtok.is_zero() {
            return MIN_OUTPUT_TOKENS;
        }
        let max_tokens = (budget_for_output / (output_cost_per_mtok / ONE_MILLION))
            .to_u64()
            .unwrap_or(MIN_OUTPUT_TOKENS);
        max_tokens.clamp(MIN_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS)
    }

    /// All cost records recorded so far, in recording order.
    pub fn records(&self) -> &[CostRecord] {
        &self.records
    }

    /// A snapshot summary suitable for the run's cost log and CLI output.
    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary {
            total_budget: self.total_budget,
            spent: self.spent,
            remaining: self.remaining(),
            utilization: self.utilization(),
            total_calls: self.records.len(),
            avg_cost_per_call: self.avg_cost_per_step(),
        }
    }
}

/// Snapshot of a [`BudgetTracker`]'s state, serialized into the cost log.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BudgetSummary {
    /// Total budget configured for the run.
    pub total_budget: Decimal,
    /// Total spend so far.
    pub spent: Decimal,
    /// Budget remaining.
    pub remaining: Decimal,
    /// Fraction of budget spent, in `[0, 1]`.
    pub utilization: f64,
    /// Number of provider calls recorded.
    pub total_calls: usize,
    /// Average cost per recorded call.
    pub avg_cost_per_call: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn records_cost_and_decrements_remaining() {
        let mut tracker = BudgetTracker::new(dec("10.00"));
        let cost = tracker.record("claude-haiku", 1_000_000, 500_000, dec("0.25"), dec("1.25"), 1);
        assert_eq!(cost, dec("0.875"));
        assert_eq!(tracker.spent(), dec("0.875"));
        assert_eq!(tracker.remaining(), dec("9.125"));
    }

    #[test]
    fn can_afford_respects_remaining_budget() {
        let tracker = BudgetTracker::new(dec("1.00"));
        assert!(tracker.can_afford(dec("0.50")));
        assert!(!tracker.can_afford(dec("1.50")));
    }

    #[test]
    fn try_record_rejects_overspend() {
        let mut tracker = BudgetTracker::new(dec("0.01"));
        let err = tracker
            .try_record("claude-opus", 1_000_000, 1_000_000, dec("15.00"), dec("75.00"), 1)
            .unwrap_err();
        match err {
            BudgetError::Exceeded { cap, .. } => assert_eq!(cap, dec("0.01")),
            #[allow(unreachable_patterns)]
            _ => panic!("unexpected error variant"),
        }
        assert_eq!(tracker.spent(), Decimal::ZERO);
    }

    #[test]
    fn max_output_tokens_is_clamped_to_floor() {
        let tracker = BudgetTracker::new(dec("0.0001"));
        let tokens = tracker.max_output_tokens(dec("15.00"), dec("75.00"), None);
        assert_eq!(tokens, 256);
    }

    #[test]
    fn max_output_tokens_is_clamped_to_ceiling() {
        let tracker = BudgetTracker::new(dec("10000"));
        let tokens = tracker.max_output_tokens(dec("0.01"), dec("0.01"), None);
        assert_eq!(tokens, 16_384);
    }

    #[test]
    fn remaining_steps_reestimate_after_two_records() {
        let mut tracker = BudgetTracker::new(dec("1.00"));
        tracker.set_estimated_remaining_steps(10);
        tracker.record("m", 1_000_000, 0, dec("0.10"), dec("0.10"), 1);
        tracker.record("m", 1_000_000, 0, dec("0.10"), dec("0.10"), 2);
        assert!(tracker.estimated_remaining_steps() < 10);
    }

    #[test]
    fn zero_budget_is_fully_utilized() {
        let tracker = BudgetTracker::new(Decimal::ZERO);
        assert_eq!(tracker.utilization(), 1.0);
    }
}
