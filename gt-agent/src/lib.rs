#![deny(missing_docs)]
//! The coding agent's step loop: a sequential plan/execute cycle over a
//! fixed provider set, bounded by a USD budget and a hard step ceiling.
//!
//! One [`AgentSession`] owns one [`gt_budget::BudgetTracker`], one
//! [`gt_router::ModelRouter`] scoped to the providers it could detect
//! credentials for, and one [`gt_tool::ToolRegistry`] rooted at a fixed
//! working directory. `run` drives the loop to completion and returns a
//! [`SessionReport`] summarizing cost and outcome.

mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gt_budget::BudgetTracker;
use gt_router::ModelRouter;
use gt_tool::ToolRegistry;
use gt_types::{
    CompletionResult, Message, ModelInfo, ProviderAdapter, StepType, StopReason, ToolResultEntry,
};
use rust_decimal::Decimal;

pub use error::AgentError;
pub use gt_budget::{BudgetSummary, CostRecord};

const MAX_STEPS: u64 = 200;
const COST_FLOOR_INPUT_TOKENS: u64 = 500;
const COST_FLOOR_OUTPUT_TOKENS: u64 = 100;
const FALLBACK_MAX_TOKENS: u64 = 1024;
const CHARS_PER_TOKEN: u64 = 4;
const CONTEXT_HEADROOM_TOKENS: u64 = 500;

const SYSTEM_TEMPLATE: &str = "\
You are a coding agent. Complete the user's task efficiently and correctly.

Working directory: {cwd}

## Budget
You have a strict budget. Every response you generate costs money.
- Total budget: ${total_budget:.4}
- Spent so far: ${spent:.4}
- Remaining: ${remaining:.4}
- Estimated steps left: {est_steps}

## Efficiency guidelines
- Read files before editing to understand context
- Make precise, targeted edits — don't rewrite entire files unnecessarily
- Combine related reasoning in a single response
- Don't repeat yourself or explain obvious things
- Minimize unnecessary tool calls
- When the task is complete, call task_complete immediately

## Tools
You have access to file operations, shell commands, and search tools.
Use them to explore, modify, and verify code.
";

/// Reads provider credentials from the environment and builds one adapter
/// per provider with a key present. Anthropic and OpenAI each look at a
/// single env var; Google accepts either of two names.
pub fn detect_providers() -> HashMap<String, Arc<dyn ProviderAdapter>> {
    let mut providers: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        providers.insert("anthropic".to_string(), Arc::new(gt_provider_anthropic::Anthropic::new(key)));
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        providers.insert("openai".to_string(), Arc::new(gt_provider_openai::OpenAi::new(key)));
    }
    if let Ok(key) = std::env::var("GOOGLE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY")) {
        providers.insert("google".to_string(), Arc::new(gt_provider_gemini::Gemini::new(key)));
    }
    providers
}

/// Coarse initial estimate of remaining steps from the task's word count.
pub fn initial_estimated_steps(task: &str) -> u64 {
    let words = task.split_whitespace().count();
    if words < 30 {
        5
    } else if words < 100 {
        10
    } else {
        20
    }
}

/// Why the session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// `task_complete` was called, or the model ended its turn with no
    /// further tool calls past the first step.
    Completed,
    /// The budget could not afford even the cheapest model's cost floor.
    BudgetExhausted,
    /// Every provider, including fallback, failed to answer a step.
    ProviderFailure(String),
    /// The step ceiling was reached before the task completed.
    StepCeilingReached,
}

/// Outcome of a full agent session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Why the session stopped.
    pub termination: TerminationReason,
    /// The `summary` argument from `task_complete`, if it was called.
    pub summary: Option<String>,
    /// Number of steps actually taken.
    pub steps_taken: u64,
    /// Final budget snapshot.
    pub budget: BudgetSummary,
    /// Every recorded cost event, in step order.
    pub cost_records: Vec<CostRecord>,
}

/// Drives the plan/execute step loop for one coding task.
pub struct AgentSession {
    working_dir: PathBuf,
    budget: BudgetTracker,
    router: ModelRouter,
    tools: ToolRegistry,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    messages: Vec<Message>,
    completed: bool,
}

impl AgentSession {
    /// Build a session for `task`, rooted at `working_dir`, bounded by
    /// `total_budget` USD. Fails if no provider credentials are present.
    pub fn new(task: &str, total_budget: Decimal, working_dir: impl Into<PathBuf>) -> Result<Self, AgentError> {
        let providers = detect_providers();
        if providers.is_empty() {
            return Err(AgentError::NoProvidersConfigured);
        }
        let provider_names: Vec<String> = providers.keys().cloned().collect();
        let router = ModelRouter::new(&provider_names)?;

        let mut budget = BudgetTracker::new(total_budget);
        budget.set_estimated_remaining_steps(initial_estimated_steps(task));

        let working_dir = working_dir.into();
        let tools = ToolRegistry::new(&working_dir);

        Ok(Self {
            working_dir,
            budget,
            router,
            tools,
            providers,
            messages: vec![Message::user(task)],
            completed: false,
        })
    }

    /// The working directory every tool call is rooted at.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Current budget snapshot, without running any more steps.
    pub fn budget_summary(&self) -> BudgetSummary {
        self.budget.summary()
    }

    /// Current estimate of how many steps remain in the run.
    pub fn estimated_remaining_steps(&self) -> u64 {
        self.budget.estimated_remaining_steps()
    }

    /// The model the router would choose for the next step, given the
    /// current budget state. Used by the `estimate` CLI command to preview
    /// a run without spending anything.
    pub fn preview_model(&self, step_type: StepType) -> ModelInfo {
        let estimated_input_tokens = self.estimate_input_tokens();
        self.router.select(&self.budget, step_type, estimated_input_tokens, 1000)
    }

    fn estimate_input_tokens(&self) -> u64 {
        let content_chars: u64 = self
            .messages
            .iter()
            .map(|m| m.content.chars().count() as u64)
            .sum();
        content_chars / CHARS_PER_TOKEN + CONTEXT_HEADROOM_TOKENS
    }

    fn render_system_prompt(&self) -> String {
        SYSTEM_TEMPLATE
            .replace("{cwd}", &self.working_dir.display().to_string())
            .replace("{total_budget:.4}", &format!("{:.4}", self.budget.total_budget()))
            .replace("{spent:.4}", &format!("{:.4}", self.budget.spent()))
            .replace("{remaining:.4}", &format!("{:.4}", self.budget.remaining()))
            .replace("{est_steps}", &self.budget.estimated_remaining_steps().to_string())
    }

    async fn call_with_fallback(
        &self,
        selected: &ModelInfo,
        system: &str,
        max_tokens: u64,
    ) -> Result<(CompletionResult, ModelInfo), AgentError> {
        let primary = self
            .providers
            .get(&selected.provider)
            .expect("router only selects models from available providers");
        let tool_defs = self.tools.definitions();

        match primary.complete(&self.messages, &tool_defs, &selected.id, system, max_tokens).await {
            Ok(result) => return Ok((result, selected.clone())),
            Err(e) => {
                tracing::warn!(provider = %selected.provider, error = %e, "primary provider call failed, attempting fallback");
            }
        }

        let cheapest = self.router.cheapest_model();
        for (name, adapter) in &self.providers {
            if *name == selected.provider {
                continue;
            }
            match adapter
                .complete(&self.messages, &tool_defs, &cheapest.id, system, FALLBACK_MAX_TOKENS)
                .await
            {
                Ok(result) => return Ok((result, cheapest)),
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "fallback provider call failed");
                }
            }
        }

        Err(AgentError::AllProvidersFailed(
            "every configured provider failed to complete this step".to_string(),
        ))
    }

    /// Run the step loop to completion (or budget exhaustion, provider
    /// failure, or the step ceiling) and return a summary.
    pub async fn run(mut self) -> Result<SessionReport, AgentError> {
        let mut step: u64 = 0;
        let mut summary: Option<String> = None;
        let termination: TerminationReason;

        loop {
            if self.completed || step >= MAX_STEPS {
                termination = if self.completed {
                    TerminationReason::Completed
                } else {
                    TerminationReason::StepCeilingReached
                };
                break;
            }
            step += 1;

            let floor = self.router.cheapest_model().estimate_call_cost(
                COST_FLOOR_INPUT_TOKENS,
                COST_FLOOR_OUTPUT_TOKENS,
            );
            if !self.budget.can_afford(floor) {
                termination = TerminationReason::BudgetExhausted;
                break;
            }

            let step_type = if step == 1 { StepType::Plan } else { StepType::Execute };
            let estimated_input_tokens = self.estimate_input_tokens();
            let selected = self.router.select(&self.budget, step_type, estimated_input_tokens, 1000);
            let max_output_tokens = self.budget.max_output_tokens(
                selected.input_cost_per_mtok,
                selected.output_cost_per_mtok,
                Some(estimated_input_tokens),
            );
            let system = self.render_system_prompt();

            tracing::info!(step, step_type = ?step_type, model = %selected.id, "starting step");

            let (result, billed_model) = match self.call_with_fallback(&selected, &system, max_output_tokens).await {
                Ok(pair) => pair,
                Err(e) => {
                    termination = TerminationReason::ProviderFailure(e.to_string());
                    break;
                }
            };

            self.budget.record(
                billed_model.id.clone(),
                result.input_tokens,
                result.output_tokens,
                billed_model.input_cost_per_mtok,
                billed_model.output_cost_per_mtok,
                step,
            );

            self.messages.push(Message::assistant(result.content.clone(), result.tool_calls.clone()));

            let mut tool_results: Vec<ToolResultEntry> = Vec::new();
            for call in &result.tool_calls {
                if call.name == "task_complete" {
                    self.completed = true;
                    summary = call
                        .arguments
                        .get("summary")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string);
                    tracing::info!(step, summary = ?summary, "task_complete signaled");
                    break;
                }
                let output = self.tools.execute(&call.name, call.arguments.clone()).await.unwrap_or_else(|e| format!("Error: {e}"));
                let is_error = output.starts_with("Error:");
                tool_results.push(ToolResultEntry {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    output,
                    is_error,
                });
            }
            if !tool_results.is_empty() {
                self.messages.push(Message::tool_results(tool_results));
            }

            if !self.completed
                && !result.has_tool_calls()
                && result.stop_reason == StopReason::EndTurn
                && step > 1
            {
                self.completed = true;
                tracing::info!(step, "graceful early termination: no tool calls, end turn");
            }

            if !self.completed {
                let remaining = self.budget.estimated_remaining_steps();
                self.budget.set_estimated_remaining_steps(remaining.saturating_sub(1));
            }
        }

        Ok(SessionReport {
            termination,
            summary,
            steps_taken: step,
            budget: self.budget.summary(),
            cost_records: self.budget.records().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_types::{ToolCallRequest, ToolDefinition};

    /// Always asks for a harmless tool call and never ends its turn, so a
    /// session driven by it can only stop via the step ceiling.
    struct EndlessToolCaller;

    #[async_trait::async_trait]
    impl ProviderAdapter for EndlessToolCaller {
        fn name(&self) -> &str {
            "anthropic"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _model: &str,
            _system: &str,
            _max_tokens: u64,
        ) -> Result<CompletionResult, gt_types::ProviderError> {
            Ok(CompletionResult {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    id: "call_1".to_string(),
                    name: "list_files".to_string(),
                    arguments: serde_json::json!({"path": "."}),
                }],
                stop_reason: StopReason::ToolUse,
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    fn endless_session(dir: &std::path::Path) -> AgentSession {
        let mut providers: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        providers.insert("anthropic".to_string(), Arc::new(EndlessToolCaller));
        let router = ModelRouter::new(&["anthropic".to_string()]).unwrap();
        let mut budget = BudgetTracker::new(Decimal::from(1_000_000));
        budget.set_estimated_remaining_steps(DEFAULT_TEST_STEPS);
        AgentSession {
            working_dir: dir.to_path_buf(),
            budget,
            router,
            tools: ToolRegistry::new(dir),
            providers,
            messages: vec![Message::user("loop forever")],
            completed: false,
        }
    }

    const DEFAULT_TEST_STEPS: u64 = 1000;

    #[tokio::test]
    async fn run_stops_at_exactly_the_step_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let session = endless_session(dir.path());
        let report = session.run().await.unwrap();
        assert_eq!(report.steps_taken, MAX_STEPS);
        assert_eq!(report.termination, TerminationReason::StepCeilingReached);
    }

    #[test]
    fn initial_estimate_follows_word_count_bands() {
        assert_eq!(initial_estimated_steps("fix the bug"), 5);
        let medium: String = std::iter::repeat("word ").take(50).collect();
        assert_eq!(initial_estimated_steps(&medium), 10);
        let long: String = std::iter::repeat("word ").take(150).collect();
        assert_eq!(initial_estimated_steps(&long), 20);
    }

    // Both cases live in one test: AgentSession::new reads process-wide env
    // vars, so exercising both branches in separate #[test] fns would race
    // under the default parallel test runner.
    #[test]
    fn session_construction_depends_on_environment_credentials() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("GOOGLE_API_KEY");
        std::env::remove_var("GEMINI_API_KEY");
        let err = AgentSession::new("task", Decimal::from(1), "/tmp").unwrap_err();
        assert!(matches!(err, AgentError::NoProvidersConfigured));

        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        let session = AgentSession::new("do a small thing", Decimal::from(10), "/tmp/workdir").unwrap();
        let rendered = session.render_system_prompt();
        assert!(rendered.contains("Total budget: $10.0000"));
        assert!(rendered.contains("Working directory: /tmp/workdir"));
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
}
