//! `gastown-agent`: run a budget-aware coding agent against a single task.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gt_agent::{AgentSession, TerminationReason};
use gt_router::model_catalog;
use gt_types::StepType;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(name = "gastown-agent", about = "Budget-aware coding agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent against a task until completion, budget exhaustion, or failure.
    Run {
        /// The task description given to the agent.
        task: String,
        /// Total USD budget for this run. Must be strictly positive.
        #[arg(long)]
        budget: Decimal,
        /// Working directory for tool calls. Defaults to the current directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Preview the model the router would pick for this task's first step,
    /// without spending any budget.
    Estimate {
        /// The task description to estimate for.
        task: String,
        /// Total USD budget to estimate against. Must be strictly positive.
        #[arg(long)]
        budget: Decimal,
    },
    /// List the full model catalog, independent of configured credentials.
    Models,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run { task, budget, dir } => run_cmd(&task, budget, dir).await,
        Command::Estimate { task, budget } => estimate_cmd(&task, budget),
        Command::Models => models_cmd(),
    };
    std::process::exit(code);
}

async fn run_cmd(task: &str, budget: Decimal, dir: Option<PathBuf>) -> i32 {
    if budget <= Decimal::ZERO {
        eprintln!("error: --budget must be strictly positive");
        return 1;
    }
    let working_dir = dir.unwrap_or_else(|| PathBuf::from("."));

    let session = match AgentSession::new(task, budget, &working_dir) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let report = match session.run().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    print_report(&report);
    match report.termination {
        TerminationReason::Completed => 0,
        _ => 1,
    }
}

fn estimate_cmd(task: &str, budget: Decimal) -> i32 {
    if budget <= Decimal::ZERO {
        eprintln!("error: --budget must be strictly positive");
        return 1;
    }
    let session = match AgentSession::new(task, budget, ".") {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let model = session.preview_model(StepType::Plan);
    let summary = session.budget_summary();
    println!("First step would use: {} ({:?} tier)", model.id, model.tier);
    println!("Estimated call cost: ${}", model.estimate_call_cost(2000, 1000));
    println!("Total budget: ${}", summary.total_budget);
    println!("Estimated steps: {}", session.estimated_remaining_steps());
    0
}

fn models_cmd() -> i32 {
    println!("{:<28} {:<10} {:<10} {:>12} {:>12}", "model", "provider", "tier", "$/Mtok in", "$/Mtok out");
    for model in model_catalog() {
        println!(
            "{:<28} {:<10} {:<10?} {:>12} {:>12}",
            model.id, model.provider, model.tier, model.input_cost_per_mtok, model.output_cost_per_mtok
        );
    }
    0
}

fn print_report(report: &gt_agent::SessionReport) {
    println!("--- cost log ---");
    for record in &report.cost_records {
        println!(
            "step {:>3}  {:<28} in={:<8} out={:<8} cost=${}",
            record.step, record.model, record.input_tokens, record.output_tokens, record.cost
        );
    }
    println!("--- summary ---");
    println!("steps taken: {}", report.steps_taken);
    println!("spent: ${}", report.budget.spent);
    println!("remaining: ${}", report.budget.remaining);
    match &report.termination {
        TerminationReason::Completed => {
            println!("result: completed");
            if let Some(summary) = &report.summary {
                println!("summary: {summary}");
            }
        }
        TerminationReason::BudgetExhausted => println!("result: budget exhausted"),
        TerminationReason::ProviderFailure(msg) => println!("result: provider failure ({msg})"),
        TerminationReason::StepCeilingReached => println!("result: step ceiling reached"),
    }
}
