//! `gastown`: workspace, rig, worker, and convoy management CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gt_orchestrator::{
    checkout_pr, convoy_create, convoy_status, init_workspace, job_status, rig_add, rig_list,
    spawn_single, ControlLoop, WorkspaceConfig,
};

#[derive(Parser)]
#[command(name = "gastown", about = "Multi-agent workspace manager")]
struct Cli {
    /// Workspace root. Defaults to the current directory.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new workspace at the given path.
    WorkspaceInit {
        /// Path to create the workspace at.
        path: PathBuf,
        /// Also run `git init` in the workspace root.
        #[arg(long)]
        git: bool,
    },
    /// Manage project rigs (cloned repositories).
    Rig {
        #[command(subcommand)]
        action: RigAction,
    },
    /// Spawn a single worker against a task.
    Spawn {
        /// Task description.
        task: String,
        /// Target rig name.
        #[arg(long)]
        rig: String,
        /// Context files to pass to the worker.
        #[arg(long)]
        files: Vec<String>,
    },
    /// Run the control loop, dispatching pending tasks up to the
    /// configured concurrency limit until interrupted.
    Swarm,
    /// Manage convoys (task bundles).
    Convoy {
        #[command(subcommand)]
        action: ConvoyAction,
    },
    /// Check a job's current status.
    Status {
        /// Job id to poll.
        job_id: String,
    },
    /// Check out a job's branch locally via a git worktree.
    Checkout {
        /// Rig the job ran against.
        #[arg(long)]
        rig: String,
        /// Job id whose branch to check out.
        job_id: String,
    },
    /// Mayor (interactive coordinator) operations.
    Mayor {
        #[command(subcommand)]
        action: MayorAction,
    },
    /// Launch the White Glove interface (user-friendly TUI).
    #[command(alias = "g")]
    Glove {
        /// Project to work on.
        #[arg(long, short = 'p')]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
enum RigAction {
    /// Register a rig's name and repository.
    Add {
        /// Rig name.
        name: String,
        /// Repository URL.
        repo: String,
    },
    /// List configured rigs.
    List,
}

#[derive(Subcommand)]
enum ConvoyAction {
    /// Create a convoy from a name and a list of issue descriptions.
    Create {
        /// Convoy name.
        name: String,
        /// Issue descriptions, one task per issue.
        issues: Vec<String>,
    },
    /// Show the task plan's progress.
    Status,
}

#[derive(Subcommand)]
enum MayorAction {
    /// Attach to the interactive Mayor session.
    Attach,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let workspace = cli.workspace.unwrap_or_else(|| PathBuf::from("."));
    std::process::exit(run(workspace, cli.command).await);
}

async fn run(workspace: PathBuf, command: Command) -> i32 {
    match command {
        Command::WorkspaceInit { path, git } => match init_workspace(&path, git).await {
            Ok(_) => {
                println!("Gas Town workspace initialized at {}", path.display());
                println!("  Run 'gastown rig add <name> <repo>' to add your first project");
                0
            }
            Err(e) => fail(e),
        },
        Command::Rig { action } => rig_cmd(&workspace, action).await,
        Command::Spawn { task, rig, files } => spawn_cmd(&workspace, &task, &rig, files).await,
        Command::Swarm => swarm_cmd(&workspace).await,
        Command::Convoy { action } => convoy_cmd(&workspace, action).await,
        Command::Status { job_id } => status_cmd(&workspace, &job_id).await,
        Command::Checkout { rig, job_id } => checkout_cmd(&workspace, &rig, &job_id).await,
        Command::Mayor { action } => mayor_cmd(action),
        Command::Glove { project } => glove_cmd(project),
    }
}

fn fail(e: impl std::fmt::Display) -> i32 {
    eprintln!("error: {e}");
    1
}

async fn load_config(workspace: &PathBuf) -> Result<WorkspaceConfig, i32> {
    WorkspaceConfig::load(workspace).await.map_err(fail)
}

async fn rig_cmd(workspace: &PathBuf, action: RigAction) -> i32 {
    let mut config = match load_config(workspace).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    match action {
        RigAction::Add { name, repo } => match rig_add(&mut config, &name, &repo).await {
            Ok(()) => {
                println!("Added rig '{name}' from {repo}");
                0
            }
            Err(e) => fail(e),
        },
        RigAction::List => {
            let rigs = rig_list(&config);
            if rigs.is_empty() {
                println!("No rigs configured. Use 'gastown rig add <name> <repo>'");
                return 0;
            }
            println!("Rigs:");
            for (name, repo) in rigs {
                println!("  - {name}: {repo}");
            }
            0
        }
    }
}

async fn spawn_cmd(workspace: &PathBuf, task: &str, rig: &str, files: Vec<String>) -> i32 {
    let config = match load_config(workspace).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    match spawn_single(&config, rig, task, &files).await {
        Ok(status) => {
            println!("Spawned worker with job ID: {}", status.job_id);
            println!("  Monitor with 'gastown status {}'", status.job_id);
            0
        }
        Err(e) => fail(e),
    }
}

async fn swarm_cmd(workspace: &PathBuf) -> i32 {
    let config = match load_config(workspace).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let control_loop = match ControlLoop::new(config).await {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    println!("Swarm running. Press Ctrl-C to stop.");
    control_loop.run_forever().await;
    0
}

async fn convoy_cmd(workspace: &PathBuf, action: ConvoyAction) -> i32 {
    let config = match load_config(workspace).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    match action {
        ConvoyAction::Create { name, issues } => match convoy_create(&config, &name, &issues).await {
            Ok(()) => {
                println!("Created convoy '{name}' with {} task(s)", issues.len());
                0
            }
            Err(e) => fail(e),
        },
        ConvoyAction::Status => match convoy_status(&config).await {
            Ok(status) => {
                println!(
                    "total={} pending={} running={} done={}",
                    status.total, status.pending, status.running, status.done
                );
                0
            }
            Err(e) => fail(e),
        },
    }
}

async fn status_cmd(workspace: &PathBuf, job_id: &str) -> i32 {
    let config = match load_config(workspace).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    match job_status(&config, job_id).await {
        Ok(status) => {
            println!("Job {job_id}:");
            println!("  Status: {:?}", status.state);
            println!("  Step:   {}", status.current_step);
            if let Some(pr) = &status.pr_link {
                println!("  PR:     {pr}");
            }
            0
        }
        Err(e) => fail(e),
    }
}

async fn checkout_cmd(workspace: &PathBuf, rig: &str, job_id: &str) -> i32 {
    let config = match load_config(workspace).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    match checkout_pr(&config, rig, job_id).await {
        Ok(path) => {
            println!("PR for job {job_id} checked out to: {}", path.display());
            0
        }
        Err(e) => fail(e),
    }
}

fn mayor_cmd(action: MayorAction) -> i32 {
    match action {
        MayorAction::Attach => {
            println!(
                "Mayor is an interactive coordinator session and isn't available in this \
                 non-interactive build. Use 'gastown spawn' or 'gastown swarm' directly."
            );
            0
        }
    }
}

fn glove_cmd(project: Option<String>) -> i32 {
    match project {
        Some(project) => println!(
            "White Glove is an interactive TUI and isn't available in this non-interactive \
             build. Use 'gastown spawn --rig {project}' or 'gastown status' directly."
        ),
        None => println!(
            "White Glove is an interactive TUI and isn't available in this non-interactive \
             build. Use 'gastown spawn' or 'gastown status' directly."
        ),
    }
    0
}
