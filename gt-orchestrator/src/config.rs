//! Workspace configuration: `.gastown/config.yaml` and the on-disk layout
//! it describes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

const DEFAULT_AGENT: &str = "jules";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_CONCURRENT_AGENTS: usize = 4;
const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 30;

/// Persisted orchestrator configuration for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Absolute path to the workspace root.
    pub workspace: PathBuf,
    /// Name of the external worker CLI binary to invoke.
    pub default_agent: String,
    /// Seconds between control-loop ticks.
    pub poll_interval: u64,
    /// Maximum number of concurrently active jobs.
    pub max_concurrent_agents: usize,
    /// Seconds to back off after a rate-limited job status.
    pub rate_limit_backoff: u64,
    /// Rig name to repository URL (or local path) mapping.
    #[serde(default)]
    pub rigs: HashMap<String, String>,
}

impl WorkspaceConfig {
    /// A fresh configuration with the prototype's documented defaults.
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            default_agent: DEFAULT_AGENT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            max_concurrent_agents: DEFAULT_MAX_CONCURRENT_AGENTS,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF_SECS,
            rigs: HashMap::new(),
        }
    }

    /// Path to the config file under a workspace root.
    pub fn config_path(workspace: &Path) -> PathBuf {
        workspace.join(".gastown").join("config.yaml")
    }

    /// Path to the task plan markdown file under this workspace.
    pub fn task_plan_path(&self) -> PathBuf {
        self.workspace.join(".gastown").join("brain").join("task.md")
    }

    /// Path a named rig's clone would live at.
    pub fn rig_path(&self, name: &str) -> PathBuf {
        self.workspace.join("rigs").join(name)
    }

    /// Load configuration from `<workspace>/.gastown/config.yaml`.
    pub async fn load(workspace: &Path) -> Result<Self, OrchestratorError> {
        let path = Self::config_path(workspace);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| OrchestratorError::ConfigRead {
                path: path.display().to_string(),
                source: e.to_string(),
            })?;
        serde_yaml::from_str(&raw).map_err(|e| OrchestratorError::ConfigRead {
            path: path.display().to_string(),
            source: e.to_string(),
        })
    }

    /// Persist this configuration to `<workspace>/.gastown/config.yaml`.
    pub async fn save(&self) -> Result<(), OrchestratorError> {
        let path = Self::config_path(&self.workspace);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OrchestratorError::ConfigWrite {
                    path: path.display().to_string(),
                    source: e.to_string(),
                })?;
        }
        let raw = serde_yaml::to_string(self).map_err(|e| OrchestratorError::ConfigWrite {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| OrchestratorError::ConfigWrite {
                path: path.display().to_string(),
                source: e.to_string(),
            })
    }
}

/// Create the on-disk workspace layout (`rigs/`, `hooks/`, `convoys/`,
/// `.gastown/brain/`) and write a default config, unless one already
/// exists. Optionally runs `git init` in the workspace root.
pub async fn init_workspace(path: &Path, git_init: bool) -> Result<WorkspaceConfig, OrchestratorError> {
    for dir in ["rigs", "hooks", "convoys", ".gastown", ".gastown/brain"] {
        tokio::fs::create_dir_all(path.join(dir))
            .await
            .map_err(|e| OrchestratorError::ConfigWrite {
                path: path.join(dir).display().to_string(),
                source: e.to_string(),
            })?;
    }

    if git_init {
        let status = tokio::process::Command::new("git")
            .arg("init")
            .arg(path)
            .status()
            .await;
        if let Err(e) = status {
            tracing::warn!(error = %e, "git init failed");
        }
    }

    let config = WorkspaceConfig::new(path.to_path_buf());
    config.save().await?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_workspace_creates_layout_and_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = init_workspace(dir.path(), false).await.unwrap();
        assert!(dir.path().join("rigs").is_dir());
        assert!(dir.path().join(".gastown/brain").is_dir());
        assert_eq!(config.max_concurrent_agents, DEFAULT_MAX_CONCURRENT_AGENTS);

        let reloaded = WorkspaceConfig::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.default_agent, DEFAULT_AGENT);
    }

    #[tokio::test]
    async fn rig_round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = init_workspace(dir.path(), false).await.unwrap();
        config.rigs.insert("demo".to_string(), "https://example.com/demo.git".to_string());
        config.save().await.unwrap();

        let reloaded = WorkspaceConfig::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.rigs.get("demo").map(String::as_str), Some("https://example.com/demo.git"));
    }
}
