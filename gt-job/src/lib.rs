#![deny(missing_docs)]
//! Async job submission and polling against an external coding-worker CLI.
//!
//! Abstracts the async/GitHub-based job pattern — `submit` then
//! `watch`/`poll` then a terminal [`JobStatus`] — so the orchestrator sees
//! a simple task-to-result flow while this wrapper absorbs the async
//! complexity of an external subprocess-driven worker.

use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use gt_types::{JobError, JobState, JobStatus};
use regex::Regex;
use tokio::process::Command;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 30;
const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 3;

/// Configuration for the job wrapper's polling cadence.
#[derive(Debug, Clone, Copy)]
pub struct JobWrapperConfig {
    /// Seconds between successive polls of a running job.
    pub poll_interval_secs: u64,
    /// Seconds to back off after observing a rate-limited status.
    pub rate_limit_backoff_secs: u64,
}

impl Default for JobWrapperConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            rate_limit_backoff_secs: DEFAULT_RATE_LIMIT_BACKOFF_SECS,
        }
    }
}

/// Wraps an external worker CLI (invoked as `worker_bin`) with
/// submit/poll/watch/cancel semantics.
pub struct JobWrapper {
    worker_bin: String,
    config: JobWrapperConfig,
}

impl JobWrapper {
    /// Build a wrapper around the given worker CLI binary name, e.g. `jules`.
    pub fn new(worker_bin: impl Into<String>, config: JobWrapperConfig) -> Self {
        Self {
            worker_bin: worker_bin.into(),
            config,
        }
    }

    /// Create a dedicated branch, submit the task, and return the job id.
    pub async fn submit(
        &self,
        prompt: &str,
        repo_path: &str,
        context_files: &[String],
    ) -> Result<JobStatus, JobError> {
        let branch_name = format!("polecat-{}", short_hex());

        run_command(
            "git",
            &["checkout", "-b", &branch_name],
            Some(repo_path),
        )
        .await
        .map_err(|e| JobError::Spawn(format!("git checkout failed: {e}")))?;

        let mut args: Vec<String> = vec!["start".to_string()];
        for f in context_files {
            args.push("--context".to_string());
            args.push(f.clone());
        }
        args.push("--prompt".to_string());
        args.push(prompt.to_string());
        args.push("--branch".to_string());
        args.push(branch_name.clone());

        let output = self.run_worker(&args).await?;
        let job_id = parse_job_id(&output);

        Ok(JobStatus::pending(job_id, Some(branch_name)))
    }

    /// Poll the worker once for the current status of `job_id`.
    pub async fn poll(&self, job_id: &str) -> Result<JobStatus, JobError> {
        let output = self
            .run_worker(&["status", job_id, "--format", "json"])
            .await?;
        Ok(parse_status(job_id, &output))
    }

    /// Poll until the job reaches a terminal state, invoking `on_update`
    /// with a timestamped status line after every successful poll.
    ///
    /// After three consecutive poll errors, returns a synthetic failed
    /// status rather than looping forever.
    pub async fn watch(
        &self,
        job_id: &str,
        mut on_update: impl FnMut(&str),
    ) -> JobStatus {
        let mut consecutive_errors: u32 = 0;

        loop {
            match self.poll(job_id).await {
                Ok(mut status) => {
                    consecutive_errors = 0;
                    let timestamp = Utc::now().format("%H:%M:%S");
                    let short_id: String = job_id.chars().take(8).collect();
                    let mut msg = format!("[{timestamp}] Job #{short_id}... Status: {:?}", status.state);
                    if !status.current_step.is_empty() {
                        msg.push_str(&format!(" - {}", status.current_step));
                    }
                    on_update(&msg);

                    if status.is_complete() {
                        status.completed_at = Some(Utc::now());
                        return status;
                    }

                    if status.state == JobState::RateLimited {
                        on_update(&format!(
                            "Rate limited. Backing off {}s...",
                            self.config.rate_limit_backoff_secs
                        ));
                        tokio::time::sleep(Duration::from_secs(self.config.rate_limit_backoff_secs))
                            .await;
                        continue;
                    }

                    tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(job_id, error = %e, consecutive_errors, "poll failed");
                    if consecutive_errors >= MAX_CONSECUTIVE_POLL_ERRORS {
                        return JobStatus {
                            job_id: job_id.to_string(),
                            state: JobState::Failed,
                            current_step: "Polling failed".to_string(),
                            pr_link: None,
                            branch_name: None,
                            started_at: None,
                            completed_at: Some(Utc::now()),
                            error: Some(e.to_string()),
                        };
                    }
                    tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
                }
            }
        }
    }

    /// Cancel a running job.
    pub async fn cancel(&self, job_id: &str) -> bool {
        self.run_worker(&["cancel", job_id]).await.is_ok()
    }

    async fn run_worker(&self, args: &[&str]) -> Result<String, JobError> {
        run_command(&self.worker_bin, args, None)
            .await
            .map_err(|e| JobError::Spawn(e.to_string()))
    }
}

async fn run_command(bin: &str, args: &[&str], cwd: Option<&str>) -> Result<String, String> {
    let mut cmd = Command::new(bin);
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    let output = cmd
        .output()
        .await
        .map_err(|e| format!("failed to spawn {bin}: {e}"))?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).into_owned());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn short_hex() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

fn parse_job_id(output: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(output) {
        if let Some(id) = value
            .get("job_id")
            .or_else(|| value.get("id"))
            .and_then(serde_json::Value::as_str)
        {
            return id.to_string();
        }
    }

    let patterns = [
        r"(?i)job\s*id:\s*(\S+)",
        r"(?i)started\s+job:\s*(\S+)",
        r"^([a-f0-9-]{36})$",
    ];
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(output.trim()) {
                if let Some(m) = caps.get(1) {
                    return m.as_str().to_string();
                }
            }
        }
    }

    let trimmed = output.trim();
    if trimmed.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        trimmed
            .split_whitespace()
            .next()
            .unwrap_or(trimmed)
            .to_string()
    }
}

fn parse_status(job_id: &str, output: &str) -> JobStatus {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(output) {
        let state = value
            .get("state")
            .and_then(serde_json::Value::as_str)
            .map(parse_state_keyword)
            .unwrap_or(JobState::Pending);
        return JobStatus {
            job_id: job_id.to_string(),
            state,
            current_step: value
                .get("current_step")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            pr_link: value
                .get("pr_url")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            branch_name: value
                .get("branch")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            started_at: None,
            completed_at: None,
            error: None,
        };
    }
    parse_status_text(job_id, output)
}

fn parse_state_keyword(raw: &str) -> JobState {
    let lower = raw.to_lowercase();
    if lower.contains("complete") || lower.contains("success") {
        JobState::Completed
    } else if lower.contains("fail") || lower.contains("error") {
        JobState::Failed
    } else if lower.contains("running") || lower.contains("progress") {
        JobState::Running
    } else if lower.contains("rate") && lower.contains("limit") {
        JobState::RateLimited
    } else {
        JobState::Pending
    }
}

fn parse_status_text(job_id: &str, output: &str) -> JobStatus {
    let state = parse_state_keyword(output);
    let current_step: String = output.trim().chars().take(100).collect();
    JobStatus {
        job_id: job_id.to_string(),
        state,
        current_step,
        pr_link: None,
        branch_name: None,
        started_at: None,
        completed_at: None,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_id_from_json() {
        let id = parse_job_id(r#"{"job_id": "abc123"}"#);
        assert_eq!(id, "abc123");
    }

    #[test]
    fn parses_job_id_from_text_pattern() {
        let id = parse_job_id("Started job: xyz-789");
        assert_eq!(id, "xyz-789");
    }

    #[test]
    fn parses_job_id_fallback_first_token() {
        let id = parse_job_id("some unrecognized output here");
        assert_eq!(id, "some");
    }

    #[test]
    fn parses_status_keywords_from_text() {
        assert_eq!(parse_status_text("j1", "build complete").state, JobState::Completed);
        assert_eq!(parse_status_text("j1", "error: build failed").state, JobState::Failed);
        assert_eq!(parse_status_text("j1", "still running").state, JobState::Running);
        assert_eq!(parse_status_text("j1", "rate limit hit").state, JobState::RateLimited);
        assert_eq!(parse_status_text("j1", "queued up").state, JobState::Pending);
    }

    #[test]
    fn running_takes_precedence_over_rate_limit_keyword() {
        // "running" must win here: the worker is still making progress,
        // the rate-limit mention is incidental.
        assert_eq!(
            parse_status_text("j1", "rate limited while running").state,
            JobState::Running
        );
    }

    #[test]
    fn parses_status_from_json_body() {
        let status = parse_status(
            "j1",
            r#"{"state": "RUNNING", "current_step": "compiling", "branch": "polecat-ab12cd34"}"#,
        );
        assert_eq!(status.state, JobState::Running);
        assert_eq!(status.current_step, "compiling");
        assert_eq!(status.branch_name.as_deref(), Some("polecat-ab12cd34"));
    }
}
