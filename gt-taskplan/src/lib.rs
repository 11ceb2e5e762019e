#![deny(missing_docs)]
//! Durable markdown checklist store for the orchestrator's task plan.
//!
//! The task plan is a human-editable markdown file the user may modify
//! between orchestrator ticks; rewrites preserve every non-task line
//! exactly and touch only the single checkbox character of the task line
//! being marked.

use std::path::{Path, PathBuf};

use gt_types::{TaskPlanError, TaskPlanEntry, TaskStatus};
use regex::Regex;

const INITIAL_TASK_CONTENT: &str = "# Gas Town Tasks\n\n## Active Tasks\n- [ ] Initialize project\n";

fn task_line_regex() -> Regex {
    Regex::new(r"^(\s*[-*]\s*\[)([ xX/])(\]\s*)(.+)$").expect("valid static regex")
}

/// Reads and atomically rewrites a single task plan markdown file.
pub struct TaskPlanStore {
    path: PathBuf,
}

impl TaskPlanStore {
    /// Open the task plan at `path`, creating it (and its parent
    /// directory) with starter content if it doesn't exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TaskPlanError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskPlanError::Write {
                    path: path.display().to_string(),
                    source: e.to_string(),
                })?;
        }
        if tokio::fs::metadata(&path).await.is_err() {
            write_atomic(&path, INITIAL_TASK_CONTENT).await?;
        }
        Ok(Self { path })
    }

    /// Parse every task checkbox line in the file, in source order.
    pub async fn read_entries(&self) -> Result<Vec<TaskPlanEntry>, TaskPlanError> {
        let content = self.read_raw().await?;
        Ok(parse_entries(&content))
    }

    /// Text of the first entry whose status is still `pending`.
    pub async fn next_pending(&self) -> Result<Option<String>, TaskPlanError> {
        Ok(self
            .read_entries()
            .await?
            .into_iter()
            .find(|e| e.is_pending())
            .map(|e| e.display_text))
    }

    /// Rewrite the checkbox marker for the first task line whose
    /// display text exactly matches `task_text`. Lines that don't match
    /// a task or don't match `task_text` are rewritten byte-identical.
    pub async fn mark(&self, task_text: &str, status: TaskStatus) -> Result<(), TaskPlanError> {
        let content = self.read_raw().await?;
        let re = task_line_regex();
        let marker = status.to_marker_char();

        let mut rewritten_lines: Vec<String> = Vec::new();
        for line in content.lines() {
            if let Some(caps) = re.captures(line) {
                let text = caps[4].trim_end();
                if text == task_text {
                    rewritten_lines.push(format!("{}{}{}{}", &caps[1], marker, &caps[3], &caps[4]));
                    continue;
                }
            }
            rewritten_lines.push(line.to_string());
        }

        let mut new_content = rewritten_lines.join("\n");
        new_content.push('\n');
        write_atomic(&self.path, &new_content).await
    }

    /// Overwrite the plan with a fresh task structure: an execution
    /// phase containing `steps`, followed by a single verification step.
    pub async fn create_task(&self, title: &str, steps: &[String]) -> Result<(), TaskPlanError> {
        let mut content = format!("# {title}\n\n## Execution Phase\n");
        for step in steps {
            content.push_str(&format!("- [ ] {step}\n"));
        }
        content.push_str("\n## Verification Phase\n- [ ] Verify results\n");
        write_atomic(&self.path, &content).await
    }

    async fn read_raw(&self) -> Result<String, TaskPlanError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TaskPlanError::Read {
                path: self.path.display().to_string(),
                source: e.to_string(),
            })
    }
}

fn parse_entries(content: &str) -> Vec<TaskPlanEntry> {
    let re = task_line_regex();
    content
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            let marker = caps[2].chars().next()?;
            let status = TaskStatus::from_marker_char(marker)?;
            Some(TaskPlanEntry {
                original_line_text: line.to_string(),
                status,
                display_text: caps[4].trim_end().to_string(),
            })
        })
        .collect()
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), TaskPlanError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| TaskPlanError::Write {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    tokio::fs::write(tmp.path(), content)
        .await
        .map_err(|e| TaskPlanError::Write {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
    tmp.persist(path).map_err(|e| TaskPlanError::Write {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opening_missing_file_creates_starter_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.md");
        let store = TaskPlanStore::open(&path).await.unwrap();
        let entries = store.read_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_text, "Initialize project");
    }

    #[tokio::test]
    async fn scenario_e_mark_running_then_done_preserves_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.md");
        tokio::fs::write(&path, "# T\n- [ ] A\n- [ ] B\n")
            .await
            .unwrap();
        let store = TaskPlanStore::open(&path).await.unwrap();

        store.mark("A", TaskStatus::Running).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "# T\n- [/] A\n- [ ] B\n");

        store.mark("A", TaskStatus::Done).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "# T\n- [x] A\n- [ ] B\n");

        assert_eq!(store.next_pending().await.unwrap(), Some("B".to_string()));
    }

    #[tokio::test]
    async fn prose_lines_pass_through_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.md");
        tokio::fs::write(&path, "Some prose.\n- [ ] A\nMore prose.\n")
            .await
            .unwrap();
        let store = TaskPlanStore::open(&path).await.unwrap();
        store.mark("A", TaskStatus::Done).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "Some prose.\n- [x] A\nMore prose.\n");
    }

    #[tokio::test]
    async fn create_task_writes_execution_and_verification_phases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.md");
        let store = TaskPlanStore::open(&path).await.unwrap();
        store
            .create_task("New Feature", &["step one".to_string(), "step two".to_string()])
            .await
            .unwrap();
        let entries = store.read_entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].display_text, "Verify results");
    }
}
