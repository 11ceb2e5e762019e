#![deny(missing_docs)]
//! Sandboxed file and shell tools for the agent step loop.
//!
//! A fixed, closed set of tools, each rooted at a working directory fixed
//! at session start. Every tool returns a single string; all errors are
//! returned as strings beginning with `Error:`, never thrown across the
//! tool-call boundary. Only registry-level failures (an unknown tool
//! name) surface as an `Err`.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use gt_types::ToolDefinition;
use serde_json::Value;

pub use gt_types::ToolError;

const MAX_READ_CHARS: usize = 100_000;
const MAX_LIST_ENTRIES: usize = 500;
const MAX_SEARCH_MATCH_LINES: usize = 100;
const SEARCH_TIMEOUT_SECS: u64 = 15;
const RUN_COMMAND_HARD_CAP_SECS: u64 = 120;
const DEFAULT_RUN_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Object-safe trait for a single sandboxed tool.
///
/// Implementations never panic and never return an `Err` for domain
/// failures (missing file, ambiguous edit, timed-out command) — those are
/// reported as an `Error: ...`-prefixed string, matching the provider
/// contract that tool results are always plain text.
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name, used to dispatch calls in the registry.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool against the given arguments, returning its result
    /// (or an `Error: ...`-prefixed string) as plain text.
    fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>>;
}

/// Registry of tools executing within a single working directory.
pub struct ToolRegistry {
    working_dir: PathBuf,
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Build the registry with the fixed 7-tool set rooted at `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let mut tools: HashMap<String, Arc<dyn ToolDyn>> = HashMap::new();
        let register = |tools: &mut HashMap<String, Arc<dyn ToolDyn>>, tool: Arc<dyn ToolDyn>| {
            tools.insert(tool.name().to_string(), tool);
        };
        register(&mut tools, Arc::new(builtin::ReadFile::new(&working_dir)));
        register(&mut tools, Arc::new(builtin::WriteFile::new(&working_dir)));
        register(&mut tools, Arc::new(builtin::EditFile::new(&working_dir)));
        register(&mut tools, Arc::new(builtin::ListFiles::new(&working_dir)));
        register(&mut tools, Arc::new(builtin::SearchFiles::new(&working_dir)));
        register(&mut tools, Arc::new(builtin::RunCommand::new(&working_dir)));
        register(&mut tools, Arc::new(builtin::TaskComplete));
        Self { working_dir, tools }
    }

    /// The working directory every relative path argument resolves against.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Tool definitions, in JSON-Schema-shaped form, for the provider's
    /// tool-calling request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters()))
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name, returning its plain-text result. Only an
    /// unregistered tool name produces an `Err`; everything else is
    /// reported inline as an `Error: ...` string per the tool contract.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        Ok(tool.call(arguments).await)
    }

    /// Whether `task_complete` is among the registered tools (always true;
    /// kept for callers that want to assert the invariant explicitly).
    pub fn has_task_complete(&self) -> bool {
        self.tools.contains_key("task_complete")
    }
}

fn resolve_path(working_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        working_dir.join(p)
    }
}

fn get_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

mod builtin {
    use super::*;

    pub struct ReadFile {
        working_dir: PathBuf,
    }
    impl ReadFile {
        pub fn new(working_dir: &Path) -> Self {
            Self {
                working_dir: working_dir.to_path_buf(),
            }
        }
    }
    impl ToolDyn for ReadFile {
        fn name(&self) -> &str {
            "read_file"
        }
        fn description(&self) -> &str {
            "Read the contents of a file. Returns the file content as text."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative or absolute file path"},
                },
                "required": ["path"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                let Some(path) = get_str(&arguments, "path") else {
                    return "Error: missing required argument 'path'".to_string();
                };
                let resolved = resolve_path(&self.working_dir, path);
                let content = match tokio::fs::read(&resolved).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(_) => return format!("Error: File not found: {path}"),
                };
                if content.chars().count() > MAX_READ_CHARS {
                    let total = content.chars().count();
                    let truncated: String = content.chars().take(MAX_READ_CHARS).collect();
                    format!("{truncated}\n\n... (truncated, file is {total} chars)")
                } else {
                    content
                }
            })
        }
    }

    pub struct WriteFile {
        working_dir: PathBuf,
    }
    impl WriteFile {
        pub fn new(working_dir: &Path) -> Self {
            Self {
                working_dir: working_dir.to_path_buf(),
            }
        }
    }
    impl ToolDyn for WriteFile {
        fn name(&self) -> &str {
            "write_file"
        }
        fn description(&self) -> &str {
            "Create or overwrite a file with the given content."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path to write to"},
                    "content": {"type": "string", "description": "Full file content"},
                },
                "required": ["path", "content"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                let (Some(path), Some(content)) =
                    (get_str(&arguments, "path"), get_str(&arguments, "content"))
                else {
                    return "Error: missing required argument 'path' or 'content'".to_string();
                };
                let resolved = resolve_path(&self.working_dir, path);
                if let Some(parent) = resolved.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        return format!("Error: {e}");
                    }
                }
                if let Err(e) = tokio::fs::write(&resolved, content).await {
                    return format!("Error: {e}");
                }
                format!("Wrote {} chars to {path}", content.chars().count())
            })
        }
    }

    pub struct EditFile {
        working_dir: PathBuf,
    }
    impl EditFile {
        pub fn new(working_dir: &Path) -> Self {
            Self {
                working_dir: working_dir.to_path_buf(),
            }
        }
    }
    impl ToolDyn for EditFile {
        fn name(&self) -> &str {
            "edit_file"
        }
        fn description(&self) -> &str {
            "Edit a file by replacing an exact string match with new content. \
             The old_string must appear exactly once in the file."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path to edit"},
                    "old_string": {"type": "string", "description": "Exact text to find (must be unique in file)"},
                    "new_string": {"type": "string", "description": "Replacement text"},
                },
                "required": ["path", "old_string", "new_string"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                let (Some(path), Some(old_string), Some(new_string)) = (
                    get_str(&arguments, "path"),
                    get_str(&arguments, "old_string"),
                    get_str(&arguments, "new_string"),
                ) else {
                    return "Error: missing required edit_file argument".to_string();
                };
                let resolved = resolve_path(&self.working_dir, path);
                let content = match tokio::fs::read_to_string(&resolved).await {
                    Ok(c) => c,
                    Err(_) => return format!("Error: File not found: {path}"),
                };
                let count = content.matches(old_string).count();
                if count == 0 {
                    return "Error: old_string not found in file".to_string();
                }
                if count > 1 {
                    return format!(
                        "Error: old_string found {count} times, must be unique. Add more context."
                    );
                }
                let new_content = content.replacen(old_string, new_string, 1);
                if let Err(e) = tokio::fs::write(&resolved, new_content).await {
                    return format!("Error: {e}");
                }
                format!("Edited {path}: replaced 1 occurrence")
            })
        }
    }

    pub struct ListFiles {
        working_dir: PathBuf,
    }
    impl ListFiles {
        pub fn new(working_dir: &Path) -> Self {
            Self {
                working_dir: working_dir.to_path_buf(),
            }
        }
    }
    impl ToolDyn for ListFiles {
        fn name(&self) -> &str {
            "list_files"
        }
        fn description(&self) -> &str {
            "List files in a directory. Supports glob patterns."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory path or glob pattern (e.g. 'src/**/*.rs')"},
                },
                "required": ["path"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                let Some(path) = get_str(&arguments, "path") else {
                    return "Error: missing required argument 'path'".to_string();
                };
                let working_dir = self.working_dir.clone();
                let path = path.to_string();
                tokio::task::spawn_blocking(move || list_files_blocking(&working_dir, &path))
                    .await
                    .unwrap_or_else(|e| format!("Error: {e}"))
            })
        }
    }

    fn list_files_blocking(working_dir: &Path, path: &str) -> String {
        let resolved = resolve_path(working_dir, path);
        if path.contains('*') || path.contains('?') {
            let pattern = resolved.to_string_lossy().into_owned();
            let mut matches: Vec<PathBuf> = match glob::glob(&pattern) {
                Ok(paths) => paths.filter_map(Result::ok).collect(),
                Err(e) => return format!("Error: invalid glob pattern: {e}"),
            };
            matches.sort();
            if matches.is_empty() {
                return "No files matched the pattern.".to_string();
            }
            let rel: Vec<String> = matches
                .iter()
                .take(MAX_LIST_ENTRIES)
                .map(|m| {
                    m.strip_prefix(working_dir)
                        .unwrap_or(m)
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            return rel.join("\n");
        }

        if resolved.is_dir() {
            let mut entries: Vec<std::fs::DirEntry> = match std::fs::read_dir(&resolved) {
                Ok(rd) => rd.filter_map(Result::ok).collect(),
                Err(e) => return format!("Error: {e}"),
            };
            entries.sort_by_key(|e| e.file_name());
            let rendered: Vec<String> = entries
                .into_iter()
                .take(MAX_LIST_ENTRIES)
                .map(|e| {
                    let name = e.file_name().to_string_lossy().into_owned();
                    if e.path().is_dir() {
                        format!("{name}/")
                    } else {
                        name
                    }
                })
                .collect();
            return rendered.join("\n");
        }

        format!("Error: Not a directory or pattern: {path}")
    }

    pub struct SearchFiles {
        working_dir: PathBuf,
    }
    impl SearchFiles {
        pub fn new(working_dir: &Path) -> Self {
            Self {
                working_dir: working_dir.to_path_buf(),
            }
        }
    }
    impl ToolDyn for SearchFiles {
        fn name(&self) -> &str {
            "search_files"
        }
        fn description(&self) -> &str {
            "Search file contents using a regex pattern. Returns matching lines with file paths."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Regex pattern to search for"},
                    "path": {"type": "string", "description": "Directory to search in (default: working dir)"},
                    "include": {"type": "string", "description": "File glob filter (e.g. '*.rs')"},
                },
                "required": ["pattern"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                let Some(pattern) = get_str(&arguments, "pattern") else {
                    return "Error: missing required argument 'pattern'".to_string();
                };
                let search_dir = match get_str(&arguments, "path") {
                    Some(p) if !p.is_empty() => resolve_path(&self.working_dir, p),
                    _ => self.working_dir.clone(),
                };
                let include = get_str(&arguments, "include").filter(|s| !s.is_empty());

                let mut cmd = tokio::process::Command::new("grep");
                cmd.arg("-rn");
                if let Some(include) = include {
                    cmd.arg("--include").arg(include);
                }
                cmd.arg("-E")
                    .arg(pattern)
                    .arg(&search_dir)
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());

                let output = tokio::time::timeout(
                    Duration::from_secs(SEARCH_TIMEOUT_SECS),
                    cmd.output(),
                )
                .await;

                match output {
                    Ok(Ok(out)) => {
                        let stdout = String::from_utf8_lossy(&out.stdout);
                        let trimmed = stdout.trim();
                        if trimmed.is_empty() {
                            return "No matches found.".to_string();
                        }
                        let lines: Vec<&str> = trimmed.split('\n').collect();
                        if lines.len() > MAX_SEARCH_MATCH_LINES {
                            format!(
                                "{}\n... ({} total matches)",
                                lines[..MAX_SEARCH_MATCH_LINES].join("\n"),
                                lines.len()
                            )
                        } else {
                            trimmed.to_string()
                        }
                    }
                    Ok(Err(e)) => format!("Error: {e}"),
                    Err(_) => "Error: Search timed out".to_string(),
                }
            })
        }
    }

    pub struct RunCommand {
        working_dir: PathBuf,
    }
    impl RunCommand {
        pub fn new(working_dir: &Path) -> Self {
            Self {
                working_dir: working_dir.to_path_buf(),
            }
        }
    }
    impl ToolDyn for RunCommand {
        fn name(&self) -> &str {
            "run_command"
        }
        fn description(&self) -> &str {
            "Execute a shell command and return stdout/stderr. Use for running tests, \
             installing packages, git operations, etc."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "Shell command to execute"},
                    "timeout": {"type": "integer", "description": "Timeout in seconds (default: 30)"},
                },
                "required": ["command"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                let Some(command) = get_str(&arguments, "command") else {
                    return "Error: missing required argument 'command'".to_string();
                };
                let requested_timeout = arguments
                    .get("timeout")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_RUN_COMMAND_TIMEOUT_SECS);
                let timeout_secs = requested_timeout.min(RUN_COMMAND_HARD_CAP_SECS);

                let mut cmd = tokio::process::Command::new("sh");
                cmd.arg("-c")
                    .arg(command)
                    .current_dir(&self.working_dir)
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());

                let output =
                    tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await;

                match output {
                    Ok(Ok(out)) => {
                        let mut rendered = String::new();
                        let stdout = String::from_utf8_lossy(&out.stdout);
                        let stderr = String::from_utf8_lossy(&out.stderr);
                        if !stdout.is_empty() {
                            rendered.push_str(&stdout);
                        }
                        if !stderr.is_empty() {
                            if !rendered.is_empty() {
                                rendered.push('\n');
                            }
                            rendered.push_str(&stderr);
                        }
                        if !out.status.success() {
                            rendered.push_str(&format!(
                                "\n(exit code: {})",
                                out.status.code().unwrap_or(-1)
                            ));
                        }
                        let trimmed = rendered.trim();
                        if trimmed.is_empty() {
                            "(no output)".to_string()
                        } else {
                            trimmed.to_string()
                        }
                    }
                    Ok(Err(e)) => format!("Error: {e}"),
                    Err(_) => format!("Error: Command timed out after {timeout_secs}s"),
                }
            })
        }
    }

    pub struct TaskComplete;
    impl ToolDyn for TaskComplete {
        fn name(&self) -> &str {
            "task_complete"
        }
        fn description(&self) -> &str {
            "Signal that the task is finished. Call this when you have completed the user's request."
        }
        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string", "description": "Brief summary of what was accomplished"},
                },
                "required": ["summary"],
            })
        }
        fn call(&self, arguments: Value) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
            Box::pin(async move {
                get_str(&arguments, "summary")
                    .unwrap_or("")
                    .to_string()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let write_result = registry
            .execute("write_file", json!({"path": "a.txt", "content": "hello"}))
            .await
            .unwrap();
        assert_eq!(write_result, "Wrote 5 chars to a.txt");

        let read_result = registry
            .execute("read_file", json!({"path": "a.txt"}))
            .await
            .unwrap();
        assert_eq!(read_result, "hello");
    }

    #[tokio::test]
    async fn read_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry
            .execute("read_file", json!({"path": "missing.txt"}))
            .await
            .unwrap();
        assert!(result.starts_with("Error:"));
    }

    #[tokio::test]
    async fn edit_file_requires_unique_match() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        registry
            .execute(
                "write_file",
                json!({"path": "a.txt", "content": "foo foo bar"}),
            )
            .await
            .unwrap();

        let ambiguous = registry
            .execute(
                "edit_file",
                json!({"path": "a.txt", "old_string": "foo", "new_string": "baz"}),
            )
            .await
            .unwrap();
        assert!(ambiguous.contains("found 2 times"));

        let unique = registry
            .execute(
                "edit_file",
                json!({"path": "a.txt", "old_string": "bar", "new_string": "baz"}),
            )
            .await
            .unwrap();
        assert_eq!(unique, "Edited a.txt: replaced 1 occurrence");
    }

    #[tokio::test]
    async fn edit_file_reports_zero_matches() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        registry
            .execute("write_file", json!({"path": "a.txt", "content": "hello"}))
            .await
            .unwrap();
        let result = registry
            .execute(
                "edit_file",
                json!({"path": "a.txt", "old_string": "nope", "new_string": "x"}),
            )
            .await
            .unwrap();
        assert_eq!(result, "Error: old_string not found in file");
    }

    #[tokio::test]
    async fn run_command_reports_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry
            .execute("run_command", json!({"command": "true"}))
            .await
            .unwrap();
        assert_eq!(result, "(no output)");
    }

    #[tokio::test]
    async fn run_command_annotates_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry
            .execute("run_command", json!({"command": "exit 3"}))
            .await
            .unwrap();
        assert!(result.contains("(exit code: 3)"));
    }

    #[tokio::test]
    async fn list_files_appends_slash_to_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry
            .execute("list_files", json!({"path": "."}))
            .await
            .unwrap();
        assert!(result.contains("sub/"));
        assert!(result.contains("file.txt"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_registry_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let err = registry.execute("nonexistent", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn task_complete_echoes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry
            .execute("task_complete", json!({"summary": "done"}))
            .await
            .unwrap();
        assert_eq!(result, "done");
    }

    #[test]
    fn registry_exposes_all_seven_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        assert_eq!(registry.definitions().len(), 7);
        assert!(registry.has_task_complete());
    }
}
