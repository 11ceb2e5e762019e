//! Task plan entries: the checkbox lines in `.gastown/brain/task.md`.

use serde::{Deserialize, Serialize};

/// The checkbox state of one task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// `[ ]` — not yet started.
    Pending,
    /// `[/]` — currently dispatched to a worker.
    Running,
    /// `[x]` or `[X]` — done.
    Done,
}

impl TaskStatus {
    /// Parse the single character between the checkbox brackets.
    pub fn from_marker_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(TaskStatus::Pending),
            '/' => Some(TaskStatus::Running),
            'x' | 'X' => Some(TaskStatus::Done),
            _ => None,
        }
    }

    /// Render back to the single character used in the markdown checkbox.
    pub fn to_marker_char(self) -> char {
        match self {
            TaskStatus::Pending => ' ',
            TaskStatus::Running => '/',
            TaskStatus::Done => 'x',
        }
    }
}

/// One parsed line from the task plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlanEntry {
    /// The exact source line this entry was parsed from, preserved so
    /// rewrites can reproduce indentation and list-marker style byte for
    /// byte when the status doesn't change.
    pub original_line_text: String,
    /// Current checkbox state.
    pub status: TaskStatus,
    /// Task description text, with the list/checkbox prefix stripped.
    pub display_text: String,
}

impl TaskPlanEntry {
    /// Whether this entry is still actionable (not yet done).
    pub fn is_pending(&self) -> bool {
        matches!(self.status, TaskStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trips_through_char() {
        for s in [TaskStatus::Pending, TaskStatus::Running, TaskStatus::Done] {
            assert_eq!(TaskStatus::from_marker_char(s.to_marker_char()), Some(s));
        }
    }

    #[test]
    fn uppercase_x_counts_as_done() {
        assert_eq!(TaskStatus::from_marker_char('X'), Some(TaskStatus::Done));
    }
}
