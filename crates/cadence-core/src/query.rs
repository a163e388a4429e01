use crate::models::{TaskPriority, TaskStatus};

/// Conjunctive filter for task listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    pub project: Option<String>,
    pub label: Option<String>,
    pub priority: Option<TaskPriority>,
    pub recurring_only: bool,
}

impl TaskFilter {
    /// Open tasks only: what a to-do view shows by default.
    pub fn open() -> Self {
        Self {
            statuses: vec![TaskStatus::Todo, TaskStatus::InProgress],
            ..Default::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
