use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    CommittedCompletion, CompletionCommit, CompletionRecord, NewTaskData, Project, RecurrenceRule,
    RecurrenceType, Section, Task, TaskPriority, TaskStatus, UpdateTaskData,
};
use crate::query::TaskFilter;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// Domain modules
pub mod projects;
pub mod rules;
pub mod tasks;

// Row shape for task listings
#[derive(Debug, Clone, FromRow)]
pub struct TaskQueryResult {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub is_recurring: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub project_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub section_name: Option<String>,
    pub recurrence_type: Option<RecurrenceType>,
    pub labels: Option<String>,
}

/// Domain-specific trait for task operations
#[async_trait]
pub trait TaskRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError>;
    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;
    async fn find_tasks_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Task>, CoreError>;
    async fn find_task_labels(&self, id: Uuid) -> Result<Vec<String>, CoreError>;
    async fn find_tasks_with_details(&self, filter: &TaskFilter) -> Result<Vec<TaskQueryResult>, CoreError>;
    async fn update_task(&self, id: Uuid, data: UpdateTaskData) -> Result<Task, CoreError>;
    async fn start_task(&self, id: Uuid) -> Result<Task, CoreError>;
    /// Completes a one-off task. Recurring tasks complete through the scheduler.
    async fn complete_task(&self, id: Uuid) -> Result<Task, CoreError>;
    /// Archives an open task and ends any series it carries.
    async fn archive_task(&self, id: Uuid) -> Result<Task, CoreError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for project operations
#[async_trait]
pub trait ProjectRepository {
    async fn add_project(&self, name: String, description: Option<String>) -> Result<Project, CoreError>;
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>, CoreError>;
    async fn find_projects(&self) -> Result<Vec<Project>, CoreError>;
    async fn delete_project(&self, name: String) -> Result<(), CoreError>;
    async fn add_section(&self, project_name: &str, name: String) -> Result<Section, CoreError>;
    async fn find_sections(&self, project_name: &str) -> Result<Vec<Section>, CoreError>;
    async fn find_section_by_name(&self, project_name: &str, name: &str) -> Result<Option<Section>, CoreError>;
}

/// Persistence of recurrence rules and the atomic completion step.
#[async_trait]
pub trait RecurrenceRepository {
    async fn find_rule_by_task(&self, task_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError>;
    /// Inserts or replaces the rule and flags its task as recurring. A task
    /// without a due date takes the rule's anchor as its due date.
    async fn save_rule(&self, rule: &RecurrenceRule) -> Result<RecurrenceRule, CoreError>;
    /// Removes the rule and clears the recurring flag. Returns whether a rule existed.
    async fn delete_rule(&self, task_id: Uuid) -> Result<bool, CoreError>;
    /// Marks the task done, applies the rule change, inserts the successor and
    /// records the completion, all in one transaction. An instance that is
    /// already in the completion ledger yields its recorded outcome and writes nothing.
    async fn commit_completion(
        &self,
        commit: CompletionCommit,
    ) -> Result<CommittedCompletion, CoreError>;
    async fn find_completion(&self, task_id: Uuid) -> Result<Option<CompletionRecord>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository: TaskRepository + ProjectRepository + RecurrenceRepository {}

impl<T> Repository for T where T: TaskRepository + ProjectRepository + RecurrenceRepository {}

/// SQLite implementation of the repository pattern
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}
