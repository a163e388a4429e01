use crate::error::CoreError;
use crate::models::{NewTaskData, Project, Section, Task, TaskPriority, TaskStatus, UpdateTaskData};
use crate::query::TaskFilter;
use crate::repository::{SqliteRepository, TaskQueryResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = Self::add_task_in_transaction(&mut tx, data).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn find_tasks_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Task>, CoreError> {
        // Ids are stored as 16-byte blobs; match against their hex form.
        let mut pattern = String::with_capacity(short_id.len() + 1);
        pattern.extend(short_id.chars().filter(|c| *c != '-').map(|c| c.to_ascii_lowercase()));
        pattern.push('%');

        let tasks: Vec<Task> = sqlx::query_as("SELECT * FROM tasks WHERE lower(hex(id)) LIKE $1")
            .bind(pattern)
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }

    async fn find_task_labels(&self, id: Uuid) -> Result<Vec<String>, CoreError> {
        let labels = sqlx::query_scalar(
            "SELECT label_name FROM task_labels WHERE task_id = $1 ORDER BY label_name",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        Ok(labels)
    }

    async fn find_tasks_with_details(&self, filter: &TaskFilter) -> Result<Vec<TaskQueryResult>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"SELECT
                t.id, t.title, t.description, t.status, t.priority, t.due_date, t.is_recurring,
                t.completed_at, t.created_at, t.project_id, t.section_id,
                p.name AS project_name,
                s.name AS section_name,
                r.recurrence_type AS recurrence_type,
                GROUP_CONCAT(tl.label_name) AS labels
            FROM tasks t
            LEFT JOIN projects p ON t.project_id = p.id
            LEFT JOIN sections s ON t.section_id = s.id
            LEFT JOIN recurrence_rules r ON r.task_id = t.id
            LEFT JOIN task_labels tl ON tl.task_id = t.id
            WHERE 1 = 1"#,
        );

        if !filter.statuses.is_empty() {
            qb.push(" AND t.status IN (");
            let mut separated = qb.separated(", ");
            for status in &filter.statuses {
                separated.push_bind(*status);
            }
            separated.push_unseparated(")");
        }
        if let Some(project) = &filter.project {
            qb.push(" AND p.name = ");
            qb.push_bind(project.clone());
        }
        if let Some(label) = &filter.label {
            qb.push(" AND t.id IN (SELECT task_id FROM task_labels WHERE label_name = ");
            qb.push_bind(label.clone());
            qb.push(")");
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND t.priority = ");
            qb.push_bind(priority);
        }
        if filter.recurring_only {
            qb.push(" AND t.is_recurring = 1");
        }

        qb.push(" GROUP BY t.id");
        qb.push(" ORDER BY t.due_date IS NULL, t.due_date, t.created_at");

        let tasks = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTaskData) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;

        let current = Self::find_task_by_id_in_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if current.is_recurring {
            match data.due_date {
                Some(None) => {
                    return Err(CoreError::InvalidInput(
                        "A recurring task needs a due date. Remove the recurrence first.".to_string(),
                    ))
                }
                // Moving the open instance moves the anchor of its rule.
                Some(Some(due_date)) => {
                    sqlx::query(
                        "UPDATE recurrence_rules SET next_due_date = $1, updated_at = $2 WHERE task_id = $3",
                    )
                    .bind(due_date)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {}
            }
        }

        Self::update_task_fields(&mut tx, &current, &data).await?;

        let updated_task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated_task)
    }

    async fn start_task(&self, id: Uuid) -> Result<Task, CoreError> {
        let task: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(TaskStatus::InProgress)
        .bind(Utc::now())
        .bind(id)
        .bind(TaskStatus::Todo)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| CoreError::InvalidState(format!("Task {} is missing or not in todo", id)))?;
        Ok(task)
    }

    async fn complete_task(&self, id: Uuid) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;

        let task = Self::find_task_by_id_in_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if task.is_recurring {
            return Err(CoreError::InvalidState(format!(
                "Task '{}' is recurring and must be completed through the scheduler",
                task.title
            )));
        }
        if !task.status.is_open() {
            return Err(CoreError::InvalidState(format!(
                "Task '{}' is already {}",
                task.title, task.status
            )));
        }

        let now = Utc::now();
        let completed_task: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET status = $1, completed_at = $2, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(TaskStatus::Done)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(completed_task)
    }

    async fn archive_task(&self, id: Uuid) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;

        let task = Self::find_task_by_id_in_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if !task.status.is_open() {
            return Err(CoreError::InvalidState(format!(
                "Only open tasks can be archived; '{}' is {}",
                task.title, task.status
            )));
        }

        // Archiving ends the series without spawning a successor.
        sqlx::query("DELETE FROM recurrence_rules WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let archived: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET status = $1, is_recurring = 0, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(TaskStatus::Archived)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(archived)
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl SqliteRepository {
    /// Add a task within an existing transaction
    pub(crate) async fn add_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        mut data: NewTaskData,
    ) -> Result<Task, CoreError> {
        if data.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Task title cannot be empty.".to_string()));
        }

        if data.project_id.is_none() {
            if let Some(project_name) = &data.project_name {
                let project: Option<Project> =
                    sqlx::query_as("SELECT * FROM projects WHERE name = $1")
                        .bind(project_name)
                        .fetch_optional(&mut **tx)
                        .await?;
                data.project_id = Some(
                    project
                        .map(|p| p.id)
                        .ok_or_else(|| CoreError::NotFound(project_name.clone()))?,
                );
            }
        }

        if let Some(section_id) = data.section_id {
            let section: Section = sqlx::query_as("SELECT * FROM sections WHERE id = $1")
                .bind(section_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Section {}", section_id)))?;
            match data.project_id {
                Some(project_id) if project_id != section.project_id => {
                    return Err(CoreError::InvalidInput(format!(
                        "Section '{}' belongs to a different project",
                        section.name
                    )));
                }
                _ => data.project_id = Some(section.project_id),
            }
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::now_v7(),
            title: data.title,
            description: data.description,
            status: TaskStatus::Todo,
            priority: data.priority.unwrap_or(TaskPriority::None),
            due_date: data.due_date,
            is_recurring: data.is_recurring,
            completed_at: None,
            project_id: data.project_id,
            section_id: data.section_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO tasks (id, title, description, status, priority, due_date, is_recurring, completed_at, project_id, section_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.is_recurring)
        .bind(task.completed_at)
        .bind(task.project_id)
        .bind(task.section_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut **tx)
        .await?;

        Self::insert_labels(tx, task.id, &data.labels).await?;

        Ok(task)
    }

    /// Find a task by ID within an existing transaction
    pub(crate) async fn find_task_by_id_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: Uuid,
    ) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(task)
    }

    pub(crate) async fn find_task_labels_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: Uuid,
    ) -> Result<Vec<String>, CoreError> {
        let labels = sqlx::query_scalar(
            "SELECT label_name FROM task_labels WHERE task_id = $1 ORDER BY label_name",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(labels)
    }

    async fn insert_labels<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: Uuid,
        labels: &[String],
    ) -> Result<(), CoreError> {
        if labels.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT OR IGNORE INTO task_labels (task_id, label_name) ");
        query_builder.push_values(labels.iter(), |mut b, label| {
            b.push_bind(task_id).push_bind(label);
        });
        query_builder.build().execute(&mut **tx).await?;
        Ok(())
    }

    /// Update task fields within an existing transaction
    pub(crate) async fn update_task_fields<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        current: &Task,
        data: &UpdateTaskData,
    ) -> Result<(), CoreError> {
        let id = current.id;
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(title) = &data.title {
            if title.trim().is_empty() {
                return Err(CoreError::InvalidInput("Task title cannot be empty.".to_string()));
            }
            qb.push(", title = ");
            qb.push_bind(title.clone());
        }

        if let Some(description) = &data.description {
            qb.push(", description = ");
            qb.push_bind(description.clone());
        }

        if let Some(due_date) = &data.due_date {
            qb.push(", due_date = ");
            qb.push_bind(*due_date);
        }

        if let Some(priority) = &data.priority {
            qb.push(", priority = ");
            qb.push_bind(*priority);
        }

        let mut project_id = match &data.project_name {
            Some(Some(project_name)) => {
                let project: Option<Project> =
                    sqlx::query_as("SELECT * FROM projects WHERE name = $1")
                        .bind(project_name.clone())
                        .fetch_optional(&mut **tx)
                        .await?;
                Some(
                    project
                        .map(|p| p.id)
                        .ok_or_else(|| CoreError::NotFound(project_name.clone()))?,
                )
            }
            Some(None) => None,
            None => current.project_id,
        };

        // Same rule as on insert: a section pins the task to its own project.
        let mut section_id = data.section_id.unwrap_or(current.section_id);
        if let Some(wanted) = section_id {
            let section: Section = sqlx::query_as("SELECT * FROM sections WHERE id = $1")
                .bind(wanted)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Section {}", wanted)))?;
            match project_id {
                Some(project) if project != section.project_id => {
                    if data.section_id.is_some() {
                        return Err(CoreError::InvalidInput(format!(
                            "Section '{}' belongs to a different project",
                            section.name
                        )));
                    }
                    // The task moved projects and leaves its old section behind.
                    section_id = None;
                }
                Some(_) => {}
                None if data.project_name.is_some() && data.section_id.is_none() => {
                    section_id = None;
                }
                None => project_id = Some(section.project_id),
            }
        }

        qb.push(", project_id = ");
        qb.push_bind(project_id);
        qb.push(", section_id = ");
        qb.push_bind(section_id);

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut **tx).await?;

        if let Some(labels_to_add) = &data.add_labels {
            Self::insert_labels(tx, id, labels_to_add).await?;
        }

        if let Some(labels_to_remove) = &data.remove_labels {
            if !labels_to_remove.is_empty() {
                let mut query_builder: QueryBuilder<Sqlite> =
                    QueryBuilder::new("DELETE FROM task_labels WHERE task_id = ");
                query_builder.push_bind(id);
                query_builder.push(" AND label_name IN (");
                let mut separated = query_builder.separated(", ");
                for label in labels_to_remove.iter() {
                    separated.push_bind(label.clone());
                }
                separated.push_unseparated(")");
                query_builder.build().execute(&mut **tx).await?;
            }
        }

        Ok(())
    }
}
