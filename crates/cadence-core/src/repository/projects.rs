use crate::error::CoreError;
use crate::models::{Project, Section};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
impl super::ProjectRepository for SqliteRepository {
    async fn add_project(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Project, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Project name cannot be empty.".to_string()));
        }
        if self.find_project_by_name(&name).await?.is_some() {
            return Err(CoreError::InvalidInput(format!("Project '{}' already exists", name)));
        }

        let project = sqlx::query_as(
            r#"INSERT INTO projects (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(project)
    }

    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>, CoreError> {
        let project = sqlx::query_as("SELECT * FROM projects WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        Ok(project)
    }

    async fn find_projects(&self) -> Result<Vec<Project>, CoreError> {
        let projects =
            sqlx::query_as("SELECT id, name, description, created_at FROM projects ORDER BY name")
                .fetch_all(self.pool())
                .await?;
        Ok(projects)
    }

    async fn delete_project(&self, name: String) -> Result<(), CoreError> {
        let project = self
            .find_project_by_name(&name)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Project '{}'", name)))?;

        let task_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
            .bind(project.id)
            .fetch_one(self.pool())
            .await?;

        if task_count.0 > 0 {
            return Err(CoreError::InvalidInput(format!(
                "Cannot delete project '{}' because it has {} associated task(s). Delete or move the tasks first.",
                name, task_count.0
            )));
        }

        // Sections go with the project through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project.id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Project '{}'", name)));
        }
        Ok(())
    }

    async fn add_section(&self, project_name: &str, name: String) -> Result<Section, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Section name cannot be empty.".to_string()));
        }
        let project = self
            .find_project_by_name(project_name)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Project '{}'", project_name)))?;

        if self.find_section_by_name(project_name, &name).await?.is_some() {
            return Err(CoreError::InvalidInput(format!(
                "Section '{}' already exists in project '{}'",
                name, project_name
            )));
        }

        let section = sqlx::query_as(
            r#"INSERT INTO sections (id, project_id, name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, project_id, name, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(project.id)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(section)
    }

    async fn find_sections(&self, project_name: &str) -> Result<Vec<Section>, CoreError> {
        let sections = sqlx::query_as(
            r#"SELECT s.id, s.project_id, s.name, s.created_at
            FROM sections s
            JOIN projects p ON s.project_id = p.id
            WHERE p.name = $1
            ORDER BY s.created_at
            "#,
        )
        .bind(project_name)
        .fetch_all(self.pool())
        .await?;
        Ok(sections)
    }

    async fn find_section_by_name(
        &self,
        project_name: &str,
        name: &str,
    ) -> Result<Option<Section>, CoreError> {
        let section = sqlx::query_as(
            r#"SELECT s.id, s.project_id, s.name, s.created_at
            FROM sections s
            JOIN projects p ON s.project_id = p.id
            WHERE p.name = $1 AND s.name = $2
            "#,
        )
        .bind(project_name)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(section)
    }
}
