use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::UpdateTaskData;
use cadence_core::repository::Repository;
use chrono::NaiveDate;
use owo_colors::OwoColorize;

use crate::cli::EditCommand;
use crate::parser::parse_date;
use crate::util::resolve_task_id;

pub async fn edit_task(repo: &impl Repository, command: EditCommand, today: NaiveDate) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.id).await?;
    let task = repo
        .find_task_by_id(task_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Task {}", task_id)))?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.map(Some)
    };

    let due_date = if command.due_clear {
        Some(None)
    } else {
        command
            .due
            .as_deref()
            .map(|d| parse_date(d, today))
            .transpose()?
            .map(Some)
    };

    let project_name = if command.project_clear {
        Some(None)
    } else {
        command.project.clone().map(Some)
    };

    let section_id = if command.section_clear {
        Some(None)
    } else if let Some(section_name) = &command.section {
        let owning_project = match &command.project {
            Some(project) => project.clone(),
            None => repo
                .find_projects()
                .await?
                .into_iter()
                .find(|p| Some(p.id) == task.project_id)
                .map(|p| p.name)
                .ok_or_else(|| anyhow!("Task has no project; pass --project with --section"))?,
        };
        let section = repo
            .find_section_by_name(&owning_project, section_name)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "Section '{}' in project '{}'",
                    section_name, owning_project
                ))
            })?;
        Some(Some(section.id))
    } else if project_name.is_some() {
        // Sections do not travel between projects.
        Some(None)
    } else {
        None
    };

    let update_data = UpdateTaskData {
        title: command.title,
        description,
        due_date,
        priority: command.priority,
        project_name,
        section_id,
        add_labels: (!command.add_label.is_empty()).then_some(command.add_label),
        remove_labels: (!command.remove_label.is_empty()).then_some(command.remove_label),
    };

    let updated = repo.update_task(task_id, update_data).await?;

    println!("{} Updated task: {}", "✓".green().bold(), updated.title.bright_white().bold());
    if updated.is_recurring && updated.due_date != task.due_date {
        if let Some(due_date) = updated.due_date {
            println!(
                "  {} Recurrence now counts from {}",
                "→".blue(),
                due_date.to_string().cyan()
            );
        }
    }
    Ok(())
}
