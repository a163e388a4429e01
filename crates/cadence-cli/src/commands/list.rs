use anyhow::Result;
use cadence_core::query::TaskFilter;
use cadence_core::repository::Repository;
use chrono::NaiveDate;

use crate::cli::ListCommand;
use crate::views::table::{display_tasks, ViewTask};

pub async fn list_tasks(repo: &impl Repository, command: ListCommand, today: NaiveDate) -> Result<()> {
    let base = if command.all {
        TaskFilter::default()
    } else if !command.status.is_empty() {
        TaskFilter {
            statuses: command.status,
            ..Default::default()
        }
    } else {
        TaskFilter::open()
    };
    let filter = TaskFilter {
        project: command.project,
        label: command.label,
        priority: command.priority,
        recurring_only: command.recurring,
        ..base
    };

    let tasks = repo.find_tasks_with_details(&filter).await?;

    let view_tasks: Vec<ViewTask> = tasks
        .into_iter()
        .map(|t| {
            let mut labels: Vec<String> = t
                .labels
                .map_or_else(Vec::new, |s| s.split(',').map(String::from).collect());
            labels.sort();
            ViewTask {
                id: t.id,
                title: t.title,
                status: t.status,
                priority: t.priority,
                due_date: t.due_date,
                project_name: t.project_name,
                section_name: t.section_name,
                labels,
                recurrence: t.recurrence_type,
            }
        })
        .collect();

    display_tasks(&view_tasks, today);

    Ok(())
}
