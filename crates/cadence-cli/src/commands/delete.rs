use anyhow::Result;
use cadence_core::error::CoreError;
use cadence_core::repository::Repository;
use dialoguer::Confirm;

use crate::cli::DeleteCommand;
use crate::util::resolve_task_id;

pub async fn delete_task(repo: &impl Repository, command: DeleteCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.id).await?;
    let task = repo
        .find_task_by_id(task_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Task with ID '{}'", task_id)))?;

    if !command.force {
        let prompt = if task.is_recurring {
            format!(
                "Delete recurring task '{}'? Its recurrence is removed too.",
                task.title
            )
        } else {
            format!("Are you sure you want to delete task '{}'?", task.title)
        };
        let confirmation = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    repo.delete_task(task_id).await?;
    println!("Deleted task: '{}'", task.title);
    Ok(())
}
