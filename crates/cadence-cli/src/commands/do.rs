use anyhow::Result;
use cadence_core::error::CoreError;
use cadence_core::models::CompletionOutcome;
use cadence_core::repository::Repository;
use cadence_core::scheduler::RecurrenceScheduler;
use owo_colors::OwoColorize;

use crate::cli::TaskIdCommand;
use crate::util::resolve_task_id;

pub async fn do_task<R>(scheduler: &RecurrenceScheduler<R>, command: TaskIdCommand) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let repo = scheduler.repository();
    let task_id = resolve_task_id(repo, &command.id).await?;
    let task = repo
        .find_task_by_id(task_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Task {}", task_id)))?;

    if !task.is_recurring {
        let completed = repo.complete_task(task_id).await?;
        println!("Completed task: '{}'", completed.title);
        return Ok(());
    }

    match scheduler.complete_recurring_task(task_id).await? {
        CompletionOutcome::Successor(next) => {
            println!("Completed task: '{}'", task.title);
            match next.due_date {
                Some(due_date) => println!(
                    "Next '{}' is due {} ({})",
                    next.title,
                    due_date.to_string().cyan(),
                    next.id.to_string().yellow()
                ),
                None => println!("Created next '{}' ({})", next.title, next.id),
            }
        }
        CompletionOutcome::NoSuccessor => {
            println!("Completed task: '{}'", task.title);
            println!("{}", "That was the last one; the series has ended.".bright_black());
        }
    }

    Ok(())
}
