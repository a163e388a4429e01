use anyhow::Result;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::TaskIdCommand;
use crate::util::resolve_task_id;

pub async fn archive_task(repo: &impl Repository, command: TaskIdCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.id).await?;
    let was_recurring = repo.find_rule_by_task(task_id).await?.is_some();

    let task = repo.archive_task(task_id).await?;
    println!("Archived task: '{}'", task.title);
    if was_recurring {
        println!("{}", "Its recurrence has ended.".bright_black());
    }
    Ok(())
}
