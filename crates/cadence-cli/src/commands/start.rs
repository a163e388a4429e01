use anyhow::Result;
use cadence_core::repository::Repository;

use crate::cli::TaskIdCommand;
use crate::util::resolve_task_id;

pub async fn start_task(repo: &impl Repository, command: TaskIdCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.id).await?;
    let task = repo.start_task(task_id).await?;
    println!("Started task: '{}'", task.title);
    Ok(())
}
