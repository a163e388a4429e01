use anyhow::Result;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::{ProjectCommand, ProjectSubcommand};
use crate::views::table::display_projects;

pub async fn project_command(repo: &impl Repository, command: ProjectCommand) -> Result<()> {
    match command.command {
        ProjectSubcommand::Add(add) => {
            let project = repo.add_project(add.name, add.description).await?;
            println!("{} Created project: {}", "✓".green().bold(), project.name.bold());
        }
        ProjectSubcommand::List => {
            let projects = repo.find_projects().await?;
            display_projects(&projects);
        }
        ProjectSubcommand::Delete(delete) => {
            repo.delete_project(delete.name.clone()).await?;
            println!("Deleted project: '{}'", delete.name);
        }
    }
    Ok(())
}
