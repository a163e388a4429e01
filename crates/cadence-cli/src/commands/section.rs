use anyhow::Result;
use cadence_core::error::CoreError;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::{SectionCommand, SectionSubcommand};
use crate::views::table::display_sections;

pub async fn section_command(repo: &impl Repository, command: SectionCommand) -> Result<()> {
    match command.command {
        SectionSubcommand::Add(add) => {
            let section = repo.add_section(&add.project, add.name).await?;
            println!(
                "{} Created section: {} in {}",
                "✓".green().bold(),
                section.name.bold(),
                add.project
            );
        }
        SectionSubcommand::List(list) => {
            if repo.find_project_by_name(&list.project).await?.is_none() {
                return Err(CoreError::NotFound(format!("Project '{}'", list.project)).into());
            }
            let sections = repo.find_sections(&list.project).await?;
            display_sections(&list.project, &sections);
        }
    }
    Ok(())
}
