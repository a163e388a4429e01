use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::NewTaskData;
use cadence_core::recurrence::RuleEvaluator;
use cadence_core::repository::Repository;
use cadence_core::scheduler::RecurrenceScheduler;
use chrono::NaiveDate;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::parser::{parse_date, rule_spec};

pub async fn add_task<R>(
    scheduler: &RecurrenceScheduler<R>,
    command: AddCommand,
    today: NaiveDate,
) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let repo = scheduler.repository();
    let due_date = command
        .due
        .as_deref()
        .map(|d| parse_date(d, today))
        .transpose()?;

    // Validate the rule before anything is written.
    let spec = match command.rule.every {
        Some(every) => {
            let spec = rule_spec(&command.rule, every, today)?;
            RuleEvaluator::validate(&spec)?;
            Some(spec)
        }
        None if command.rule.interval.is_some()
            || command.rule.on.is_some()
            || command.rule.day.is_some()
            || command.rule.until.is_some()
            || command.rule.times.is_some() =>
        {
            return Err(anyhow!("Recurrence options need --every"));
        }
        None => None,
    };

    let section_id = match (&command.project, &command.section) {
        (Some(project), Some(section)) => Some(
            repo.find_section_by_name(project, section)
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!(
                        "Section '{}' in project '{}'",
                        section, project
                    ))
                })?
                .id,
        ),
        _ => None,
    };

    let new_task_data = NewTaskData {
        title: command.title,
        description: command.description,
        due_date,
        priority: command.priority,
        project_name: command.project,
        project_id: None,
        section_id,
        labels: command.label,
        is_recurring: false,
    };

    let added_task = repo.add_task(new_task_data).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    println!(
        "{} Created task: {}",
        "✓".style(success_style),
        added_task.title.bright_white().bold()
    );
    println!(
        "  {} Task ID: {}",
        "→".style(info_style),
        added_task.id.to_string().yellow()
    );

    if let Some(spec) = spec {
        let rule = scheduler.attach_recurrence(added_task.id, spec).await?;
        println!(
            "  {} Repeats {}",
            "→".style(info_style),
            RuleEvaluator::describe(&rule).cyan()
        );
        println!(
            "  {} Due: {}",
            "→".style(info_style),
            rule.next_due_date.to_string().cyan()
        );
    } else if let Some(due_date) = added_task.due_date {
        println!("  {} Due: {}", "→".style(info_style), due_date.to_string().cyan());
    }

    Ok(())
}
