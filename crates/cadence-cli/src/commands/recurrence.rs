use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::EndCondition;
use cadence_core::recurrence::RuleEvaluator;
use cadence_core::repository::Repository;
use cadence_core::scheduler::RecurrenceScheduler;
use chrono::NaiveDate;
use owo_colors::OwoColorize;

use crate::cli::{
    RecurrenceCommand, RecurrencePreviewCommand, RecurrenceSubcommand, SetRecurrenceCommand,
    TaskIdCommand,
};
use crate::parser::rule_spec;
use crate::util::resolve_task_id;
use crate::views::table::display_preview;

pub async fn recurrence_command<R>(
    scheduler: &RecurrenceScheduler<R>,
    command: RecurrenceCommand,
    today: NaiveDate,
    preview_count: usize,
) -> Result<()>
where
    R: Repository + Send + Sync,
{
    match command.command {
        RecurrenceSubcommand::Set(cmd) => set_command(scheduler, cmd, today).await,
        RecurrenceSubcommand::Update(cmd) => update_command(scheduler, cmd, today).await,
        RecurrenceSubcommand::Clear(cmd) => clear_command(scheduler, cmd).await,
        RecurrenceSubcommand::Show(cmd) => show_command(scheduler, cmd).await,
        RecurrenceSubcommand::Preview(cmd) => {
            preview_command(scheduler, cmd, today, preview_count).await
        }
    }
}

async fn set_command<R>(
    scheduler: &RecurrenceScheduler<R>,
    command: SetRecurrenceCommand,
    today: NaiveDate,
) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let task_id = resolve_task_id(scheduler.repository(), &command.id).await?;
    let every = command
        .rule
        .every
        .ok_or_else(|| anyhow!("--every is required (daily, weekly, monthly, yearly or custom)"))?;
    let spec = rule_spec(&command.rule, every, today)?;

    let rule = scheduler.attach_recurrence(task_id, spec).await?;

    println!(
        "{} Task now repeats {}",
        "✓".green().bold(),
        RuleEvaluator::describe(&rule).cyan()
    );
    println!("  {} Next due: {}", "→".blue(), rule.next_due_date.to_string().cyan());
    Ok(())
}

async fn update_command<R>(
    scheduler: &RecurrenceScheduler<R>,
    command: SetRecurrenceCommand,
    today: NaiveDate,
) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let repo = scheduler.repository();
    let task_id = resolve_task_id(repo, &command.id).await?;

    // Without --every the rule keeps its current type.
    let every = match command.rule.every {
        Some(every) => every,
        None => {
            repo.find_rule_by_task(task_id)
                .await?
                .ok_or_else(|| {
                    CoreError::InvalidState(format!("Task {} has no recurrence to update", task_id))
                })?
                .recurrence_type
        }
    };
    let spec = rule_spec(&command.rule, every, today)?;

    let rule = scheduler.update_recurrence(task_id, spec).await?;

    println!(
        "{} Recurrence updated: {}",
        "✓".green().bold(),
        RuleEvaluator::describe(&rule).cyan()
    );
    println!("  {} Completed so far: {}", "→".blue(), rule.completed_count);
    Ok(())
}

async fn clear_command<R>(scheduler: &RecurrenceScheduler<R>, command: TaskIdCommand) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let task_id = resolve_task_id(scheduler.repository(), &command.id).await?;
    scheduler.detach_recurrence(task_id).await?;
    println!("Task no longer repeats.");
    Ok(())
}

async fn show_command<R>(scheduler: &RecurrenceScheduler<R>, command: TaskIdCommand) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let repo = scheduler.repository();
    let task_id = resolve_task_id(repo, &command.id).await?;
    let task = repo
        .find_task_by_id(task_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Task {}", task_id)))?;

    let Some(rule) = repo.find_rule_by_task(task_id).await? else {
        println!("'{}' does not repeat.", task.title);
        return Ok(());
    };

    println!("{}", "Recurrence".blue().bold());
    println!("Task: {} ({})", task.title.cyan(), task.id.to_string().yellow());
    println!("Type: {}", rule.recurrence_type);
    println!("Repeats: {}", RuleEvaluator::describe(&rule).green());
    println!("Next due: {}", rule.next_due_date);
    println!("Completed: {}", rule.completed_count);
    match rule.end {
        EndCondition::Never => println!("Ends: never"),
        EndCondition::OnDate(date) => println!("Ends: after {}", date),
        EndCondition::AfterCount(limit) => println!(
            "Ends: after {} completions ({} left)",
            limit,
            limit.saturating_sub(rule.completed_count)
        ),
    }
    Ok(())
}

async fn preview_command<R>(
    scheduler: &RecurrenceScheduler<R>,
    command: RecurrencePreviewCommand,
    today: NaiveDate,
    default_count: usize,
) -> Result<()>
where
    R: Repository + Send + Sync,
{
    let task_id = resolve_task_id(scheduler.repository(), &command.id).await?;
    let count = command.count.unwrap_or(default_count);
    let dates = scheduler.preview(task_id, count).await?;

    if dates.is_empty() {
        println!("No upcoming occurrences (the series ends with the open task)");
        return Ok(());
    }

    println!("{} (next {} occurrences)", "Preview".blue().bold(), dates.len());
    display_preview(&dates, today);
    Ok(())
}
