use cadence_core::models::{Project, RecurrenceType, Section, TaskPriority, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use uuid::Uuid;

use crate::util::short_id;

#[derive(Debug, Clone)]
pub struct ViewTask {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub project_name: Option<String>,
    pub section_name: Option<String>,
    pub labels: Vec<String>,
    pub recurrence: Option<RecurrenceType>,
}

/// "today", "tomorrow", "in 3 days", "2 weeks ago".
pub fn relative_day(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        _ => (date - today).humanize(),
    }
}

pub fn display_tasks(tasks: &[ViewTask], today: NaiveDate) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Status", "Due Date", "Project", "Labels"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&task.id)));

        let mut display_title = String::new();
        if task.recurrence.is_some() {
            display_title.push('↻');
            display_title.push(' ');
        }
        display_title.push_str(&task.title);

        let mut title_cell = Cell::new(display_title);
        match task.status {
            TaskStatus::Done | TaskStatus::Archived => {
                title_cell = title_cell
                    .add_attribute(Attribute::CrossedOut)
                    .fg(Color::DarkGrey);
            }
            TaskStatus::Todo | TaskStatus::InProgress => {
                title_cell = match task.priority {
                    TaskPriority::High => title_cell.fg(Color::Red).add_attribute(Attribute::Bold),
                    TaskPriority::Medium => title_cell.fg(Color::Yellow),
                    TaskPriority::Low => title_cell.fg(Color::Green),
                    TaskPriority::None => title_cell,
                };
            }
        };
        row.add_cell(title_cell);

        let status_cell = Cell::new(task.status.to_string());
        let status_cell = match task.status {
            TaskStatus::Done => status_cell.fg(Color::Green),
            TaskStatus::Archived => status_cell.fg(Color::DarkGrey),
            TaskStatus::InProgress => status_cell.fg(Color::Cyan),
            TaskStatus::Todo => status_cell,
        };
        row.add_cell(status_cell);

        let due_date_cell = match task.due_date {
            Some(due_date) => {
                let due_text = format!("{} ({})", due_date, relative_day(due_date, today));
                if task.status.is_open() && due_date < today {
                    Cell::new(due_text).fg(Color::Red)
                } else if task.status.is_open() && due_date == today {
                    Cell::new(due_text).fg(Color::Yellow)
                } else {
                    Cell::new(due_text)
                }
            }
            None => Cell::new("None"),
        };
        row.add_cell(due_date_cell);

        let project = match (&task.project_name, &task.section_name) {
            (Some(project), Some(section)) => format!("{} / {}", project, section),
            (Some(project), None) => project.clone(),
            _ => "None".to_string(),
        };
        row.add_cell(Cell::new(project));
        row.add_cell(Cell::new(if task.labels.is_empty() {
            "None".to_string()
        } else {
            task.labels.join(", ")
        }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Description", "Created"]);

    for project in projects {
        let mut row = Row::new();
        row.add_cell(Cell::new(&project.name));
        row.add_cell(Cell::new(project.description.as_deref().unwrap_or("None")));
        row.add_cell(Cell::new(humanize_instant(project.created_at)));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_sections(project: &str, sections: &[Section]) {
    if sections.is_empty() {
        println!("No sections in project '{}'.", project);
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Section", "Created"]);
    for section in sections {
        table.add_row(vec![
            Cell::new(&section.name),
            Cell::new(humanize_instant(section.created_at)),
        ]);
    }

    println!("{table}");
}

pub fn display_preview(dates: &[NaiveDate], today: NaiveDate) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Weekday", "When"]);
    for (i, date) in dates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(date),
            Cell::new(date.format("%A")),
            Cell::new(relative_day(*date, today)),
        ]);
    }

    println!("{table}");
}

fn humanize_instant(at: DateTime<Utc>) -> String {
    at.humanize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_day() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 29).unwrap();
        assert_eq!(relative_day(today, today), "today");
        assert_eq!(relative_day(today.succ_opt().unwrap(), today), "tomorrow");
        assert_eq!(relative_day(today.pred_opt().unwrap(), today), "yesterday");
    }
}
