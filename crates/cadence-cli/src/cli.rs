use cadence_core::models::{RecurrenceType, TaskPriority, TaskStatus};
use clap::{Args, Parser, Subcommand};

/// A task manager with recurring tasks
#[derive(Parser, Debug)]
#[command(name = "cadence", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task
    Add(AddCommand),
    /// List tasks
    List(ListCommand),
    /// Mark a task as in progress
    Start(TaskIdCommand),
    /// Mark a task as done; a recurring task spawns its next instance
    Do(TaskIdCommand),
    /// Archive an open task, ending any recurrence it carries
    Archive(TaskIdCommand),
    /// Delete a task
    Delete(DeleteCommand),
    /// Edit a task
    Edit(EditCommand),
    /// Manage projects
    Project(ProjectCommand),
    /// Manage sections inside a project
    Section(SectionCommand),
    /// Manage task recurrence
    Recur(RecurrenceCommand),
}

/// Shape of a recurrence rule as typed on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Frequency: daily, weekly, monthly, yearly or custom
    #[arg(long)]
    pub every: Option<RecurrenceType>,
    /// Repeat every N periods
    #[arg(long)]
    pub interval: Option<u32>,
    /// Weekdays for weekly rules (e.g. "mon,wed,fri")
    #[arg(long)]
    pub on: Option<String>,
    /// Day of month for monthly rules (1-31 or "last")
    #[arg(long)]
    pub day: Option<String>,
    /// Last date an instance may fall on (YYYY-MM-DD, today, tomorrow)
    #[arg(long)]
    pub until: Option<String>,
    /// Stop after this many completions
    #[arg(long)]
    pub times: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// The description of the task
    #[arg(short, long)]
    pub description: Option<String>,
    /// The due date (YYYY-MM-DD, today, tomorrow)
    #[arg(long)]
    pub due: Option<String>,
    /// The project of the task
    #[arg(short, long)]
    pub project: Option<String>,
    /// Section within the project
    #[arg(short, long, requires = "project")]
    pub section: Option<String>,
    /// Labels to add to the task
    #[arg(short, long, num_args = 1..)]
    pub label: Vec<String>,
    /// The priority of the task
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    #[command(flatten)]
    pub rule: RuleArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID of the task to edit
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, conflicts_with = "due")]
    pub due_clear: bool,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub project: Option<String>,
    #[arg(long, conflicts_with = "project")]
    pub project_clear: bool,

    #[arg(long)]
    pub section: Option<String>,
    #[arg(long, conflicts_with = "section")]
    pub section_clear: bool,

    /// Add labels to the task
    #[arg(long, num_args = 1..)]
    pub add_label: Vec<String>,

    /// Remove labels from the task
    #[arg(long, num_args = 1..)]
    pub remove_label: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct TaskIdCommand {
    /// The ID (or unique ID prefix) of the task
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the task to delete
    pub id: String,
    /// Force deletion without confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Include done and archived tasks
    #[arg(short, long, conflicts_with = "status")]
    pub all: bool,
    /// Only tasks with these statuses
    #[arg(long, num_args = 1..)]
    pub status: Vec<TaskStatus>,
    #[arg(short, long)]
    pub project: Option<String>,
    #[arg(short, long)]
    pub label: Option<String>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Only recurring tasks
    #[arg(short, long)]
    pub recurring: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub command: ProjectSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectSubcommand {
    /// Add a new project
    Add(AddProjectCommand),
    /// List projects
    List,
    /// Delete a project
    Delete(DeleteProjectCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddProjectCommand {
    /// The name of the project
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteProjectCommand {
    /// The name of the project to delete
    pub name: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SectionCommand {
    #[command(subcommand)]
    pub command: SectionSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SectionSubcommand {
    /// Add a section to a project
    Add(AddSectionCommand),
    /// List the sections of a project
    List(ListSectionsCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddSectionCommand {
    /// The project that owns the section
    pub project: String,
    /// The name of the section
    pub name: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ListSectionsCommand {
    pub project: String,
}

/// Recurrence management commands
#[derive(Parser, Debug, Clone)]
pub struct RecurrenceCommand {
    #[command(subcommand)]
    pub command: RecurrenceSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecurrenceSubcommand {
    /// Make a task recur, replacing any existing rule
    Set(SetRecurrenceCommand),
    /// Change a task's rule, keeping its progress
    Update(SetRecurrenceCommand),
    /// Stop a task from recurring
    Clear(TaskIdCommand),
    /// Show a task's rule
    Show(TaskIdCommand),
    /// Show the next due dates of a task's rule
    Preview(RecurrencePreviewCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SetRecurrenceCommand {
    /// The ID of the task
    pub id: String,
    #[command(flatten)]
    pub rule: RuleArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurrencePreviewCommand {
    /// The ID of the task
    pub id: String,
    /// Number of occurrences to show
    #[arg(long, short)]
    pub count: Option<usize>,
}
