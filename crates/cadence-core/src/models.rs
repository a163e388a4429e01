use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A named column inside a project.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Archived,
}

impl TaskStatus {
    /// Open tasks can still be worked on, archived, or completed.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" | "doing" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "archived" => Ok(TaskStatus::Archived),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::None => write!(f, "none"),
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Local calendar date; recurrence works purely on dates.
    pub due_date: Option<NaiveDate>,
    /// True while a recurrence rule is attached to this task.
    pub is_recurring: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            title: "".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::None,
            due_date: None,
            is_recurring: false,
            completed_at: None,
            project_id: None,
            section_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
    pub project_name: Option<String>, // Kept for CLI convenience
    pub project_id: Option<Uuid>,     // Used internally for transactions
    pub section_id: Option<Uuid>,
    pub labels: Vec<String>,
    /// Only set by the scheduler when it spawns a successor instance.
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskData {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<TaskPriority>,
    pub project_name: Option<Option<String>>,
    pub section_id: Option<Option<Uuid>>,
    pub add_labels: Option<Vec<String>>,
    pub remove_labels: Option<Vec<String>>,
}

// ============================================================================
// Recurrence Models
// ============================================================================

/// The product-level classification of a rule. `Custom` is a label for
/// non-default combinations; evaluation only ever looks at [`Pattern`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceType::Daily => write!(f, "daily"),
            RecurrenceType::Weekly => write!(f, "weekly"),
            RecurrenceType::Monthly => write!(f, "monthly"),
            RecurrenceType::Yearly => write!(f, "yearly"),
            RecurrenceType::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence type: {0}")]
pub struct ParseRecurrenceTypeError(String);

impl FromStr for RecurrenceType {
    type Err = ParseRecurrenceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrenceType::Daily),
            "weekly" => Ok(RecurrenceType::Weekly),
            "monthly" => Ok(RecurrenceType::Monthly),
            "yearly" => Ok(RecurrenceType::Yearly),
            "custom" => Ok(RecurrenceType::Custom),
            _ => Err(ParseRecurrenceTypeError(s.to_string())),
        }
    }
}

pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Set of weekday indices (0 = Sunday .. 6 = Saturday) packed into a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Builds a set from indices, rejecting anything outside 0..=6.
    pub fn from_indices(indices: &[u8]) -> Option<Self> {
        indices.iter().try_fold(Self::EMPTY, |set, &idx| {
            (idx < 7).then(|| WeekdaySet(set.0 | (1 << idx)))
        })
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits < 0x80).then_some(WeekdaySet(bits))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(&self, index: u8) -> bool {
        index < 7 && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Indices in calendar order starting from Sunday.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..7).filter(move |idx| self.contains(*idx))
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|idx| WEEKDAY_NAMES[idx as usize]).collect();
        write!(f, "{}", names.join(", "))
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday: {0}")]
pub struct ParseWeekdayError(String);

/// Parses a comma separated list such as `mon,wed` or `1,3`.
impl FromStr for WeekdaySet {
    type Err = ParseWeekdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut indices = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let idx = match part.to_lowercase().as_str() {
                "sun" | "sunday" | "su" => 0,
                "mon" | "monday" | "mo" => 1,
                "tue" | "tuesday" | "tu" => 2,
                "wed" | "wednesday" | "we" => 3,
                "thu" | "thursday" | "th" => 4,
                "fri" | "friday" | "fr" => 5,
                "sat" | "saturday" | "sa" => 6,
                other => other
                    .parse::<u8>()
                    .map_err(|_| ParseWeekdayError(part.to_string()))?,
            };
            indices.push(idx);
        }
        WeekdaySet::from_indices(&indices).ok_or_else(|| ParseWeekdayError(s.to_string()))
    }
}

/// Day-of-month selector for monthly rules. Stored as 1..=31, or -1 for `Last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonthDay {
    Day(u8),
    Last,
}

impl MonthDay {
    pub const LAST_SENTINEL: i32 = -1;

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            Self::LAST_SENTINEL => Some(MonthDay::Last),
            1..=31 => Some(MonthDay::Day(raw as u8)),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            MonthDay::Day(day) => i32::from(day),
            MonthDay::Last => Self::LAST_SENTINEL,
        }
    }
}

/// What the evaluator actually computes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Daily,
    /// An empty set means "the anchor's own weekday".
    Weekly { weekdays: WeekdaySet },
    Monthly { day: MonthDay },
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndCondition {
    Never,
    OnDate(NaiveDate),
    AfterCount(u32),
}

/// A recurrence rule attached to exactly one open task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// The task instance currently carrying this rule.
    pub task_id: Uuid,
    pub recurrence_type: RecurrenceType,
    pub interval: u32,
    pub pattern: Pattern,
    pub end: EndCondition,
    pub completed_count: u32,
    /// Due date of the open instance; the anchor for the next computation.
    pub next_due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurrenceRule {
    pub fn weekdays(&self) -> WeekdaySet {
        match self.pattern {
            Pattern::Weekly { weekdays } => weekdays,
            _ => WeekdaySet::EMPTY,
        }
    }

    pub fn month_day(&self) -> Option<MonthDay> {
        match self.pattern {
            Pattern::Monthly { day } => Some(day),
            _ => None,
        }
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match self.end {
            EndCondition::OnDate(date) => Some(date),
            _ => None,
        }
    }

    pub fn end_after_count(&self) -> Option<u32> {
        match self.end {
            EndCondition::AfterCount(count) => Some(count),
            _ => None,
        }
    }
}

/// Unvalidated rule as submitted by the recurrence editor.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub recurrence_type: RecurrenceType,
    pub interval: u32,
    pub weekdays: Vec<u8>,
    /// 1..=31, or -1 for the last day of the month.
    pub month_day: Option<i32>,
    pub end_date: Option<NaiveDate>,
    pub end_after_count: Option<u32>,
}

impl RuleSpec {
    pub fn new(recurrence_type: RecurrenceType) -> Self {
        Self {
            recurrence_type,
            interval: 1,
            weekdays: Vec::new(),
            month_day: None,
            end_date: None,
            end_after_count: None,
        }
    }

    pub fn daily() -> Self {
        Self::new(RecurrenceType::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(RecurrenceType::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(RecurrenceType::Monthly)
    }

    pub fn yearly() -> Self {
        Self::new(RecurrenceType::Yearly)
    }

    pub fn custom() -> Self {
        Self::new(RecurrenceType::Custom)
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_weekdays(mut self, weekdays: &[u8]) -> Self {
        self.weekdays = weekdays.to_vec();
        self
    }

    pub fn on_month_day(mut self, day: i32) -> Self {
        self.month_day = Some(day);
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn times(mut self, count: u32) -> Self {
        self.end_after_count = Some(count);
        self
    }
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self::daily()
    }
}

/// Result of completing a recurring task.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// The rule advanced and this fresh instance now carries it.
    Successor(Task),
    /// The rule was exhausted; the series ended without error.
    NoSuccessor,
}

impl CompletionOutcome {
    pub fn successor(&self) -> Option<&Task> {
        match self {
            CompletionOutcome::Successor(task) => Some(task),
            CompletionOutcome::NoSuccessor => None,
        }
    }
}

/// How the rule changes when its task is completed.
#[derive(Debug, Clone)]
pub enum RuleAdvance {
    /// Move the rule (already advanced) onto a new successor task due on
    /// `rule.next_due_date`. The successor copies the completed task as it
    /// reads inside the commit.
    Advance { rule: RecurrenceRule },
    /// End of series: drop the rule.
    Exhaust,
}

/// Everything written for one completion, applied as a single transaction.
#[derive(Debug, Clone)]
pub struct CompletionCommit {
    pub task_id: Uuid,
    pub completed_at: DateTime<Utc>,
    /// Optimistic guard: the rule's `completed_count` observed when evaluating.
    pub expected_count: u32,
    pub advance: RuleAdvance,
}

/// What `commit_completion` did. `replayed` is set when the instance had
/// already been completed and the recorded outcome was returned unchanged.
#[derive(Debug, Clone)]
pub struct CommittedCompletion {
    pub outcome: CompletionOutcome,
    pub replayed: bool,
}

/// Idempotency record for a processed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CompletionRecord {
    pub task_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub successor_id: Option<Uuid>,
}

/// Notifications for callers that mirror task state (views, caches).
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    RuleAttached(RecurrenceRule),
    RuleUpdated(RecurrenceRule),
    RuleDetached { task_id: Uuid },
    SuccessorCreated { completed_task_id: Uuid, successor: Task },
    SeriesEnded { task_id: Uuid },
}
