use crate::error::CoreError;
use crate::models::{
    CommittedCompletion, CompletionCommit, CompletionOutcome, CompletionRecord, EndCondition,
    MonthDay, NewTaskData, Pattern, RecurrenceRule, RecurrenceType, RuleAdvance, Task, TaskStatus,
    WeekdaySet,
};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Sqlite, Transaction};
use std::time::Duration;
use uuid::Uuid;

/// Attempts at the completion transaction before a busy database is reported.
const COMMIT_ATTEMPTS: u32 = 5;

/// Storage shape of a rule. SQLite integers come back as `i64`.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RecurrenceRuleRow {
    pub task_id: Uuid,
    pub recurrence_type: RecurrenceType,
    pub frequency: RecurrenceType,
    pub interval: i64,
    pub weekdays: i64,
    pub month_day: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub end_after_count: Option<i64>,
    pub completed_count: i64,
    pub next_due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn corrupt(task_id: Uuid, what: &str) -> CoreError {
    CoreError::InvalidState(format!("Stored rule for task {} has an invalid {}", task_id, what))
}

fn to_u32(task_id: Uuid, value: i64, what: &str) -> Result<u32, CoreError> {
    u32::try_from(value).map_err(|_| corrupt(task_id, what))
}

impl TryFrom<RecurrenceRuleRow> for RecurrenceRule {
    type Error = CoreError;

    fn try_from(row: RecurrenceRuleRow) -> Result<Self, Self::Error> {
        let id = row.task_id;
        let pattern = match row.frequency {
            RecurrenceType::Daily => Pattern::Daily,
            RecurrenceType::Weekly => {
                let bits = u8::try_from(row.weekdays).map_err(|_| corrupt(id, "weekday set"))?;
                Pattern::Weekly {
                    weekdays: WeekdaySet::from_bits(bits).ok_or_else(|| corrupt(id, "weekday set"))?,
                }
            }
            RecurrenceType::Monthly => {
                let raw = row.month_day.ok_or_else(|| corrupt(id, "month day"))?;
                let raw = i32::try_from(raw).map_err(|_| corrupt(id, "month day"))?;
                Pattern::Monthly {
                    day: MonthDay::from_raw(raw).ok_or_else(|| corrupt(id, "month day"))?,
                }
            }
            RecurrenceType::Yearly => Pattern::Yearly,
            RecurrenceType::Custom => return Err(corrupt(id, "frequency")),
        };

        let end = match (row.end_date, row.end_after_count) {
            (Some(date), None) => EndCondition::OnDate(date),
            (None, Some(count)) => EndCondition::AfterCount(to_u32(id, count, "end count")?),
            (None, None) => EndCondition::Never,
            (Some(_), Some(_)) => return Err(corrupt(id, "end condition")),
        };

        Ok(RecurrenceRule {
            task_id: id,
            recurrence_type: row.recurrence_type,
            interval: to_u32(id, row.interval, "interval")?,
            pattern,
            end,
            completed_count: to_u32(id, row.completed_count, "completed count")?,
            next_due_date: row.next_due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn frequency_of(pattern: &Pattern) -> RecurrenceType {
    match pattern {
        Pattern::Daily => RecurrenceType::Daily,
        Pattern::Weekly { .. } => RecurrenceType::Weekly,
        Pattern::Monthly { .. } => RecurrenceType::Monthly,
        Pattern::Yearly => RecurrenceType::Yearly,
    }
}

#[async_trait]
impl super::RecurrenceRepository for SqliteRepository {
    async fn find_rule_by_task(&self, task_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError> {
        let row: Option<RecurrenceRuleRow> =
            sqlx::query_as("SELECT * FROM recurrence_rules WHERE task_id = $1")
                .bind(task_id)
                .fetch_optional(self.pool())
                .await?;
        row.map(RecurrenceRule::try_from).transpose()
    }

    async fn save_rule(&self, rule: &RecurrenceRule) -> Result<RecurrenceRule, CoreError> {
        let mut tx = self.pool().begin().await?;

        let task = Self::find_task_by_id_in_transaction(&mut tx, rule.task_id)
            .await?
            .ok_or_else(|| {
                CoreError::InvalidState(format!("Task {} no longer exists", rule.task_id))
            })?;
        if !task.status.is_open() {
            return Err(CoreError::InvalidState(format!(
                "Task '{}' is {}; only open tasks can recur",
                task.title, task.status
            )));
        }

        let row: RecurrenceRuleRow = sqlx::query_as(
            r#"INSERT INTO recurrence_rules (
                task_id, recurrence_type, frequency, interval, weekdays, month_day,
                end_date, end_after_count, completed_count, next_due_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT(task_id) DO UPDATE SET
                recurrence_type = excluded.recurrence_type,
                frequency = excluded.frequency,
                interval = excluded.interval,
                weekdays = excluded.weekdays,
                month_day = excluded.month_day,
                end_date = excluded.end_date,
                end_after_count = excluded.end_after_count,
                completed_count = excluded.completed_count,
                next_due_date = excluded.next_due_date,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(rule.task_id)
        .bind(rule.recurrence_type)
        .bind(frequency_of(&rule.pattern))
        .bind(i64::from(rule.interval))
        .bind(i64::from(rule.weekdays().bits()))
        .bind(rule.month_day().map(MonthDay::to_raw))
        .bind(rule.end_date())
        .bind(rule.end_after_count().map(i64::from))
        .bind(i64::from(rule.completed_count))
        .bind(rule.next_due_date)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        // The open instance is always due on the rule's anchor.
        sqlx::query(
            "UPDATE tasks SET is_recurring = 1, due_date = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(rule.next_due_date)
        .bind(rule.updated_at)
        .bind(rule.task_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        RecurrenceRule::try_from(row)
    }

    async fn delete_rule(&self, task_id: Uuid) -> Result<bool, CoreError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("DELETE FROM recurrence_rules WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE tasks SET is_recurring = 0, updated_at = $1 WHERE id = $2 AND is_recurring = 1")
            .bind(Utc::now())
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit_completion(
        &self,
        commit: CompletionCommit,
    ) -> Result<CommittedCompletion, CoreError> {
        let mut attempt = 1;
        loop {
            match self.try_commit_completion(&commit).await {
                Err(e) if e.is_busy() && attempt < COMMIT_ATTEMPTS => {
                    tracing::debug!(
                        task_id = %commit.task_id,
                        attempt,
                        "completion lost the write lock; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(20 * u64::from(attempt))).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn find_completion(&self, task_id: Uuid) -> Result<Option<CompletionRecord>, CoreError> {
        let record = sqlx::query_as(
            "SELECT task_id, completed_at, successor_id FROM completion_events WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(record)
    }
}

impl SqliteRepository {
    /// One attempt at the completion transaction. SQLite opens it deferred, so a
    /// concurrent writer can make the first write fail as busy; the caller retries.
    async fn try_commit_completion(
        &self,
        commit: &CompletionCommit,
    ) -> Result<CommittedCompletion, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task_id = commit.task_id;

        if let Some(record) = Self::find_completion_in_transaction(&mut tx, task_id).await? {
            let outcome = Self::recorded_outcome_in_transaction(&mut tx, &record).await?;
            return Ok(CommittedCompletion {
                outcome,
                replayed: true,
            });
        }

        let task = Self::find_task_by_id_in_transaction(&mut tx, task_id)
            .await?
            .ok_or_else(|| CoreError::InvalidState(format!("Task {} was deleted", task_id)))?;
        if !task.status.is_open() {
            return Err(CoreError::InvalidState(format!(
                "Task '{}' is {} and cannot be completed",
                task.title, task.status
            )));
        }

        // The rule leaves this instance either way.
        sqlx::query(
            r#"UPDATE tasks
            SET status = $1, completed_at = $2, is_recurring = 0, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(TaskStatus::Done)
        .bind(commit.completed_at)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        let (outcome, successor_id) = match &commit.advance {
            RuleAdvance::Advance { rule } => {
                let labels = Self::find_task_labels_in_transaction(&mut tx, task_id).await?;
                let successor = NewTaskData {
                    title: task.title.clone(),
                    description: task.description.clone(),
                    due_date: Some(rule.next_due_date),
                    priority: Some(task.priority),
                    project_name: None,
                    project_id: task.project_id,
                    section_id: task.section_id,
                    labels,
                    is_recurring: true,
                };
                let successor: Task = Self::add_task_in_transaction(&mut tx, successor).await?;

                let result = sqlx::query(
                    r#"UPDATE recurrence_rules
                    SET task_id = $1, completed_count = $2, next_due_date = $3, updated_at = $4
                    WHERE task_id = $5 AND completed_count = $6
                    "#,
                )
                .bind(successor.id)
                .bind(i64::from(rule.completed_count))
                .bind(rule.next_due_date)
                .bind(rule.updated_at)
                .bind(task_id)
                .bind(i64::from(commit.expected_count))
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(CoreError::InvalidState(format!(
                        "Recurrence rule for task {} changed during completion",
                        task_id
                    )));
                }

                let id = successor.id;
                (CompletionOutcome::Successor(successor), Some(id))
            }
            RuleAdvance::Exhaust => {
                let result = sqlx::query(
                    "DELETE FROM recurrence_rules WHERE task_id = $1 AND completed_count = $2",
                )
                .bind(task_id)
                .bind(i64::from(commit.expected_count))
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(CoreError::InvalidState(format!(
                        "Recurrence rule for task {} changed during completion",
                        task_id
                    )));
                }
                (CompletionOutcome::NoSuccessor, None)
            }
        };

        sqlx::query(
            "INSERT INTO completion_events (task_id, completed_at, successor_id) VALUES ($1, $2, $3)",
        )
        .bind(task_id)
        .bind(commit.completed_at)
        .bind(successor_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CommittedCompletion {
            outcome,
            replayed: false,
        })
    }

    async fn recorded_outcome_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        record: &CompletionRecord,
    ) -> Result<CompletionOutcome, CoreError> {
        match record.successor_id {
            None => Ok(CompletionOutcome::NoSuccessor),
            Some(successor_id) => Self::find_task_by_id_in_transaction(tx, successor_id)
                .await?
                .map(CompletionOutcome::Successor)
                .ok_or_else(|| {
                    CoreError::InvalidState(format!(
                        "Task {} was completed but its successor {} no longer exists",
                        record.task_id, successor_id
                    ))
                }),
        }
    }

    async fn find_completion_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: Uuid,
    ) -> Result<Option<CompletionRecord>, CoreError> {
        let record = sqlx::query_as(
            "SELECT task_id, completed_at, successor_id FROM completion_events WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(frequency: RecurrenceType) -> RecurrenceRuleRow {
        let day = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        RecurrenceRuleRow {
            task_id: Uuid::now_v7(),
            recurrence_type: frequency,
            frequency,
            interval: 1,
            weekdays: 0,
            month_day: None,
            end_date: None,
            end_after_count: None,
            completed_count: 0,
            next_due_date: day,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_decodes_monthly_last_day() {
        let mut monthly = row(RecurrenceType::Monthly);
        monthly.month_day = Some(-1);
        monthly.end_after_count = Some(3);
        let rule = RecurrenceRule::try_from(monthly).unwrap();
        assert_eq!(rule.pattern, Pattern::Monthly { day: MonthDay::Last });
        assert_eq!(rule.end, EndCondition::AfterCount(3));
    }

    #[test]
    fn test_row_rejects_corrupt_values() {
        let mut monthly = row(RecurrenceType::Monthly);
        monthly.month_day = None;
        assert!(matches!(
            RecurrenceRule::try_from(monthly),
            Err(CoreError::InvalidState(_))
        ));

        let mut weekly = row(RecurrenceType::Weekly);
        weekly.weekdays = 300;
        assert!(RecurrenceRule::try_from(weekly).is_err());

        assert!(RecurrenceRule::try_from(row(RecurrenceType::Custom)).is_err());
    }
}
