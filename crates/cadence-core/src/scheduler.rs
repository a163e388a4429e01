use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::models::{
    CompletionCommit, CompletionOutcome, Pattern, RecurrenceRule, RuleAdvance, RuleSpec,
    SchedulerEvent,
};
use crate::recurrence::{NextOccurrence, RuleEvaluator};
use crate::repository::Repository;

/// Lifecycle orchestration for recurring tasks.
///
/// The scheduler is the only writer of recurrence rules and the only place
/// successor tasks are created. Completion is serialized per scheduler and
/// committed as one transaction, so a completion event produces at most one
/// successor even when requests race or are replayed.
pub struct RecurrenceScheduler<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    events: Option<UnboundedSender<SchedulerEvent>>,
    completion_gate: Mutex<()>,
}

impl<R> RecurrenceScheduler<R>
where
    R: Repository + Send + Sync,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            events: None,
            completion_gate: Mutex::new(()),
        }
    }

    /// Publishes lifecycle changes on `events`. A dropped receiver is ignored.
    pub fn with_events(mut self, events: UnboundedSender<SchedulerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Attaches `spec` to an open task, replacing any rule it already carries.
    ///
    /// The anchor is the task's due date, or today when it has none; in the
    /// latter case the task becomes due today.
    #[tracing::instrument(skip(self, spec))]
    pub async fn attach_recurrence(
        &self,
        task_id: Uuid,
        spec: RuleSpec,
    ) -> Result<RecurrenceRule, CoreError> {
        let validated = RuleEvaluator::validate(&spec)?;

        let task = self
            .repository
            .find_task_by_id(task_id)
            .await?
            .ok_or_else(|| CoreError::InvalidState(format!("Task {} does not exist", task_id)))?;
        if !task.status.is_open() {
            return Err(CoreError::InvalidState(format!(
                "Task '{}' is {}; only open tasks can recur",
                task.title, task.status
            )));
        }

        let anchor = task.due_date.unwrap_or_else(|| self.clock.today());
        let rule = validated.into_rule(task_id, anchor, 0, self.clock.now());
        let saved = self.repository.save_rule(&rule).await?;

        tracing::info!(
            task_id = %task_id,
            rule = %RuleEvaluator::describe(&saved),
            anchor = %anchor,
            "recurrence attached"
        );
        self.emit(SchedulerEvent::RuleAttached(saved.clone()));
        Ok(saved)
    }

    /// Replaces the shape of an existing rule while keeping its progress:
    /// `completed_count` and the current anchor survive the edit.
    #[tracing::instrument(skip(self, spec))]
    pub async fn update_recurrence(
        &self,
        task_id: Uuid,
        spec: RuleSpec,
    ) -> Result<RecurrenceRule, CoreError> {
        let validated = RuleEvaluator::validate(&spec)?;

        let existing = self.repository.find_rule_by_task(task_id).await?.ok_or_else(|| {
            CoreError::InvalidState(format!("Task {} has no recurrence to update", task_id))
        })?;

        if let Some(limit) = spec.end_after_count {
            if limit < existing.completed_count {
                return Err(CoreError::Validation(format!(
                    "end-after count {} is below the {} completions already recorded",
                    limit, existing.completed_count
                )));
            }
        }

        let keep_day = validated.month_day.is_none();
        let mut rule = validated.into_rule(
            task_id,
            existing.next_due_date,
            existing.completed_count,
            self.clock.now(),
        );
        rule.created_at = existing.created_at;
        // A monthly rule without an explicit day keeps the day it was fixed to,
        // not whatever day a clamped anchor happens to fall on.
        if let (true, Pattern::Monthly { .. }, Some(day)) = (keep_day, rule.pattern, existing.month_day()) {
            rule.pattern = Pattern::Monthly { day };
        }

        let saved = self.repository.save_rule(&rule).await?;

        tracing::info!(task_id = %task_id, rule = %RuleEvaluator::describe(&saved), "recurrence updated");
        self.emit(SchedulerEvent::RuleUpdated(saved.clone()));
        Ok(saved)
    }

    /// Removes the rule from a task. Detaching a task with no rule is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn detach_recurrence(&self, task_id: Uuid) -> Result<(), CoreError> {
        if self.repository.delete_rule(task_id).await? {
            tracing::info!(task_id = %task_id, "recurrence detached");
            self.emit(SchedulerEvent::RuleDetached { task_id });
        } else {
            tracing::debug!(task_id = %task_id, "no recurrence to detach");
        }
        Ok(())
    }

    /// Marks a recurring task done and, unless the rule is exhausted, spawns
    /// the next instance carrying the rule forward.
    ///
    /// A repeated request for an instance that was already completed returns
    /// the recorded outcome instead of advancing the rule again, whether the
    /// first request went through this scheduler or another one on the same
    /// database.
    #[tracing::instrument(skip(self))]
    pub async fn complete_recurring_task(&self, task_id: Uuid) -> Result<CompletionOutcome, CoreError> {
        let _gate = self.completion_gate.lock().await;

        if let Some(outcome) = self.recorded_outcome(task_id).await? {
            tracing::warn!(task_id = %task_id, "completion replayed; returning recorded outcome");
            return Ok(outcome);
        }

        let task = self
            .repository
            .find_task_by_id(task_id)
            .await?
            .ok_or_else(|| CoreError::InvalidState(format!("Task {} was deleted", task_id)))?;
        let rule = self.repository.find_rule_by_task(task_id).await?;

        let rule = match rule {
            Some(rule) if task.status.is_open() => rule,
            _ => {
                // A completion committed elsewhere since the ledger check moves the
                // rule and closes the task; it also leaves its ledger row.
                if let Some(outcome) = self.recorded_outcome(task_id).await? {
                    tracing::warn!(task_id = %task_id, "completed concurrently; returning recorded outcome");
                    return Ok(outcome);
                }
                return Err(if task.status.is_open() {
                    CoreError::InvalidState(format!("Task '{}' has no recurrence rule", task.title))
                } else {
                    CoreError::InvalidState(format!(
                        "Task '{}' is {} and cannot be completed",
                        task.title, task.status
                    ))
                });
            }
        };

        let now = self.clock.now();
        let advance = match RuleEvaluator::compute_next(&rule, rule.next_due_date) {
            NextOccurrence::Occurrence(date) => RuleAdvance::Advance {
                rule: RecurrenceRule {
                    completed_count: rule.completed_count + 1,
                    next_due_date: date,
                    updated_at: now,
                    ..rule.clone()
                },
            },
            NextOccurrence::Exhausted => RuleAdvance::Exhaust,
        };

        let committed = self
            .repository
            .commit_completion(CompletionCommit {
                task_id,
                completed_at: now,
                expected_count: rule.completed_count,
                advance,
            })
            .await?;

        if committed.replayed {
            tracing::warn!(task_id = %task_id, "completed concurrently; returning recorded outcome");
            return Ok(committed.outcome);
        }

        match &committed.outcome {
            CompletionOutcome::Successor(successor) => {
                tracing::info!(
                    task_id = %task_id,
                    successor_id = %successor.id,
                    due_date = ?successor.due_date,
                    "successor created"
                );
                self.emit(SchedulerEvent::SuccessorCreated {
                    completed_task_id: task_id,
                    successor: successor.clone(),
                });
            }
            CompletionOutcome::NoSuccessor => {
                tracing::info!(task_id = %task_id, "recurrence exhausted; series ended");
                self.emit(SchedulerEvent::SeriesEnded { task_id });
            }
        }

        Ok(committed.outcome)
    }

    async fn recorded_outcome(&self, task_id: Uuid) -> Result<Option<CompletionOutcome>, CoreError> {
        let Some(record) = self.repository.find_completion(task_id).await? else {
            return Ok(None);
        };
        match record.successor_id {
            None => Ok(Some(CompletionOutcome::NoSuccessor)),
            Some(successor_id) => self
                .repository
                .find_task_by_id(successor_id)
                .await?
                .map(|successor| Some(CompletionOutcome::Successor(successor)))
                .ok_or_else(|| {
                    CoreError::InvalidState(format!(
                        "Task {} was completed but its successor {} no longer exists",
                        task_id, successor_id
                    ))
                }),
        }
    }

    /// Human-readable label for the rule a task carries, if any.
    pub async fn describe(&self, task_id: Uuid) -> Result<Option<String>, CoreError> {
        let rule = self.repository.find_rule_by_task(task_id).await?;
        Ok(rule.as_ref().map(RuleEvaluator::describe))
    }

    /// The next `count` due dates after the open instance.
    pub async fn preview(&self, task_id: Uuid, count: usize) -> Result<Vec<NaiveDate>, CoreError> {
        let rule = self.repository.find_rule_by_task(task_id).await?.ok_or_else(|| {
            CoreError::InvalidState(format!("Task {} has no recurrence rule", task_id))
        })?;
        Ok(RuleEvaluator::preview(&rule, count))
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                tracing::trace!("scheduler event receiver dropped");
            }
        }
    }
}
