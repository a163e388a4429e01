//! # Cadence Core Library
//!
//! Recurring tasks for a personal task manager: rule validation and date
//! arithmetic, the scheduler that turns a completed instance into its
//! successor, and SQLite storage for tasks, projects and rules.
//!
//! ## Core Modules
//!
//! - [`recurrence`]: Pure rule evaluation (`validate`, `compute_next`, `describe`)
//! - [`scheduler`]: Attach, update, detach and complete recurring tasks
//! - [`repository`]: Data access layer with the Repository pattern
//! - [`calendar`]: Month/year arithmetic with end-of-month clamping
//! - [`clock`]: Injectable source of "today"
//! - [`models`]: Core data structures and transfer objects
//! - [`db`]: Database connection and migration management
//! - [`error`]: Error taxonomy shared by every layer
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadence_core::{
//!     clock::SystemClock,
//!     db,
//!     models::{NewTaskData, RuleSpec},
//!     repository::{SqliteRepository, TaskRepository},
//!     scheduler::RecurrenceScheduler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let repo = Arc::new(SqliteRepository::new(pool));
//!     let scheduler = RecurrenceScheduler::new(repo.clone(), Arc::new(SystemClock::utc()));
//!
//!     let task = repo
//!         .add_task(NewTaskData {
//!             title: "Water the plants".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let rule = scheduler
//!         .attach_recurrence(task.id, RuleSpec::weekly().on_weekdays(&[1, 4]))
//!         .await?;
//!     println!("{}", cadence_core::recurrence::RuleEvaluator::describe(&rule));
//!
//!     let outcome = scheduler.complete_recurring_task(task.id).await?;
//!     if let Some(next) = outcome.successor() {
//!         println!("next due {:?}", next.due_date);
//!     }
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod clock;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod repository;
pub mod scheduler;
