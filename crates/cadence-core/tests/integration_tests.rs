use cadence_core::db::establish_connection;
use cadence_core::error::CoreError;
use cadence_core::models::*;
use cadence_core::query::TaskFilter;
use cadence_core::repository::{
    ProjectRepository, RecurrenceRepository, SqliteRepository, TaskRepository,
};
use chrono::NaiveDate;
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    (SqliteRepository::new(pool), temp_dir)
}

/// Helper function to create a test project
async fn create_test_project(repo: &SqliteRepository, name: &str) -> Project {
    repo.add_project(name.to_string(), Some(format!("Test project: {}", name)))
        .await
        .expect("Failed to create test project")
}

/// Helper function to create a test task
async fn create_test_task(repo: &SqliteRepository, title: &str, project_id: Option<Uuid>) -> Task {
    let task_data = NewTaskData {
        title: title.to_string(),
        description: Some(format!("Test task: {}", title)),
        priority: Some(TaskPriority::Medium),
        due_date: NaiveDate::from_ymd_opt(2026, 3, 1),
        project_id,
        ..Default::default()
    };

    repo.add_task(task_data)
        .await
        .expect("Failed to create test task")
}

#[tokio::test]
async fn test_basic_task_crud_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;

    let project = create_test_project(&repo, "Test Project").await;
    let task = create_test_task(&repo, "Test Task", Some(project.id)).await;

    assert_eq!(task.title, "Test Task");
    assert_eq!(task.project_id, Some(project.id));
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert!(!task.is_recurring);

    let update_data = UpdateTaskData {
        title: Some("Updated Task".to_string()),
        priority: Some(TaskPriority::High),
        ..Default::default()
    };
    let updated_task = repo
        .update_task(task.id, update_data)
        .await
        .expect("Failed to update task");
    assert_eq!(updated_task.title, "Updated Task");
    assert_eq!(updated_task.priority, TaskPriority::High);

    let started = repo.start_task(task.id).await.expect("Failed to start task");
    assert_eq!(started.status, TaskStatus::InProgress);

    let completed = repo
        .complete_task(task.id)
        .await
        .expect("Failed to complete task");
    assert_eq!(completed.status, TaskStatus::Done);
    assert!(completed.completed_at.is_some());

    repo.delete_task(task.id).await.expect("Failed to delete task");
    assert!(repo.find_task_by_id(task.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_task_filtering_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;
    let project = create_test_project(&repo, "Filter Project").await;

    let labeled = repo
        .add_task(NewTaskData {
            title: "Labeled".to_string(),
            project_name: Some("Filter Project".to_string()),
            labels: vec!["home".to_string(), "errand".to_string()],
            due_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(labeled.project_id, Some(project.id));

    let loose = create_test_task(&repo, "Loose", None).await;
    let done = create_test_task(&repo, "Done already", None).await;
    repo.complete_task(done.id).await.unwrap();

    let open = repo.find_tasks_with_details(&TaskFilter::open()).await.unwrap();
    let titles: Vec<&str> = open.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Labeled", "Loose"]);

    let by_project = repo
        .find_tasks_with_details(&TaskFilter::open().with_project("Filter Project"))
        .await
        .unwrap();
    assert_eq!(by_project.len(), 1);
    assert_eq!(by_project[0].project_name.as_deref(), Some("Filter Project"));
    let labels = by_project[0].labels.clone().unwrap_or_default();
    assert!(labels.contains("home") && labels.contains("errand"));

    let by_label = repo
        .find_tasks_with_details(&TaskFilter::default().with_label("errand"))
        .await
        .unwrap();
    assert_eq!(by_label.len(), 1);
    assert_eq!(by_label[0].id, labeled.id);

    let everything = repo.find_tasks_with_details(&TaskFilter::default()).await.unwrap();
    assert_eq!(everything.len(), 3);
    assert!(everything.iter().any(|t| t.id == loose.id));
}

#[tokio::test]
async fn test_labels_are_added_and_removed() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = repo
        .add_task(NewTaskData {
            title: "Labels".to_string(),
            labels: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    repo.update_task(
        task.id,
        UpdateTaskData {
            add_labels: Some(vec!["c".to_string(), "a".to_string()]),
            remove_labels: Some(vec!["b".to_string()]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(repo.find_task_labels(task.id).await.unwrap(), vec!["a", "c"]);
}

#[tokio::test]
async fn test_short_id_prefix_lookup() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "Find me", None).await;

    let short = task.id.simple().to_string()[..8].to_string();
    let found = repo.find_tasks_by_short_id_prefix(&short).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, task.id);

    let hyphenated = task.id.to_string()[..13].to_uppercase();
    let found = repo.find_tasks_by_short_id_prefix(&hyphenated).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_project_and_section_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;

    create_test_project(&repo, "Home").await;
    let duplicate = repo.add_project("Home".to_string(), None).await;
    assert!(matches!(duplicate, Err(CoreError::InvalidInput(_))));

    let section = repo.add_section("Home", "Garden".to_string()).await.unwrap();
    assert!(matches!(
        repo.add_section("Nowhere", "Garden".to_string()).await,
        Err(CoreError::NotFound(_))
    ));

    let sections = repo.find_sections("Home").await.unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].id, section.id);

    // A section places its task in the owning project.
    let task = repo
        .add_task(NewTaskData {
            title: "Mow".to_string(),
            section_id: Some(section.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(task.project_id, Some(section.project_id));

    let blocked = repo.delete_project("Home".to_string()).await;
    assert!(matches!(blocked, Err(CoreError::InvalidInput(_))));

    repo.delete_task(task.id).await.unwrap();
    repo.delete_project("Home".to_string()).await.unwrap();
    assert!(repo.find_projects().await.unwrap().is_empty());
    assert!(repo.find_sections("Home").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_keeps_section_inside_its_project() {
    let (repo, _temp_dir) = setup_test_db().await;

    let home = create_test_project(&repo, "Home").await;
    create_test_project(&repo, "Work").await;
    let garden = repo.add_section("Home", "Garden".to_string()).await.unwrap();
    let desk = repo.add_section("Work", "Desk".to_string()).await.unwrap();

    let task = create_test_task(&repo, "Water tomatoes", Some(home.id)).await;

    let foreign = repo
        .update_task(
            task.id,
            UpdateTaskData {
                section_id: Some(Some(desk.id)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(foreign, Err(CoreError::InvalidInput(_))));
    let unchanged = repo.find_task_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(unchanged.section_id, None);

    let placed = repo
        .update_task(
            task.id,
            UpdateTaskData {
                section_id: Some(Some(garden.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(placed.section_id, Some(garden.id));
    assert_eq!(placed.project_id, Some(home.id));

    // Moving to another project drops the old project's section.
    let moved = repo
        .update_task(
            task.id,
            UpdateTaskData {
                project_name: Some(Some("Work".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.project_id, Some(desk.project_id));
    assert_eq!(moved.section_id, None);

    let mismatched = repo
        .update_task(
            task.id,
            UpdateTaskData {
                project_name: Some(Some("Work".to_string())),
                section_id: Some(Some(garden.id)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(mismatched, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn test_error_handling_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;

    let empty = repo
        .add_task(NewTaskData {
            title: "   ".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(empty, Err(CoreError::InvalidInput(_))));

    let unknown_project = repo
        .add_task(NewTaskData {
            title: "Orphan".to_string(),
            project_name: Some("Missing".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(unknown_project, Err(CoreError::NotFound(_))));

    let missing = Uuid::now_v7();
    assert!(matches!(repo.delete_task(missing).await, Err(CoreError::NotFound(_))));
    assert!(matches!(repo.complete_task(missing).await, Err(CoreError::NotFound(_))));

    let task = create_test_task(&repo, "Twice", None).await;
    repo.complete_task(task.id).await.unwrap();
    assert!(matches!(
        repo.complete_task(task.id).await,
        Err(CoreError::InvalidState(_))
    ));
    assert!(matches!(repo.start_task(task.id).await, Err(CoreError::InvalidState(_))));
    assert!(matches!(repo.archive_task(task.id).await, Err(CoreError::InvalidState(_))));
}

#[tokio::test]
async fn test_rule_persistence_round_trip() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = repo
        .add_task(NewTaskData {
            title: "Pay rent".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let anchor = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
    let now = chrono::Utc::now();
    let rule = RecurrenceRule {
        task_id: task.id,
        recurrence_type: RecurrenceType::Monthly,
        interval: 1,
        pattern: Pattern::Monthly { day: MonthDay::Last },
        end: EndCondition::AfterCount(12),
        completed_count: 0,
        next_due_date: anchor,
        created_at: now,
        updated_at: now,
    };

    let saved = repo.save_rule(&rule).await.unwrap();
    assert_eq!(saved.pattern, rule.pattern);
    assert_eq!(saved.end, rule.end);

    let loaded = repo.find_rule_by_task(task.id).await.unwrap().unwrap();
    assert_eq!(loaded.next_due_date, anchor);
    assert_eq!(loaded.month_day(), Some(MonthDay::Last));

    // Saving a rule flags the task and pins its due date to the anchor.
    let task = repo.find_task_by_id(task.id).await.unwrap().unwrap();
    assert!(task.is_recurring);
    assert_eq!(task.due_date, Some(anchor));

    // A one-off completion refuses recurring tasks.
    assert!(matches!(
        repo.complete_task(task.id).await,
        Err(CoreError::InvalidState(_))
    ));

    assert!(repo.delete_rule(task.id).await.unwrap());
    assert!(!repo.delete_rule(task.id).await.unwrap());
    let task = repo.find_task_by_id(task.id).await.unwrap().unwrap();
    assert!(!task.is_recurring);
}

#[tokio::test]
async fn test_due_date_edit_moves_rule_anchor() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "Standup", None).await;
    let anchor = task.due_date.unwrap();
    let now = chrono::Utc::now();

    repo.save_rule(&RecurrenceRule {
        task_id: task.id,
        recurrence_type: RecurrenceType::Daily,
        interval: 1,
        pattern: Pattern::Daily,
        end: EndCondition::Never,
        completed_count: 0,
        next_due_date: anchor,
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();

    let moved = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
    repo.update_task(
        task.id,
        UpdateTaskData {
            due_date: Some(Some(moved)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let rule = repo.find_rule_by_task(task.id).await.unwrap().unwrap();
    assert_eq!(rule.next_due_date, moved);

    let cleared = repo
        .update_task(
            task.id,
            UpdateTaskData {
                due_date: Some(None),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(cleared, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn test_archive_ends_series() {
    let (repo, _temp_dir) = setup_test_db().await;
    let task = create_test_task(&repo, "Gym", None).await;
    let now = chrono::Utc::now();

    repo.save_rule(&RecurrenceRule {
        task_id: task.id,
        recurrence_type: RecurrenceType::Weekly,
        interval: 1,
        pattern: Pattern::Weekly {
            weekdays: WeekdaySet::from_indices(&[1, 3, 5]).unwrap(),
        },
        end: EndCondition::Never,
        completed_count: 0,
        next_due_date: task.due_date.unwrap(),
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();

    let archived = repo.archive_task(task.id).await.unwrap();
    assert_eq!(archived.status, TaskStatus::Archived);
    assert!(!archived.is_recurring);
    assert!(repo.find_rule_by_task(task.id).await.unwrap().is_none());
}
