//! Integration tests for the periodic job table and task routing.

use primepass_settings::config::{Bindings, Profile, SettingsLoader};
use primepass_settings::schedule::{AnyTask, DEFAULT_QUEUE, PeriodicJobTable, TaskRouter};
use std::collections::HashSet;
use std::time::Duration;

fn production_env() -> Bindings {
    Bindings::empty()
        .with("ALLOWED_HOSTS", "api.primepass.com")
        .with("DATABASE_HOST", "db.internal")
        .with("CORS_ALLOWED_ORIGINS", "https://app.primepass.com")
}

#[test]
fn test_exactly_four_jobs_with_cadences() {
    let table = PeriodicJobTable::beat_schedule("UTC").unwrap();
    let jobs: Vec<_> = table
        .jobs()
        .iter()
        .map(|job| (job.name.as_str(), job.cadence_secs.get()))
        .collect();
    assert_eq!(
        jobs,
        vec![
            ("cleanup-expired-tokens", 3600),
            ("send-event-reminders", 1800),
            ("update-event-analytics", 900),
            ("cleanup-old-notifications", 86400),
        ]
    );
    assert_eq!(
        table.get("update-event-analytics").map(|job| job.cadence()),
        Some(Duration::from_secs(900))
    );
}

#[test]
fn test_handlerless_job_skipped() {
    let table = PeriodicJobTable::beat_schedule("UTC").unwrap();
    assert!(table.get("cleanup-expired-tokens").unwrap().task.is_none());

    let ready = table.dispatchable(&AnyTask);
    assert_eq!(ready.len(), 3);
    assert!(ready.iter().all(|job| job.task.is_some()));
}

#[test]
fn test_registry_filters_unknown_tasks() {
    let table = PeriodicJobTable::beat_schedule("UTC").unwrap();
    let registry: HashSet<String> = [
        "apps.events.tasks.send_event_reminders",
        "apps.notifications.tasks.cleanup_old_notifications",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let names: Vec<_> = table
        .dispatchable(&registry)
        .into_iter()
        .map(|job| job.name.as_str())
        .collect();
    assert_eq!(names, vec!["send-event-reminders", "cleanup-old-notifications"]);
}

#[test]
fn test_schedule_uses_task_queue_timezone() {
    let resolved = SettingsLoader::new(Bindings::empty())
        .load_profile(Profile::Development)
        .unwrap();
    let table = resolved.schedule();
    assert_eq!(table.timezone(), resolved.settings().task_queue.timezone);
    assert_eq!(table.len(), 4);
}

#[test]
fn test_production_task_routes() {
    let resolved = SettingsLoader::new(production_env())
        .load_profile(Profile::Production)
        .unwrap();
    let router = resolved.task_router();
    let table = resolved.schedule();

    let queues: Vec<_> = table
        .jobs()
        .iter()
        .filter_map(|job| job.task.as_deref())
        .map(|task| router.queue_or_default(task))
        .collect();
    assert_eq!(queues, vec!["events", "analytics", "notifications"]);
    assert_eq!(router.queue_for("apps.payments.tasks.refund"), None);
}

#[test]
fn test_development_has_no_task_routes() {
    let resolved = SettingsLoader::new(Bindings::empty())
        .load_profile(Profile::Development)
        .unwrap();
    let router = TaskRouter::new(&resolved.settings().task_queue.task_routes).unwrap();
    assert_eq!(
        router.queue_or_default("apps.events.tasks.send_event_reminders"),
        DEFAULT_QUEUE
    );
}
