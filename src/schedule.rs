//! Periodic job table and task-queue routing.
//!
//! The table only declares recurring work; running it is the external beat
//! scheduler's job. A job may be declared without a task (a placeholder),
//! and consumers skip such entries instead of failing.

use crate::config::TaskRoute;
use crate::error::{ConfigError, ConfigResult};
use regex_lite::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::num::NonZeroU64;
use std::time::Duration;
use tracing::warn;

/// Queue that receives tasks no route matches.
pub const DEFAULT_QUEUE: &str = "celery";

/// One recurring job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodicJob {
    /// Unique within its table.
    pub name: String,
    /// Seconds between runs.
    pub cadence_secs: NonZeroU64,
    /// Task to invoke. `None` marks a placeholder with nothing bound yet.
    pub task: Option<String>,
}

impl PeriodicJob {
    pub fn new(name: &str, cadence_secs: u64, task: Option<&str>) -> ConfigResult<Self> {
        let cadence_secs = NonZeroU64::new(cadence_secs).ok_or_else(|| {
            ConfigError::inconsistent(name, "cadence must be a positive number of seconds")
        })?;
        Ok(Self {
            name: name.to_string(),
            cadence_secs,
            task: task.map(str::to_string),
        })
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs.get())
    }
}

/// Lookup of the tasks a worker can execute.
pub trait TaskRegistry {
    fn contains(&self, task: &str) -> bool;
}

impl TaskRegistry for HashSet<String> {
    fn contains(&self, task: &str) -> bool {
        HashSet::contains(self, task)
    }
}

impl TaskRegistry for BTreeSet<String> {
    fn contains(&self, task: &str) -> bool {
        BTreeSet::contains(self, task)
    }
}

impl TaskRegistry for [&str] {
    fn contains(&self, task: &str) -> bool {
        self.iter().any(|t| *t == task)
    }
}

/// Registry that accepts every named task.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyTask;

impl TaskRegistry for AnyTask {
    fn contains(&self, _task: &str) -> bool {
        true
    }
}

/// Ordered name -> cadence table read once by the beat scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodicJobTable {
    timezone: String,
    jobs: Vec<PeriodicJob>,
}

impl PeriodicJobTable {
    /// Build a table, rejecting duplicate job names.
    pub fn new(timezone: &str, jobs: Vec<PeriodicJob>) -> ConfigResult<Self> {
        let mut seen = HashSet::new();
        for job in &jobs {
            if !seen.insert(job.name.as_str()) {
                return Err(ConfigError::inconsistent(
                    &job.name,
                    "periodic job names must be unique",
                ));
            }
        }
        Ok(Self {
            timezone: timezone.to_string(),
            jobs,
        })
    }

    /// The platform's beat schedule.
    pub fn beat_schedule(timezone: &str) -> ConfigResult<Self> {
        Self::new(
            timezone,
            vec![
                // Placeholder: its task went away with the accounts app.
                PeriodicJob::new("cleanup-expired-tokens", 3_600, None)?,
                PeriodicJob::new(
                    "send-event-reminders",
                    1_800,
                    Some("apps.events.tasks.send_event_reminders"),
                )?,
                PeriodicJob::new(
                    "update-event-analytics",
                    900,
                    Some("apps.analytics.tasks.update_event_analytics"),
                )?,
                PeriodicJob::new(
                    "cleanup-old-notifications",
                    86_400,
                    Some("apps.notifications.tasks.cleanup_old_notifications"),
                )?,
            ],
        )
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn jobs(&self) -> &[PeriodicJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PeriodicJob> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Jobs a scheduler can actually dispatch against `registry`.
    ///
    /// Entries without a task, or whose task the registry does not know,
    /// are skipped with a warning.
    pub fn dispatchable<'a, R>(&'a self, registry: &R) -> Vec<&'a PeriodicJob>
    where
        R: TaskRegistry + ?Sized,
    {
        self.jobs
            .iter()
            .filter(|job| match job.task.as_deref() {
                None => {
                    warn!(job = %job.name, "Periodic job has no task bound, skipping");
                    false
                }
                Some(task) if !registry.contains(task) => {
                    warn!(job = %job.name, task = %task, "Periodic job task is not registered, skipping");
                    false
                }
                Some(_) => true,
            })
            .collect()
    }
}

/// First-match task -> queue routing from glob patterns (`apps.events.tasks.*`).
#[derive(Debug, Clone)]
pub struct TaskRouter {
    routes: Vec<(Regex, String)>,
}

impl TaskRouter {
    pub fn new(routes: &[TaskRoute]) -> ConfigResult<Self> {
        let routes = routes
            .iter()
            .map(|route| Ok((glob_to_regex(&route.pattern)?, route.queue.clone())))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self { routes })
    }

    /// Queue for `task`, or `None` for the default queue.
    pub fn queue_for(&self, task: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(task))
            .map(|(_, queue)| queue.as_str())
    }

    /// Queue for `task`, falling back to [`DEFAULT_QUEUE`].
    pub fn queue_or_default(&self, task: &str) -> &str {
        self.queue_for(task).unwrap_or(DEFAULT_QUEUE)
    }
}

fn glob_to_regex(glob: &str) -> ConfigResult<Regex> {
    let body = glob
        .split('*')
        .map(regex_lite::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
        .map_err(|_| ConfigError::coercion("task_queue.task_routes", glob, "a task glob"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_cadence_rejected() {
        assert!(PeriodicJob::new("never", 0, Some("apps.x")).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let jobs = vec![
            PeriodicJob::new("a", 60, None).unwrap(),
            PeriodicJob::new("a", 120, None).unwrap(),
        ];
        let err = PeriodicJobTable::new("UTC", jobs).unwrap_err();
        assert_eq!(err.key(), Some("a"));
    }

    #[test]
    fn test_unregistered_task_skipped() {
        let table = PeriodicJobTable::beat_schedule("UTC").unwrap();
        let registry: &[&str] = &["apps.events.tasks.send_event_reminders"];
        let names: Vec<_> = table
            .dispatchable(registry)
            .into_iter()
            .map(|job| job.name.as_str())
            .collect();
        assert_eq!(names, vec!["send-event-reminders"]);
    }

    #[test]
    fn test_glob_routes_first_match() {
        let router = TaskRouter::new(&[
            TaskRoute {
                pattern: "apps.events.tasks.*".into(),
                queue: "events".into(),
            },
            TaskRoute {
                pattern: "apps.*".into(),
                queue: "catchall".into(),
            },
        ])
        .unwrap();
        assert_eq!(
            router.queue_for("apps.events.tasks.send_event_reminders"),
            Some("events")
        );
        assert_eq!(router.queue_for("apps.payments.tasks.refund"), Some("catchall"));
        assert_eq!(router.queue_for("celery.backend_cleanup"), None);
        assert_eq!(router.queue_or_default("celery.backend_cleanup"), DEFAULT_QUEUE);
    }

    #[test]
    fn test_glob_dots_are_literal() {
        let router = TaskRouter::new(&[TaskRoute {
            pattern: "apps.events.tasks.*".into(),
            queue: "events".into(),
        }])
        .unwrap();
        assert_eq!(router.queue_for("appsXevents.tasks.x"), None);
    }
}
