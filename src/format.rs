//! Output formatting for settings, routes and schedules.

use crate::routes::RouteTable;
use crate::schedule::{PeriodicJobTable, TaskRouter};
use anyhow::Result;
use serde::Serialize;

/// Output format for printed documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid options: yaml, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl OutputFormat {
    /// Render any serializable document.
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                out
            }
        })
    }
}

/// Route table as an aligned text listing.
pub fn format_routes_text(table: &RouteTable) -> String {
    let width = table
        .entries()
        .iter()
        .map(|entry| entry.pattern.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for entry in table.entries() {
        let kind = match entry.kind {
            crate::routes::MatchKind::Exact => "exact",
            crate::routes::MatchKind::Include => "include",
        };
        out.push_str(&format!(
            "{:<width$}  {:<7}  {}",
            entry.pattern, kind, entry.handler
        ));
        if let Some(ref name) = entry.name {
            out.push_str(&format!("  [{}]", name));
        }
        out.push('\n');
    }
    out
}

/// Periodic job table as a text listing, with the queue each task lands on.
pub fn format_schedule_text(table: &PeriodicJobTable, router: &TaskRouter) -> String {
    let mut out = format!("# Periodic jobs ({}, {})\n", table.len(), table.timezone());
    for job in table.jobs() {
        match job.task.as_deref() {
            Some(task) => out.push_str(&format!(
                "- {} every {}s -> {} [{}]\n",
                job.name,
                job.cadence_secs,
                task,
                router.queue_or_default(task)
            )),
            None => out.push_str(&format!(
                "- {} every {}s -> (no task)\n",
                job.name, job.cadence_secs
            )),
        }
    }
    out
}
