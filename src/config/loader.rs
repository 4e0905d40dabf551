//! Settings resolution: base -> overlay -> typed, validated record.

use super::base::base_settings;
use super::env::Bindings;
use super::merge::apply_overlay;
use super::profile::{Profile, ResolveOptions, select_profile};
use super::types::Settings;
use super::validate::validate;
use crate::error::ConfigResult;
use crate::reporting::{ErrorReportingPlan, plan_error_reporting};
use crate::routes::RouteTable;
use crate::schedule::{PeriodicJobTable, TaskRouter};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolve settings for `profile`.
///
/// Pure: reads only `env` and `opts`. The base is built, the profile's
/// overlay is applied to a private copy and the result is validated. The
/// route table, job table, task routes and error-reporting plan are derived
/// as part of validation; on any error nothing is returned.
pub fn resolve(profile: Profile, env: &Bindings, opts: &ResolveOptions) -> ConfigResult<Settings> {
    let settings = resolve_settings(profile, env, opts)?;
    Derived::build(profile, &settings)?;
    Ok(settings)
}

fn resolve_settings(
    profile: Profile,
    env: &Bindings,
    opts: &ResolveOptions,
) -> ConfigResult<Settings> {
    let base = base_settings(env, &opts.base_dir)?;
    let ops = profile.overlay(&base, env, opts)?;
    debug!(profile = %profile, ops = ops.len(), "Applying settings overlay");

    let merged = apply_overlay(base.to_value()?, &ops)?;
    let settings: Settings = serde_json::from_value(merged)?;
    validate(profile, &settings)?;
    Ok(settings)
}

/// Everything built from the settings record at startup.
#[derive(Debug, Clone)]
struct Derived {
    routes: RouteTable,
    schedule: PeriodicJobTable,
    task_router: TaskRouter,
    error_reporting: Option<ErrorReportingPlan>,
}

impl Derived {
    fn build(profile: Profile, settings: &Settings) -> ConfigResult<Self> {
        Ok(Self {
            routes: RouteTable::for_profile(profile, settings)?,
            schedule: PeriodicJobTable::beat_schedule(&settings.task_queue.timezone)?,
            task_router: TaskRouter::new(&settings.task_queue.task_routes)?,
            error_reporting: plan_error_reporting(settings)?,
        })
    }
}

/// Settings loader bound to one set of bindings.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    env: Bindings,
    opts: ResolveOptions,
}

impl SettingsLoader {
    pub fn new(env: Bindings) -> Self {
        Self {
            env,
            opts: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: ResolveOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn bindings(&self) -> &Bindings {
        &self.env
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.opts
    }

    /// Select the profile (explicit selector first, then the environment)
    /// and resolve it.
    pub fn load(&self, selector: Option<&str>) -> ConfigResult<ResolvedSettings> {
        let profile = select_profile(selector, &self.env)?;
        self.load_profile(profile)
    }

    /// Resolve a known profile.
    pub fn load_profile(&self, profile: Profile) -> ConfigResult<ResolvedSettings> {
        let settings = resolve_settings(profile, &self.env, &self.opts)?;
        let derived = Derived::build(profile, &settings)?;
        info!(
            profile = %profile,
            debug = settings.core.debug,
            routes = derived.routes.entries().len(),
            "Settings resolved"
        );
        Ok(ResolvedSettings {
            profile,
            settings: Arc::new(settings),
            derived: Arc::new(derived),
        })
    }
}

/// The frozen outcome of resolution, shared read-only by every consumer.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    profile: Profile,
    settings: Arc<Settings>,
    derived: Arc<Derived>,
}

impl ResolvedSettings {
    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle for workers and other consumers. Cloning never re-resolves.
    pub fn share(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    /// Route table for this profile.
    pub fn routes(&self) -> &RouteTable {
        &self.derived.routes
    }

    /// Periodic job table handed to the beat scheduler.
    pub fn schedule(&self) -> &PeriodicJobTable {
        &self.derived.schedule
    }

    pub fn task_router(&self) -> &TaskRouter {
        &self.derived.task_router
    }

    /// Reporting plan, `None` when no DSN is bound.
    pub fn error_reporting(&self) -> Option<&ErrorReportingPlan> {
        self.derived.error_reporting.as_ref()
    }
}
