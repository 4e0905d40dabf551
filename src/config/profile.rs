//! Settings profiles: the named overlays applied on top of the base.

use super::env::Bindings;
use super::merge::OverlayOp;
use super::types::Settings;
use super::{development, production};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment binding that selects the profile.
pub const PROFILE_ENV: &str = "PRIMEPASS_SETTINGS";

/// Module-path prefix accepted in front of a profile name.
const MODULE_PREFIX: &str = "primepass.settings.";

/// One deployment environment. Exactly one is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Development, Profile::Production];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
        }
    }

    /// Build the overlay operations for this profile.
    pub fn overlay(
        &self,
        base: &Settings,
        env: &Bindings,
        opts: &ResolveOptions,
    ) -> ConfigResult<Vec<OverlayOp>> {
        match self {
            Profile::Development => development::overlay(base, env, opts),
            Profile::Production => production::overlay(base, env),
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    /// Accepts `development`, `production` and their module paths
    /// (`primepass.settings.production`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = trimmed.strip_prefix(MODULE_PREFIX).unwrap_or(trimmed);
        match name {
            "development" => Ok(Profile::Development),
            "production" => Ok(Profile::Production),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the profile from an explicit selector, else from [`PROFILE_ENV`].
///
/// There is no fallback: with neither, resolution fails.
pub fn select_profile(explicit: Option<&str>, env: &Bindings) -> ConfigResult<Profile> {
    match explicit.or_else(|| env.get(PROFILE_ENV)) {
        Some(selector) if !selector.trim().is_empty() => selector.parse(),
        _ => Err(ConfigError::MissingProfile),
    }
}

/// Inputs to resolution that do not come from bindings.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Project root for template, static and media directories.
    pub base_dir: PathBuf,
    /// Resolve for a test run (development only): in-memory database,
    /// dummy cache, eager tasks.
    pub testing: bool,
    /// The process runs inside a container. Probed by the entry point,
    /// never by the resolver.
    pub in_container: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            testing: false,
            in_container: false,
        }
    }
}

impl ResolveOptions {
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    pub fn in_container(mut self, in_container: bool) -> Self {
        self.in_container = in_container;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_names() {
        assert_eq!("development".parse::<Profile>().unwrap(), Profile::Development);
        assert_eq!(" production ".parse::<Profile>().unwrap(), Profile::Production);
        assert_eq!(
            "primepass.settings.production".parse::<Profile>().unwrap(),
            Profile::Production
        );
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let err = "staging".parse::<Profile>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(ref s) if s == "staging"));
        assert!("Production".parse::<Profile>().is_err());
    }

    #[test]
    fn test_select_profile_prefers_explicit() {
        let env = Bindings::empty().with(PROFILE_ENV, "production");
        assert_eq!(select_profile(None, &env).unwrap(), Profile::Production);
        assert_eq!(
            select_profile(Some("development"), &env).unwrap(),
            Profile::Development
        );
    }

    #[test]
    fn test_select_profile_has_no_default() {
        assert!(matches!(
            select_profile(None, &Bindings::empty()),
            Err(ConfigError::MissingProfile)
        ));
        let env = Bindings::empty().with(PROFILE_ENV, "  ");
        assert!(matches!(
            select_profile(None, &env),
            Err(ConfigError::MissingProfile)
        ));
    }
}
