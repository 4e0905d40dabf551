//! Environment bindings with declared defaults and typed coercion.
//!
//! Values are read from a snapshot of the process environment, optionally
//! layered over a `.env` file. The process environment always wins over the
//! file, and the process environment itself is never modified.

use crate::error::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Snapshot of external key/value bindings consumed during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    vars: BTreeMap<String, String>,
}

impl Bindings {
    /// Empty bindings: every accessor falls back to its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are ignored.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Snapshot the process environment layered over a `.env` file.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn from_process_with_env_file(path: &Path) -> ConfigResult<Self> {
        let mut bindings = Self::from_env_file(path)?;
        bindings.vars.extend(Self::from_process().vars);
        Ok(bindings)
    }

    /// Read bindings from a `.env` file only.
    pub fn from_env_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No env file, using process environment only");
            return Ok(Self::empty());
        }

        let env_file_err = |source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        };

        let mut vars = BTreeMap::new();
        for item in dotenvy::from_path_iter(path).map_err(env_file_err)? {
            let (key, value) = item.map_err(env_file_err)?;
            vars.insert(key, value);
        }
        debug!(path = %path.display(), count = vars.len(), "Loaded env file");
        Ok(Self { vars })
    }

    /// Return a copy with one binding set, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Raw value of a binding, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// All bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// String binding with a default.
    pub fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Optional string binding. An empty value counts as absent.
    pub fn optional_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// String binding with no default.
    pub fn required_string(&self, key: &str, reason: &str) -> ConfigResult<String> {
        self.optional_string(key)
            .ok_or_else(|| ConfigError::missing(key, reason))
    }

    /// Boolean binding. Accepts `y/yes/t/true/on/1` and `n/no/f/false/off/0`,
    /// case-insensitively.
    pub fn bool(&self, key: &str, default: bool) -> ConfigResult<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => parse_bool(raw).ok_or_else(|| ConfigError::coercion(key, raw, "a boolean")),
        }
    }

    /// Integer binding.
    pub fn int<T: FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        self.parse(key, default, "an integer")
    }

    /// Floating point binding.
    pub fn float(&self, key: &str, default: f64) -> ConfigResult<f64> {
        self.parse(key, default, "a number")
    }

    /// Duration binding, as whole seconds.
    pub fn duration(&self, key: &str, default: Duration) -> ConfigResult<Duration> {
        let secs = self.parse(key, default.as_secs(), "an integer number of seconds")?;
        Ok(Duration::from_secs(secs))
    }

    /// Comma-delimited list binding. Items are trimmed and empty items dropped.
    pub fn list(&self, key: &str, default: &str) -> Vec<String> {
        split_list(self.get(key).unwrap_or(default))
    }

    /// Comma-delimited list binding with no default.
    pub fn required_list(&self, key: &str, reason: &str) -> ConfigResult<Vec<String>> {
        let items = self
            .get(key)
            .map(split_list)
            .ok_or_else(|| ConfigError::missing(key, reason))?;
        if items.is_empty() {
            return Err(ConfigError::missing(key, reason));
        }
        Ok(items)
    }

    /// URL binding. The value is kept verbatim once it parses.
    pub fn url(&self, key: &str, default: &str) -> ConfigResult<String> {
        let raw = self.get(key).unwrap_or(default);
        url::Url::parse(raw).map_err(|_| ConfigError::coercion(key, raw, "a URL"))?;
        Ok(raw.to_string())
    }

    /// Binding parsed through `FromStr`; `expected` names the type in errors.
    pub fn parse<T: FromStr>(&self, key: &str, default: T, expected: &'static str) -> ConfigResult<T> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::coercion(key, raw, expected)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
