//! URL route table.
//!
//! The table is an ordered list of patterns resolved first-match. Each profile
//! has its own builder: production assembles the base table only, so debug
//! and profiling endpoints cannot appear there whatever the settings say.

use crate::config::{Profile, Settings};
use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use std::fmt;

/// What a matched route is served by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Handler {
    AdminSite,
    TokenObtainPair,
    TokenRefresh,
    TokenVerify,
    HealthCheck,
    Schema,
    SwaggerUi,
    Redoc,
    DebugToolbar,
    Silk,
    /// Files served straight from `root`.
    StaticFiles { root: String },
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::AdminSite => f.write_str("admin-site"),
            Handler::TokenObtainPair => f.write_str("token-obtain-pair"),
            Handler::TokenRefresh => f.write_str("token-refresh"),
            Handler::TokenVerify => f.write_str("token-verify"),
            Handler::HealthCheck => f.write_str("health-check"),
            Handler::Schema => f.write_str("schema"),
            Handler::SwaggerUi => f.write_str("swagger-ui"),
            Handler::Redoc => f.write_str("redoc"),
            Handler::DebugToolbar => f.write_str("debug-toolbar"),
            Handler::Silk => f.write_str("silk"),
            Handler::StaticFiles { root } => write!(f, "static-files({root})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The whole path must equal the pattern.
    Exact,
    /// The pattern is a prefix delegating to a sub-table.
    Include,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub pattern: String,
    pub kind: MatchKind,
    pub handler: Handler,
    /// Reverse-lookup name (or namespace for includes).
    pub name: Option<String>,
}

impl RouteEntry {
    fn exact(pattern: &str, handler: Handler, name: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: MatchKind::Exact,
            handler,
            name: Some(name.to_string()),
        }
    }

    fn include(pattern: &str, handler: Handler, namespace: Option<&str>) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: MatchKind::Include,
            handler,
            name: namespace.map(str::to_string),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self.kind {
            MatchKind::Exact => path == self.pattern,
            MatchKind::Include => path.starts_with(&self.pattern),
        }
    }

    /// Whether this entry would match every path `later` matches.
    fn shadows(&self, later: &RouteEntry) -> bool {
        match self.kind {
            MatchKind::Include => later.pattern.starts_with(&self.pattern),
            MatchKind::Exact => later.kind == MatchKind::Exact && later.pattern == self.pattern,
        }
    }
}

/// Ordered, validated route list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Validate ordering and wrap `entries`.
    pub fn new(entries: Vec<RouteEntry>) -> ConfigResult<Self> {
        for (i, earlier) in entries.iter().enumerate() {
            if let Some(later) = entries[i + 1..].iter().find(|later| earlier.shadows(later)) {
                return Err(ConfigError::inconsistent(
                    "ROUTES",
                    format!(
                        "'{}' ({}) is declared after '{}' and can never match",
                        later.pattern, later.handler, earlier.pattern
                    ),
                ));
            }
        }
        Ok(Self { entries })
    }

    /// Table for `profile`.
    pub fn for_profile(profile: Profile, settings: &Settings) -> ConfigResult<Self> {
        let entries = match profile {
            Profile::Development => development_entries(settings),
            Profile::Production => base_entries(settings),
        };
        Self::new(entries)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// First entry matching `path`. A leading `/` is ignored.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.entries.iter().find(|entry| entry.matches(path))
    }

    /// Entry registered under `name`.
    pub fn by_name(&self, name: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_deref() == Some(name))
    }
}

fn base_entries(settings: &Settings) -> Vec<RouteEntry> {
    vec![
        RouteEntry::include(&settings.admin.url, Handler::AdminSite, None),
        RouteEntry::exact(
            "api/v1/auth/token/",
            Handler::TokenObtainPair,
            "token_obtain_pair",
        ),
        RouteEntry::exact(
            "api/v1/auth/token/refresh/",
            Handler::TokenRefresh,
            "token_refresh",
        ),
        RouteEntry::exact(
            "api/v1/auth/token/verify/",
            Handler::TokenVerify,
            "token_verify",
        ),
        RouteEntry::include("api/v1/health/", Handler::HealthCheck, None),
        RouteEntry::exact("api/schema/", Handler::Schema, "schema"),
        RouteEntry::exact("api/docs/", Handler::SwaggerUi, "swagger-ui"),
        RouteEntry::exact("api/redoc/", Handler::Redoc, "redoc"),
    ]
}

fn development_entries(settings: &Settings) -> Vec<RouteEntry> {
    let mut entries = base_entries(settings);
    entries.push(RouteEntry::include(
        "__debug__/",
        Handler::DebugToolbar,
        None,
    ));
    entries.push(RouteEntry::include("silk/", Handler::Silk, Some("silk")));

    let files = &settings.static_files;
    for (url, root) in [
        (&files.media_url, &files.media_root),
        (&files.static_url, &files.static_root),
    ] {
        if let Some(prefix) = local_prefix(url) {
            entries.push(RouteEntry::include(
                prefix,
                Handler::StaticFiles { root: root.clone() },
                None,
            ));
        }
    }
    entries
}

/// Route prefix for a locally served URL; `None` for absolute URLs.
fn local_prefix(url: &str) -> Option<&str> {
    if url.contains("://") || url.starts_with("//") {
        return None;
    }
    let prefix = url.trim_start_matches('/');
    (!prefix.is_empty()).then_some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_shadowing_rejected() {
        let err = RouteTable::new(vec![
            RouteEntry::include("api/", Handler::HealthCheck, None),
            RouteEntry::exact("api/schema/", Handler::Schema, "schema"),
        ])
        .unwrap_err();
        assert_eq!(err.key(), Some("ROUTES"));
    }

    #[test]
    fn test_duplicate_exact_rejected() {
        assert!(
            RouteTable::new(vec![
                RouteEntry::exact("api/docs/", Handler::SwaggerUi, "swagger-ui"),
                RouteEntry::exact("api/docs/", Handler::Redoc, "redoc"),
            ])
            .is_err()
        );
    }

    #[test]
    fn test_exact_then_include_allowed() {
        let table = RouteTable::new(vec![
            RouteEntry::exact("api/schema/", Handler::Schema, "schema"),
            RouteEntry::include("api/", Handler::HealthCheck, None),
        ])
        .unwrap();
        assert_eq!(
            table.resolve("/api/schema/").map(|e| &e.handler),
            Some(&Handler::Schema)
        );
        assert_eq!(
            table.resolve("api/schema/extra").map(|e| &e.handler),
            Some(&Handler::HealthCheck)
        );
    }

    #[test]
    fn test_local_prefix() {
        assert_eq!(local_prefix("/static/"), Some("static/"));
        assert_eq!(local_prefix("https://cdn.primepass.com/static/"), None);
        assert_eq!(local_prefix("/"), None);
    }
}
