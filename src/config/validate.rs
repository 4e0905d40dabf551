//! Inter-key consistency checks on resolved settings.
//!
//! Serde catches type errors while decoding; the checks here catch values
//! that are well-typed but contradict each other or the profile.

use super::base::DEFAULT_SECRET_KEY;
use super::profile::Profile;
use super::types::Settings;
use crate::error::{ConfigError, ConfigResult};
use tracing::warn;

/// Validate resolved settings for `profile`, failing on the first problem.
pub fn validate(profile: Profile, settings: &Settings) -> ConfigResult<()> {
    if settings.core.allowed_hosts.is_empty() {
        return Err(ConfigError::inconsistent(
            "ALLOWED_HOSTS",
            "at least one host must be allowed",
        ));
    }

    if profile == Profile::Production {
        if settings.core.debug {
            return Err(ConfigError::inconsistent(
                "DEBUG",
                "debug must be off in production",
            ));
        }
        if settings.core.secret_key == DEFAULT_SECRET_KEY {
            warn!("SECRET_KEY is the built-in development key; bind SECRET_KEY for production");
        }
    }

    let admin_url = &settings.admin.url;
    if admin_url.starts_with('/') || !admin_url.ends_with('/') {
        return Err(ConfigError::inconsistent(
            "ADMIN_URL",
            format!("'{admin_url}' must be a relative path ending in '/'"),
        ));
    }

    for (key, url) in [
        ("STATIC_URL", &settings.static_files.static_url),
        ("MEDIA_URL", &settings.static_files.media_url),
    ] {
        if !url.ends_with('/') {
            return Err(ConfigError::inconsistent(
                key,
                format!("'{url}' must end with '/'"),
            ));
        }
    }
    if settings.static_files.static_url == settings.static_files.media_url {
        return Err(ConfigError::inconsistent(
            "MEDIA_URL",
            "static and media files must be served from different URLs",
        ));
    }

    if settings.jwt.access_token_lifetime.is_zero() {
        return Err(ConfigError::inconsistent(
            "JWT_ACCESS_TOKEN_LIFETIME",
            "token lifetime must be positive",
        ));
    }
    if settings.jwt.refresh_token_lifetime.is_zero() {
        return Err(ConfigError::inconsistent(
            "JWT_REFRESH_TOKEN_LIFETIME",
            "token lifetime must be positive",
        ));
    }

    let rate = settings.error_reporting.traces_sample_rate;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::inconsistent(
            "SENTRY_TRACES_SAMPLE_RATE",
            format!("{rate} is outside 0.0..=1.0"),
        ));
    }

    if !settings.cors.allow_all_origins {
        for origin in &settings.cors.allowed_origins {
            if url::Url::parse(origin).is_err() {
                return Err(ConfigError::coercion(
                    "CORS_ALLOWED_ORIGINS",
                    origin,
                    "an origin URL",
                ));
            }
        }
    }

    if let Some(query_count) = &settings.dev_tools.query_count {
        for pattern in query_count
            .ignore_request_patterns
            .iter()
            .chain(&query_count.ignore_sql_patterns)
        {
            if regex_lite::Regex::new(pattern).is_err() {
                return Err(ConfigError::coercion(
                    "dev_tools.query_count",
                    pattern,
                    "a regular expression",
                ));
            }
        }
    }

    for route in &settings.task_queue.task_routes {
        if route.pattern.is_empty() || route.queue.is_empty() {
            return Err(ConfigError::inconsistent(
                "task_queue.task_routes",
                "task routes need both a pattern and a queue",
            ));
        }
    }

    Ok(())
}
