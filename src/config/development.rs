//! Development overlay.
//!
//! Debug instrumentation on, HTTPS hardening off, permissive CORS, verbose
//! console logging and eager task execution when asked for.

use super::env::Bindings;
use super::merge::OverlayOp;
use super::profile::ResolveOptions;
use super::types::{CacheSettings, DatabaseSettings, Settings};
use crate::error::ConfigResult;
use serde_json::json;

/// Host of the connection pooler inside the compose network.
const PGBOUNCER_HOST: &str = "pgbouncer";
const PGBOUNCER_CONTAINER_PORT: u16 = 6432;

const DEV_APPS: &[&str] = &["django_extensions", "debug_toolbar", "silk"];

const DEV_MIDDLEWARE: &[&str] = &[
    "debug_toolbar.middleware.DebugToolbarMiddleware",
    "silk.middleware.SilkyMiddleware",
];

pub(crate) fn overlay(
    base: &Settings,
    env: &Bindings,
    opts: &ResolveOptions,
) -> ConfigResult<Vec<OverlayOp>> {
    let installed_apps: Vec<&str> = base
        .core
        .installed_apps
        .iter()
        .map(String::as_str)
        .chain(DEV_APPS.iter().copied())
        .collect();

    let middleware: Vec<&str> = DEV_MIDDLEWARE
        .iter()
        .copied()
        .chain(base.core.middleware.iter().map(String::as_str))
        .collect();

    let mut ops = vec![
        OverlayOp::assign("/core/debug", true),
        OverlayOp::assign(
            "/core/allowed_hosts",
            json!(["localhost", "127.0.0.1", "0.0.0.0", "backend"]),
        ),
        OverlayOp::assign("/core/installed_apps", json!(installed_apps)),
        OverlayOp::assign("/core/middleware", json!(middleware)),
        OverlayOp::assign("/core/internal_ips", json!(["127.0.0.1", "localhost"])),
        OverlayOp::assign(
            "/dev_tools/debug_toolbar",
            json!({ "show_toolbar": true, "show_collapsed": true }),
        ),
        OverlayOp::assign(
            "/dev_tools/silk",
            json!({
                "python_profiler": env.bool("ENABLE_SILK_PROFILING", false)?,
                "python_profiler_binary": true,
                "authentication": true,
                "authorisation": true,
            }),
        ),
    ];

    if env.bool("USE_PGBOUNCER", false)? {
        ops.push(OverlayOp::merge(
            "/database",
            json!({
                "host": env.string("DATABASE_HOST", PGBOUNCER_HOST),
                "port": env.int("PGBOUNCER_PORT", 5432u16)?,
            }),
        ));
    }

    if opts.in_container || env.bool("DOCKER_ENV", false)? {
        ops.push(OverlayOp::merge(
            "/database",
            json!({ "host": PGBOUNCER_HOST, "port": PGBOUNCER_CONTAINER_PORT }),
        ));
    }

    ops.extend([
        OverlayOp::merge("/cache/options", json!({ "IGNORE_EXCEPTIONS": true })),
        OverlayOp::assign(
            "/email/backend",
            "django.core.mail.backends.console.EmailBackend",
        ),
        OverlayOp::assign("/cors/allow_all_origins", true),
        OverlayOp::assign(
            "/cors/allowed_origins",
            json!([
                "http://localhost:3000",
                "http://127.0.0.1:3000",
                "http://localhost:5173",
                "http://127.0.0.1:5173",
            ]),
        ),
        OverlayOp::merge("/logging/handlers/console", json!({ "level": "DEBUG" })),
        OverlayOp::assign(
            "/logging/loggers/django.db.backends",
            json!({ "handlers": ["console"], "level": "DEBUG", "propagate": false }),
        ),
        OverlayOp::assign("/dev_tools/shell_plus_print_sql", true),
        OverlayOp::assign("/dev_tools/shell_plus_print_sql_truncate", 1000),
        OverlayOp::merge(
            "/security",
            json!({
                "ssl_redirect": false,
                "hsts_seconds": 0,
                "hsts_include_subdomains": false,
                "hsts_preload": false,
            }),
        ),
        OverlayOp::assign("/security/proxy_ssl_header", json!(null)),
        OverlayOp::merge(
            "/task_queue",
            json!({
                "task_always_eager": env.bool("CELERY_EAGER", false)?,
                "task_eager_propagates": true,
            }),
        ),
        OverlayOp::assign(
            "/dev_tools/query_count",
            json!({
                "medium_threshold": 50,
                "high_threshold": 200,
                "min_time_to_log": 0,
                "min_query_count_to_log": 5,
                "ignore_request_patterns": ["^/admin/", "^/static/", "^/media/"],
                "ignore_sql_patterns": [],
                "display_duplicates": 10,
            }),
        ),
        OverlayOp::assign("/templates/debug", true),
    ]);

    if opts.testing {
        ops.extend([
            OverlayOp::assign("/database", serde_json::to_value(DatabaseSettings::in_memory())?),
            OverlayOp::assign("/cache", serde_json::to_value(CacheSettings::dummy())?),
            OverlayOp::merge(
                "/task_queue",
                json!({ "task_always_eager": true, "task_eager_propagates": true }),
            ),
        ]);
    }

    Ok(ops)
}
