//! Production overlay.
//!
//! Hosts, database host and CORS origins must be bound explicitly. Debug is
//! forced off whatever the environment says.

use super::env::Bindings;
use super::merge::OverlayOp;
use super::types::*;
use crate::error::ConfigResult;
use serde_json::json;
use std::collections::BTreeMap;

const S3_STORAGE: &str = "storages.backends.s3boto3.S3Boto3Storage";

pub(crate) fn overlay(base: &Settings, env: &Bindings) -> ConfigResult<Vec<OverlayOp>> {
    let allowed_hosts = env.required_list(
        "ALLOWED_HOSTS",
        "production serves only explicitly listed hosts",
    )?;
    let database_host = env.required_string(
        "DATABASE_HOST",
        "production connects through an explicitly configured database host",
    )?;
    let cors_origins = env.required_list(
        "CORS_ALLOWED_ORIGINS",
        "production allows only explicitly listed origins",
    )?;

    let mut middleware = base.core.middleware.clone();
    let at = middleware.len().min(1);
    middleware.insert(at, "django.middleware.cache.UpdateCacheMiddleware".to_string());
    middleware.push("django.middleware.cache.FetchFromCacheMiddleware".to_string());

    let mut ops = vec![
        OverlayOp::assign("/core/debug", false),
        OverlayOp::assign("/core/allowed_hosts", json!(allowed_hosts)),
        OverlayOp::assign("/core/middleware", json!(middleware)),
        OverlayOp::merge(
            "/security",
            json!({
                "ssl_redirect": env.bool("SECURE_SSL_REDIRECT", true)?,
                "hsts_seconds": env.int("SECURE_HSTS_SECONDS", 31_536_000u64)?,
                "hsts_include_subdomains": env.bool("SECURE_HSTS_INCLUDE_SUBDOMAINS", true)?,
                "hsts_preload": env.bool("SECURE_HSTS_PRELOAD", true)?,
                "content_type_nosniff": true,
                "browser_xss_filter": true,
                "referrer_policy": "strict-origin-when-cross-origin",
                "csrf_cookie_secure": true,
                "csrf_cookie_httponly": true,
                "csrf_cookie_samesite": "Lax",
            }),
        ),
        OverlayOp::assign(
            "/security/proxy_ssl_header",
            json!({ "header": "HTTP_X_FORWARDED_PROTO", "value": "https" }),
        ),
        OverlayOp::merge(
            "/session",
            json!({ "cookie_secure": true, "cookie_httponly": true, "cookie_samesite": "Lax" }),
        ),
        OverlayOp::merge(
            "/database",
            json!({
                "host": database_host,
                "port": env.int("PGBOUNCER_PORT", 6432u16)?,
                "conn_max_age": 60,
                "options": {
                    "sslmode": "require",
                    "connect_timeout": 10,
                    "options": "-c default_transaction_isolation=read_committed",
                    "MAX_CONNS": 20,
                    "OPTIONS": { "MAX_CONNS": 20, "autocommit": true },
                },
            }),
        ),
        OverlayOp::merge(
            "/cache/options",
            json!({
                "CONNECTION_POOL_KWARGS": {
                    "max_connections": 100,
                    "retry_on_timeout": true,
                    "socket_keepalive": true,
                    "socket_keepalive_options": {},
                },
                "IGNORE_EXCEPTIONS": false,
            }),
        ),
    ];

    if env.bool("USE_S3", false)? {
        ops.extend(s3_storage(env)?);
    }

    ops.push(OverlayOp::merge(
        "/email",
        json!({
            "backend": "anymail.backends.sendgrid.EmailBackend",
            "default_from_email": env.string("DEFAULT_FROM_EMAIL", "noreply@primepass.com"),
            "server_email": env.string("SERVER_EMAIL", "server@primepass.com"),
        }),
    ));
    if let Some(api_key) = env.optional_string("SENDGRID_API_KEY") {
        ops.push(OverlayOp::assign("/email/sendgrid_api_key", api_key));
    }

    ops.extend([
        OverlayOp::assign("/logging", serde_json::to_value(production_logging())?),
        OverlayOp::assign(
            "/error_reporting",
            json!({
                "dsn": env.optional_string("SENTRY_DSN"),
                "traces_sample_rate": env.float("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
                "send_default_pii": false,
                "environment": env.string("ENVIRONMENT", "production"),
                "release": env.string("RELEASE_VERSION", "1.0.0"),
                "integrations": ["django", "celery", "redis"],
            }),
        ),
        OverlayOp::assign("/cors/allow_all_origins", false),
        OverlayOp::assign("/cors/allowed_origins", json!(cors_origins)),
        OverlayOp::merge(
            "/task_queue",
            json!({
                "task_always_eager": false,
                "worker_prefetch_multiplier": 1,
                "task_acks_late": true,
                "worker_max_tasks_per_child": 1000,
            }),
        ),
        OverlayOp::assign(
            "/task_queue/task_routes",
            json!([
                { "pattern": "apps.notifications.tasks.*", "queue": "notifications" },
                { "pattern": "apps.events.tasks.*", "queue": "events" },
                { "pattern": "apps.analytics.tasks.*", "queue": "analytics" },
            ]),
        ),
        OverlayOp::merge(
            "/templates",
            json!({
                "loaders": [
                    "django.template.loaders.filesystem.Loader",
                    "django.template.loaders.app_directories.Loader",
                ],
                "cached_loaders": true,
            }),
        ),
        OverlayOp::assign(
            "/health_check",
            json!({ "disk_usage_max_percent": 90, "memory_min_mb": 100 }),
        ),
        OverlayOp::assign("/rate_limit", json!({ "enable": true, "use_cache": "default" })),
        OverlayOp::assign(
            "/rest_framework/renderer_classes",
            json!(["djangorestframework_camel_case.render.CamelCaseJSONRenderer"]),
        ),
        OverlayOp::assign(
            "/http_cache",
            json!({ "alias": "default", "seconds": 600, "key_prefix": "primepass" }),
        ),
        OverlayOp::assign(
            "/backup",
            json!({
                "storage": "django.core.files.storage.FileSystemStorage",
                "location": "/var/backups/primepass/",
            }),
        ),
        OverlayOp::assign(
            "/admin",
            json!({ "url": env.string("ADMIN_URL", "admin/"), "force_allauth": true }),
        ),
    ]);

    Ok(ops)
}

/// Object storage for static and media files.
fn s3_storage(env: &Bindings) -> ConfigResult<Vec<OverlayOp>> {
    const REASON: &str = "required when USE_S3 is enabled";

    let s3 = S3Settings {
        access_key_id: env.required_string("AWS_ACCESS_KEY_ID", REASON)?,
        secret_access_key: env.required_string("AWS_SECRET_ACCESS_KEY", REASON)?,
        bucket_name: env.required_string("AWS_STORAGE_BUCKET_NAME", REASON)?,
        region_name: env.string("AWS_S3_REGION_NAME", "us-east-1"),
        custom_domain: env.optional_string("AWS_S3_CUSTOM_DOMAIN"),
        default_acl: None,
        object_parameters: super::base::object(json!({ "CacheControl": "max-age=86400" })),
    };
    let domain = s3.domain();

    Ok(vec![
        OverlayOp::assign("/storage/s3", serde_json::to_value(&s3)?),
        OverlayOp::merge(
            "/static_files",
            json!({
                "staticfiles_storage": S3_STORAGE,
                "default_file_storage": S3_STORAGE,
                "static_url": format!("https://{domain}/static/"),
                "media_url": format!("https://{domain}/media/"),
            }),
        ),
    ])
}

fn production_logging() -> LoggingSettings {
    let formatters = BTreeMap::from([
        (
            "verbose".to_string(),
            FormatterSettings {
                kind: FormatterKind::Text,
                format: "{levelname} {asctime} {module} {process:d} {thread:d} {message}"
                    .to_string(),
            },
        ),
        (
            "json".to_string(),
            FormatterSettings {
                kind: FormatterKind::Json,
                format: "%(levelname)s %(asctime)s %(module)s %(process)d %(thread)d %(message)s"
                    .to_string(),
            },
        ),
    ]);

    let handler = |level, class: &str, formatter: Option<&str>| HandlerSettings {
        level,
        class: class.to_string(),
        filename: None,
        formatter: formatter.map(str::to_string),
        max_bytes: None,
        backup_count: None,
    };

    let handlers = BTreeMap::from([
        (
            "file".to_string(),
            HandlerSettings {
                filename: Some("/var/log/primepass/primepass.log".to_string()),
                max_bytes: Some(50 * 1024 * 1024),
                backup_count: Some(5),
                ..handler(
                    LogLevel::Info,
                    "logging.handlers.RotatingFileHandler",
                    Some("json"),
                )
            },
        ),
        (
            "console".to_string(),
            handler(LogLevel::Info, "logging.StreamHandler", Some("json")),
        ),
        (
            "sentry".to_string(),
            handler(
                LogLevel::Error,
                "sentry_sdk.integrations.logging.SentryHandler",
                None,
            ),
        ),
    ]);

    let logger = |propagate| LoggerSettings {
        handlers: vec!["console".into(), "file".into(), "sentry".into()],
        level: LogLevel::Info,
        propagate,
    };

    LoggingSettings {
        disable_existing_loggers: false,
        formatters,
        handlers,
        root: logger(true),
        loggers: BTreeMap::from([
            ("django".to_string(), logger(false)),
            ("primepass".to_string(), logger(false)),
            ("celery".to_string(), logger(false)),
        ]),
    }
}
