//! Base settings shared by every profile.
//!
//! Pure data plus binding lookups: every key resolves here, either from its
//! binding or from its declared default.

use super::env::Bindings;
use super::types::*;
use crate::error::ConfigResult;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Insecure key used when `SECRET_KEY` is not bound.
pub const DEFAULT_SECRET_KEY: &str = "your-super-secret-key-change-this-in-production";

/// Default Redis endpoint for cache, broker, results and channel layer.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

const FRAMEWORK_APPS: &[&str] = &[
    "django.contrib.admin",
    "django.contrib.auth",
    "django.contrib.contenttypes",
    "django.contrib.sessions",
    "django.contrib.messages",
    "django.contrib.staticfiles",
    "django.contrib.sites",
];

const THIRD_PARTY_APPS: &[&str] = &[
    "rest_framework",
    "rest_framework_simplejwt",
    "drf_spectacular",
    "corsheaders",
    "django_filters",
    "phonenumber_field",
    "django_countries",
    "cachalot",
    "channels",
    "django_celery_beat",
    "django_celery_results",
    "health_check",
    "health_check.db",
    "health_check.cache",
    "health_check.storage",
    "axes",
    "django_ratelimit",
];

// Platform apps (events, notifications, payments, analytics) are added here
// once they exist.
const LOCAL_APPS: &[&str] = &[];

const MIDDLEWARE: &[&str] = &[
    "django.middleware.security.SecurityMiddleware",
    "whitenoise.middleware.WhiteNoiseMiddleware",
    "corsheaders.middleware.CorsMiddleware",
    "django.contrib.sessions.middleware.SessionMiddleware",
    "django.middleware.common.CommonMiddleware",
    "django.middleware.csrf.CsrfViewMiddleware",
    "django.contrib.auth.middleware.AuthenticationMiddleware",
    "django.contrib.messages.middleware.MessageMiddleware",
    "django.middleware.clickjacking.XFrameOptionsMiddleware",
    "axes.middleware.AxesMiddleware",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn under(base_dir: &Path, child: &str) -> String {
    base_dir.join(child).display().to_string()
}

/// Build the base settings from bindings.
///
/// `base_dir` is the project root that template, static and media
/// directories are resolved against.
pub fn base_settings(env: &Bindings, base_dir: &Path) -> ConfigResult<Settings> {
    let secret_key = env.string("SECRET_KEY", DEFAULT_SECRET_KEY);
    let redis_url = env.url("REDIS_URL", DEFAULT_REDIS_URL)?;
    let log_level: LogLevel = env.parse("LOG_LEVEL", LogLevel::Info, "a log level")?;

    let installed_apps = FRAMEWORK_APPS
        .iter()
        .chain(THIRD_PARTY_APPS)
        .chain(LOCAL_APPS)
        .map(|s| s.to_string())
        .collect();

    Ok(Settings {
        core: CoreSettings {
            debug: env.bool("DEBUG", false)?,
            allowed_hosts: env.list("ALLOWED_HOSTS", "localhost,127.0.0.1"),
            internal_ips: Vec::new(),
            installed_apps,
            middleware: strings(MIDDLEWARE),
            root_urlconf: "backend.urls".to_string(),
            wsgi_application: "backend.wsgi.application".to_string(),
            asgi_application: "backend.asgi.application".to_string(),
            site_id: 1,
            default_auto_field: "django.db.models.BigAutoField".to_string(),
            secret_key: secret_key.clone(),
        },
        templates: TemplateSettings {
            backend: "django.template.backends.django.DjangoTemplates".to_string(),
            dirs: vec![under(base_dir, "templates")],
            app_dirs: true,
            context_processors: strings(&[
                "django.template.context_processors.debug",
                "django.template.context_processors.request",
                "django.contrib.auth.context_processors.auth",
                "django.contrib.messages.context_processors.messages",
            ]),
            debug: false,
            loaders: Vec::new(),
            cached_loaders: false,
        },
        database: DatabaseSettings {
            engine: "django.db.backends.postgresql".to_string(),
            name: env.string("DATABASE_NAME", "primepass_db"),
            user: env.string("DATABASE_USER", "primepass_user"),
            password: env.string("DATABASE_PASSWORD", "primepass_password"),
            host: env.string("DATABASE_HOST", "localhost"),
            port: Some(env.int("DATABASE_PORT", 5432u16)?),
            options: object(json!({ "connect_timeout": 10 })),
            conn_max_age: 0,
            disable_migrations: false,
        },
        cache: CacheSettings {
            backend: "django_redis.cache.RedisCache".to_string(),
            location: Some(redis_url.clone()),
            options: object(json!({
                "CLIENT_CLASS": "django_redis.client.DefaultClient",
                "CONNECTION_POOL_KWARGS": {
                    "max_connections": 50,
                    "retry_on_timeout": true,
                },
                "SERIALIZER": "django_redis.serializers.json.JSONSerializer",
                "COMPRESSOR": "django_redis.compressors.zlib.ZlibCompressor",
            })),
            key_prefix: "primepass".to_string(),
            timeout: Duration::from_secs(env.int("CACHE_TTL", 3600u64)?),
        },
        session: SessionSettings {
            engine: "django.contrib.sessions.backends.cache".to_string(),
            cache_alias: "default".to_string(),
            cookie_age: Duration::from_secs(env.int("SESSION_CACHE_TTL", 86_400u64)?),
            cookie_secure: false,
            cookie_httponly: true,
            cookie_samesite: Some("Lax".to_string()),
        },
        auth: AuthSettings {
            backends: strings(&[
                "axes.backends.AxesBackend",
                "django.contrib.auth.backends.ModelBackend",
            ]),
            account_email_required: true,
            account_username_required: false,
            account_authentication_method: "email".to_string(),
            account_email_verification: "mandatory".to_string(),
        },
        rest_framework: RestFrameworkSettings {
            authentication_classes: strings(&[
                "rest_framework_simplejwt.authentication.JWTAuthentication",
                "rest_framework.authentication.SessionAuthentication",
            ]),
            permission_classes: strings(&["rest_framework.permissions.IsAuthenticated"]),
            renderer_classes: strings(&[
                "djangorestframework_camel_case.render.CamelCaseJSONRenderer",
                "rest_framework.renderers.JSONRenderer",
            ]),
            parser_classes: strings(&[
                "djangorestframework_camel_case.parser.CamelCaseFormParser",
                "djangorestframework_camel_case.parser.CamelCaseMultiPartParser",
                "djangorestframework_camel_case.parser.CamelCaseJSONParser",
            ]),
            filter_backends: strings(&[
                "django_filters.rest_framework.DjangoFilterBackend",
                "rest_framework.filters.SearchFilter",
                "rest_framework.filters.OrderingFilter",
            ]),
            pagination_class: "rest_framework.pagination.PageNumberPagination".to_string(),
            page_size: 20,
            schema_class: "drf_spectacular.openapi.AutoSchema".to_string(),
        },
        jwt: JwtSettings {
            access_token_lifetime: env
                .duration("JWT_ACCESS_TOKEN_LIFETIME", Duration::from_secs(3_600))?,
            refresh_token_lifetime: env
                .duration("JWT_REFRESH_TOKEN_LIFETIME", Duration::from_secs(86_400))?,
            rotate_refresh_tokens: env.bool("JWT_ROTATE_REFRESH_TOKENS", true)?,
            blacklist_after_rotation: true,
            update_last_login: true,
            algorithm: env.string("JWT_ALGORITHM", "HS256"),
            signing_key: env.string("JWT_SECRET_KEY", &secret_key),
            verifying_key: None,
            audience: None,
            issuer: None,
            auth_header_types: strings(&["Bearer"]),
            auth_header_name: "HTTP_AUTHORIZATION".to_string(),
            user_id_field: "id".to_string(),
            user_id_claim: "user_id".to_string(),
            token_type_claim: "token_type".to_string(),
        },
        cors: CorsSettings {
            allowed_origins: env.list(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000,http://127.0.0.1:3000",
            ),
            allow_credentials: env.bool("CORS_ALLOW_CREDENTIALS", true)?,
            allow_all_origins: env.bool("CORS_ALLOW_ALL_ORIGINS", false)?,
        },
        channel_layer: ChannelLayerSettings {
            backend: "channels_redis.core.RedisChannelLayer".to_string(),
            hosts: vec![redis_url.clone()],
            capacity: 1500,
            expiry: Duration::from_secs(10),
        },
        task_queue: TaskQueueSettings {
            broker_url: redis_url.clone(),
            result_backend: redis_url,
            accept_content: strings(&["json"]),
            task_serializer: "json".to_string(),
            result_serializer: "json".to_string(),
            timezone: "UTC".to_string(),
            beat_scheduler: "django_celery_beat.schedulers:DatabaseScheduler".to_string(),
            task_always_eager: false,
            task_eager_propagates: false,
            task_acks_late: false,
            worker_prefetch_multiplier: None,
            worker_max_tasks_per_child: None,
            task_routes: Vec::new(),
        },
        i18n: I18nSettings {
            language_code: "en-us".to_string(),
            time_zone: "UTC".to_string(),
            use_i18n: true,
            use_tz: true,
        },
        static_files: StaticFilesSettings {
            static_url: env.string("STATIC_URL", "/static/"),
            static_root: under(base_dir, "staticfiles"),
            staticfiles_dirs: vec![under(base_dir, "static")],
            media_url: env.string("MEDIA_URL", "/media/"),
            media_root: under(base_dir, "media"),
            staticfiles_storage: "whitenoise.storage.CompressedManifestStaticFilesStorage"
                .to_string(),
            default_file_storage: None,
        },
        storage: StorageSettings { s3: None },
        security: SecuritySettings {
            browser_xss_filter: env.bool("SECURE_BROWSER_XSS_FILTER", true)?,
            content_type_nosniff: env.bool("SECURE_CONTENT_TYPE_NOSNIFF", true)?,
            x_frame_options: env.string("X_FRAME_OPTIONS", "DENY"),
            ssl_redirect: false,
            proxy_ssl_header: None,
            hsts_seconds: 0,
            hsts_include_subdomains: false,
            hsts_preload: false,
            referrer_policy: None,
            csrf_cookie_secure: false,
            csrf_cookie_httponly: false,
            csrf_cookie_samesite: Some("Lax".to_string()),
        },
        axes: AxesSettings {
            failure_limit: 5,
            cooloff_hours: 1,
            lock_out_by_combination_user_and_ip: true,
        },
        logging: base_logging(env, log_level),
        api_docs: ApiDocsSettings {
            title: "PrimePass API".to_string(),
            description: "High-ticket event management platform API".to_string(),
            version: "1.0.0".to_string(),
            serve_include_schema: false,
            component_split_request: true,
            schema_path_prefix: "/api/v1/".to_string(),
        },
        email: EmailSettings {
            backend: env.string(
                "EMAIL_BACKEND",
                "django.core.mail.backends.console.EmailBackend",
            ),
            host: env.string("EMAIL_HOST", "smtp.gmail.com"),
            port: env.int("EMAIL_PORT", 587u16)?,
            use_tls: env.bool("EMAIL_USE_TLS", true)?,
            host_user: env.string("EMAIL_HOST_USER", ""),
            host_password: env.string("EMAIL_HOST_PASSWORD", ""),
            default_from_email: None,
            server_email: None,
            sendgrid_api_key: None,
        },
        error_reporting: ErrorReportingSettings {
            dsn: None,
            traces_sample_rate: 0.0,
            send_default_pii: false,
            environment: "development".to_string(),
            release: "1.0.0".to_string(),
            integrations: Vec::new(),
        },
        dev_tools: DevToolsSettings {
            debug_toolbar: None,
            silk: None,
            shell_plus_print_sql: false,
            shell_plus_print_sql_truncate: None,
            query_count: None,
        },
        http_cache: None,
        health_check: HealthCheckSettings {
            disk_usage_max_percent: None,
            memory_min_mb: None,
        },
        rate_limit: RateLimitSettings {
            enable: true,
            use_cache: "default".to_string(),
        },
        backup: None,
        admin: AdminSettings {
            url: "admin/".to_string(),
            force_allauth: false,
        },
        platform: PlatformSettings {
            frontend_url: env.url("FRONTEND_URL", "http://localhost:3000")?,
            api_version: env.string("API_VERSION", "v1"),
            max_events_per_user: env.int("MAX_EVENTS_PER_USER", 10u32)?,
            max_attendees_per_event: env.int("MAX_ATTENDEES_PER_EVENT", 1000u32)?,
            default_event_duration: env
                .duration("DEFAULT_EVENT_DURATION", Duration::from_secs(3_600))?,
            enable_notifications: env.bool("ENABLE_NOTIFICATIONS", true)?,
            notification_channels: env.list("NOTIFICATION_CHANNELS", "email,websocket"),
            websocket_url: env.url("WEBSOCKET_URL", "ws://localhost:8000/ws/")?,
        },
    })
}

fn base_logging(env: &Bindings, level: LogLevel) -> LoggingSettings {
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
            "simple".to_string(),
            FormatterSettings {
                kind: FormatterKind::Text,
                format: "{levelname} {message}".to_string(),
            },
        ),
    ]);

    let handlers = BTreeMap::from([
        (
            "file".to_string(),
            HandlerSettings {
                level,
                class: "logging.FileHandler".to_string(),
                filename: Some(env.string("LOG_FILE", "logs/primepass.log")),
                formatter: Some("verbose".to_string()),
                max_bytes: None,
                backup_count: None,
            },
        ),
        (
            "console".to_string(),
            HandlerSettings {
                level,
                class: "logging.StreamHandler".to_string(),
                filename: None,
                formatter: Some("simple".to_string()),
                max_bytes: None,
                backup_count: None,
            },
        ),
    ]);

    let sinks = strings(&["console", "file"]);
    let logger = |propagate| LoggerSettings {
        handlers: sinks.clone(),
        level,
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
        ]),
    }
}

/// Unwrap a `json!` object literal into an option map.
pub(crate) fn object(value: serde_json::Value) -> OptionMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => OptionMap::new(),
    }
}
