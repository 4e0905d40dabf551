//! Settings types.
//!
//! `Settings` is the typed, process-wide configuration record. It is built by
//! [`base_settings`](super::base_settings), specialized by exactly one
//! [`Profile`](super::Profile) overlay and never mutated afterwards.
//!
//! Every struct denies unknown fields: the overlay machinery works on the
//! serialized form, and decoding it back is what guarantees an overlay cannot
//! introduce a setting that does not exist here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// String-keyed composite option map (database/cache `OPTIONS`).
pub type OptionMap = Map<String, Value>;

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub core: CoreSettings,
    pub templates: TemplateSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub session: SessionSettings,
    pub auth: AuthSettings,
    pub rest_framework: RestFrameworkSettings,
    pub jwt: JwtSettings,
    pub cors: CorsSettings,
    pub channel_layer: ChannelLayerSettings,
    pub task_queue: TaskQueueSettings,
    pub i18n: I18nSettings,
    pub static_files: StaticFilesSettings,
    pub storage: StorageSettings,
    pub security: SecuritySettings,
    pub axes: AxesSettings,
    pub logging: LoggingSettings,
    pub api_docs: ApiDocsSettings,
    pub email: EmailSettings,
    pub error_reporting: ErrorReportingSettings,
    pub dev_tools: DevToolsSettings,
    pub http_cache: Option<HttpCacheSettings>,
    pub health_check: HealthCheckSettings,
    pub rate_limit: RateLimitSettings,
    pub backup: Option<BackupSettings>,
    pub admin: AdminSettings,
    pub platform: PlatformSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreSettings {
    pub secret_key: String,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub internal_ips: Vec<String>,
    pub installed_apps: Vec<String>,
    /// Ordered; the first entry wraps every other.
    pub middleware: Vec<String>,
    pub root_urlconf: String,
    pub wsgi_application: String,
    pub asgi_application: String,
    pub site_id: u32,
    pub default_auto_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSettings {
    pub backend: String,
    pub dirs: Vec<String>,
    pub app_dirs: bool,
    pub context_processors: Vec<String>,
    pub debug: bool,
    /// Explicit loaders; empty means the backend default.
    pub loaders: Vec<String>,
    /// Wrap `loaders` in the cached loader.
    pub cached_loaders: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
    pub engine: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: Option<u16>,
    pub options: OptionMap,
    /// Persistent connection lifetime in seconds; 0 closes after each request.
    pub conn_max_age: u64,
    pub disable_migrations: bool,
}

impl DatabaseSettings {
    /// In-memory sqlite database used by test runs.
    pub fn in_memory() -> Self {
        Self {
            engine: "django.db.backends.sqlite3".to_string(),
            name: ":memory:".to_string(),
            user: String::new(),
            password: String::new(),
            host: String::new(),
            port: None,
            options: OptionMap::new(),
            conn_max_age: 0,
            disable_migrations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    pub backend: String,
    pub location: Option<String>,
    pub options: OptionMap,
    pub key_prefix: String,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl CacheSettings {
    /// Cache that stores nothing, used by test runs.
    pub fn dummy() -> Self {
        Self {
            backend: "django.core.cache.backends.dummy.DummyCache".to_string(),
            location: None,
            options: OptionMap::new(),
            key_prefix: String::new(),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    pub engine: String,
    pub cache_alias: String,
    #[serde(with = "duration_secs")]
    pub cookie_age: Duration,
    pub cookie_secure: bool,
    pub cookie_httponly: bool,
    pub cookie_samesite: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSettings {
    pub backends: Vec<String>,
    pub account_email_required: bool,
    pub account_username_required: bool,
    pub account_authentication_method: String,
    pub account_email_verification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestFrameworkSettings {
    pub authentication_classes: Vec<String>,
    pub permission_classes: Vec<String>,
    pub renderer_classes: Vec<String>,
    pub parser_classes: Vec<String>,
    pub filter_backends: Vec<String>,
    pub pagination_class: String,
    pub page_size: u32,
    pub schema_class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtSettings {
    #[serde(with = "duration_secs")]
    pub access_token_lifetime: Duration,
    #[serde(with = "duration_secs")]
    pub refresh_token_lifetime: Duration,
    pub rotate_refresh_tokens: bool,
    pub blacklist_after_rotation: bool,
    pub update_last_login: bool,
    pub algorithm: String,
    pub signing_key: String,
    pub verifying_key: Option<String>,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub auth_header_types: Vec<String>,
    pub auth_header_name: String,
    pub user_id_field: String,
    pub user_id_claim: String,
    pub token_type_claim: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_all_origins: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelLayerSettings {
    pub backend: String,
    pub hosts: Vec<String>,
    pub capacity: u32,
    #[serde(with = "duration_secs")]
    pub expiry: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskQueueSettings {
    pub broker_url: String,
    pub result_backend: String,
    pub accept_content: Vec<String>,
    pub task_serializer: String,
    pub result_serializer: String,
    pub timezone: String,
    pub beat_scheduler: String,
    pub task_always_eager: bool,
    pub task_eager_propagates: bool,
    pub task_acks_late: bool,
    pub worker_prefetch_multiplier: Option<u32>,
    pub worker_max_tasks_per_child: Option<u32>,
    /// Glob pattern -> queue, first match wins.
    pub task_routes: Vec<TaskRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskRoute {
    pub pattern: String,
    pub queue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct I18nSettings {
    pub language_code: String,
    pub time_zone: String,
    pub use_i18n: bool,
    pub use_tz: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticFilesSettings {
    pub static_url: String,
    pub static_root: String,
    pub staticfiles_dirs: Vec<String>,
    pub media_url: String,
    pub media_root: String,
    pub staticfiles_storage: String,
    pub default_file_storage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    pub s3: Option<S3Settings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region_name: String,
    pub custom_domain: Option<String>,
    pub default_acl: Option<String>,
    pub object_parameters: OptionMap,
}

impl S3Settings {
    /// Host serving stored objects: the custom domain, else the bucket host.
    pub fn domain(&self) -> String {
        self.custom_domain
            .clone()
            .unwrap_or_else(|| format!("{}.s3.amazonaws.com", self.bucket_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySslHeader {
    pub header: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecuritySettings {
    pub browser_xss_filter: bool,
    pub content_type_nosniff: bool,
    pub x_frame_options: String,
    pub ssl_redirect: bool,
    pub proxy_ssl_header: Option<ProxySslHeader>,
    pub hsts_seconds: u64,
    pub hsts_include_subdomains: bool,
    pub hsts_preload: bool,
    pub referrer_policy: Option<String>,
    pub csrf_cookie_secure: bool,
    pub csrf_cookie_httponly: bool,
    pub csrf_cookie_samesite: Option<String>,
}

/// Brute-force lockout policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxesSettings {
    pub failure_limit: u32,
    pub cooloff_hours: u64,
    pub lock_out_by_combination_user_and_ip: bool,
}

/// Log severity as written in logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(format!(
                "Invalid log level '{}'. Valid options: DEBUG, INFO, WARNING, ERROR, CRITICAL",
                s
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    pub disable_existing_loggers: bool,
    pub formatters: BTreeMap<String, FormatterSettings>,
    pub handlers: BTreeMap<String, HandlerSettings>,
    pub root: LoggerSettings,
    pub loggers: BTreeMap<String, LoggerSettings>,
}

impl LoggingSettings {
    /// Whether the console handler emits structured JSON.
    pub fn console_is_json(&self) -> bool {
        self.handlers
            .get("console")
            .and_then(|h| h.formatter.as_deref())
            .and_then(|name| self.formatters.get(name))
            .is_some_and(|f| f.kind == FormatterKind::Json)
    }

    /// Lowest level any handler accepts.
    pub fn most_verbose_level(&self) -> LogLevel {
        self.handlers
            .values()
            .map(|h| h.level)
            .min()
            .unwrap_or(self.root.level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatterKind {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterSettings {
    pub kind: FormatterKind,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerSettings {
    pub level: LogLevel,
    pub class: String,
    pub filename: Option<String>,
    pub formatter: Option<String>,
    pub max_bytes: Option<u64>,
    pub backup_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSettings {
    pub handlers: Vec<String>,
    pub level: LogLevel,
    pub propagate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiDocsSettings {
    pub title: String,
    pub description: String,
    pub version: String,
    pub serve_include_schema: bool,
    pub component_split_request: bool,
    pub schema_path_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailSettings {
    pub backend: String,
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub host_user: String,
    pub host_password: String,
    pub default_from_email: Option<String>,
    pub server_email: Option<String>,
    pub sendgrid_api_key: Option<String>,
}

/// Error-reporting SDK parameters. A DSN enables reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorReportingSettings {
    pub dsn: Option<String>,
    pub traces_sample_rate: f64,
    pub send_default_pii: bool,
    pub environment: String,
    pub release: String,
    pub integrations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevToolsSettings {
    pub debug_toolbar: Option<DebugToolbarSettings>,
    pub silk: Option<SilkSettings>,
    pub shell_plus_print_sql: bool,
    pub shell_plus_print_sql_truncate: Option<u32>,
    pub query_count: Option<QueryCountSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugToolbarSettings {
    pub show_toolbar: bool,
    pub show_collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SilkSettings {
    pub python_profiler: bool,
    pub python_profiler_binary: bool,
    pub authentication: bool,
    pub authorisation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryCountSettings {
    pub medium_threshold: u32,
    pub high_threshold: u32,
    pub min_time_to_log: u32,
    pub min_query_count_to_log: u32,
    /// Regular expressions over request paths.
    pub ignore_request_patterns: Vec<String>,
    /// Regular expressions over SQL text.
    pub ignore_sql_patterns: Vec<String>,
    pub display_duplicates: u32,
}

/// Whole-response cache middleware parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpCacheSettings {
    pub alias: String,
    #[serde(with = "duration_secs")]
    pub seconds: Duration,
    pub key_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheckSettings {
    pub disk_usage_max_percent: Option<u8>,
    pub memory_min_mb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSettings {
    pub enable: bool,
    pub use_cache: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupSettings {
    pub storage: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminSettings {
    /// Route prefix of the admin site, e.g. `admin/`.
    pub url: String,
    pub force_allauth: bool,
}

/// Event platform limits and feature switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformSettings {
    pub frontend_url: String,
    pub api_version: String,
    pub max_events_per_user: u32,
    pub max_attendees_per_event: u32,
    #[serde(with = "duration_secs")]
    pub default_event_duration: Duration,
    pub enable_notifications: bool,
    pub notification_channels: Vec<String>,
    pub websocket_url: String,
}

/// JSON pointers of settings that hold credentials.
pub const SECRET_KEYS: &[&str] = &[
    "/core/secret_key",
    "/database/password",
    "/jwt/signing_key",
    "/email/host_password",
    "/email/sendgrid_api_key",
    "/storage/s3/secret_access_key",
    "/error_reporting/dsn",
];

const REDACTED: &str = "********";

impl Settings {
    /// Serialize to a JSON value. Maps are sorted, so equal settings always
    /// produce identical output.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Serialized form with every credential masked.
    pub fn to_redacted_value(&self) -> serde_json::Result<Value> {
        let mut value = self.to_value()?;
        for pointer in SECRET_KEYS {
            if let Some(slot) = value.pointer_mut(pointer)
                && !slot.is_null()
            {
                *slot = Value::String(REDACTED.to_string());
            }
        }
        Ok(value)
    }
}

/// Serialize a `Duration` as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
