//! Integration tests for settings resolution.
//!
//! Bindings are built explicitly for every test; the process environment is
//! never read or mutated.

use primepass_settings::config::{
    Bindings, DEFAULT_SECRET_KEY, PROFILE_ENV, Profile, ResolveOptions, SettingsLoader,
    base_settings, resolve,
};
use primepass_settings::error::{ConfigError, ErrorCode};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Minimal bindings production refuses to start without.
fn production_env() -> Bindings {
    Bindings::empty()
        .with("ALLOWED_HOSTS", "api.primepass.com,www.primepass.com")
        .with("DATABASE_HOST", "db.internal")
        .with("CORS_ALLOWED_ORIGINS", "https://app.primepass.com")
}

fn defaults() -> ResolveOptions {
    ResolveOptions::default()
}

#[test]
fn test_resolution_is_deterministic() {
    for (profile, env) in [
        (Profile::Development, Bindings::empty()),
        (Profile::Production, production_env()),
    ] {
        let first = resolve(profile, &env, &defaults()).unwrap();
        let second = resolve(profile, &env, &defaults()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap(),
            "{profile} serialization must be byte-identical"
        );
    }
}

#[test]
fn test_untouched_keys_keep_base_values() {
    let env = production_env();
    let base = base_settings(&env, Path::new(".")).unwrap();
    let prod = resolve(Profile::Production, &env, &defaults()).unwrap();

    assert_eq!(prod.jwt, base.jwt);
    assert_eq!(prod.i18n, base.i18n);
    assert_eq!(prod.axes, base.axes);
    assert_eq!(prod.platform, base.platform);
    assert_eq!(prod.channel_layer, base.channel_layer);
}

#[test]
fn test_cache_options_merge_keeps_siblings() {
    let dev = resolve(Profile::Development, &Bindings::empty(), &defaults()).unwrap();
    let options = &dev.cache.options;
    assert_eq!(options["IGNORE_EXCEPTIONS"], json!(true));
    assert_eq!(
        options["CLIENT_CLASS"],
        json!("django_redis.client.DefaultClient")
    );
    assert_eq!(
        options["SERIALIZER"],
        json!("django_redis.serializers.json.JSONSerializer")
    );

    let prod = resolve(Profile::Production, &production_env(), &defaults()).unwrap();
    let options = &prod.cache.options;
    assert_eq!(options["IGNORE_EXCEPTIONS"], json!(false));
    assert_eq!(
        options["CLIENT_CLASS"],
        json!("django_redis.client.DefaultClient")
    );
    assert_eq!(options["CONNECTION_POOL_KWARGS"]["max_connections"], json!(100));
    assert_eq!(options["CONNECTION_POOL_KWARGS"]["retry_on_timeout"], json!(true));
}

#[test]
fn test_development_debug_without_binding() {
    let dev = resolve(Profile::Development, &Bindings::empty(), &defaults()).unwrap();
    assert!(dev.core.debug);
    assert!(dev.templates.debug);
    assert!(dev.templates.loaders.is_empty());
    assert!(!dev.templates.cached_loaders);
    assert!(
        dev.core
            .installed_apps
            .iter()
            .any(|app| app == "debug_toolbar")
    );
    assert_eq!(
        dev.core.middleware.first().map(String::as_str),
        Some("debug_toolbar.middleware.DebugToolbarMiddleware")
    );
}

#[test]
fn test_production_debug_forced_off() {
    let env = production_env().with("DEBUG", "true");
    let prod = resolve(Profile::Production, &env, &defaults()).unwrap();
    assert!(!prod.core.debug);
    assert!(prod.security.ssl_redirect);
    assert!(prod.session.cookie_secure);
}

#[test]
fn test_malformed_cache_ttl_aborts() {
    let env = Bindings::empty().with("CACHE_TTL", "notanumber");
    for profile in Profile::ALL {
        let env = match profile {
            Profile::Development => env.clone(),
            Profile::Production => production_env().with("CACHE_TTL", "notanumber"),
        };
        let err = resolve(profile, &env, &defaults()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CoercionFailed);
        assert_eq!(err.key(), Some("CACHE_TTL"));
    }
}

#[test]
fn test_unknown_profile_aborts() {
    let env = Bindings::empty().with(PROFILE_ENV, "staging");
    let err = SettingsLoader::new(env).load(None).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownProfile(ref name) if name == "staging"));
}

#[test]
fn test_missing_profile_aborts() {
    let err = SettingsLoader::new(Bindings::empty())
        .load(None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingProfile);
}

#[test]
fn test_module_path_selector() {
    let env = production_env().with(PROFILE_ENV, "primepass.settings.production");
    let resolved = SettingsLoader::new(env).load(None).unwrap();
    assert_eq!(resolved.profile(), Profile::Production);
}

#[test]
fn test_production_required_bindings() {
    for key in ["ALLOWED_HOSTS", "DATABASE_HOST", "CORS_ALLOWED_ORIGINS"] {
        let env: Bindings = production_env()
            .iter()
            .filter(|(k, _)| *k != key)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let err = resolve(Profile::Production, &env, &defaults()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingBinding, "{key}");
        assert_eq!(err.key(), Some(key));
    }
}

#[test]
fn test_production_database_and_routing() {
    let prod = resolve(Profile::Production, &production_env(), &defaults()).unwrap();
    assert_eq!(prod.database.host, "db.internal");
    assert_eq!(prod.database.port, Some(6432));
    assert_eq!(prod.database.conn_max_age, 60);
    assert_eq!(prod.database.options["sslmode"], json!("require"));
    assert_eq!(prod.task_queue.worker_prefetch_multiplier, Some(1));
    assert!(prod.task_queue.task_acks_late);
    assert_eq!(prod.task_queue.task_routes.len(), 3);
    assert_eq!(
        prod.core.allowed_hosts,
        vec!["api.primepass.com", "www.primepass.com"]
    );
    assert!(prod.logging.console_is_json());
}

#[test]
fn test_production_cache_middleware_positions() {
    let base = base_settings(&production_env(), Path::new(".")).unwrap();
    let prod = resolve(Profile::Production, &production_env(), &defaults()).unwrap();
    let middleware = &prod.core.middleware;
    assert_eq!(middleware.len(), base.core.middleware.len() + 2);
    assert_eq!(middleware[0], base.core.middleware[0]);
    assert_eq!(middleware[1], "django.middleware.cache.UpdateCacheMiddleware");
    assert_eq!(
        middleware.last().map(String::as_str),
        Some("django.middleware.cache.FetchFromCacheMiddleware")
    );
}

#[test]
fn test_s3_requires_credentials() {
    let env = production_env().with("USE_S3", "true");
    let err = resolve(Profile::Production, &env, &defaults()).unwrap_err();
    assert_eq!(err.key(), Some("AWS_ACCESS_KEY_ID"));

    let env = env
        .with("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE")
        .with("AWS_SECRET_ACCESS_KEY", "s3cr3t")
        .with("AWS_STORAGE_BUCKET_NAME", "primepass-assets");
    let prod = resolve(Profile::Production, &env, &defaults()).unwrap();
    assert_eq!(
        prod.static_files.static_url,
        "https://primepass-assets.s3.amazonaws.com/static/"
    );
    assert_eq!(
        prod.static_files.media_url,
        "https://primepass-assets.s3.amazonaws.com/media/"
    );
    let s3 = prod.storage.s3.as_ref().unwrap();
    assert_eq!(s3.region_name, "us-east-1");
}

#[test]
fn test_testing_mode_swaps_backends() {
    let opts = defaults().testing(true);
    let dev = resolve(Profile::Development, &Bindings::empty(), &opts).unwrap();
    assert_eq!(dev.database.name, ":memory:");
    assert!(dev.database.disable_migrations);
    assert_eq!(
        dev.cache.backend,
        "django.core.cache.backends.dummy.DummyCache"
    );
    assert!(dev.task_queue.task_always_eager);
}

#[test]
fn test_container_switches_to_pgbouncer() {
    let dev = resolve(
        Profile::Development,
        &Bindings::empty(),
        &defaults().in_container(true),
    )
    .unwrap();
    assert_eq!(dev.database.host, "pgbouncer");
    assert_eq!(dev.database.port, Some(6432));

    let dev = resolve(
        Profile::Development,
        &Bindings::empty().with("DOCKER_ENV", "yes"),
        &defaults(),
    )
    .unwrap();
    assert_eq!(dev.database.host, "pgbouncer");
}

#[test]
fn test_redaction_masks_secrets() {
    let env = production_env()
        .with("SECRET_KEY", "very-secret")
        .with("SENTRY_DSN", "https://key@o1.ingest.sentry.io/7");
    let prod = resolve(Profile::Production, &env, &defaults()).unwrap();
    let shown = prod.to_redacted_value().unwrap();
    assert_eq!(shown["core"]["secret_key"], json!("********"));
    assert_eq!(shown["error_reporting"]["dsn"], json!("********"));
    assert_eq!(shown["core"]["debug"], json!(false));
    assert!(!shown.to_string().contains("very-secret"));
    assert_ne!(prod.core.secret_key, DEFAULT_SECRET_KEY);
}

#[test]
fn test_env_file_layered_under_process() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    fs::write(
        &path,
        "ALLOWED_HOSTS=from-file.primepass.com\nDATABASE_HOST=db.file\nCACHE_TTL=120\n",
    )
    .unwrap();

    let file = Bindings::from_env_file(&path).unwrap();
    assert_eq!(file.get("CACHE_TTL"), Some("120"));

    let env: Bindings = file
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .chain([
            ("ALLOWED_HOSTS".to_string(), "api.primepass.com".to_string()),
            (
                "CORS_ALLOWED_ORIGINS".to_string(),
                "https://app.primepass.com".to_string(),
            ),
        ])
        .collect();
    let prod = resolve(Profile::Production, &env, &defaults()).unwrap();
    assert_eq!(prod.core.allowed_hosts, vec!["api.primepass.com"]);
    assert_eq!(prod.database.host, "db.file");
    assert_eq!(prod.cache.timeout.as_secs(), 120);
}

#[test]
fn test_missing_env_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let env = Bindings::from_env_file(&dir.path().join("absent.env")).unwrap();
    assert!(!env.contains("DEBUG"));
}

#[test]
fn test_malformed_admin_url_rejected() {
    let env = production_env().with("ADMIN_URL", "/admin");
    let err = resolve(Profile::Production, &env, &defaults()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InconsistentSettings);
    assert_eq!(err.key(), Some("ADMIN_URL"));
}

#[test]
fn test_malformed_dsn_aborts_load() {
    let env = production_env().with("SENTRY_DSN", "not a dsn");
    let err = SettingsLoader::new(env)
        .load_profile(Profile::Production)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CoercionFailed);
    assert_eq!(err.key(), Some("SENTRY_DSN"));

    let env = production_env().with("SENTRY_DSN", "https://key@o1.ingest.sentry.io/7");
    let resolved = SettingsLoader::new(env)
        .load_profile(Profile::Production)
        .unwrap();
    assert_eq!(
        resolved.error_reporting().and_then(|plan| plan.project_id()),
        Some("7")
    );
}

#[test]
fn test_malformed_overlay_bindings_abort() {
    let cases = [
        (Profile::Production, "USE_S3", "maybe"),
        (Profile::Production, "PGBOUNCER_PORT", "abc"),
        (Profile::Production, "SECURE_HSTS_SECONDS", "x"),
        (Profile::Development, "CELERY_EAGER", "maybe"),
        (Profile::Development, "ENABLE_SILK_PROFILING", "sometimes"),
    ];
    for (profile, key, raw) in cases {
        let env = match profile {
            Profile::Development => Bindings::empty(),
            Profile::Production => production_env(),
        }
        .with(key, raw);
        let err = resolve(profile, &env, &defaults()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CoercionFailed, "{profile} {key}");
        assert_eq!(err.key(), Some(key));
    }
}

#[test]
fn test_development_pgbouncer_port_checked_when_enabled() {
    let env = Bindings::empty()
        .with("USE_PGBOUNCER", "true")
        .with("PGBOUNCER_PORT", "abc");
    let err = resolve(Profile::Development, &env, &defaults()).unwrap_err();
    assert_eq!(err.key(), Some("PGBOUNCER_PORT"));
}

#[test]
fn test_token_lifetime_must_be_whole_seconds() {
    let env = Bindings::empty().with("JWT_ACCESS_TOKEN_LIFETIME", "5m");
    let err = resolve(Profile::Development, &env, &defaults()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::CoercionFailed);
    assert_eq!(err.key(), Some("JWT_ACCESS_TOKEN_LIFETIME"));
}

#[test]
fn test_production_sendgrid_key_only_when_bound() {
    let prod = resolve(Profile::Production, &production_env(), &defaults()).unwrap();
    assert_eq!(prod.email.sendgrid_api_key, None);
    assert_eq!(prod.email.backend, "anymail.backends.sendgrid.EmailBackend");

    let env = production_env().with("SENDGRID_API_KEY", "SG.key");
    let prod = resolve(Profile::Production, &env, &defaults()).unwrap();
    assert_eq!(prod.email.sendgrid_api_key.as_deref(), Some("SG.key"));
}

#[test]
fn test_production_pool_kwargs_replaced_whole() {
    let base = base_settings(&production_env(), Path::new(".")).unwrap();
    let prod = resolve(Profile::Production, &production_env(), &defaults()).unwrap();
    assert_eq!(
        prod.cache.options["CONNECTION_POOL_KWARGS"],
        json!({
            "max_connections": 100,
            "retry_on_timeout": true,
            "socket_keepalive": true,
            "socket_keepalive_options": {},
        })
    );
    assert_eq!(prod.cache.options["SERIALIZER"], base.cache.options["SERIALIZER"]);
}
