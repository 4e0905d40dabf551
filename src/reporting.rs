//! Error-reporting initialization plan.
//!
//! Resolution never touches the reporting SDK. The loader calls
//! [`plan_error_reporting`] on the validated settings, so a malformed DSN
//! stops startup, and consumers hand the plan to whatever client they link.
//! No DSN means reporting stays off.

use crate::config::Settings;
use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReportingPlan {
    /// Parsed DSN. Serialized without its secret part.
    #[serde(serialize_with = "serialize_dsn")]
    pub dsn: Url,
    pub environment: String,
    pub release: String,
    pub traces_sample_rate: f64,
    pub send_default_pii: bool,
    pub integrations: Vec<String>,
}

impl ErrorReportingPlan {
    /// Project id taken from the DSN path (`https://key@host/<id>`).
    pub fn project_id(&self) -> Option<&str> {
        self.dsn
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|id| !id.is_empty())
    }
}

fn serialize_dsn<S: serde::Serializer>(dsn: &Url, serializer: S) -> Result<S::Ok, S::Error> {
    let mut public = dsn.clone();
    // Neither call fails on URLs with a host, which a parsed DSN always has.
    let _ = public.set_username("");
    let _ = public.set_password(None);
    serializer.serialize_str(public.as_str())
}

/// Build the reporting plan, or `None` when no DSN is bound.
pub fn plan_error_reporting(settings: &Settings) -> ConfigResult<Option<ErrorReportingPlan>> {
    let reporting = &settings.error_reporting;
    let Some(raw) = reporting.dsn.as_deref().filter(|dsn| !dsn.is_empty()) else {
        debug!("SENTRY_DSN not bound, error reporting disabled");
        return Ok(None);
    };

    let dsn = Url::parse(raw)
        .ok()
        .filter(|url| url.has_host())
        .ok_or_else(|| ConfigError::coercion("SENTRY_DSN", "********", "a DSN URL"))?;

    let plan = ErrorReportingPlan {
        dsn,
        environment: reporting.environment.clone(),
        release: reporting.release.clone(),
        traces_sample_rate: reporting.traces_sample_rate,
        send_default_pii: reporting.send_default_pii,
        integrations: reporting.integrations.clone(),
    };
    info!(
        environment = %plan.environment,
        release = %plan.release,
        sample_rate = plan.traces_sample_rate,
        "Error reporting enabled"
    );
    Ok(Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bindings, Profile, ResolveOptions, resolve};

    fn production(env: Bindings) -> Settings {
        let env = env
            .with("ALLOWED_HOSTS", "api.primepass.com")
            .with("DATABASE_HOST", "db.internal")
            .with("CORS_ALLOWED_ORIGINS", "https://app.primepass.com");
        resolve(Profile::Production, &env, &ResolveOptions::default()).unwrap()
    }

    #[test]
    fn test_no_dsn_means_disabled() {
        let settings = production(Bindings::empty());
        assert!(plan_error_reporting(&settings).unwrap().is_none());
    }

    #[test]
    fn test_plan_carries_reporting_settings() {
        let settings = production(
            Bindings::empty()
                .with("SENTRY_DSN", "https://abc123@o1.ingest.sentry.io/42")
                .with("RELEASE_VERSION", "2.3.0"),
        );
        let plan = plan_error_reporting(&settings).unwrap().unwrap();
        assert_eq!(plan.release, "2.3.0");
        assert_eq!(plan.environment, "production");
        assert_eq!(plan.project_id(), Some("42"));
        assert!(!plan.send_default_pii);

        let shown = serde_json::to_value(&plan).unwrap();
        assert!(!shown["dsn"].as_str().unwrap().contains("abc123"));
    }

    #[test]
    fn test_malformed_dsn_rejected() {
        let mut settings = production(Bindings::empty());
        settings.error_reporting.dsn = Some("not a dsn".into());
        let err = plan_error_reporting(&settings).unwrap_err();
        assert_eq!(err.key(), Some("SENTRY_DSN"));
    }
}
