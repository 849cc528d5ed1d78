use anyhow::Result;
use prometheus::Registry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::metrics;

const DEFAULT_FILTER: &str = "registration_api=debug,tower_http=info";

pub struct Observability {
    pub registry: Registry,
}

impl Observability {
    /// Installs the global tracing subscriber and builds the metrics registry.
    ///
    /// `LOG_FORMAT=json` switches to JSON lines; anything else uses the
    /// human-readable formatter. `RUST_LOG` overrides the default filter.
    pub fn init() -> Result<Self> {
        let registry = Self::registry()?;

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
        let json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }

        tracing::info!(json_logs = json, "Observability stack initialized (tracing + Prometheus)");
        Ok(Self { registry })
    }

    /// Metrics registry with every collector registered under the `registration` prefix
    pub fn registry() -> Result<Registry> {
        let registry = Registry::new_custom(Some("registration".into()), None)?;
        metrics::register_all(&registry)?;
        Ok(registry)
    }
}
