//! Tracing / logging initialisation helpers.

use chainperm_core::config::LogConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive string, e.g. "info,chainperm_listener=debug".
pub fn directives(config: &LogConfig) -> String {
    let mut directives = config.level.clone();
    let mut components: Vec<_> = config
        .components
        .iter()
        .map(|(component, level)| (component.replace('-', "_"), level))
        .collect();
    components.sort();
    for (target, level) in components {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// `RUST_LOG` wins over the configured directives when set.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(config)))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup; later calls are no-ops.
pub fn init_tracing(config: &LogConfig) {
    let filter = build_filter(config);

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
    };
    if let Err(e) = result {
        tracing::debug!("tracing already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_names_become_targets() {
        let config = LogConfig {
            level: "warn".into(),
            components: [
                ("chainperm-listener".to_string(), "debug".to_string()),
                ("chainperm_gateway".to_string(), "trace".to_string()),
            ]
            .into(),
            json: false,
        };
        assert_eq!(
            directives(&config),
            "warn,chainperm_gateway=trace,chainperm_listener=debug"
        );
    }

    #[test]
    fn targets_sort_after_normalising() {
        let config = LogConfig {
            level: "info".into(),
            components: [
                ("chainperm-listener".to_string(), "debug".to_string()),
                ("chainperm_core".to_string(), "warn".to_string()),
                ("chainperm-contract".to_string(), "trace".to_string()),
            ]
            .into(),
            json: false,
        };
        assert_eq!(
            directives(&config),
            "info,chainperm_contract=trace,chainperm_core=warn,chainperm_listener=debug"
        );
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing(&LogConfig::default());
        init_tracing(&LogConfig::default());
    }
}
