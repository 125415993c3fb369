#[cfg(test)]
mod tests {
    use crate::env::{AppConfig, DEFAULT_DATABASE_URL};
    use serial_test::serial;

    const KEYS: [&str; 5] = [
        "DATABASE_URL",
        "SESSION_TTL_HOURS",
        "SESSION_SWEEP_INTERVAL_SECS",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "OTEL_EXPORTER_OTLP_HEADERS",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        KEYS.iter().map(|key| (*key, None)).collect()
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        temp_env::with_vars(unset_all(), || {
            let config = AppConfig::from_env().expect("Defaults should load");

            assert_eq!(config, AppConfig::default());
            assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
            assert_eq!(config.session_ttl_hours, 24);
            assert!(config.otlp_endpoint.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        temp_env::with_vars(
            vec![
                ("DATABASE_URL", Some("sqlite://other.db")),
                ("SESSION_TTL_HOURS", Some("2")),
                ("SESSION_SWEEP_INTERVAL_SECS", Some("60")),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("http://localhost:4317")),
                ("OTEL_EXPORTER_OTLP_HEADERS", Some("x-api-key=secret")),
            ],
            || {
                let config = AppConfig::from_env().expect("Config should load");

                assert_eq!(config.database_url, "sqlite://other.db");
                assert_eq!(config.session_ttl_hours, 2);
                assert_eq!(config.session_sweep_interval_secs, 60);
                assert_eq!(
                    config.otlp_endpoint.as_deref(),
                    Some("http://localhost:4317")
                );
                assert_eq!(
                    config.otlp_headers,
                    vec![("x-api-key".to_string(), "secret".to_string())]
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_blank_values_fall_back_to_defaults() {
        temp_env::with_vars(
            vec![
                ("DATABASE_URL", Some("  ")),
                ("SESSION_TTL_HOURS", None),
                ("SESSION_SWEEP_INTERVAL_SECS", None),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("")),
                ("OTEL_EXPORTER_OTLP_HEADERS", None),
            ],
            || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
                assert!(config.otlp_endpoint.is_none());
            },
        );
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        temp_env::with_vars(
            vec![
                ("SESSION_TTL_HOURS", Some("0")),
                ("SESSION_SWEEP_INTERVAL_SECS", None),
                ("OTEL_EXPORTER_OTLP_HEADERS", None),
            ],
            || assert!(AppConfig::from_env().is_err()),
        );

        temp_env::with_vars(
            vec![
                ("SESSION_TTL_HOURS", Some("soon")),
                ("SESSION_SWEEP_INTERVAL_SECS", None),
                ("OTEL_EXPORTER_OTLP_HEADERS", None),
            ],
            || assert!(AppConfig::from_env().is_err()),
        );

        temp_env::with_vars(
            vec![
                ("SESSION_TTL_HOURS", None),
                ("SESSION_SWEEP_INTERVAL_SECS", None),
                ("OTEL_EXPORTER_OTLP_HEADERS", Some("no-equals-sign")),
            ],
            || assert!(AppConfig::from_env().is_err()),
        );
    }
}
