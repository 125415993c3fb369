use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tracing::{info, warn};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://mentor_booking.db?mode=rwc";

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub session_sweep_interval_secs: u64,
    pub otlp_endpoint: Option<String>,
    pub otlp_headers: Vec<(String, String)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            session_ttl_hours: 24,
            session_sweep_interval_secs: 3600,
            otlp_endpoint: None,
            otlp_headers: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let session_ttl_hours = parse_var("SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
        if session_ttl_hours <= 0 {
            return Err(anyhow!("SESSION_TTL_HOURS must be positive"));
        }

        let otlp_headers = match non_empty_var("OTEL_EXPORTER_OTLP_HEADERS") {
            Some(raw) => parse_headers(&raw).context("Invalid OTEL_EXPORTER_OTLP_HEADERS")?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            session_ttl_hours,
            session_sweep_interval_secs: parse_var(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval_secs,
            )?,
            otlp_endpoint: non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            otlp_headers,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    dotenvy::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}

/// Parses `key=value,key=value` pairs.
fn parse_headers(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected key=value, got '{}'", pair))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_headers;

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers("x-honeycomb-team=abc, x-dataset = bookings").unwrap();
        assert_eq!(
            headers,
            vec![
                ("x-honeycomb-team".to_string(), "abc".to_string()),
                ("x-dataset".to_string(), "bookings".to_string()),
            ]
        );

        assert!(parse_headers("missing-separator").is_err());
    }
}
