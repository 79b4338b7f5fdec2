//! Environment configuration, read once at startup.

use std::time::Duration;

use podium_orchestration::SagaTimings;

use crate::error::AppError;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Everything the process reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// PostgreSQL connection string. In-memory stores when absent.
    pub database_url: Option<String>,
    /// Pool size for the PostgreSQL stores.
    pub db_max_connections: u32,
    /// Saga delays.
    pub timings: SagaTimings,
    /// Players for the demo matchmaking opened at startup; zero disables it.
    pub demo_players: u32,
    /// OTLP collector endpoint. Span export is off when absent.
    pub otlp_endpoint: Option<String>,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `get_env`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a value does not parse.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SagaTimings::default();
        let db_max_connections = parse_u32(
            &get_env,
            "PODIUM_DB_MAX_CONNECTIONS",
            DEFAULT_DB_MAX_CONNECTIONS,
        )?;
        if db_max_connections == 0 {
            return Err(AppError::Config(
                "PODIUM_DB_MAX_CONNECTIONS must be positive".to_owned(),
            ));
        }
        Ok(Self {
            database_url: non_empty(get_env("DATABASE_URL")),
            db_max_connections,
            timings: SagaTimings {
                session_start_delay: parse_millis(
                    &get_env,
                    "PODIUM_SESSION_START_DELAY_MS",
                    defaults.session_start_delay,
                )?,
                stage_break: parse_millis(&get_env, "PODIUM_STAGE_BREAK_MS", defaults.stage_break)?,
                jump_interval: parse_millis(
                    &get_env,
                    "PODIUM_JUMP_INTERVAL_MS",
                    defaults.jump_interval,
                )?,
                round_end_delay: parse_millis(
                    &get_env,
                    "PODIUM_ROUND_END_DELAY_MS",
                    defaults.round_end_delay,
                )?,
                round_break: parse_millis(&get_env, "PODIUM_ROUND_BREAK_MS", defaults.round_break)?,
                pick_timeout: parse_millis(
                    &get_env,
                    "PODIUM_PICK_TIMEOUT_MS",
                    defaults.pick_timeout,
                )?,
                matchmaking_timeout: parse_millis(
                    &get_env,
                    "PODIUM_MATCHMAKING_TIMEOUT_MS",
                    defaults.matchmaking_timeout,
                )?,
                end_session_delay: parse_millis(
                    &get_env,
                    "PODIUM_END_SESSION_DELAY_MS",
                    defaults.end_session_delay,
                )?,
            },
            demo_players: parse_u32(&get_env, "PODIUM_DEMO_PLAYERS", 0)?,
            otlp_endpoint: non_empty(get_env("OTEL_EXPORTER_OTLP_ENDPOINT")),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_u32<F>(get_env: &F, key: &str, default: u32) -> Result<u32, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(get_env(key)) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a non-negative integer: {e}"))),
    }
}

fn parse_millis<F>(get_env: &F, key: &str, default: Duration) -> Result<Duration, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(get_env(key)) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Duration::from_millis)
            .map_err(|e| AppError::Config(format!("{key} must be milliseconds: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, AppError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_env_with(|key| env.get(key).cloned())
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        // Act
        let config = config_from(&[]).unwrap();

        // Assert
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.timings, SagaTimings::default());
        assert_eq!(config.demo_players, 0);
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_values_are_parsed() {
        // Arrange
        let pairs = [
            ("DATABASE_URL", "postgres://localhost/podium"),
            ("PODIUM_DB_MAX_CONNECTIONS", "4"),
            ("PODIUM_JUMP_INTERVAL_MS", "250"),
            ("PODIUM_PICK_TIMEOUT_MS", " 1500 "),
            ("PODIUM_DEMO_PLAYERS", "3"),
        ];

        // Act
        let config = config_from(&pairs).unwrap();

        // Assert
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/podium")
        );
        assert_eq!(config.db_max_connections, 4);
        assert_eq!(config.timings.jump_interval, Duration::from_millis(250));
        assert_eq!(config.timings.pick_timeout, Duration::from_millis(1500));
        assert_eq!(config.timings.stage_break, SagaTimings::default().stage_break);
        assert_eq!(config.demo_players, 3);
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();

        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_malformed_timing_is_config_error() {
        let result = config_from(&[("PODIUM_ROUND_BREAK_MS", "soon")]);

        let Err(AppError::Config(message)) = result else {
            panic!("expected a config error");
        };
        assert!(message.contains("PODIUM_ROUND_BREAK_MS"));
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let result = config_from(&[("PODIUM_DB_MAX_CONNECTIONS", "0")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
