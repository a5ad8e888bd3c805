use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{ClientConfig, Environment, ServerConfig};
use crate::ConfigError;

/// Load server configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_server_config() -> Result<ServerConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_server_config(|key| std::env::var(key))
}

/// Load client configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_client_config() -> Result<ClientConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_client_config(|key| std::env::var(key))
}

/// Env-var reader over an injectable lookup, so parsing is testable with a
/// plain `HashMap` instead of process-global `set_var`.
struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    fn require(&self, var: &str) -> Result<String, ConfigError> {
        (self.lookup)(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).ok().filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_string())
    }

    fn parse<T>(&self, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.or_default(var, default);
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }
}

fn build_server_config<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let env = EnvReader { lookup };

    let database_url = env.require("DATABASE_URL")?;
    let environment = parse_environment(&env.or_default("PROPDB_ENV", "development"))?;
    let bind_addr = env.parse::<SocketAddr>("PROPDB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = env.or_default("PROPDB_LOG_LEVEL", "info");

    let db_max_connections = env.parse::<u32>("PROPDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = env.parse::<u32>("PROPDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = env.parse::<u64>("PROPDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let rate_limit_per_minute = env.parse::<usize>("PROPDB_RATE_LIMIT_PER_MINUTE", "120")?;

    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "PROPDB_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "must not exceed PROPDB_DB_MAX_CONNECTIONS ({db_max_connections})"
            ),
        });
    }

    Ok(ServerConfig {
        database_url,
        env: environment,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        rate_limit_per_minute,
    })
}

fn build_client_config<F>(lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let env = EnvReader { lookup };

    let api_url = env.or_default("PROPDB_API_URL", "http://localhost:3000");
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "PROPDB_API_URL".to_string(),
            reason: format!("expected an http(s) URL, got '{api_url}'"),
        });
    }

    Ok(ClientConfig {
        api_url,
        api_token: env.optional("PROPDB_API_TOKEN"),
        log_level: env.or_default("PROPDB_LOG_LEVEL", "info"),
        request_timeout_secs: env.parse::<u64>("PROPDB_REQUEST_TIMEOUT_SECS", "30")?,
        max_retries: env.parse::<u32>("PROPDB_MAX_RETRIES", "2")?,
        retry_backoff_base_ms: env.parse::<u64>("PROPDB_RETRY_BACKOFF_BASE_MS", "250")?,
        debounce_ms: env.parse::<u64>("PROPDB_DEBOUNCE_MS", "300")?,
        favorites_path: PathBuf::from(env.or_default("PROPDB_FAVORITES_PATH", "./favorites.json")),
    })
}

/// Parse a string into an `Environment` variant.
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PROPDB_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
