use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but its value is invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but its value is invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default; only malformed values fail.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("BCPROP_ENV", "development"))?;
    let bind_addr = parse_addr("BCPROP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("BCPROP_LOG_LEVEL", "info");

    let lookup_budget_ms = parse_u64("BCPROP_LOOKUP_BUDGET_MS", "5000")?;
    if lookup_budget_ms == 0 {
        return Err(invalid(
            "BCPROP_LOOKUP_BUDGET_MS",
            "must be greater than zero".to_string(),
        ));
    }
    let cache_ttl_secs = parse_u64("BCPROP_CACHE_TTL_SECS", "604800")?;
    let http_timeout_secs = parse_u64("BCPROP_HTTP_TIMEOUT_SECS", "15")?;
    let user_agent = or_default("BCPROP_USER_AGENT", "bcprop/0.1 (property-snapshot)");
    let zoning_sources_path = lookup("BCPROP_ZONING_SOURCES_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let geocoder_url = or_default(
        "BCPROP_GEOCODER_URL",
        "https://nominatim.openstreetmap.org/search",
    );
    let geocoder_min_interval_ms = parse_u64("BCPROP_GEOCODER_MIN_INTERVAL_MS", "1000")?;
    let geocoder_max_retries = parse_u32("BCPROP_GEOCODER_MAX_RETRIES", "2")?;
    let rate_limit_per_minute = parse_usize("BCPROP_RATE_LIMIT_PER_MINUTE", "120")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        lookup_budget_ms,
        cache_ttl_secs,
        http_timeout_secs,
        user_agent,
        zoning_sources_path,
        geocoder_url,
        geocoder_min_interval_ms,
        geocoder_max_retries,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BCPROP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
