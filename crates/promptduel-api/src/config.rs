use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub turso: Option<TursoSyncConfig>,
    pub supabase_url: String,
    pub supabase_jwks_url: String,
    pub supabase_jwt_issuer: String,
    pub supabase_jwt_audience: String,
    pub jwks_cache_ttl: Duration,
    pub auth_clock_skew: Duration,
    pub rate_limit_window: Duration,
    pub vote_rate_limit_per_window: u32,
    pub mutation_rate_limit_per_window: u32,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TursoSyncConfig {
    pub database_url: String,
    pub auth_token: String,
}

impl fmt::Debug for TursoSyncConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TursoSyncConfig")
            .field("database_url", &self.database_url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("turso", &self.turso)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_jwks_url", &self.supabase_jwks_url)
            .field("supabase_jwt_issuer", &self.supabase_jwt_issuer)
            .field("supabase_jwt_audience", &self.supabase_jwt_audience)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "vote_rate_limit_per_window",
                &self.vote_rate_limit_per_window,
            )
            .field(
                "mutation_rate_limit_per_window",
                &self.mutation_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "PROMPTDUEL_BIND_ADDR", "127.0.0.1:8080");
        let db_path = value_or_default(&lookup, "PROMPTDUEL_DB_PATH", "promptduel.db");

        let supabase_url = required_trimmed(&lookup, "SUPABASE_URL")?;
        if !is_http_url(&supabase_url) {
            return Err(ConfigError::Invalid(
                "SUPABASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let default_jwks = format!(
            "{}/auth/v1/.well-known/jwks.json",
            trim_trailing(&supabase_url)
        );
        let supabase_jwks_url = value_or_default(&lookup, "SUPABASE_JWKS_URL", &default_jwks);
        if !is_http_url(&supabase_jwks_url) {
            return Err(ConfigError::Invalid(
                "SUPABASE_JWKS_URL must start with http:// or https://".to_string(),
            ));
        }

        let default_issuer = format!("{}/auth/v1", trim_trailing(&supabase_url));
        let supabase_jwt_issuer = value_or_default(&lookup, "SUPABASE_JWT_ISSUER", &default_issuer);
        let supabase_jwt_audience =
            value_or_default(&lookup, "SUPABASE_JWT_AUDIENCE", "authenticated");

        let jwks_cache_ttl_secs = parse_ranged(
            &lookup,
            "SUPABASE_JWKS_CACHE_TTL_SECS",
            "300",
            30..=86_400,
        )?;
        let auth_clock_skew_secs = parse_ranged(&lookup, "AUTH_CLOCK_SKEW_SECS", "60", 0..=300)?;
        let rate_limit_window_secs =
            parse_ranged(&lookup, "RATE_LIMIT_WINDOW_SECS", "60", 10..=3_600)?;
        let vote_rate_limit_per_window =
            parse_ranged(&lookup, "VOTE_RATE_LIMIT_PER_WINDOW", "60", 1..=5_000)?;
        let mutation_rate_limit_per_window =
            parse_ranged(&lookup, "MUTATION_RATE_LIMIT_PER_WINDOW", "120", 1..=5_000)?;

        let turso = parse_turso_config(&lookup)?;

        #[allow(clippy::cast_possible_truncation)]
        Ok(Self {
            bind_addr,
            db_path,
            turso,
            supabase_url,
            supabase_jwks_url,
            supabase_jwt_issuer,
            supabase_jwt_audience,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            vote_rate_limit_per_window: vote_rate_limit_per_window as u32,
            mutation_rate_limit_per_window: mutation_rate_limit_per_window as u32,
        })
    }
}

fn parse_turso_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<TursoSyncConfig>, ConfigError> {
    let database_url = optional_trimmed(&lookup, "TURSO_DATABASE_URL");
    let auth_token = optional_trimmed(&lookup, "TURSO_AUTH_TOKEN");

    if database_url.is_none() && auth_token.is_none() {
        return Ok(None);
    }

    let database_url = database_url.ok_or(ConfigError::MissingVar("TURSO_DATABASE_URL"))?;
    let auth_token = auth_token.ok_or(ConfigError::MissingVar("TURSO_AUTH_TOKEN"))?;

    Ok(Some(TursoSyncConfig {
        database_url,
        auth_token,
    }))
}

fn parse_ranged(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{name} must be an integer in [{}, {}]",
                range.start(),
                range.end()
            ))
        })?;

    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }

    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
