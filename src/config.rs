//! Service configuration loaded from environment variables.
//!
//! ## Required
//! - `DATABASE_URL` - Postgres connection string
//! - `SESSION_SECRET` - key for hashing session tokens (min 32 chars)
//!
//! ## Optional
//! - `HOST` (default 0.0.0.0), `PORT` (default 8083)
//! - `DATABASE_MAX_CONNECTIONS` (default 10)
//! - `SESSION_TTL_HOURS` (default 24, at most one year)
//! - `NATS_URL` - publish domain events when set

use secrecy::SecretString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub session_secret: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub database_max_connections: u32,
    pub session_ttl_hours: i64,
    pub nats_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests never touch the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or(ConfigError::MissingEnvVar(key))
        };

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "SESSION_SECRET",
                format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters"),
            ));
        }

        let session_ttl_hours: i64 = parse_or(&lookup, "SESSION_TTL_HOURS", 24)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::InvalidEnvVar(
                "SESSION_TTL_HOURS",
                format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            ));
        }

        Ok(Self {
            database_url: SecretString::from(required("DATABASE_URL")?),
            session_secret: SecretString::from(session_secret),
            host: parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", 8083)?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            session_ttl_hours,
            nats_url: lookup("NATS_URL").filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/inv"), ("SESSION_SECRET", SECRET)])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.database_url.expose_secret(), "postgres://localhost/inv");
        assert!(config.nats_url.is_none());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8083");
    }

    #[test]
    fn test_missing_and_invalid() {
        let err = AppConfig::from_lookup(lookup(&[("SESSION_SECRET", SECRET)])).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnvVar("DATABASE_URL"));

        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "x"), ("SESSION_SECRET", "short")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar("SESSION_SECRET", _)));

        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "x"), ("SESSION_SECRET", SECRET), ("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar("PORT", _)));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-3")]
    #[case::centuries("9223372036854775807")]
    fn test_session_ttl_out_of_range(#[case] ttl: &str) {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "x"), ("SESSION_SECRET", SECRET), ("SESSION_TTL_HOURS", ttl)])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar("SESSION_TTL_HOURS", _)));
    }
}
