//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Signing secret used when `JWT_SECRET` is unset. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "greenlife-development-secret";

/// Which cache backend serves read-through payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// Process-local LRU cache
    #[default]
    Memory,
    /// No caching; every read hits the store
    None,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "none" | "off" => Ok(CacheBackend::None),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    pub cache_backend: CacheBackend,
    /// Maximum number of entries the in-memory cache can hold
    pub cache_max_entries: usize,
    /// Expiry sweep interval in seconds
    pub cache_cleanup_interval: u64,
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: u64,
    /// Directory that uploaded tree photos are written under
    pub media_root: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `CACHE_BACKEND` - `memory` or `none` (default: memory)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `JWT_SECRET` - Token signing secret (default: development secret)
    /// - `ACCESS_TOKEN_TTL` - Access token lifetime in seconds (default: 300)
    /// - `REFRESH_TOKEN_TTL` - Refresh token lifetime in seconds (default: 86400)
    /// - `MEDIA_ROOT` - Upload directory (default: media)
    ///
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.cache_max_entries),
            cache_cleanup_interval: parse_var("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cache_cleanup_interval),
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.jwt_secret),
            access_token_ttl: parse_var("ACCESS_TOKEN_TTL").unwrap_or(defaults.access_token_ttl),
            refresh_token_ttl: parse_var("REFRESH_TOKEN_TTL")
                .unwrap_or(defaults.refresh_token_ttl),
            media_root: env::var("MEDIA_ROOT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
        }
    }

    /// True while tokens are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            cache_backend: CacheBackend::Memory,
            cache_max_entries: 10_000,
            cache_cleanup_interval: 60,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl: 300,
            refresh_token_ttl: 86_400,
            media_root: PathBuf::from("media"),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.cache_cleanup_interval, 60);
        assert_eq!(config.access_token_ttl, 300);
        assert_eq!(config.refresh_token_ttl, 86_400);
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "SERVER_PORT",
            "CACHE_BACKEND",
            "CACHE_MAX_ENTRIES",
            "CACHE_CLEANUP_INTERVAL",
            "JWT_SECRET",
            "ACCESS_TOKEN_TTL",
            "REFRESH_TOKEN_TTL",
            "MEDIA_ROOT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.cache_max_entries, 10_000);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_cache_backend_parse() {
        assert_eq!("memory".parse::<CacheBackend>(), Ok(CacheBackend::Memory));
        assert_eq!(" None ".parse::<CacheBackend>(), Ok(CacheBackend::None));
        assert!("redis".parse::<CacheBackend>().is_err());
    }
}
