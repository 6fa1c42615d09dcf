/// Configuration management for Nodeway
///
/// Handles server configuration, the definition database and engine parameters.

use crate::runtime::engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Execution engine configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Workflow definition store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `sqlite::memory:` for a throwaway store
    pub path: String,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("NODEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("NODEWAY_PORT", 3004),
            },
            database: DatabaseConfig {
                path: std::env::var("NODEWAY_DATABASE").unwrap_or_else(|_| "data/workflows.db".to_string()),
            },
            engine: EngineConfig {
                node_timeout_ms: env_or("NODEWAY_NODE_TIMEOUT_MS", EngineConfig::default().node_timeout_ms),
            },
        }
    }
}

impl Config {
    /// Configuration backed by an in-memory database, for tests and demos
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.database.path = "sqlite::memory:".to_string();
        config
    }
}

/// Parse an environment variable, falling back on absence or bad input
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("NODEWAY_TEST_PORT_GARBAGE", "not-a-port");
        assert_eq!(env_or::<u16>("NODEWAY_TEST_PORT_GARBAGE", 3004), 3004);
        std::env::set_var("NODEWAY_TEST_PORT_GOOD", "8080");
        assert_eq!(env_or::<u16>("NODEWAY_TEST_PORT_GOOD", 3004), 8080);
    }

    #[test]
    fn test_in_memory_database() {
        assert_eq!(Config::in_memory().database.path, "sqlite::memory:");
    }
}
