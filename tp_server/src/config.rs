//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use teen_patti::{db::DatabaseConfig, room::RoomConfig};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration. `None` runs on the in-memory ledger.
    pub database: Option<DatabaseConfig>,
    /// Security configuration
    pub security: SecurityConfig,
    /// Settings every spawned room starts with
    pub room: RoomConfig,
    /// Prometheus scrape address, if metrics are exported
    pub metrics_bind: Option<SocketAddr>,
    /// Opening balance for unknown users on the in-memory ledger
    pub default_balance: i64,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Secret shared with the identity service for HS256 tokens (required)
    pub jwt_secret: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required_or("SERVER_BIND", SocketAddr::from(([127, 0, 0, 1], 6969)))?,
        };

        let database = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .map(|database_url| {
                let defaults = DatabaseConfig::development();
                DatabaseConfig {
                    database_url,
                    max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                    min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
                    connection_timeout_secs: parse_env_or(
                        "DB_CONNECTION_TIMEOUT_SECS",
                        defaults.connection_timeout_secs,
                    ),
                    idle_timeout_secs: parse_env_or(
                        "DB_IDLE_TIMEOUT_SECS",
                        defaults.idle_timeout_secs,
                    ),
                    max_lifetime_secs: parse_env_or(
                        "DB_MAX_LIFETIME_SECS",
                        defaults.max_lifetime_secs,
                    ),
                }
            });

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use the secret the identity service signs tokens with".to_string(),
        })?;

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not an IP:PORT address"),
            })?),
            Err(_) => None,
        };

        let defaults = RoomConfig::default();
        let room = RoomConfig {
            max_seats: parse_env_or("ROOM_MAX_SEATS", defaults.max_seats),
            boot_amount: parse_env_or("ROOM_BOOT_AMOUNT", defaults.boot_amount),
            min_join_balance: parse_env_or("ROOM_MIN_JOIN_BALANCE", defaults.min_join_balance),
            turn_timeout_secs: parse_env_or("ROOM_TURN_TIMEOUT_SECS", defaults.turn_timeout_secs),
            reconnect_grace_secs: parse_env_or(
                "ROOM_RECONNECT_GRACE_SECS",
                defaults.reconnect_grace_secs,
            ),
            join_grace_secs: parse_env_or("ROOM_JOIN_GRACE_SECS", defaults.join_grace_secs),
            restart_delay_secs: parse_env_or(
                "ROOM_RESTART_DELAY_SECS",
                defaults.restart_delay_secs,
            ),
            sideshow_fallback_secs: parse_env_or(
                "ROOM_SIDESHOW_FALLBACK_SECS",
                defaults.sideshow_fallback_secs,
            ),
            bots_enabled: parse_env_or("ROOM_BOTS_ENABLED", defaults.bots_enabled),
            bot_starting_balance: parse_env_or(
                "ROOM_BOT_STARTING_BALANCE",
                defaults.bot_starting_balance,
            ),
            bot_min_think_ms: parse_env_or("ROOM_BOT_MIN_THINK_MS", defaults.bot_min_think_ms),
            bot_max_think_ms: parse_env_or("ROOM_BOT_MAX_THINK_MS", defaults.bot_max_think_ms),
        };

        Ok(ServerConfig {
            bind,
            database,
            security: SecurityConfig { jwt_secret },
            room,
            metrics_bind,
            default_balance: parse_env_or("DEFAULT_BALANCE", 10_000),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if let Some(database) = &self.database
            && database.min_connections > database.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    database.max_connections
                ),
            });
        }

        if self.default_balance < 0 {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_BALANCE".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        self.room.validate().map_err(|reason| ConfigError::Invalid {
            var: "ROOM_*".to_string(),
            reason,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env_or`], but a value that is set and malformed is an error
fn parse_env_required_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{raw}' could not be parsed"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: None,
            security: SecurityConfig {
                jwt_secret: "a".repeat(32),
            },
            room: RoomConfig::default(),
            metrics_bind: None,
            default_balance: 10_000,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Ask the identity service".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Ask the identity service"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = config();
        config.security.jwt_secret = "short".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    fn test_room_settings_are_validated() {
        let mut config = config();
        config.room.boot_amount = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Boot amount must be positive"));
    }

    #[test]
    fn test_inverted_pool_bounds_rejected() {
        let mut config = config();
        config.database = Some(DatabaseConfig {
            min_connections: 50,
            max_connections: 10,
            ..DatabaseConfig::development()
        });

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_unset_variable_falls_back_to_default() {
        assert_eq!(parse_env_or("TP_TEST_SURELY_UNSET_VAR", 42_u32), 42);
        assert_eq!(
            parse_env_required_or("TP_TEST_SURELY_UNSET_VAR", 7_i64).unwrap(),
            7
        );
    }
}
