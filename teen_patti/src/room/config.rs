//! Room configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Room configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum seats, bots included (default: 5)
    pub max_seats: usize,

    /// Boot collected from every player when a round starts
    pub boot_amount: i64,

    /// Balance required to take a seat
    pub min_join_balance: i64,

    /// Seconds the turn holder has to act
    pub turn_timeout_secs: u64,

    /// Seconds a disconnected player has to come back
    pub reconnect_grace_secs: u64,

    /// Seconds to wait for more joiners before dealing
    pub join_grace_secs: u64,

    /// Seconds the result stays on the table before the next round
    pub restart_delay_secs: u64,

    /// Sideshow wait when no turn clock is running
    pub sideshow_fallback_secs: u64,

    /// Whether filler bots are seated for short tables
    pub bots_enabled: bool,

    /// Stack a bot sits down with
    pub bot_starting_balance: i64,

    /// Bot thinking delay range in milliseconds
    pub bot_min_think_ms: u64,
    pub bot_max_think_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_seats: 5,
            boot_amount: 100,
            min_join_balance: 100,
            turn_timeout_secs: 30,
            reconnect_grace_secs: 10,
            join_grace_secs: 5,
            restart_delay_secs: 10,
            sideshow_fallback_secs: 30,
            bots_enabled: true,
            bot_starting_balance: 10_000,
            bot_min_think_ms: 1_000,
            bot_max_think_ms: 3_000,
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_seats < 2 || self.max_seats > 17 {
            return Err("Max seats must be between 2 and 17".to_string());
        }

        if self.boot_amount <= 0 {
            return Err("Boot amount must be positive".to_string());
        }

        if self.min_join_balance < self.boot_amount {
            return Err("Minimum join balance must cover the boot".to_string());
        }

        if self.turn_timeout_secs == 0 {
            return Err("Turn timeout must be at least 1 second".to_string());
        }

        if self.bot_max_think_ms < self.bot_min_think_ms {
            return Err("Bot think range is inverted".to_string());
        }

        if self.bots_enabled && self.bot_max_think_ms >= self.turn_timeout_secs * 1_000 {
            return Err("Bots must act before their turn times out".to_string());
        }

        Ok(())
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_secs(self.reconnect_grace_secs)
    }

    pub fn join_grace(&self) -> Duration {
        Duration::from_secs(self.join_grace_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    pub fn sideshow_fallback(&self) -> Duration {
        Duration::from_secs(self.sideshow_fallback_secs)
    }

    /// Filler bots needed for `real_players` humans
    pub fn bots_for(&self, real_players: usize) -> usize {
        if !self.bots_enabled {
            return 0;
        }
        match real_players {
            1 => 2,
            2 => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RoomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.turn_timeout(), Duration::from_secs(30));
        assert_eq!(config.reconnect_grace(), Duration::from_secs(10));
    }

    #[test]
    fn test_bot_fill_counts() {
        let config = RoomConfig::default();
        assert_eq!(config.bots_for(0), 0);
        assert_eq!(config.bots_for(1), 2);
        assert_eq!(config.bots_for(2), 1);
        assert_eq!(config.bots_for(3), 0);

        let no_bots = RoomConfig {
            bots_enabled: false,
            ..Default::default()
        };
        assert_eq!(no_bots.bots_for(1), 0);
    }

    #[test]
    fn test_rejects_join_balance_below_boot() {
        let config = RoomConfig {
            min_join_balance: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_slow_bots() {
        let config = RoomConfig {
            bot_max_think_ms: 30_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
