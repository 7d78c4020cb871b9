//! Runtime configuration.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::hub::OverflowPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("ping period ({ping:?}) must be shorter than the pong wait ({pong:?})")]
    PingNotBeforePong { ping: Duration, pong: Duration },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Tunables of the hub and its sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Per-session outbound queue size
    pub outbound_capacity: usize,
    /// Command queue size of every actor
    pub command_capacity: usize,
    /// Per-session control queue size (invitations)
    pub control_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Interval between keep-alive pings
    pub ping_period: Duration,
    /// Read liveness deadline, refreshed by every inbound frame
    pub pong_wait: Duration,
    /// Deadline for a single transport write
    pub write_wait: Duration,
    /// Largest accepted inbound frame in bytes
    pub max_message_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            command_capacity: 64,
            control_capacity: 16,
            overflow_policy: OverflowPolicy::Disconnect,
            ping_period: Duration::from_secs(54),
            pong_wait: Duration::from_secs(60),
            write_wait: Duration::from_secs(10),
            max_message_size: 10_000,
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("outbound capacity", self.outbound_capacity),
            ("command capacity", self.command_capacity),
            ("control capacity", self.control_capacity),
            ("max message size", self.max_message_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.write_wait.is_zero() {
            return Err(ConfigError::Zero("write wait"));
        }
        if self.ping_period.is_zero() {
            return Err(ConfigError::Zero("ping period"));
        }
        if self.ping_period >= self.pong_wait {
            return Err(ConfigError::PingNotBeforePong {
                ping: self.ping_period,
                pong: self.pong_wait,
            });
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "yakata-server")]
#[command(about = "Real-time house/room chat hub over WebSocket", long_about = None)]
pub struct ServerArgs {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "YAKATA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "YAKATA_PORT", default_value = "8080")]
    pub port: u16,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "YAKATA_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Bearer token lifetime in hours
    #[arg(long, env = "YAKATA_TOKEN_TTL_HOURS", default_value = "24")]
    pub token_ttl_hours: u64,

    /// Outbound queue size per session
    #[arg(long, env = "YAKATA_OUTBOUND_CAPACITY", default_value = "256")]
    pub outbound_capacity: usize,

    /// What to do with a session whose outbound queue is full
    #[arg(long, env = "YAKATA_OVERFLOW_POLICY", value_enum, default_value_t = OverflowPolicy::Disconnect)]
    pub overflow_policy: OverflowPolicy,

    #[arg(long, env = "YAKATA_PING_PERIOD_SECS", default_value = "54")]
    pub ping_period_secs: u64,

    #[arg(long, env = "YAKATA_PONG_WAIT_SECS", default_value = "60")]
    pub pong_wait_secs: u64,

    #[arg(long, env = "YAKATA_WRITE_WAIT_SECS", default_value = "10")]
    pub write_wait_secs: u64,

    /// Largest accepted inbound frame in bytes
    #[arg(long, env = "YAKATA_MAX_MESSAGE_SIZE", default_value = "10000")]
    pub max_message_size: usize,

    /// Publish presence events on the in-process presence bus
    #[arg(long, env = "YAKATA_PUBSUB")]
    pub pubsub: bool,
}

impl ServerArgs {
    /// Build and validate the hub configuration.
    pub fn hub_config(&self) -> Result<HubConfig, ConfigError> {
        let config = HubConfig {
            outbound_capacity: self.outbound_capacity,
            overflow_policy: self.overflow_policy,
            ping_period: Duration::from_secs(self.ping_period_secs),
            pong_wait: Duration::from_secs(self.pong_wait_secs),
            write_wait: Duration::from_secs(self.write_wait_secs),
            max_message_size: self.max_message_size,
            ..HubConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_hours.saturating_mul(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        // テスト項目: デフォルト設定はバリデーションを通過する
        // given (前提条件):
        let config = HubConfig::default();

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_ping_must_be_shorter_than_pong_wait() {
        // テスト項目: ping 間隔が pong 待ち時間以上だとエラーになる
        // given (前提条件):
        let config = HubConfig {
            ping_period: Duration::from_secs(60),
            pong_wait: Duration::from_secs(60),
            ..HubConfig::default()
        };

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert!(matches!(result, Err(ConfigError::PingNotBeforePong { .. })));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        // テスト項目: 容量 0 はエラーになる
        // given (前提条件):
        let config = HubConfig {
            outbound_capacity: 0,
            ..HubConfig::default()
        };

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Err(ConfigError::Zero("outbound capacity")));
    }

    #[test]
    fn test_args_build_hub_config() {
        // テスト項目: コマンドライン引数から HubConfig が構築される
        // given (前提条件):
        let args = ServerArgs::parse_from([
            "yakata-server",
            "--jwt-secret",
            "s3cret",
            "--outbound-capacity",
            "8",
            "--overflow-policy",
            "drop-oldest",
            "--ping-period-secs",
            "5",
            "--pong-wait-secs",
            "6",
        ]);

        // when (操作):
        let config = args.hub_config().unwrap();

        // then (期待する結果):
        assert_eq!(config.outbound_capacity, 8);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);
        assert_eq!(config.ping_period, Duration::from_secs(5));
        assert_eq!(args.token_ttl(), Duration::from_secs(24 * 3600));
        assert!(!args.pubsub);
    }

    #[test]
    fn test_args_reject_inverted_timeouts() {
        // テスト項目: ping 間隔が pong 待ち時間より長い引数はエラーになる
        // given (前提条件):
        let args = ServerArgs::parse_from([
            "yakata-server",
            "--jwt-secret",
            "s3cret",
            "--ping-period-secs",
            "90",
        ]);

        // when (操作):
        let result = args.hub_config();

        // then (期待する結果):
        assert!(result.is_err());
    }
}
