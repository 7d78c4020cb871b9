//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in seconds
    fn now_secs(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_secs: i64,
}

impl FixedClock {
    pub fn new(fixed_secs: i64) -> Self {
        Self { fixed_secs }
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.fixed_secs
    }
}

/// Current Unix timestamp in milliseconds (UTC)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a Unix timestamp (milliseconds) as `HH:MM:SS` for terminal display.
///
/// Out-of-range timestamps render as `--:--:--`.
pub fn format_clock_time(timestamp_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_non_zero_timestamp() {
        // テスト項目: SystemClock が 0 以外のタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let timestamp = clock.now_secs();

        // then (期待する結果):
        assert!(timestamp > 0);
    }

    #[test]
    fn test_fixed_clock_returns_fixed_value() {
        // テスト項目: FixedClock は常に同じ値を返す
        // given (前提条件):
        let clock = FixedClock::new(1_700_000_000);

        // when (操作):
        let first = clock.now_secs();
        let second = clock.now_secs();

        // then (期待する結果):
        assert_eq!(first, 1_700_000_000);
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_clock_time() {
        // テスト項目: ミリ秒タイムスタンプが HH:MM:SS 形式に変換される
        // given (前提条件): 2023-11-14T22:13:20Z
        let timestamp = 1_700_000_000_000;

        // when (操作):
        let formatted = format_clock_time(timestamp);

        // then (期待する結果):
        assert_eq!(formatted, "22:13:20");
    }
}
