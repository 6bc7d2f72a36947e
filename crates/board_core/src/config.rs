use std::time::Duration;

use anyhow::ensure;
use serde::Deserialize;
use shared::domain::DEFAULT_TIMER_SECONDS;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How many history messages to read when joining.
    pub history_limit: usize,
    /// How long a follower waits for the leader snapshot before replaying
    /// history instead.
    #[serde(with = "millis")]
    pub snapshot_timeout: Duration,
    #[serde(with = "millis")]
    pub tick_interval: Duration,
    pub initial_timer_seconds: u32,
    pub mailbox_capacity: usize,
    pub ignore_self_echo: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            snapshot_timeout: Duration::from_secs(3),
            tick_interval: Duration::from_secs(1),
            initial_timer_seconds: DEFAULT_TIMER_SECONDS,
            mailbox_capacity: 256,
            ignore_self_echo: true,
        }
    }
}

impl SessionConfig {
    /// Rejects values the session loop cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.tick_interval.is_zero(), "tick_interval must be non-zero");
        ensure!(
            !self.snapshot_timeout.is_zero(),
            "snapshot_timeout must be non-zero"
        );
        ensure!(self.mailbox_capacity > 0, "mailbox_capacity must be non-zero");
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
