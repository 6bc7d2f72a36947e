use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use board_core::SessionConfig;

pub const DEFAULT_CONFIG_FILE: &str = "board_sim.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub room_id: String,
    pub peers: usize,
    pub history_limit: usize,
    pub snapshot_timeout_ms: u64,
    pub timer_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            room_id: "retro".into(),
            peers: 3,
            history_limit: 100,
            snapshot_timeout_ms: 3000,
            timer_seconds: 300,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            history_limit: self.history_limit,
            snapshot_timeout: Duration::from_millis(self.snapshot_timeout_ms),
            initial_timer_seconds: self.timer_seconds,
            ..SessionConfig::default()
        }
    }
}

/// Defaults, then the config file, then the environment. A missing default
/// file is fine; a missing explicit file is an error.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg = toml::from_str::<HashMap<String, String>>(&raw)
            .context("config file must hold flat string keys")?;
        apply_file(&mut settings, &file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("room_id") {
        settings.room_id = v.clone();
    }
    if let Some(v) = file_cfg.get("peers").and_then(|v| v.parse().ok()) {
        settings.peers = v;
    }
    if let Some(v) = file_cfg.get("history_limit").and_then(|v| v.parse().ok()) {
        settings.history_limit = v;
    }
    if let Some(v) = file_cfg
        .get("snapshot_timeout_ms")
        .and_then(|v| v.parse().ok())
    {
        settings.snapshot_timeout_ms = v;
    }
    if let Some(v) = file_cfg.get("timer_seconds").and_then(|v| v.parse().ok()) {
        settings.timer_seconds = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("BOARD_ROOM") {
        settings.room_id = v;
    }
    if let Some(v) = var("APP__ROOM_ID") {
        settings.room_id = v;
    }

    if let Some(v) = var("APP__PEERS").and_then(|v| v.parse().ok()) {
        settings.peers = v;
    }
    if let Some(v) = var("APP__HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
        settings.history_limit = v;
    }
    if let Some(v) = var("APP__SNAPSHOT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        settings.snapshot_timeout_ms = v;
    }
    if let Some(v) = var("APP__TIMER_SECONDS").and_then(|v| v.parse().ok()) {
        settings.timer_seconds = v;
    }
}
