//! Defaults, tunables and on-disk locations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_OCR_LANG: &str = "rus";
pub const DEFAULT_ACTION_DELAY: f64 = 0.1;
pub const DEFAULT_WAIT: f64 = 1.0;
pub const DEFAULT_HOLD: f64 = 0.2;
pub const DEFAULT_REPEAT_DELAY: f64 = 0.5;
pub const DEFAULT_MAX_TRIES: u32 = 100;
pub const DEFAULT_POLL: f64 = 1.0;
pub const MIN_POLL: f64 = 0.1;
pub const DEFAULT_STOP_WORD_INTERVAL: f64 = 10.0;

/// Engine timings. Everything here is a tunable, not a semantic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Longest uninterrupted sleep; bounds stop/pause latency.
    #[serde(with = "millis")]
    pub sleep_chunk: Duration,
    #[serde(with = "millis")]
    pub search_retry_delay: Duration,
    #[serde(with = "millis")]
    pub search_round_delay: Duration,
    #[serde(with = "millis")]
    pub key_hold: Duration,
    #[serde(with = "millis")]
    pub key_after_up: Duration,
    #[serde(with = "millis")]
    pub modifier_gap: Duration,
    #[serde(with = "millis")]
    pub mouse_settle: Duration,
    #[serde(with = "millis")]
    pub click_hold: Duration,
    pub pointer_steps_per_sec: u32,
    #[serde(with = "millis")]
    pub approach_duration: Duration,
    #[serde(with = "millis")]
    pub watchdog_tick: Duration,
    /// 0 = unbounded event channel.
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sleep_chunk: Duration::from_millis(10),
            search_retry_delay: Duration::from_millis(120),
            search_round_delay: Duration::from_secs(5),
            key_hold: Duration::from_millis(60),
            key_after_up: Duration::from_millis(5),
            modifier_gap: Duration::from_millis(5),
            mouse_settle: Duration::from_millis(20),
            click_hold: Duration::from_millis(10),
            pointer_steps_per_sec: 120,
            approach_duration: Duration::from_millis(50),
            watchdog_tick: Duration::from_millis(50),
            event_capacity: 0,
        }
    }
}

impl PlayerConfig {
    /// Near-zero input timings for headless runs and tests.
    pub fn instant() -> Self {
        Self {
            key_hold: Duration::ZERO,
            key_after_up: Duration::ZERO,
            modifier_gap: Duration::ZERO,
            mouse_settle: Duration::ZERO,
            click_hold: Duration::ZERO,
            approach_duration: Duration::ZERO,
            ..Self::default()
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Where records and settings live.
#[derive(Debug, Clone)]
pub struct AppPaths {
    dir: PathBuf,
}

impl AppPaths {
    /// `$MACROPLAY_HOME`, else `$HOME/.macroplay`.
    pub fn new() -> Result<Self> {
        if let Ok(dir) = std::env::var("MACROPLAY_HOME") {
            if !dir.trim().is_empty() {
                return Ok(Self::with_dir(dir));
            }
        }
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("HOME not set")?;
        Ok(Self::with_dir(PathBuf::from(home).join(".macroplay")))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn records_file(&self) -> PathBuf {
        self.dir.join("records.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.dir.join("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_as_millis() {
        let json = serde_json::to_value(PlayerConfig::default()).unwrap();
        assert_eq!(json["sleep_chunk"], 10);
        assert_eq!(json["search_round_delay"], 5000);
        let cfg: PlayerConfig = serde_json::from_str(r#"{"sleep_chunk": 5}"#).unwrap();
        assert_eq!(cfg.sleep_chunk, Duration::from_millis(5));
        assert_eq!(cfg.key_hold, Duration::from_millis(60));
    }

    #[test]
    fn paths_under_dir() {
        let paths = AppPaths::with_dir("/tmp/mp");
        assert_eq!(paths.records_file(), PathBuf::from("/tmp/mp/records.json"));
        assert_eq!(paths.settings_file(), PathBuf::from("/tmp/mp/settings.json"));
    }
}
