//! Stop-word configuration: a text search plus how often to run it.

use crate::action::{Action, TextAreaAction, TextSearch};
use crate::config::DEFAULT_STOP_WORD_INTERVAL;
use crate::wire::{action_from_value, action_to_value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;

/// Stored in the same shape as a text-area action with an extra `interval_sec`.
#[derive(Debug, Clone, PartialEq)]
pub struct StopWordConfig {
    pub search: TextSearch,
    pub interval_sec: f64,
}

impl StopWordConfig {
    pub fn new(search: TextSearch) -> Self {
        Self {
            search,
            interval_sec: DEFAULT_STOP_WORD_INTERVAL,
        }
    }

    pub fn interval(&self) -> Duration {
        let secs = if self.interval_sec.is_finite() && self.interval_sec > 0.0 {
            self.interval_sec
        } else {
            DEFAULT_STOP_WORD_INTERVAL
        };
        Duration::from_secs_f64(secs)
    }

    pub fn is_usable(&self) -> bool {
        !self.search.is_blank()
    }
}

impl Serialize for StopWordConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = action_to_value(&Action::TextArea(TextAreaAction {
            search: self.search.clone(),
            ..Default::default()
        }));
        if let Value::Object(map) = &mut value {
            map.insert("interval_sec".into(), self.interval_sec.into());
        }
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StopWordConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        let interval_sec = value
            .get("interval_sec")
            .and_then(crate::wire::as_f64)
            .unwrap_or(DEFAULT_STOP_WORD_INTERVAL);
        if let Value::Object(map) = &mut value {
            map.insert("type".into(), "area_word".into());
        }
        let search = match action_from_value(&value) {
            Action::TextArea(t) => t.search,
            _ => TextSearch::default(),
        };
        Ok(Self { search, interval_sec })
    }
}
