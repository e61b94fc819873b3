//! What the engine tells its caller.

use macroplay_core::Rect;
use serde::Serialize;
use std::fmt;

/// How a run ended. Set once; later conditions never overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndState {
    Done,
    Stopped,
    Error,
}

impl fmt::Display for EndState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndState::Done => "done",
            EndState::Stopped => "stopped",
            EndState::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Running,
    Paused,
    Done,
    Stopped,
    Error,
}

impl PlayerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerState::Done | PlayerState::Stopped | PlayerState::Error)
    }
}

impl From<EndState> for PlayerState {
    fn from(s: EndState) -> Self {
        match s {
            EndState::Done => PlayerState::Done,
            EndState::Stopped => PlayerState::Stopped,
            EndState::Error => PlayerState::Error,
        }
    }
}

/// One-way notifications, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Lifecycle messages and the most specific failure reason.
    Status { text: String },
    /// Per-attempt detail for the running action.
    Current { text: String },
    Cycle { number: u32, label: String },
    Progress { done: usize, total: usize },
    /// A top-level action started.
    ActionRow { index: usize },
    ActionOk { index: usize },
    ActionError { index: usize, message: String },
    Paused { paused: bool, reason: String },
    /// The base rectangle relative coordinates now resolve against.
    BaseArea { rect: Rect },
    /// Always the last event of a run.
    Finished { state: EndState, reason: String },
}

/// Result of [`crate::PlaybackHandle::join`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackOutcome {
    pub state: EndState,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_tagged() {
        let v = serde_json::to_value(PlayerEvent::Progress { done: 1, total: 3 }).unwrap();
        assert_eq!(v, serde_json::json!({"event": "progress", "done": 1, "total": 3}));
        let v = serde_json::to_value(PlayerEvent::Finished {
            state: EndState::Stopped,
            reason: "Stopped by user".into(),
        })
        .unwrap();
        assert_eq!(v["event"], "finished");
        assert_eq!(v["state"], "stopped");
    }

    #[test]
    fn terminal_states() {
        assert!(PlayerState::from(EndState::Error).is_terminal());
        assert!(!PlayerState::Paused.is_terminal());
    }
}
