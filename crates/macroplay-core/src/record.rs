//! A named, repeatable sequence of actions.

use crate::action::{total_steps, Action};
use crate::config::DEFAULT_REPEAT_DELAY;
use crate::error::{Error, Result};
use crate::timing::TimingSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatSettings {
    pub enabled: bool,
    /// Number of cycles; 0 repeats until stopped.
    pub count: u32,
    pub delay: TimingSpec,
}

impl Default for RepeatSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            count: 0,
            delay: TimingSpec::fixed(DEFAULT_REPEAT_DELAY),
        }
    }
}

impl RepeatSettings {
    pub fn infinite(&self) -> bool {
        self.enabled && self.count == 0
    }

    /// Shown next to each cycle.
    pub fn label(&self, cycles_left: u32) -> String {
        if !self.enabled {
            "disabled".to_string()
        } else if self.count == 0 {
            "infinite".to_string()
        } else {
            format!("{} left", cycles_left)
        }
    }
}

/// Which process's window a record plays against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessBinding {
    pub bound: bool,
    pub exe: String,
    /// Session-only replacement for `exe`.
    pub exe_override: String,
}

impl ProcessBinding {
    pub fn to_exe(exe: impl Into<String>) -> Self {
        Self {
            bound: true,
            exe: exe.into(),
            exe_override: String::new(),
        }
    }

    /// Executable to resolve, or `None` when the record is not bound.
    pub fn effective_exe(&self) -> Option<&str> {
        if !self.bound {
            return None;
        }
        let over = self.exe_override.trim();
        if !over.is_empty() {
            return Some(over);
        }
        Some(self.exe.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordWire", into = "RecordWire")]
pub struct Record {
    pub name: String,
    pub actions: Vec<Action>,
    pub move_mouse: bool,
    pub repeat: RepeatSettings,
    pub binding: ProcessBinding,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            name: "New record".to_string(),
            actions: Vec::new(),
            move_mouse: true,
            repeat: RepeatSettings::default(),
            binding: ProcessBinding::default(),
        }
    }
}

impl Record {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            actions,
            ..Self::default()
        }
    }

    /// Rejects records that cannot be played. Runs before any input is sent.
    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::configuration(format!(
                "Record '{}' has no actions to play",
                self.name
            )));
        }
        if self.binding.bound && self.binding.effective_exe().map_or(true, str::is_empty) {
            return Err(Error::configuration(format!(
                "Record '{}' is bound to a process but no executable is set",
                self.name
            )));
        }
        validate_actions(&self.actions, "")
    }

    pub fn total_steps(&self, start_index: usize) -> usize {
        total_steps(self.actions.get(start_index..).unwrap_or(&[]))
    }

    pub fn requires_ocr(&self) -> bool {
        self.actions.iter().any(Action::requires_ocr)
    }
}

fn validate_actions(actions: &[Action], prefix: &str) -> Result<()> {
    for (i, action) in actions.iter().enumerate() {
        let number = format!("{}{}", prefix, i + 1);
        if let Some(text) = action.search_text() {
            if text.trim().is_empty() {
                let what = match action {
                    Action::WaitEvent(_) => "wait-for-text: expected text is empty",
                    _ => "text area: search text is empty",
                };
                return Err(Error::configuration(format!("Action #{} ({})", number, what))
                    .with_context(serde_json::json!({ "action": number })));
            }
        }
        if let Action::TextArea(t) = action {
            validate_actions(&t.on_fail_actions, &format!("{}.", number))?;
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct RecordWire {
    name: String,
    actions: Vec<Action>,
    move_mouse: Option<bool>,
    repeat: RepeatSettings,
    bind_to_process: bool,
    bound_exe: Option<String>,
    bound_exe_override: Option<String>,
}

impl Default for RecordWire {
    fn default() -> Self {
        Self {
            name: "Record".to_string(),
            actions: Vec::new(),
            move_mouse: None,
            repeat: RepeatSettings::default(),
            bind_to_process: false,
            bound_exe: None,
            bound_exe_override: None,
        }
    }
}

impl From<RecordWire> for Record {
    fn from(w: RecordWire) -> Self {
        let mut exe = w.bound_exe.unwrap_or_default().trim().to_string();
        let mut exe_override = w.bound_exe_override.unwrap_or_default().trim().to_string();
        // Files written before the override existed kept the path there.
        if w.bind_to_process && exe.is_empty() && !exe_override.is_empty() {
            exe = std::mem::take(&mut exe_override);
        }
        Record {
            name: w.name,
            actions: w.actions,
            move_mouse: w.move_mouse.unwrap_or(true),
            repeat: w.repeat,
            binding: ProcessBinding {
                bound: w.bind_to_process,
                exe,
                exe_override,
            },
        }
    }
}

impl From<Record> for RecordWire {
    fn from(r: Record) -> Self {
        Self {
            name: r.name,
            actions: r.actions,
            move_mouse: Some(r.move_mouse),
            repeat: r.repeat,
            bind_to_process: r.binding.bound,
            bound_exe: Some(r.binding.exe.trim().to_string()),
            bound_exe_override: Some(r.binding.exe_override.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::*;
    use crate::geometry::Region;
    use serde_json::json;

    #[test]
    fn defaults_when_fields_missing() {
        let r: Record = serde_json::from_value(json!({"name": "x", "move_mouse": null})).unwrap();
        assert!(r.move_mouse);
        assert_eq!(r.repeat, RepeatSettings::default());
        assert_eq!(r.repeat.delay, TimingSpec::fixed(0.5));
        assert!(!r.binding.bound);
        assert!(r.actions.is_empty());
    }

    #[test]
    fn override_migrates_into_exe() {
        let r: Record = serde_json::from_value(json!({
            "name": "x",
            "bind_to_process": true,
            "bound_exe": "  ",
            "bound_exe_override": "C:/game.exe",
        }))
        .unwrap();
        assert_eq!(r.binding.exe, "C:/game.exe");
        assert_eq!(r.binding.exe_override, "");
        assert_eq!(r.binding.effective_exe(), Some("C:/game.exe"));
    }

    #[test]
    fn override_wins_when_set() {
        let binding = ProcessBinding {
            bound: true,
            exe: "a.exe".into(),
            exe_override: "b.exe".into(),
        };
        assert_eq!(binding.effective_exe(), Some("b.exe"));
        assert_eq!(ProcessBinding::default().effective_exe(), None);
    }

    #[test]
    fn wire_names() {
        let mut r = Record::new("daily", vec![WaitAction::default().into()]);
        r.binding = ProcessBinding::to_exe("game.exe");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["bind_to_process"], true);
        assert_eq!(v["bound_exe"], "game.exe");
        assert_eq!(v["bound_exe_override"], "");
        assert_eq!(v["move_mouse"], true);
        assert_eq!(v["actions"][0]["type"], "wait");
        let back: Record = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn empty_search_text_rejected() {
        let r = Record::new(
            "x",
            vec![
                WaitAction::default().into(),
                TextAreaAction {
                    search: TextSearch::new("  ", Region::default()),
                    ..Default::default()
                }
                .into(),
            ],
        );
        let err = r.validate().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigurationError);
        assert!(err.message.contains("#2"), "{}", err.message);
    }

    #[test]
    fn nested_fail_branch_validated() {
        let r = Record::new(
            "x",
            vec![TextAreaAction {
                search: TextSearch::new("Play", Region::default()),
                on_fail: OnFail::RunActions,
                on_fail_actions: vec![WaitEventAction::default().into()],
                ..Default::default()
            }
            .into()],
        );
        let err = r.validate().unwrap_err();
        assert!(err.message.contains("#1.1"), "{}", err.message);
    }

    #[test]
    fn empty_record_rejected() {
        assert!(Record::new("x", vec![]).validate().is_err());
        assert!(Record::new("x", vec![WaitAction::default().into()]).validate().is_ok());
    }

    #[test]
    fn cycle_labels() {
        let mut rep = RepeatSettings::default();
        assert_eq!(rep.label(0), "disabled");
        rep.enabled = true;
        assert_eq!(rep.label(0), "infinite");
        rep.count = 3;
        assert_eq!(rep.label(2), "2 left");
    }
}
