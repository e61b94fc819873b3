//! Input triggers: a mouse button or a key combination, each with optional modifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard cap on names carried by one trigger.
pub const MAX_TRIGGER_KEYS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    #[default]
    Mouse,
    Keys,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" | "lmb" => Some(Self::Left),
            "middle" | "mmb" => Some(Self::Middle),
            "right" | "rmb" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Left => "LMB",
            Self::Middle => "MMB",
            Self::Right => "RMB",
        }
    }
}

/// Modifier keys in the order they are pressed and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" | "lctrl" | "rctrl" | "ctrl_l" | "ctrl_r" => Some(Self::Ctrl),
            "alt" | "menu" | "option" | "lalt" | "ralt" | "alt_l" | "alt_r" | "altgr" => Some(Self::Alt),
            "shift" | "lshift" | "rshift" | "shift_l" | "shift_r" => Some(Self::Shift),
            "meta" | "win" | "super" | "cmd" | "command" | "lwin" | "rwin" => Some(Self::Meta),
            _ => None,
        }
    }

    /// Name handed to the input injector.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Meta => "meta",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Ctrl => "Ctrl",
            Self::Alt => "Alt",
            Self::Shift => "Shift",
            Self::Meta => "Meta",
        }
    }
}

/// What a trigger presses once split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    /// Deduplicated, canonical order.
    pub modifiers: Vec<Modifier>,
    /// Non-modifier key names, in declaration order.
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(from = "TriggerWire")]
pub struct Trigger {
    pub kind: TriggerKind,
    pub keys: Vec<String>,
    pub mouse_button: Option<MouseButton>,
}

impl Trigger {
    pub fn mouse(button: MouseButton) -> Self {
        Self {
            kind: TriggerKind::Mouse,
            keys: Vec::new(),
            mouse_button: Some(button),
        }
    }

    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: TriggerKind::Keys,
            keys: keys.into_iter().map(Into::into).collect(),
            mouse_button: None,
        }
        .normalized()
    }

    /// Add modifiers held while a mouse button is clicked.
    pub fn with_modifiers<I, S>(mut self, mods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(mods.into_iter().map(Into::into));
        self.normalized()
    }

    /// Enforce the kind/button invariant and the key cap.
    pub fn normalized(mut self) -> Self {
        self.keys.retain(|k| !k.trim().is_empty());
        self.keys.truncate(MAX_TRIGGER_KEYS);
        match self.kind {
            TriggerKind::Mouse => {
                self.mouse_button.get_or_insert(MouseButton::Left);
            }
            TriggerKind::Keys => self.mouse_button = None,
        }
        self
    }

    pub fn is_mouse(&self) -> bool {
        self.kind == TriggerKind::Mouse
    }

    pub fn button(&self) -> MouseButton {
        self.mouse_button.unwrap_or_default()
    }

    pub fn chord(&self) -> Chord {
        let mut modifiers = Vec::new();
        let mut keys = Vec::new();
        for name in &self.keys {
            match Modifier::from_name(name) {
                Some(m) => {
                    if !modifiers.contains(&m) {
                        modifiers.push(m);
                    }
                }
                None => keys.push(name.trim().to_string()),
            }
        }
        modifiers.sort();
        Chord { modifiers, keys }
    }

    fn canonical_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keys
            .iter()
            .map(|k| match Modifier::from_name(k) {
                Some(m) => m.key_name().to_string(),
                None => k.trim().to_lowercase(),
            })
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::mouse(MouseButton::Left)
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.mouse_button == other.mouse_button
            && self.canonical_keys() == other.canonical_keys()
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chord = self.chord();
        let mut parts: Vec<String> = chord.modifiers.iter().map(|m| m.label().to_string()).collect();
        parts.extend(chord.keys.iter().map(|k| key_label(k)));
        if self.is_mouse() {
            parts.push(self.button().label().to_string());
        }
        if parts.is_empty() {
            return f.write_str("(none)");
        }
        f.write_str(&parts.join(" + "))
    }
}

fn key_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(c) if name.chars().count() == 1 => c.to_uppercase().collect(),
        Some(c) if (c == 'f' || c == 'F') && chars.clone().all(|d| d.is_ascii_digit()) => {
            format!("F{}", chars.as_str())
        }
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TriggerWire {
    kind: Option<String>,
    keys: Vec<serde_json::Value>,
    mouse_button: Option<String>,
}

impl From<TriggerWire> for Trigger {
    fn from(w: TriggerWire) -> Self {
        let kind = match w.kind.as_deref() {
            Some("keys") => TriggerKind::Keys,
            _ => TriggerKind::Mouse,
        };
        let keys = w
            .keys
            .iter()
            .map(|k| match k {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        Trigger {
            kind,
            keys,
            mouse_button: w.mouse_button.as_deref().and_then(MouseButton::parse),
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_defaults_to_left() {
        let t: Trigger = serde_json::from_str(r#"{"kind":"mouse","mouse_button":"side"}"#).unwrap();
        assert_eq!(t.mouse_button, Some(MouseButton::Left));
    }

    #[test]
    fn keys_drop_button() {
        let t: Trigger =
            serde_json::from_str(r#"{"kind":"keys","keys":["ctrl","e"],"mouse_button":"right"}"#).unwrap();
        assert_eq!(t.kind, TriggerKind::Keys);
        assert_eq!(t.mouse_button, None);
    }

    #[test]
    fn unknown_kind_is_mouse() {
        let t: Trigger = serde_json::from_str(r#"{"kind":"pedal"}"#).unwrap();
        assert_eq!(t, Trigger::default());
    }

    #[test]
    fn keys_are_capped() {
        let names: Vec<String> = (0..15).map(|i| format!("k{}", i)).collect();
        assert_eq!(Trigger::keys(names).keys.len(), MAX_TRIGGER_KEYS);
    }

    #[test]
    fn equality_ignores_order() {
        assert_eq!(
            Trigger::keys(["shift", "ctrl", "s"]),
            Trigger::keys(["Control", "s", "Shift"])
        );
        assert_ne!(Trigger::keys(["ctrl", "s"]), Trigger::keys(["alt", "s"]));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(Trigger::keys(["shift", "e", "ctrl"]).to_string(), "Ctrl + Shift + E");
        assert_eq!(Trigger::keys(["alt", "f4"]).to_string(), "Alt + F4");
        assert_eq!(
            Trigger::mouse(MouseButton::Right).with_modifiers(["meta", "alt"]).to_string(),
            "Alt + Meta + RMB"
        );
        assert_eq!(Trigger::keys(["enter"]).to_string(), "Enter");
    }

    #[test]
    fn chord_orders_modifiers() {
        let chord = Trigger::keys(["meta", "a", "ctrl", "ctrl", "b"]).chord();
        assert_eq!(chord.modifiers, vec![Modifier::Ctrl, Modifier::Meta]);
        assert_eq!(chord.keys, vec!["a".to_string(), "b".to_string()]);
    }
}
