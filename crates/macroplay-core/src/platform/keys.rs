//! Key names an injector is expected to understand.

use crate::trigger::Modifier;

const NAMED: &[&str] = &[
    "enter", "return", "tab", "space", "escape", "esc", "backspace", "delete", "del", "insert",
    "ins", "home", "end", "pageup", "page_up", "pagedown", "page_down", "up", "down", "left",
    "right", "arrow_up", "arrow_down", "arrow_left", "arrow_right", "capslock", "caps_lock",
    "numlock", "scrolllock", "printscreen", "print_screen", "pause", "apps",
];

const OEM: &[char] = &[
    '`', '-', '=', '[', ']', '\\', ';', '\'', ',', '.', '/', '~', '+',
];

/// Lowercased, trimmed form used for comparison.
pub fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn is_known_key(name: &str) -> bool {
    let key = canonical(name);
    if Modifier::from_name(&key).is_some() || NAMED.contains(&key.as_str()) {
        return true;
    }
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_alphanumeric() || OEM.contains(&c),
        (Some('f'), Some(_)) => key[1..].parse::<u8>().map_or(false, |n| (1..=24).contains(&n)),
        _ => key
            .strip_prefix("num")
            .map_or(false, |rest| rest.len() == 1 && rest.chars().all(|c| c.is_ascii_digit())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names() {
        for k in ["a", "Z", "7", "F4", "f24", "Enter", "ctrl", "Win", "num5", ";", "я"] {
            assert!(is_known_key(k), "{}", k);
        }
    }

    #[test]
    fn unknown_names() {
        for k in ["", "f25", "f0", "hyper", "num", "ab"] {
            assert!(!is_known_key(k), "{}", k);
        }
    }
}
