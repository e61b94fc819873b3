//! Stand-in capabilities for dry runs: nothing reaches the real desktop.

use super::keys::is_known_key;
use super::{InputInjector, TextFragment, TextLocator, WindowInfo, WindowLocator};
use crate::error::{InputError, LocateError};
use crate::geometry::Rect;
use crate::trigger::MouseButton;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Logs every input instead of sending it.
#[derive(Debug, Default)]
pub struct LoggingInjector {
    pointer: Mutex<(i32, i32)>,
}

impl LoggingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(name: &str) -> Result<(), InputError> {
        if is_known_key(name) {
            Ok(())
        } else {
            Err(InputError::UnknownKey(name.to_string()))
        }
    }
}

impl InputInjector for LoggingInjector {
    fn key_down(&self, name: &str) -> Result<(), InputError> {
        Self::check(name)?;
        tracing::info!(key = name, "key down");
        Ok(())
    }

    fn key_up(&self, name: &str) -> Result<(), InputError> {
        Self::check(name)?;
        tracing::info!(key = name, "key up");
        Ok(())
    }

    fn mouse_move_to(&self, x: i32, y: i32) -> Result<(), InputError> {
        *self.pointer.lock() = (x, y);
        tracing::trace!(x, y, "pointer move");
        Ok(())
    }

    fn mouse_click(&self, button: MouseButton) -> Result<(), InputError> {
        let (x, y) = *self.pointer.lock();
        tracing::info!(button = button.as_str(), x, y, "click");
        Ok(())
    }

    fn mouse_press(&self, button: MouseButton) -> Result<(), InputError> {
        tracing::info!(button = button.as_str(), "mouse down");
        Ok(())
    }

    fn mouse_release(&self, button: MouseButton) -> Result<(), InputError> {
        tracing::info!(button = button.as_str(), "mouse up");
        Ok(())
    }

    fn mouse_position(&self) -> Option<(i32, i32)> {
        Some(*self.pointer.lock())
    }
}

/// Reports text recognition as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTextLocator;

impl TextLocator for NoTextLocator {
    fn available_languages(&self) -> Vec<String> {
        Vec::new()
    }

    fn locate(&self, _area: Rect, _lang: &str, _scale: f64) -> Result<Vec<TextFragment>, LocateError> {
        Err(LocateError::Unavailable)
    }
}

/// A fixed desktop with an optional set of known windows.
#[derive(Debug, Clone)]
pub struct StaticWindows {
    desktop: Rect,
    windows: HashMap<String, WindowInfo>,
}

impl StaticWindows {
    pub fn new(desktop: Rect) -> Self {
        Self {
            desktop,
            windows: HashMap::new(),
        }
    }

    pub fn with_window(mut self, exe: impl Into<String>, rect: Rect, scale: f64) -> Self {
        self.windows.insert(exe_key(&exe.into()), WindowInfo { rect, scale });
        self
    }
}

/// Match on file name, case-insensitively, so `C:\Games\x.exe` finds `x.exe`.
fn exe_key(exe: &str) -> String {
    let name = exe.rsplit(['/', '\\']).next().unwrap_or(exe);
    name.trim().to_lowercase()
}

impl WindowLocator for StaticWindows {
    fn resolve(&self, exe: &str) -> Option<WindowInfo> {
        self.windows.get(&exe_key(exe)).copied()
    }

    fn virtual_desktop(&self) -> Rect {
        self.desktop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_injector_rejects_unknown_keys() {
        let inj = LoggingInjector::new();
        assert!(inj.key_down("ctrl").is_ok());
        assert_eq!(inj.key_down("hyper"), Err(InputError::UnknownKey("hyper".into())));
        inj.mouse_move_to(4, 5).unwrap();
        assert_eq!(inj.mouse_position(), Some((4, 5)));
    }

    #[test]
    fn windows_match_by_file_name() {
        let win = Rect::from_size(10, 10, 800, 600);
        let locator = StaticWindows::new(Rect::from_size(0, 0, 1920, 1080)).with_window("C:\\Games\\Game.exe", win, 1.5);
        assert_eq!(locator.resolve("game.EXE").map(|w| w.rect), Some(win));
        assert!(locator.resolve("other.exe").is_none());
    }

    #[test]
    fn no_text_is_unavailable() {
        assert!(!NoTextLocator.is_available());
        assert_eq!(NoTextLocator.locate(Rect::default(), "eng", 1.0), Err(LocateError::Unavailable));
    }
}
