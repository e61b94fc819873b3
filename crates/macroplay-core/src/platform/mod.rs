//! Host capabilities the engine drives but does not implement.
//!
//! Real backends (OS input injection, OCR, window lookup) live outside this
//! workspace; [`headless`] provides stand-ins for dry runs.

pub mod headless;
pub mod keys;

use crate::error::{InputError, LocateError};
use crate::geometry::Rect;
use crate::trigger::MouseButton;
use serde::{Deserialize, Serialize};

/// Presses and releases keys and mouse buttons on the host.
pub trait InputInjector: Send + Sync {
    fn key_down(&self, name: &str) -> Result<(), InputError>;
    fn key_up(&self, name: &str) -> Result<(), InputError>;
    fn mouse_move_to(&self, x: i32, y: i32) -> Result<(), InputError>;
    fn mouse_click(&self, button: MouseButton) -> Result<(), InputError>;
    fn mouse_press(&self, button: MouseButton) -> Result<(), InputError>;
    fn mouse_release(&self, button: MouseButton) -> Result<(), InputError>;

    /// Current pointer position, when the host can report it.
    fn mouse_position(&self) -> Option<(i32, i32)> {
        None
    }
}

/// A piece of recognized text in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bbox: Rect,
    /// 0..100; negative when the recognizer gives no confidence.
    pub confidence: f64,
    /// Fragments sharing a line id sit on the same text line.
    pub line: u32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bbox: Rect, confidence: f64, line: u32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
            line,
        }
    }
}

/// Reads text off the screen.
pub trait TextLocator: Send + Sync {
    /// Installed recognition languages. Empty means recognition is unavailable.
    fn available_languages(&self) -> Vec<String>;

    /// Recognize text inside `area`. `scale` is the display scale factor of
    /// the window the area belongs to.
    fn locate(&self, area: Rect, lang: &str, scale: f64) -> Result<Vec<TextFragment>, LocateError>;

    fn is_available(&self) -> bool {
        !self.available_languages().is_empty()
    }
}

/// A resolved window client area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub rect: Rect,
    pub scale: f64,
}

/// Finds windows of bound processes.
pub trait WindowLocator: Send + Sync {
    fn resolve(&self, exe: &str) -> Option<WindowInfo>;

    /// Union of all displays.
    fn virtual_desktop(&self) -> Rect;
}
