//! Structured errors for callers and the CLI

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigurationError,
    ResolutionFailure,
    SearchExhausted,
    Cancelled,
    UnexpectedFault,
    OcrUnavailable,
    RecordNotFound,
    InvalidRecord,
    Io,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    /// Bound record whose window cannot be found. Playback must not fall
    /// back to the desktop in this case.
    pub fn window_not_found(exe: &str) -> Self {
        Self::new(
            ErrorCode::ResolutionFailure,
            format!(
                "Bound to '{}' but its window was not found; stopping instead of clicking the desktop",
                exe
            ),
        )
        .with_suggestions(vec![
            "Start the target application".into(),
            "Clear the process binding to play against the whole desktop".into(),
        ])
    }

    pub fn search_exhausted(word: &str, attempts: u32) -> Self {
        Self::new(
            ErrorCode::SearchExhausted,
            format!(
                "Could not find text '{}' in the region after {} attempts",
                word, attempts
            ),
        )
        .with_context(serde_json::json!({ "word": word, "attempts": attempts }))
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cancelled, reason)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UnexpectedFault,
            format!("Player error: {}", message.into()),
        )
    }

    pub fn ocr_unavailable() -> Self {
        Self::new(
            ErrorCode::OcrUnavailable,
            "Text recognition is unavailable; text-search actions will be skipped",
        )
    }

    pub fn record_not_found(name: &str) -> Self {
        Self::new(ErrorCode::RecordNotFound, format!("No record named '{}'", name))
    }

    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRecord, reason)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::UnexpectedFault, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidRecord, e.to_string())
    }
}

/// Failure reported by a [`TextLocator`](crate::platform::TextLocator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// No text recognition backend is installed.
    #[error("text recognition unavailable")]
    Unavailable,
    #[error("text recognition failed: {0}")]
    Failed(String),
}

/// Failure reported by an [`InputInjector`](crate::platform::InputInjector).
/// Never fatal to playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown key: {0}")]
    UnknownKey(String),
    #[error("input injection failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let e = Error::record_not_found("daily");
        assert_eq!(e.to_string(), "[RecordNotFound] No record named 'daily'");
    }

    #[test]
    fn serializes_screaming_code() {
        let json = serde_json::to_value(Error::search_exhausted("OK", 3)).unwrap();
        assert_eq!(json["code"], "SEARCH_EXHAUSTED");
        assert_eq!(json["context"]["attempts"], 3);
        assert!(json.get("suggestions").is_none());
    }
}
