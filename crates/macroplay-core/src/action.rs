//! The macro step model.
//!
//! [`Action`] is a closed sum type; the engine matches on it exhaustively, so a
//! new variant does not compile until every executor handles it. Serialization
//! lives in [`crate::wire`].

use crate::config::{
    DEFAULT_ACTION_DELAY, DEFAULT_HOLD, DEFAULT_MAX_TRIES, DEFAULT_OCR_LANG, DEFAULT_POLL,
    DEFAULT_WAIT, MIN_POLL,
};
use crate::geometry::{Rect, Region};
use crate::timing::TimingSpec;
use crate::trigger::{Trigger, TriggerKind};

/// Declares the rectangle relative coordinates resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseAreaAction {
    pub rect: Rect,
    pub click: bool,
    pub trigger: Trigger,
}

impl Default for BaseAreaAction {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            click: true,
            trigger: Trigger::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaAction {
    pub region: Region,
    pub click: bool,
    pub multiplier: u32,
    /// Sampled before each repetition.
    pub delay: TimingSpec,
    pub trigger: Trigger,
}

impl Default for AreaAction {
    fn default() -> Self {
        Self {
            region: Region::default(),
            click: false,
            multiplier: 1,
            delay: TimingSpec::fixed(DEFAULT_ACTION_DELAY),
            trigger: Trigger::default(),
        }
    }
}

/// A text query over a screen region.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub region: Region,
    pub word: String,
    /// 1-based occurrence in reading order.
    pub index: u32,
    /// Minimum number of occurrences that must be visible; 0 disables the check.
    pub count: u32,
    pub ocr_lang: String,
}

impl TextSearch {
    pub fn new(word: impl Into<String>, region: Region) -> Self {
        Self {
            word: word.into(),
            region,
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.word.trim().is_empty()
    }
}

impl Default for TextSearch {
    fn default() -> Self {
        Self {
            region: Region::default(),
            word: String::new(),
            index: 1,
            count: 0,
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnFail {
    #[default]
    Retry,
    Error,
    RunActions,
}

impl OnFail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Error => "error",
            Self::RunActions => "action",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "action" | "actions" | "run_actions" => Self::RunActions,
            _ => Self::Retry,
        }
    }
}

/// What happens after a fail-branch has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostMode {
    #[default]
    None,
    Stop,
    Repeat,
}

impl PostMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stop => "stop",
            Self::Repeat => "repeat",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Self::Stop,
            "repeat" => Self::Repeat,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAreaAction {
    pub search: TextSearch,
    pub search_infinite: bool,
    pub max_tries: u32,
    pub on_fail: OnFail,
    pub on_fail_actions: Vec<Action>,
    pub post_mode: PostMode,
    pub click: bool,
    pub multiplier: u32,
    pub delay: TimingSpec,
    pub trigger: Trigger,
}

impl Default for TextAreaAction {
    fn default() -> Self {
        Self {
            search: TextSearch::default(),
            search_infinite: true,
            max_tries: DEFAULT_MAX_TRIES,
            on_fail: OnFail::Retry,
            on_fail_actions: Vec::new(),
            post_mode: PostMode::None,
            click: false,
            multiplier: 1,
            delay: TimingSpec::fixed(DEFAULT_ACTION_DELAY),
            trigger: Trigger::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PressMode {
    #[default]
    Normal,
    Long,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activation {
    /// Starts when the previous item's hold ends.
    #[default]
    AfterPrevious,
    /// Starts at `start_offset` from the beginning of the long press.
    FromStart,
}

impl Activation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AfterPrevious => "after_prev",
            Self::FromStart => "from_start",
        }
    }
}

/// One hold in a long-press timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LongPressItem {
    pub trigger: Trigger,
    pub hold: TimingSpec,
    pub activation: Activation,
    pub start_offset: TimingSpec,
}

impl Default for LongPressItem {
    fn default() -> Self {
        Self {
            trigger: Trigger::default(),
            hold: TimingSpec::fixed(DEFAULT_HOLD),
            activation: Activation::AfterPrevious,
            start_offset: TimingSpec::fixed(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyAction {
    pub trigger: Trigger,
    pub multiplier: u32,
    pub delay: TimingSpec,
    pub press_mode: PressMode,
    pub long_press: Vec<LongPressItem>,
}

impl Default for KeyAction {
    fn default() -> Self {
        Self {
            trigger: Trigger {
                kind: TriggerKind::Keys,
                keys: Vec::new(),
                mouse_button: None,
            },
            multiplier: 1,
            delay: TimingSpec::fixed(DEFAULT_ACTION_DELAY),
            press_mode: PressMode::Normal,
            long_press: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitAction {
    pub delay: TimingSpec,
}

impl Default for WaitAction {
    fn default() -> Self {
        Self {
            delay: TimingSpec::fixed(DEFAULT_WAIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitEventAction {
    pub region: Region,
    pub expected_text: String,
    pub ocr_lang: String,
    /// Seconds between checks, at least [`MIN_POLL`].
    pub poll: f64,
}

impl WaitEventAction {
    /// The search this wait polls: first occurrence, no count requirement.
    pub fn search(&self) -> TextSearch {
        TextSearch {
            region: self.region,
            word: self.expected_text.clone(),
            index: 1,
            count: 0,
            ocr_lang: self.ocr_lang.clone(),
        }
    }

    pub fn poll_interval(&self) -> f64 {
        if self.poll.is_finite() {
            self.poll.max(MIN_POLL)
        } else {
            DEFAULT_POLL
        }
    }
}

impl Default for WaitEventAction {
    fn default() -> Self {
        Self {
            region: Region::default(),
            expected_text: String::new(),
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
            poll: DEFAULT_POLL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    BaseArea(BaseAreaAction),
    Area(AreaAction),
    TextArea(TextAreaAction),
    Key(KeyAction),
    Wait(WaitAction),
    WaitEvent(WaitEventAction),
}

impl Action {
    /// Wire discriminator.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::BaseArea(_) => "base_area",
            Action::Area(_) => "area",
            Action::TextArea(_) => "area_word",
            Action::Key(_) => "key",
            Action::Wait(_) => "wait",
            Action::WaitEvent(_) => "wait_event",
        }
    }

    /// Progress steps this action contributes when it runs.
    pub fn steps(&self) -> usize {
        match self {
            Action::BaseArea(_) => 0,
            Action::Area(_) | Action::TextArea(_) | Action::Wait(_) | Action::WaitEvent(_) => 1,
            Action::Key(k) => match k.press_mode {
                PressMode::Normal => k.multiplier.max(1) as usize,
                PressMode::Long => k.long_press.len(),
            },
        }
    }

    pub fn requires_ocr(&self) -> bool {
        matches!(self, Action::TextArea(_) | Action::WaitEvent(_))
    }

    /// Text this action searches for, if any.
    pub fn search_text(&self) -> Option<&str> {
        match self {
            Action::TextArea(t) => Some(&t.search.word),
            Action::WaitEvent(w) => Some(&w.expected_text),
            _ => None,
        }
    }
}

/// Sum of [`Action::steps`], never below 1.
pub fn total_steps(actions: &[Action]) -> usize {
    actions.iter().map(Action::steps).sum::<usize>().max(1)
}

impl From<BaseAreaAction> for Action {
    fn from(a: BaseAreaAction) -> Self {
        Action::BaseArea(a)
    }
}

impl From<AreaAction> for Action {
    fn from(a: AreaAction) -> Self {
        Action::Area(a)
    }
}

impl From<TextAreaAction> for Action {
    fn from(a: TextAreaAction) -> Self {
        Action::TextArea(a)
    }
}

impl From<KeyAction> for Action {
    fn from(a: KeyAction) -> Self {
        Action::Key(a)
    }
}

impl From<WaitAction> for Action {
    fn from(a: WaitAction) -> Self {
        Action::Wait(a)
    }
}

impl From<WaitEventAction> for Action {
    fn from(a: WaitEventAction) -> Self {
        Action::WaitEvent(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RelRect;

    #[test]
    fn step_counts() {
        let actions: Vec<Action> = vec![
            BaseAreaAction::default().into(),
            AreaAction::default().into(),
            KeyAction { multiplier: 3, ..Default::default() }.into(),
            KeyAction {
                press_mode: PressMode::Long,
                long_press: vec![LongPressItem::default(); 2],
                ..Default::default()
            }
            .into(),
            WaitAction::default().into(),
        ];
        assert_eq!(total_steps(&actions), 1 + 3 + 2 + 1);
        assert_eq!(total_steps(&[BaseAreaAction::default().into()]), 1);
    }

    #[test]
    fn wait_event_search_is_first_occurrence() {
        let w = WaitEventAction {
            region: Region::Relative(RelRect::new(0.0, 0.5, 1.0, 1.0)),
            expected_text: "Ready".into(),
            poll: 0.01,
            ..Default::default()
        };
        let s = w.search();
        assert_eq!((s.index, s.count), (1, 0));
        assert_eq!(s.word, "Ready");
        assert_eq!(w.poll_interval(), MIN_POLL);
    }

    #[test]
    fn on_fail_parse() {
        assert_eq!(OnFail::parse("action"), OnFail::RunActions);
        assert_eq!(OnFail::parse("ERROR"), OnFail::Error);
        assert_eq!(OnFail::parse("whatever"), OnFail::Retry);
        assert_eq!(PostMode::parse("repeat"), PostMode::Repeat);
    }
}
