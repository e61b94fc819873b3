//! macroplay-core - the macro model
//!
//! Typed actions and records with a forgiving JSON wire format, the
//! coordinate mapping between absolute and window-relative rectangles, and
//! the text-region resolver that scores recognized fragments.
//!
//! Host capabilities (input injection, text recognition, window lookup) are
//! traits in [`platform`]; nothing here touches the real desktop.

pub mod action;
pub mod config;
pub mod display;
pub mod error;
pub mod geometry;
pub mod lang;
pub mod platform;
pub mod record;
pub mod resolver;
pub mod stopword;
pub mod storage;
pub mod timing;
pub mod trigger;
pub mod wire;

pub use action::*;
pub use config::{AppPaths, PlayerConfig};
pub use error::{Error, ErrorCode, InputError, LocateError, Result};
pub use geometry::{to_absolute, to_relative, Rect, Region, RelRect};
pub use platform::{InputInjector, TextFragment, TextLocator, WindowInfo, WindowLocator};
pub use record::{ProcessBinding, Record, RepeatSettings};
pub use resolver::RegionResolver;
pub use stopword::StopWordConfig;
pub use storage::{RecordStorage, Settings, SettingsStorage};
pub use timing::{TimingMode, TimingSpec};
pub use trigger::{Chord, Modifier, MouseButton, Trigger, TriggerKind};

pub mod prelude {
    pub use crate::action::*;
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::geometry::{Rect, Region, RelRect};
    pub use crate::platform::headless::{LoggingInjector, NoTextLocator, StaticWindows};
    pub use crate::platform::{InputInjector, TextFragment, TextLocator, WindowInfo, WindowLocator};
    pub use crate::record::{ProcessBinding, Record, RepeatSettings};
    pub use crate::stopword::StopWordConfig;
    pub use crate::storage::{RecordStorage, Settings, SettingsStorage};
    pub use crate::timing::TimingSpec;
    pub use crate::trigger::{MouseButton, Trigger};
}
