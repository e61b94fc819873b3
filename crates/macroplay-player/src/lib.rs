//! macroplay-player - runs records against the desktop
//!
//! ```no_run
//! use macroplay_core::prelude::*;
//! use macroplay_player::{Collaborators, PlayOptions, Player};
//! use std::sync::Arc;
//!
//! let player = Player::new(Collaborators {
//!     input: Arc::new(LoggingInjector::new()),
//!     text: Arc::new(NoTextLocator),
//!     window: Arc::new(StaticWindows::new(Rect::from_size(0, 0, 1920, 1080))),
//! });
//! let record = Record::new("demo", vec![WaitAction::default().into()]);
//! let handle = player.start(record, PlayOptions::default()).unwrap();
//! for event in handle {
//!     println!("{:?}", event);
//! }
//! ```

pub mod composer;
pub mod control;
pub mod events;
pub mod longpress;
pub mod player;
pub mod watchdog;

pub use composer::{HoldHandle, TriggerComposer};
pub use control::{Cancelled, Control};
pub use crossbeam_channel::Receiver;
pub use events::{EndState, PlaybackOutcome, PlayerEvent, PlayerState};
pub use player::{Collaborators, PlayOptions, PlaybackHandle, Player};
pub use watchdog::{BaseSnapshot, Watchdog};
