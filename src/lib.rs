//! # macroplay
//!
//! Replays user-authored desktop macros: pointer clicks, key chords, timed
//! holds, waits and on-screen text searches, against a live window.
//!
//! ## Features
//!
//! - **Model**: typed actions and records with a forgiving JSON format
//! - **Resolution**: window-relative regions and fuzzy on-screen text matching
//! - **Playback**: a cancellable engine with pause, retries and fail-branches
//! - **Watchdog**: stops a run when a configured phrase appears
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use macroplay::prelude::*;
//! use std::sync::Arc;
//!
//! let storage = RecordStorage::new()?;
//! let record = storage.find("daily")?.expect("record exists");
//!
//! let player = Player::new(Collaborators {
//!     input: Arc::new(LoggingInjector::new()),
//!     text: Arc::new(NoTextLocator),
//!     window: Arc::new(StaticWindows::new(Rect::from_size(0, 0, 1920, 1080))),
//! });
//! for event in player.start(record, PlayOptions::default())? {
//!     println!("{:?}", event);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export the model
pub use macroplay_core::*;

// Re-export the engine
pub use macroplay_player as player;
pub use macroplay_player::{
    Collaborators, EndState, PlayOptions, PlaybackHandle, PlaybackOutcome, Player, PlayerEvent,
    PlayerState,
};

pub mod prelude {
    pub use macroplay_core::prelude::*;
    pub use macroplay_player::{
        Collaborators, EndState, PlayOptions, PlaybackHandle, PlaybackOutcome, Player, PlayerEvent,
        PlayerState,
    };
}
