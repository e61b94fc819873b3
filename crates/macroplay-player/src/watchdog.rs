//! Background stop-word check.
//!
//! Polls the text locator for a configured phrase over the current base
//! rectangle and cancels playback when it shows up. It only ever reads the
//! base snapshot; the main loop owns writes.

use crate::control::Control;
use crate::events::{EndState, PlayerEvent};
use macroplay_core::{LocateError, Rect, RegionResolver, StopWordConfig, TextLocator};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// The base rectangle and display scale the main loop is working against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseSnapshot {
    pub rect: Rect,
    pub scale: f64,
}

pub type SharedBase = Arc<Mutex<Option<BaseSnapshot>>>;

pub struct Watchdog {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    /// Start polling. `enabled` may be flipped while running; `None` means always on.
    pub fn spawn(
        config: StopWordConfig,
        text: Arc<dyn TextLocator>,
        base: SharedBase,
        control: Control,
        enabled: Option<Arc<AtomicBool>>,
        tick: Duration,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let thread = thread::Builder::new()
            .name("macroplay-watchdog".into())
            .spawn(move || watch(config, text, base, control, enabled, tick, flag))?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch(
    config: StopWordConfig,
    text: Arc<dyn TextLocator>,
    base: SharedBase,
    control: Control,
    enabled: Option<Arc<AtomicBool>>,
    tick: Duration,
    stop: Arc<AtomicBool>,
) {
    let resolver = RegionResolver::new(text.as_ref());
    let interval = config.interval();
    let tick = if tick.is_zero() { Duration::from_millis(10) } else { tick };
    let mut due = Instant::now();
    tracing::info!(word = %config.search.word, interval = ?interval, "stop-word watchdog started");

    while !stop.load(Ordering::SeqCst) && !control.is_cancelled() {
        let on = enabled.as_ref().map_or(true, |e| e.load(Ordering::Relaxed));
        if on && Instant::now() >= due {
            let snapshot = *base.lock();
            if let Some(snap) = snapshot {
                due = Instant::now() + interval;
                match resolver.find_text(&config.search, &snap.rect, snap.scale) {
                    Ok(Some(_)) => {
                        let reason = format!("Stopped: stop word '{}' found", config.search.word);
                        tracing::info!(word = %config.search.word, "stop word found");
                        if control.mark_end(EndState::Stopped, reason.clone()) {
                            control.emit(PlayerEvent::Status { text: reason });
                        }
                        control.cancel();
                        break;
                    }
                    Ok(None) => tracing::debug!(word = %config.search.word, "stop word not visible"),
                    Err(LocateError::Unavailable) => {
                        tracing::warn!("text recognition unavailable, stop-word watchdog exiting");
                        break;
                    }
                    Err(e) => tracing::warn!(error = %e, "stop-word check failed"),
                }
            }
        }
        thread::sleep(tick);
    }
    tracing::debug!("stop-word watchdog finished");
}
