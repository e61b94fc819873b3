//! Cooperative cancellation, the pause gate and interruptible sleeps.
//!
//! Every suspension point in the engine goes through [`Control`]: waits are
//! split into `chunk`-sized slices so stop and pause take effect within one
//! slice, and time spent paused never counts toward a delay.

use crate::events::{EndState, PlayerEvent, PlayerState};
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Returned by every interruptible wait once a stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("playback cancelled")]
pub struct Cancelled;

#[derive(Clone)]
pub struct Control {
    inner: Arc<Inner>,
}

struct Inner {
    cancel: AtomicBool,
    paused: Mutex<bool>,
    gate: Condvar,
    paused_total: Mutex<Duration>,
    state: Mutex<PlayerState>,
    end: Mutex<Option<(EndState, String)>>,
    events: Mutex<Option<Sender<PlayerEvent>>>,
    chunk: Duration,
}

impl Control {
    pub fn new(chunk: Duration, events: Sender<PlayerEvent>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancel: AtomicBool::new(false),
                paused: Mutex::new(false),
                gate: Condvar::new(),
                paused_total: Mutex::new(Duration::ZERO),
                state: Mutex::new(PlayerState::Idle),
                end: Mutex::new(None),
                events: Mutex::new(Some(events)),
                chunk: if chunk.is_zero() { Duration::from_millis(1) } else { chunk },
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancel.store(true, Ordering::SeqCst);
        self.inner.gate.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.load(Ordering::SeqCst)
    }

    /// Close the gate. Returns false when already paused or finished.
    pub fn pause(&self) -> bool {
        if self.is_cancelled() || self.state().is_terminal() {
            return false;
        }
        let mut paused = self.inner.paused.lock();
        if *paused {
            return false;
        }
        *paused = true;
        self.set_state(PlayerState::Paused);
        true
    }

    /// Reopen the gate. Returns false when it was not closed.
    pub fn resume(&self) -> bool {
        let mut paused = self.inner.paused.lock();
        if !*paused {
            return false;
        }
        *paused = false;
        drop(paused);
        if !self.state().is_terminal() {
            self.set_state(PlayerState::Running);
        }
        self.inner.gate.notify_all();
        true
    }

    pub fn is_paused(&self) -> bool {
        *self.inner.paused.lock()
    }

    /// Block while paused. Fails as soon as a stop is requested.
    pub fn wait_if_paused(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        let mut paused = self.inner.paused.lock();
        if !*paused {
            return Ok(());
        }
        let started = Instant::now();
        while *paused && !self.is_cancelled() {
            self.inner.gate.wait_for(&mut paused, self.inner.chunk);
        }
        drop(paused);
        *self.inner.paused_total.lock() += started.elapsed();
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` of running time.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let mut remaining = duration;
        loop {
            self.wait_if_paused()?;
            if remaining.is_zero() {
                return Ok(());
            }
            let slice = remaining.min(self.inner.chunk);
            let started = Instant::now();
            thread::sleep(slice);
            remaining = remaining.saturating_sub(started.elapsed());
        }
    }

    /// A stopwatch that excludes paused time from here on.
    pub fn clock(&self) -> ActiveClock {
        ActiveClock {
            started: Instant::now(),
            paused_before: self.paused_total(),
            control: self.clone(),
        }
    }

    /// Sleep until `clock` reads at least `target`.
    pub fn sleep_until(&self, clock: &ActiveClock, target: Duration) -> Result<(), Cancelled> {
        loop {
            self.wait_if_paused()?;
            let now = clock.elapsed();
            if now >= target {
                return Ok(());
            }
            thread::sleep((target - now).min(self.inner.chunk));
        }
    }

    /// Total time spent blocked on the pause gate.
    pub fn paused_total(&self) -> Duration {
        *self.inner.paused_total.lock()
    }

    /// Record the terminal state. Only the first call wins.
    pub fn mark_end(&self, state: EndState, reason: impl Into<String>) -> bool {
        let mut end = self.inner.end.lock();
        if end.is_some() {
            return false;
        }
        *end = Some((state, reason.into()));
        true
    }

    pub fn end(&self) -> Option<(EndState, String)> {
        self.inner.end.lock().clone()
    }

    pub fn state(&self) -> PlayerState {
        *self.inner.state.lock()
    }

    pub(crate) fn set_state(&self, state: PlayerState) {
        *self.inner.state.lock() = state;
    }

    pub(crate) fn emit(&self, event: PlayerEvent) {
        let tx = self.inner.events.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event);
        }
    }

    /// Drop the sender so receivers see the end of the stream.
    pub(crate) fn close_events(&self) {
        self.inner.events.lock().take();
    }
}

/// Elapsed running time, not counting pauses.
pub struct ActiveClock {
    started: Instant,
    paused_before: Duration,
    control: Control,
}

impl ActiveClock {
    pub fn elapsed(&self) -> Duration {
        let paused = self.control.paused_total().saturating_sub(self.paused_before);
        self.started.elapsed().saturating_sub(paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> Control {
        let (tx, _rx) = crossbeam_channel::unbounded();
        Control::new(Duration::from_millis(10), tx)
    }

    #[test]
    fn cancel_interrupts_sleep() {
        let c = control();
        let remote = c.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        let started = Instant::now();
        assert_eq!(c.sleep(Duration::from_secs(5)), Err(Cancelled));
        assert!(started.elapsed() < Duration::from_millis(500));
        t.join().unwrap();
    }

    #[test]
    fn pause_time_is_not_counted() {
        let c = control();
        let remote = c.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            assert!(remote.pause());
            assert!(!remote.pause());
            thread::sleep(Duration::from_millis(300));
            assert!(remote.resume());
        });
        let started = Instant::now();
        c.sleep(Duration::from_millis(200)).unwrap();
        let elapsed = started.elapsed();
        t.join().unwrap();
        assert!(elapsed >= Duration::from_millis(480), "{:?}", elapsed);
        assert!(c.paused_total() >= Duration::from_millis(250));
    }

    #[test]
    fn cancel_releases_pause_gate() {
        let c = control();
        assert!(c.pause());
        let remote = c.clone();
        let t = thread::spawn(move || remote.wait_if_paused());
        thread::sleep(Duration::from_millis(30));
        c.cancel();
        assert_eq!(t.join().unwrap(), Err(Cancelled));
    }

    #[test]
    fn first_end_wins() {
        let c = control();
        assert!(c.mark_end(EndState::Stopped, "stop word"));
        assert!(!c.mark_end(EndState::Error, "search exhausted"));
        assert_eq!(c.end(), Some((EndState::Stopped, "stop word".to_string())));
    }

    #[test]
    fn zero_sleep_still_checks_cancel() {
        let c = control();
        assert!(c.sleep(Duration::ZERO).is_ok());
        c.cancel();
        assert_eq!(c.sleep(Duration::ZERO), Err(Cancelled));
    }

    #[test]
    fn closed_stream_ends_receivers() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let c = Control::new(Duration::from_millis(10), tx);
        c.emit(PlayerEvent::Status { text: "hi".into() });
        c.close_events();
        c.emit(PlayerEvent::Status { text: "lost".into() });
        assert_eq!(rx.iter().count(), 1);
    }
}
