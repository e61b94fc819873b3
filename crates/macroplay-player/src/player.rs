//! The playback engine: walks a record's actions on a worker thread and
//! reports through a [`PlayerEvent`] stream.

use crate::composer::TriggerComposer;
use crate::control::{Cancelled, Control};
use crate::events::{EndState, PlaybackOutcome, PlayerEvent, PlayerState};
use crate::longpress;
use crate::watchdog::{BaseSnapshot, SharedBase, Watchdog};
use crossbeam_channel::{bounded, unbounded, Receiver};
use macroplay_core::{
    to_absolute, to_relative, Action, AreaAction, BaseAreaAction, Error, InputInjector, KeyAction,
    LocateError, OnFail, PlayerConfig, PostMode, PressMode, Rect, Record, RegionResolver, Result,
    StopWordConfig, TextAreaAction, TextLocator, TextSearch, TimingSpec, Trigger, WaitAction,
    WaitEventAction, WindowLocator,
};
use parking_lot::Mutex;
use rand::Rng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Host capabilities a run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub input: Arc<dyn InputInjector>,
    pub text: Arc<dyn TextLocator>,
    pub window: Arc<dyn WindowLocator>,
}

#[derive(Clone, Default)]
pub struct PlayOptions {
    /// Action index each cycle starts from. Out of range means 0.
    pub start_index: usize,
    pub stop_word: Option<StopWordConfig>,
    /// Live toggle for the stop-word check; `None` keeps it on.
    pub stop_word_enabled: Option<Arc<AtomicBool>>,
}

pub struct Player {
    collab: Collaborators,
    config: PlayerConfig,
}

impl Player {
    pub fn new(collab: Collaborators) -> Self {
        Self::with_config(collab, PlayerConfig::default())
    }

    pub fn with_config(collab: Collaborators, config: PlayerConfig) -> Self {
        Self { collab, config }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Validate `record` and start playing it in the background.
    pub fn start(&self, record: Record, options: PlayOptions) -> Result<PlaybackHandle> {
        record.validate()?;

        let (tx, rx) = if self.config.event_capacity > 0 {
            bounded(self.config.event_capacity)
        } else {
            unbounded()
        };
        let control = Control::new(self.config.sleep_chunk, tx);
        control.set_state(PlayerState::Running);

        let start_index = if options.start_index < record.actions.len() {
            options.start_index
        } else {
            0
        };
        tracing::info!(record = %record.name, actions = record.actions.len(), start_index, "playback starting");

        let runner = Runner {
            composer: TriggerComposer::new(self.collab.input.clone(), self.config.clone(), control.clone()),
            record: Arc::new(record),
            collab: self.collab.clone(),
            config: self.config.clone(),
            control: control.clone(),
            options,
            start_index,
            base: Arc::new(Mutex::new(None)),
            base_rect: Rect::default(),
            scale: 1.0,
            current_area: None,
            progress: Progress::default(),
            ocr: true,
        };
        let thread = thread::Builder::new()
            .name("macroplay-player".into())
            .spawn(move || runner.run_to_end())?;

        Ok(PlaybackHandle {
            control,
            events_rx: rx,
            thread: Some(thread),
        })
    }
}

/// Owns a running playback.
pub struct PlaybackHandle {
    control: Control,
    events_rx: Receiver<PlayerEvent>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PlaybackHandle {
    /// Close the pause gate. Emits `Paused` only when the state changed.
    pub fn pause(&self, reason: impl Into<String>) -> bool {
        let changed = self.control.pause();
        if changed {
            let reason = reason.into();
            tracing::info!(reason = %reason, "paused");
            self.control.emit(PlayerEvent::Paused { paused: true, reason });
        }
        changed
    }

    pub fn resume(&self) -> bool {
        let changed = self.control.resume();
        if changed {
            tracing::info!("resumed");
            self.control.emit(PlayerEvent::Paused {
                paused: false,
                reason: String::new(),
            });
        }
        changed
    }

    /// Request a stop. The run winds down at its next suspension point.
    pub fn stop(&self) {
        if self.control.mark_end(EndState::Stopped, "Stopped by user") {
            tracing::info!("stop requested");
        }
        self.control.cancel();
    }

    pub fn state(&self) -> PlayerState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        !self.state().is_terminal()
    }

    pub fn receiver(&self) -> &Receiver<PlayerEvent> {
        &self.events_rx
    }

    pub fn try_recv(&self) -> Option<PlayerEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn recv(&self) -> Option<PlayerEvent> {
        self.events_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<PlayerEvent> {
        self.events_rx.recv_timeout(timeout).ok()
    }

    /// Wait for the run to finish.
    pub fn join(mut self) -> PlaybackOutcome {
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
        let (state, reason) = self
            .control
            .end()
            .unwrap_or((EndState::Stopped, String::new()));
        PlaybackOutcome { state, reason }
    }
}

impl Iterator for PlaybackHandle {
    type Item = PlayerEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.events_rx.recv().ok()
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.control.cancel();
        }
    }
}

/// Why the main loop unwound.
enum Halt {
    Cancelled,
    Fault(Error),
}

impl From<Cancelled> for Halt {
    fn from(_: Cancelled) -> Self {
        Halt::Cancelled
    }
}

/// What the caller of an action does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    /// Start the record over from its first action.
    Restart,
}

/// Result of one text lookup.
enum Lookup {
    Found(Rect),
    Missing,
    Unavailable,
}

#[derive(Default)]
struct Progress {
    done: usize,
    total: usize,
}

impl Progress {
    fn reset(&mut self, total: usize, control: &Control) {
        self.done = 0;
        self.total = total.max(1);
        self.emit(control);
    }

    fn extend(&mut self, steps: usize, control: &Control) {
        if steps > 0 {
            self.total += steps;
            self.emit(control);
        }
    }

    fn advance(&mut self, control: &Control) {
        self.done += 1;
        self.total = self.total.max(self.done);
        self.emit(control);
    }

    fn emit(&self, control: &Control) {
        control.emit(PlayerEvent::Progress {
            done: self.done,
            total: self.total,
        });
    }
}

struct Runner {
    record: Arc<Record>,
    collab: Collaborators,
    config: PlayerConfig,
    control: Control,
    composer: TriggerComposer,
    options: PlayOptions,
    start_index: usize,
    /// Read by the watchdog.
    base: SharedBase,
    base_rect: Rect,
    scale: f64,
    /// Region the last action worked on; pointer drift targets it.
    current_area: Option<Rect>,
    progress: Progress,
    ocr: bool,
}

impl Runner {
    fn run_to_end(mut self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run()));
        match result {
            Ok(Ok(())) => {
                self.control.mark_end(EndState::Done, "Done");
            }
            Ok(Err(Halt::Cancelled)) => {
                self.control.mark_end(EndState::Stopped, "Stopped");
            }
            Ok(Err(Halt::Fault(e))) => self.fail(e),
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.fail(Error::unexpected(msg));
            }
        }
        self.control.cancel();

        let (state, reason) = self
            .control
            .end()
            .unwrap_or((EndState::Done, "Done".to_string()));
        self.control.set_state(state.into());
        tracing::info!(record = %self.record.name, state = %state, reason = %reason, "playback finished");
        self.control.emit(PlayerEvent::Finished { state, reason });
        self.control.close_events();
    }

    fn fail(&self, e: Error) {
        tracing::warn!(error = %e, "playback failed");
        if self.control.mark_end(EndState::Error, e.message.clone()) {
            self.control.emit(PlayerEvent::Status { text: e.message });
        }
    }

    fn run(&mut self) -> std::result::Result<(), Halt> {
        self.resolve_start_base()?;
        self.ocr = self.collab.text.is_available();
        if !self.ocr && self.record.requires_ocr() {
            self.status(Error::ocr_unavailable().message);
        }
        let _watchdog = self.spawn_watchdog();

        let repeat = self.record.repeat.clone();
        let mut cycles_left = repeat.count;
        let mut cycle = 0u32;
        let mut start = self.start_index;
        loop {
            cycle += 1;
            self.begin_cycle(cycle, repeat.label(cycles_left), start);
            if self.run_pass(start)? == Flow::Restart {
                // A restart uses up a finite cycle but skips the inter-cycle delay.
                if repeat.enabled && !repeat.infinite() {
                    cycles_left = cycles_left.saturating_sub(1);
                    if cycles_left == 0 {
                        return Ok(());
                    }
                }
                tracing::info!(cycle, "restarting from the first action");
                start = 0;
                continue;
            }
            if !repeat.enabled {
                return Ok(());
            }
            if !repeat.infinite() {
                cycles_left = cycles_left.saturating_sub(1);
                if cycles_left == 0 {
                    return Ok(());
                }
            }
            self.control.sleep(repeat.delay.sample_duration())?;
            start = self.start_index;
        }
    }

    fn spawn_watchdog(&self) -> Option<Watchdog> {
        let config = self.options.stop_word.clone().filter(StopWordConfig::is_usable)?;
        if !self.ocr {
            tracing::info!("text recognition unavailable, stop-word watchdog not started");
            return None;
        }
        Watchdog::spawn(
            config,
            self.collab.text.clone(),
            self.base.clone(),
            self.control.clone(),
            self.options.stop_word_enabled.clone(),
            self.config.watchdog_tick,
        )
        .map_err(|e| tracing::warn!(error = %e, "could not start stop-word watchdog"))
        .ok()
    }

    fn begin_cycle(&mut self, number: u32, label: String, start: usize) {
        tracing::info!(cycle = number, label = %label, start, "cycle start");
        self.control.emit(PlayerEvent::Cycle { number, label });
        self.status(format!("cycle start #{}", number));
        self.progress.reset(self.record.total_steps(start), &self.control);
    }

    fn run_pass(&mut self, start: usize) -> std::result::Result<Flow, Halt> {
        let record = self.record.clone();
        for (index, action) in record.actions.iter().enumerate().skip(start) {
            self.control.wait_if_paused()?;
            self.control.emit(PlayerEvent::ActionRow { index });
            tracing::debug!(index, kind = action.type_name(), "action");
            if self.execute(action, Some(index))? == Flow::Restart {
                return Ok(Flow::Restart);
            }
            self.control.wait_if_paused()?;
        }
        Ok(Flow::Next)
    }

    /// `row` is the top-level index; nested fail-branch actions have none.
    fn execute(&mut self, action: &Action, row: Option<usize>) -> std::result::Result<Flow, Halt> {
        match action {
            Action::BaseArea(a) => self.base_area(a, row)?,
            Action::Area(a) => self.area(a, row)?,
            Action::TextArea(a) => return self.text_area(a, row),
            Action::Key(a) => self.key(a, row)?,
            Action::Wait(a) => self.wait(a, row)?,
            Action::WaitEvent(a) => self.wait_event(a, row)?,
        }
        Ok(Flow::Next)
    }

    // Base rectangle

    fn resolve_start_base(&mut self) -> std::result::Result<(), Halt> {
        let record = self.record.clone();
        match record.binding.effective_exe() {
            Some(exe) => {
                let info = self
                    .collab
                    .window
                    .resolve(exe)
                    .ok_or_else(|| Halt::Fault(Error::window_not_found(exe)))?;
                self.set_base(info.rect, info.scale);
            }
            None => self.set_base(self.collab.window.virtual_desktop(), 1.0),
        }
        self.current_area = Some(self.base_rect);
        Ok(())
    }

    fn set_base(&mut self, rect: Rect, scale: f64) {
        self.base_rect = rect;
        self.scale = scale;
        *self.base.lock() = Some(BaseSnapshot { rect, scale });
    }

    fn base_area(&mut self, a: &BaseAreaAction, row: Option<usize>) -> std::result::Result<(), Halt> {
        let record = self.record.clone();
        match record.binding.effective_exe() {
            Some(exe) => {
                let info = self
                    .collab
                    .window
                    .resolve(exe)
                    .ok_or_else(|| Halt::Fault(Error::window_not_found(exe)))?;
                let previous = self.base_rect;
                if info.rect != previous {
                    tracing::debug!(from = ?previous, to = ?info.rect, "window moved");
                    self.current_area = self
                        .current_area
                        .map(|area| to_absolute(&info.rect, &to_relative(&previous, &area)));
                }
                self.set_base(info.rect, info.scale);
            }
            None => {
                self.set_base(a.rect, self.scale);
                self.current_area = Some(a.rect);
            }
        }
        let rect = self.base_rect;
        self.control.emit(PlayerEvent::BaseArea { rect });
        if a.click && rect.larger_than(2) {
            self.approach(&rect)?;
            self.composer.fire(&a.trigger)?;
        }
        self.row_ok(row);
        Ok(())
    }

    // Actions

    fn area(&mut self, a: &AreaAction, row: Option<usize>) -> std::result::Result<(), Halt> {
        let rect = RegionResolver::area(&a.region, &self.base_rect);
        self.current_area = Some(rect);
        if a.click && rect.larger_than(2) {
            self.click_times(&rect, a.multiplier, &a.delay, &a.trigger)?;
        }
        self.step();
        self.row_ok(row);
        Ok(())
    }

    fn click_times(
        &self,
        rect: &Rect,
        times: u32,
        delay: &TimingSpec,
        trigger: &Trigger,
    ) -> std::result::Result<(), Cancelled> {
        for _ in 0..times.max(1) {
            self.control.sleep(delay.sample_duration())?;
            self.approach(rect)?;
            self.composer.fire(trigger)?;
        }
        Ok(())
    }

    fn text_area(&mut self, a: &TextAreaAction, row: Option<usize>) -> std::result::Result<Flow, Halt> {
        let word = &a.search.word;
        let max_tries = a.max_tries.max(1);
        loop {
            let mut attempt = 0u32;
            let found = loop {
                attempt += 1;
                self.control.wait_if_paused()?;
                match self.find(&a.search) {
                    Lookup::Found(rect) => break Some(rect),
                    Lookup::Unavailable => {
                        self.skip_unavailable(row);
                        return Ok(Flow::Next);
                    }
                    Lookup::Missing => {}
                }
                if !a.search_infinite && attempt >= max_tries {
                    break None;
                }
                self.current(if a.search_infinite {
                    format!("'{}' not found, attempt {}", word, attempt)
                } else {
                    format!("'{}' not found, attempt {}/{}", word, attempt, max_tries)
                });
                self.control.sleep(self.config.search_retry_delay)?;
            };

            if let Some(rect) = found {
                tracing::debug!(word = %word, attempt, rect = ?rect, "text found");
                self.current_area = Some(rect);
                if a.click {
                    self.click_times(&rect, a.multiplier, &a.delay, &a.trigger)?;
                }
                self.step();
                self.row_ok(row);
                return Ok(Flow::Next);
            }

            let err = Error::search_exhausted(word, attempt);
            tracing::info!(word = %word, attempts = attempt, on_fail = a.on_fail.as_str(), "search exhausted");
            match a.on_fail {
                OnFail::Retry => {
                    let secs = self.config.search_round_delay.as_secs_f64();
                    self.current(format!("'{}' not found, retry in {}s", word, secs));
                    self.control.sleep(self.config.search_round_delay)?;
                }
                OnFail::Error => {
                    self.row_error(row, &err.message);
                    return Err(Halt::Fault(err));
                }
                OnFail::RunActions => {
                    self.row_error(row, &err.message);
                    return self.fail_branch(a);
                }
            }
        }
    }

    fn fail_branch(&mut self, a: &TextAreaAction) -> std::result::Result<Flow, Halt> {
        let branch = &a.on_fail_actions;
        self.current(format!("fail-branch: running {} actions", branch.len()));
        self.progress
            .extend(branch.iter().map(Action::steps).sum(), &self.control);
        for action in branch {
            self.control.wait_if_paused()?;
            if self.execute(action, None)? == Flow::Restart {
                return Ok(Flow::Restart);
            }
        }
        self.step();
        match a.post_mode {
            PostMode::None => Ok(Flow::Next),
            PostMode::Repeat => Ok(Flow::Restart),
            PostMode::Stop => {
                let reason = format!("Stopped after fail-branch for '{}'", a.search.word);
                if self.control.mark_end(EndState::Stopped, reason.clone()) {
                    self.status(reason);
                }
                self.control.cancel();
                Err(Halt::Cancelled)
            }
        }
    }

    fn key(&mut self, a: &KeyAction, row: Option<usize>) -> std::result::Result<(), Halt> {
        match a.press_mode {
            PressMode::Normal => {
                for _ in 0..a.multiplier.max(1) {
                    self.drift(a.delay.sample_duration())?;
                    self.composer.fire(&a.trigger)?;
                    self.step();
                }
            }
            PressMode::Long => {
                if a.long_press.is_empty() {
                    self.current("long press: no items".to_string());
                } else {
                    let progress = &mut self.progress;
                    let control = &self.control;
                    longpress::run(&self.composer, control, &a.long_press, |_| {
                        progress.advance(control)
                    })?;
                }
            }
        }
        self.row_ok(row);
        Ok(())
    }

    fn wait(&mut self, a: &WaitAction, row: Option<usize>) -> std::result::Result<(), Halt> {
        self.control.sleep(a.delay.sample_duration())?;
        self.step();
        self.row_ok(row);
        Ok(())
    }

    fn wait_event(&mut self, a: &WaitEventAction, row: Option<usize>) -> std::result::Result<(), Halt> {
        let area = a.region.resolve(&self.base_rect);
        if !area.larger_than(1) {
            self.row_error(row, "wait region is too small");
            self.step();
            return Ok(());
        }
        let search = a.search();
        let poll = Duration::from_secs_f64(a.poll_interval());
        let mut checks = 0u32;
        loop {
            self.control.wait_if_paused()?;
            checks += 1;
            match self.find(&search) {
                Lookup::Found(_) => break,
                Lookup::Unavailable => {
                    self.skip_unavailable(row);
                    return Ok(());
                }
                Lookup::Missing => {}
            }
            self.current(format!("waiting for '{}' (check {})", a.expected_text, checks));
            self.control.sleep(poll)?;
        }
        tracing::debug!(text = %a.expected_text, checks, "text appeared");
        self.step();
        self.row_ok(row);
        Ok(())
    }

    // Helpers

    fn find(&mut self, search: &TextSearch) -> Lookup {
        if !self.ocr {
            return Lookup::Unavailable;
        }
        let resolver = RegionResolver::new(self.collab.text.as_ref());
        match resolver.find_text(search, &self.base_rect, self.scale) {
            Ok(Some(rect)) => Lookup::Found(rect),
            Ok(None) => Lookup::Missing,
            Err(LocateError::Unavailable) => {
                self.ocr = false;
                Lookup::Unavailable
            }
            Err(e) => {
                tracing::warn!(word = %search.word, error = %e, "text search failed");
                Lookup::Missing
            }
        }
    }

    fn skip_unavailable(&mut self, row: Option<usize>) {
        self.current("text recognition unavailable, action skipped".to_string());
        self.step();
        self.row_ok(row);
    }

    /// Move to the center of `rect` before clicking it.
    fn approach(&self, rect: &Rect) -> std::result::Result<(), Cancelled> {
        let (x, y) = rect.center();
        self.composer.ease_to(x, y, self.config.approach_duration)
    }

    /// Wait `d`, easing the pointer toward a random point of the active region
    /// when pointer movement is enabled.
    fn drift(&self, d: Duration) -> std::result::Result<(), Cancelled> {
        let target = self
            .current_area
            .filter(|r| self.record.move_mouse && r.larger_than(10) && !d.is_zero());
        match target {
            Some(r) => {
                let mut rng = rand::thread_rng();
                let (ix, iy) = (r.width() / 5, r.height() / 5);
                let x = rng.gen_range(r.left + ix..=r.right - ix);
                let y = rng.gen_range(r.top + iy..=r.bottom - iy);
                self.composer.ease_to(x, y, d)
            }
            None => self.control.sleep(d),
        }
    }

    fn step(&mut self) {
        self.progress.advance(&self.control);
    }

    fn status(&self, text: String) {
        self.control.emit(PlayerEvent::Status { text });
    }

    fn current(&self, text: String) {
        self.control.emit(PlayerEvent::Current { text });
    }

    fn row_ok(&self, row: Option<usize>) {
        if let Some(index) = row {
            self.control.emit(PlayerEvent::ActionOk { index });
        }
    }

    fn row_error(&self, row: Option<usize>, message: &str) {
        tracing::debug!(row = ?row, message, "action failed");
        if let Some(index) = row {
            self.control.emit(PlayerEvent::ActionError {
                index,
                message: message.to_string(),
            });
        }
    }
}
