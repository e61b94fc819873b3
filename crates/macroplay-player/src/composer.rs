//! Realizes triggers through the input injector.

use crate::control::{Cancelled, Control};
use macroplay_core::{InputInjector, MouseButton, PlayerConfig, Trigger};
use std::sync::Arc;
use std::time::Duration;

/// An input that is currently held down.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pressed {
    Key(String),
    Button(MouseButton),
}

/// Inputs pressed by [`TriggerComposer::begin_hold`], released by `end_hold`.
#[derive(Debug, Default)]
pub struct HoldHandle {
    pressed: Vec<Pressed>,
}

impl HoldHandle {
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }
}

pub struct TriggerComposer {
    input: Arc<dyn InputInjector>,
    config: PlayerConfig,
    control: Control,
}

impl TriggerComposer {
    pub fn new(input: Arc<dyn InputInjector>, config: PlayerConfig, control: Control) -> Self {
        Self { input, config, control }
    }

    /// Press and release `trigger` once. Held inputs are released even when
    /// cancelled mid-hold.
    pub fn fire(&self, trigger: &Trigger) -> Result<(), Cancelled> {
        if trigger.is_mouse() {
            return self.click(trigger);
        }
        let hold = self.begin_hold(trigger);
        if hold.is_empty() {
            tracing::debug!(trigger = %trigger, "nothing to press");
        }
        let held = self.control.sleep(self.config.key_hold);
        self.end_hold(hold);
        held?;
        self.control.sleep(self.config.key_after_up)
    }

    fn click(&self, trigger: &Trigger) -> Result<(), Cancelled> {
        let chord = trigger.chord();
        let mut hold = HoldHandle::default();
        for m in &chord.modifiers {
            self.press_key(m.key_name(), &mut hold);
            self.gap(self.config.modifier_gap);
        }
        self.gap(self.config.mouse_settle);
        let button = trigger.button();
        if self.config.click_hold.is_zero() {
            if let Err(e) = self.input.mouse_click(button) {
                tracing::debug!(button = button.as_str(), error = %e, "click failed");
            }
        } else {
            self.press_button(button, &mut hold);
            self.gap(self.config.click_hold);
            if matches!(hold.pressed.last(), Some(Pressed::Button(_))) {
                self.release(hold.pressed.pop());
            }
        }
        self.end_hold(hold);
        self.control.wait_if_paused()
    }

    /// Press `trigger` without releasing it: modifiers in canonical order,
    /// then keys (or the mouse button).
    pub fn begin_hold(&self, trigger: &Trigger) -> HoldHandle {
        let chord = trigger.chord();
        let mut hold = HoldHandle::default();
        for m in &chord.modifiers {
            self.press_key(m.key_name(), &mut hold);
            if trigger.is_mouse() {
                self.gap(self.config.modifier_gap);
            }
        }
        if trigger.is_mouse() {
            self.gap(self.config.mouse_settle);
            self.press_button(trigger.button(), &mut hold);
        } else {
            for key in &chord.keys {
                self.press_key(key, &mut hold);
            }
        }
        hold
    }

    /// Release everything in `hold`, last pressed first.
    pub fn end_hold(&self, mut hold: HoldHandle) {
        while let Some(p) = hold.pressed.pop() {
            self.release(Some(p));
        }
    }

    /// Move the pointer to `(x, y)` along an eased path taking `duration`.
    pub fn ease_to(&self, x: i32, y: i32, duration: Duration) -> Result<(), Cancelled> {
        let from = self.input.mouse_position();
        let steps = (duration.as_secs_f64() * f64::from(self.config.pointer_steps_per_sec)).round() as u32;
        let (fx, fy) = match from {
            Some(p) if steps > 1 => p,
            _ => {
                self.move_to(x, y);
                return self.control.sleep(duration);
            }
        };
        let slice = duration / steps;
        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            let s = t * t * (3.0 - 2.0 * t);
            let px = f64::from(fx) + f64::from(x - fx) * s;
            let py = f64::from(fy) + f64::from(y - fy) * s;
            self.move_to(px.round() as i32, py.round() as i32);
            self.control.sleep(slice)?;
        }
        Ok(())
    }

    pub fn move_to(&self, x: i32, y: i32) {
        if let Err(e) = self.input.mouse_move_to(x, y) {
            tracing::debug!(x, y, error = %e, "pointer move failed");
        }
    }

    fn press_key(&self, name: &str, hold: &mut HoldHandle) {
        match self.input.key_down(name) {
            Ok(()) => hold.pressed.push(Pressed::Key(name.to_string())),
            Err(e) => tracing::debug!(key = name, error = %e, "key ignored"),
        }
    }

    fn press_button(&self, button: MouseButton, hold: &mut HoldHandle) {
        match self.input.mouse_press(button) {
            Ok(()) => hold.pressed.push(Pressed::Button(button)),
            Err(e) => tracing::debug!(button = button.as_str(), error = %e, "mouse press failed"),
        }
    }

    fn release(&self, pressed: Option<Pressed>) {
        let result = match &pressed {
            Some(Pressed::Key(name)) => self.input.key_up(name),
            Some(Pressed::Button(b)) => self.input.mouse_release(*b),
            None => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(input = ?pressed, error = %e, "release failed");
        }
    }

    /// Short pause inside a trigger. Cancellation cuts it short but the
    /// trigger still completes so nothing stays pressed.
    fn gap(&self, d: Duration) {
        if !d.is_zero() {
            let _ = self.control.sleep(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroplay_core::InputError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl InputInjector for Log {
        fn key_down(&self, name: &str) -> Result<(), InputError> {
            if name == "bogus" {
                return Err(InputError::UnknownKey(name.into()));
            }
            self.0.lock().push(format!("down {}", name));
            Ok(())
        }
        fn key_up(&self, name: &str) -> Result<(), InputError> {
            self.0.lock().push(format!("up {}", name));
            Ok(())
        }
        fn mouse_move_to(&self, x: i32, y: i32) -> Result<(), InputError> {
            self.0.lock().push(format!("move {},{}", x, y));
            Ok(())
        }
        fn mouse_click(&self, button: MouseButton) -> Result<(), InputError> {
            self.0.lock().push(format!("click {}", button.as_str()));
            Ok(())
        }
        fn mouse_press(&self, button: MouseButton) -> Result<(), InputError> {
            if button == MouseButton::Middle {
                return Err(InputError::Failed("no middle button".into()));
            }
            self.0.lock().push(format!("press {}", button.as_str()));
            Ok(())
        }
        fn mouse_release(&self, button: MouseButton) -> Result<(), InputError> {
            self.0.lock().push(format!("release {}", button.as_str()));
            Ok(())
        }
    }

    fn composer(config: PlayerConfig) -> (TriggerComposer, Arc<Log>, Control) {
        let log = Arc::new(Log::default());
        let (tx, _rx) = crossbeam_channel::unbounded();
        let control = Control::new(config.sleep_chunk, tx);
        (TriggerComposer::new(log.clone(), config, control.clone()), log, control)
    }

    #[test]
    fn keys_press_in_canonical_order_and_release_reversed() {
        let (c, log, _) = composer(PlayerConfig::instant());
        c.fire(&Trigger::keys(["e", "shift", "ctrl"])).unwrap();
        assert_eq!(
            *log.0.lock(),
            ["down ctrl", "down shift", "down e", "up e", "up shift", "up ctrl"]
        );
    }

    #[test]
    fn mouse_with_modifiers() {
        let (c, log, _) = composer(PlayerConfig::instant());
        c.fire(&Trigger::mouse(MouseButton::Right).with_modifiers(["alt"])).unwrap();
        assert_eq!(*log.0.lock(), ["down alt", "click right", "up alt"]);
    }

    #[test]
    fn mouse_press_release_with_click_hold() {
        let (c, log, _) = composer(PlayerConfig {
            click_hold: Duration::from_millis(5),
            ..PlayerConfig::instant()
        });
        c.fire(&Trigger::mouse(MouseButton::Left)).unwrap();
        assert_eq!(*log.0.lock(), ["press left", "release left"]);
    }

    #[test]
    fn failed_press_releases_modifiers_once() {
        let (c, log, _) = composer(PlayerConfig {
            click_hold: Duration::from_millis(5),
            ..PlayerConfig::instant()
        });
        c.fire(&Trigger::mouse(MouseButton::Middle).with_modifiers(["ctrl", "alt"])).unwrap();
        assert_eq!(*log.0.lock(), ["down ctrl", "down alt", "up alt", "up ctrl"]);
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let (c, log, _) = composer(PlayerConfig::instant());
        c.fire(&Trigger::keys(["bogus", "a"])).unwrap();
        assert_eq!(*log.0.lock(), ["down a", "up a"]);
    }

    #[test]
    fn cancelled_hold_still_releases() {
        let (c, log, control) = composer(PlayerConfig {
            key_hold: Duration::from_secs(5),
            ..PlayerConfig::instant()
        });
        control.cancel();
        assert_eq!(c.fire(&Trigger::keys(["a"])), Err(Cancelled));
        assert_eq!(*log.0.lock(), ["down a", "up a"]);
    }

    #[test]
    fn ease_without_position_jumps() {
        let (c, log, _) = composer(PlayerConfig::instant());
        c.ease_to(10, 20, Duration::from_millis(50)).unwrap();
        assert_eq!(*log.0.lock(), ["move 10,20"]);
    }
}
