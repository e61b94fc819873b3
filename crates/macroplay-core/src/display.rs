//! One-line summaries for listing actions.

use crate::action::*;
use crate::geometry::{Rect, Region};

fn rect_text(r: &Rect) -> String {
    format!("({}, {}) -> ({}, {})", r.left, r.top, r.right, r.bottom)
}

fn region_text(region: &Region) -> String {
    match region {
        Region::Relative(r) => format!(
            "rel=({:.3},{:.3})->({:.3},{:.3})",
            r.rx1, r.ry1, r.rx2, r.ry2
        ),
        Region::Absolute(r) => format!("{}; size: {}x{}", rect_text(r), r.width(), r.height()),
    }
}

fn click_text(click: bool, multiplier: u32, trigger: &crate::trigger::Trigger) -> String {
    if !click {
        return String::new();
    }
    if multiplier > 1 {
        format!("; {} x{}", trigger, multiplier)
    } else {
        format!("; {}", trigger)
    }
}

impl Action {
    /// `(title, detail)` for list views.
    pub fn summary(&self) -> (String, String) {
        match self {
            Action::BaseArea(a) => (
                "Base area".into(),
                format!(
                    "frame: {}; size: {}x{}{}",
                    rect_text(&a.rect),
                    a.rect.width(),
                    a.rect.height(),
                    click_text(a.click, 1, &a.trigger)
                ),
            ),
            Action::Area(a) => (
                "Area".into(),
                format!(
                    "zone: {}{}",
                    region_text(&a.region),
                    click_text(a.click, a.multiplier, &a.trigger)
                ),
            ),
            Action::TextArea(a) => {
                let occurrence = if a.search.count > 0 {
                    format!("{}/{}", a.search.index, a.search.count)
                } else {
                    a.search.index.to_string()
                };
                let tries = if a.search_infinite {
                    "until found".to_string()
                } else {
                    format!("{} tries, then {}", a.max_tries, a.on_fail.as_str())
                };
                (
                    "Text area".into(),
                    format!(
                        "text \"{}\"; occurrence: {}; zone: {}; {}{}",
                        a.search.word,
                        occurrence,
                        region_text(&a.search.region),
                        tries,
                        click_text(a.click, a.multiplier, &a.trigger)
                    ),
                )
            }
            Action::Key(a) => {
                let detail = match a.press_mode {
                    PressMode::Long => format!("long press: {} items", a.long_press.len()),
                    PressMode::Normal => {
                        let what = if a.trigger.is_mouse() { "mouse" } else { "keys" };
                        let times = if a.multiplier > 1 { format!(" x{}", a.multiplier) } else { String::new() };
                        format!("{}: {}{}", what, a.trigger, times)
                    }
                };
                ("Press".into(), detail)
            }
            Action::Wait(a) => ("Wait".into(), format!("duration: {}", a.delay)),
            Action::WaitEvent(a) => (
                "Wait".into(),
                format!(
                    "text \"{}\"; zone: {}; every {:.1}s",
                    a.expected_text,
                    region_text(&a.region),
                    a.poll_interval()
                ),
            ),
        }
    }
}
