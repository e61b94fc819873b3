//! JSON wire format for actions.
//!
//! The reader is forgiving: missing or mistyped fields take their defaults,
//! older layouts are migrated, and an unknown `type` reads as a key action.

use crate::action::*;
use crate::config::{DEFAULT_ACTION_DELAY, DEFAULT_HOLD, DEFAULT_OCR_LANG, DEFAULT_POLL, DEFAULT_WAIT, MIN_POLL};
use crate::geometry::{Rect, Region, RelRect};
use crate::timing::TimingSpec;
use crate::trigger::{MouseButton, Trigger, TriggerKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(as_f64).unwrap_or(default)
    }

    fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(as_i64).unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(as_bool).unwrap_or(default)
    }

    fn str_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    fn timing_or(&self, key: &str, default: f64) -> TimingSpec {
        match self.get(key) {
            Some(v) => TimingSpec::from_value(v),
            None => TimingSpec::fixed(default),
        }
    }

    fn multiplier(&self) -> u32 {
        self.i64_or("multiplier", 1).clamp(1, u32::MAX as i64) as u32
    }

    fn object(&self, key: &str) -> Option<&'a Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    fn trigger(&self, key: &str) -> Option<Trigger> {
        self.get(key)
            .filter(|v| v.is_object())
            .and_then(|v| Trigger::deserialize(v).ok())
    }

    /// Trigger stored inline as `kind`/`keys`/`mouse_button`, as key actions do.
    fn inline_trigger(&self) -> Trigger {
        let kind = match self.get("kind").and_then(Value::as_str) {
            Some("mouse") => TriggerKind::Mouse,
            _ => TriggerKind::Keys,
        };
        let keys = match self.get("keys") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|k| match k {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };
        Trigger {
            kind,
            keys,
            mouse_button: self
                .get("mouse_button")
                .and_then(Value::as_str)
                .and_then(MouseButton::parse),
        }
        .normalized()
    }

    fn rect(&self) -> Rect {
        let c = |k: &str| self.i64_or(k, 0).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        Rect::from_points(c("x1"), c("y1"), c("x2"), c("y2"))
    }

    fn region(&self) -> Region {
        let rel = self.get("coord").and_then(Value::as_str) == Some("rel")
            || ["rx1", "ry1", "rx2", "ry2"].iter().any(|k| self.has(k));
        if rel {
            Region::Relative(RelRect::new(
                self.f64_or("rx1", 0.0),
                self.f64_or("ry1", 0.0),
                self.f64_or("rx2", 1.0),
                self.f64_or("ry2", 1.0),
            ))
        } else {
            Region::Absolute(self.rect())
        }
    }
}

pub fn action_from_value(value: &Value) -> Action {
    let empty = Map::new();
    let f = Fields(value.as_object().unwrap_or(&empty));
    match f.get("type").and_then(Value::as_str).unwrap_or("") {
        "base_area" => Action::BaseArea(BaseAreaAction {
            rect: f.rect(),
            click: f.bool_or("click", true),
            trigger: f.trigger("trigger").unwrap_or_default(),
        }),
        "area" => Action::Area(AreaAction {
            region: f.region(),
            click: f.bool_or("click", false),
            multiplier: f.multiplier(),
            delay: f.timing_or("delay", DEFAULT_ACTION_DELAY),
            trigger: f.trigger("trigger").unwrap_or_default(),
        }),
        "area_word" => Action::TextArea(text_area(&f)),
        "wait" => Action::Wait(WaitAction {
            delay: f.timing_or("delay", DEFAULT_WAIT),
        }),
        "wait_event" => Action::WaitEvent(wait_event(&f)),
        _ => Action::Key(key(&f)),
    }
}

fn text_area(f: &Fields<'_>) -> TextAreaAction {
    let legacy_button = f
        .get("button")
        .and_then(Value::as_str)
        .and_then(MouseButton::parse)
        .unwrap_or_default();
    let count = match f.get("count") {
        None => 0,
        Some(v) => as_i64(v).unwrap_or(1).clamp(0, u32::MAX as i64) as u32,
    };
    let on_fail_actions = match f.get("on_fail_actions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| v.is_object())
            .map(action_from_value)
            .collect(),
        _ => Vec::new(),
    };
    TextAreaAction {
        search: TextSearch {
            region: f.region(),
            word: f.str_or("word", ""),
            index: f.i64_or("index", 1).clamp(1, u32::MAX as i64) as u32,
            count,
            ocr_lang: f.str_or("ocr_lang", DEFAULT_OCR_LANG),
        },
        search_infinite: f.bool_or("search_infinite", true),
        max_tries: f
            .i64_or("search_max_tries", crate::config::DEFAULT_MAX_TRIES as i64)
            .clamp(1, u32::MAX as i64) as u32,
        on_fail: OnFail::parse(&f.str_or("search_on_fail", "retry")),
        on_fail_actions,
        post_mode: PostMode::parse(&f.str_or("on_fail_post_mode", "none")),
        click: f.bool_or("click", false),
        multiplier: f.multiplier(),
        delay: f.timing_or("delay", DEFAULT_ACTION_DELAY),
        trigger: f
            .trigger("trigger")
            .unwrap_or_else(|| Trigger::mouse(legacy_button)),
    }
}

fn wait_event(f: &Fields<'_>) -> WaitEventAction {
    let mut expected_text = f.str_or("expected_text", "");
    // Numeric waits were folded into plain text matching.
    if expected_text.trim().is_empty() && f.str_or("mode", "text") == "number" {
        expected_text = match f.get("number_value") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(v) => as_f64(v).map(format_number).unwrap_or_default(),
            None => String::new(),
        };
    }
    WaitEventAction {
        region: f.region(),
        expected_text,
        ocr_lang: f.str_or("ocr_lang", DEFAULT_OCR_LANG),
        poll: f.f64_or("poll", DEFAULT_POLL).max(MIN_POLL),
    }
}

/// Shortest form: `5` rather than `5.0`.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn key(f: &Fields<'_>) -> KeyAction {
    let press_mode = match f.str_or("press_mode", "normal").trim().to_ascii_lowercase().as_str() {
        "long" => PressMode::Long,
        _ => PressMode::Normal,
    };
    let long_press = f
        .object("long_press")
        .and_then(|lp| lp.get("actions"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(long_press_item).collect())
        .unwrap_or_default();
    KeyAction {
        trigger: f.inline_trigger(),
        multiplier: f.multiplier(),
        delay: f.timing_or("delay", DEFAULT_ACTION_DELAY),
        press_mode,
        long_press,
    }
}

fn long_press_item(value: &Value) -> Option<LongPressItem> {
    let f = Fields(value.as_object()?);
    let activation = match f.str_or("activate_mode", "after_prev").trim().to_ascii_lowercase().as_str() {
        "from_start" => Activation::FromStart,
        _ => Activation::AfterPrevious,
    };
    let (trigger, hold) = match f.trigger("trigger") {
        Some(t) => (t, f.timing_or("hold", DEFAULT_HOLD)),
        // Older files stored a plain key action per item; its delay was the hold.
        None => match action_from_value(value) {
            Action::Key(k) => (k.trigger, k.delay),
            _ => return None,
        },
    };
    Some(LongPressItem {
        trigger,
        hold: fixed_collapsed(hold),
        activation,
        start_offset: fixed_collapsed(f.timing_or("start_delay", 0.0)),
    })
}

fn fixed_collapsed(mut t: TimingSpec) -> TimingSpec {
    t.a = t.a.max(0.0);
    t.b = t.b.max(0.0);
    if t.mode == crate::timing::TimingMode::Fixed {
        t.b = t.a;
    }
    t
}

fn region_fields(region: &Region, out: &mut Map<String, Value>) {
    match region {
        Region::Relative(r) => {
            out.insert("coord".into(), json!("rel"));
            out.insert("rx1".into(), json!(r.rx1));
            out.insert("ry1".into(), json!(r.ry1));
            out.insert("rx2".into(), json!(r.rx2));
            out.insert("ry2".into(), json!(r.ry2));
        }
        Region::Absolute(r) => {
            out.insert("coord".into(), json!("abs"));
            rect_fields(r, out);
        }
    }
}

fn rect_fields(r: &Rect, out: &mut Map<String, Value>) {
    out.insert("x1".into(), json!(r.left));
    out.insert("y1".into(), json!(r.top));
    out.insert("x2".into(), json!(r.right));
    out.insert("y2".into(), json!(r.bottom));
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

pub fn action_to_value(action: &Action) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), json!(action.type_name()));
    match action {
        Action::BaseArea(a) => {
            rect_fields(&a.rect, &mut out);
            out.insert("click".into(), json!(a.click));
            out.insert("trigger".into(), json!(a.trigger));
        }
        Action::Area(a) => {
            out.extend(object(json!({
                "click": a.click,
                "multiplier": a.multiplier,
                "delay": a.delay,
                "trigger": a.trigger,
            })));
            region_fields(&a.region, &mut out);
        }
        Action::TextArea(a) => {
            let button = if a.trigger.is_mouse() { a.trigger.button() } else { MouseButton::Left };
            out.extend(object(json!({
                "word": a.search.word,
                "index": a.search.index,
                "count": a.search.count,
                "click": a.click,
                "multiplier": a.multiplier,
                "delay": a.delay,
                "button": button.as_str(),
                "trigger": a.trigger,
                "ocr_lang": a.search.ocr_lang,
                "search_infinite": a.search_infinite,
                "search_max_tries": a.max_tries.max(1),
                "search_on_fail": a.on_fail.as_str(),
                "on_fail_actions": a.on_fail_actions.iter().map(action_to_value).collect::<Vec<_>>(),
                "on_fail_post_mode": a.post_mode.as_str(),
            })));
            region_fields(&a.search.region, &mut out);
        }
        Action::Key(a) => {
            let items: Vec<Value> = a
                .long_press
                .iter()
                .map(|i| {
                    json!({
                        "trigger": i.trigger,
                        "hold": i.hold,
                        "activate_mode": i.activation.as_str(),
                        "start_delay": i.start_offset,
                    })
                })
                .collect();
            out.extend(object(json!({
                "kind": a.trigger.kind,
                "keys": a.trigger.keys,
                "mouse_button": a.trigger.mouse_button,
                "multiplier": a.multiplier,
                "delay": a.delay,
                "press_mode": match a.press_mode {
                    PressMode::Normal => "normal",
                    PressMode::Long => "long",
                },
                "long_press": { "actions": items },
            })));
        }
        Action::Wait(a) => {
            out.insert("delay".into(), json!(a.delay));
        }
        Action::WaitEvent(a) => {
            out.extend(object(json!({
                "expected_text": a.expected_text,
                "ocr_lang": a.ocr_lang,
                "poll": a.poll,
            })));
            region_fields(&a.region, &mut out);
        }
    }
    Value::Object(out)
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        action_to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(action_from_value(&value))
    }
}
