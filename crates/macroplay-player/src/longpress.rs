//! Long-press timelines: overlapping holds scheduled from a list of items.

use crate::composer::{HoldHandle, TriggerComposer};
use crate::control::{Cancelled, Control};
use macroplay_core::{Activation, LongPressItem};
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Edge {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEvent {
    /// Seconds from the start of the long press.
    pub at: f64,
    pub index: usize,
    pub edge: Edge,
}

/// Sample every item and lay the holds out on one timeline, ordered by
/// time, then list index, then begin before end.
pub fn plan<R: Rng + ?Sized>(items: &[LongPressItem], rng: &mut R) -> Vec<TimelineEvent> {
    let mut events = Vec::with_capacity(items.len() * 2);
    let mut prev_end = 0.0;
    for (index, item) in items.iter().enumerate() {
        let start = match item.activation {
            Activation::AfterPrevious => prev_end,
            Activation::FromStart => item.start_offset.sample_with(rng),
        };
        let end = start + item.hold.sample_with(rng);
        prev_end = end;
        events.push(TimelineEvent { at: start, index, edge: Edge::Begin });
        events.push(TimelineEvent { at: end, index, edge: Edge::End });
    }
    events.sort_by(|a, b| {
        a.at.total_cmp(&b.at)
            .then(a.index.cmp(&b.index))
            .then(a.edge.cmp(&b.edge))
    });
    events
}

/// Inputs held by a running timeline. Whatever is still down when this is
/// dropped gets released, highest index first.
struct Held<'a> {
    composer: &'a TriggerComposer,
    holds: BTreeMap<usize, HoldHandle>,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        while let Some((index, hold)) = self.holds.pop_last() {
            tracing::debug!(index, "releasing held input");
            self.composer.end_hold(hold);
        }
    }
}

/// Play `items`, calling `on_release` after each hold ends.
pub fn run(
    composer: &TriggerComposer,
    control: &Control,
    items: &[LongPressItem],
    mut on_release: impl FnMut(usize),
) -> Result<(), Cancelled> {
    let events = plan(items, &mut rand::thread_rng());
    tracing::debug!(items = items.len(), span = span(&events), "long press");
    let mut held = Held {
        composer,
        holds: BTreeMap::new(),
    };
    let clock = control.clock();
    for ev in events {
        control.sleep_until(&clock, Duration::from_secs_f64(ev.at))?;
        match ev.edge {
            Edge::Begin => {
                let hold = composer.begin_hold(&items[ev.index].trigger);
                held.holds.insert(ev.index, hold);
            }
            Edge::End => {
                if let Some(hold) = held.holds.remove(&ev.index) {
                    composer.end_hold(hold);
                }
                on_release(ev.index);
            }
        }
    }
    Ok(())
}

/// Total span of a planned timeline in seconds.
pub fn span(events: &[TimelineEvent]) -> f64 {
    events.iter().map(|e| e.at).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroplay_core::{TimingSpec, Trigger};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(key: &str, hold: f64, activation: Activation, offset: f64) -> LongPressItem {
        LongPressItem {
            trigger: Trigger::keys([key]),
            hold: TimingSpec::fixed(hold),
            activation,
            start_offset: TimingSpec::fixed(offset),
        }
    }

    fn order(events: &[TimelineEvent]) -> Vec<(usize, Edge)> {
        events.iter().map(|e| (e.index, e.edge)).collect()
    }

    #[test]
    fn overlapping_holds_interleave() {
        let items = [
            item("a", 0.2, Activation::AfterPrevious, 0.0),
            item("b", 0.1, Activation::FromStart, 0.05),
        ];
        let events = plan(&items, &mut StdRng::seed_from_u64(1));
        assert_eq!(
            order(&events),
            [(0, Edge::Begin), (1, Edge::Begin), (1, Edge::End), (0, Edge::End)]
        );
        assert_eq!(events[0].at, 0.0);
        assert_eq!(events[1].at, 0.05);
        assert!((span(&events) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn coinciding_events_follow_index_then_edge() {
        // a ends exactly when b begins: a has the lower index so its end goes first.
        let items = [
            item("a", 0.25, Activation::AfterPrevious, 0.0),
            item("b", 0.5, Activation::FromStart, 0.25),
        ];
        let events = plan(&items, &mut StdRng::seed_from_u64(1));
        assert_eq!(
            order(&events),
            [(0, Edge::Begin), (0, Edge::End), (1, Edge::Begin), (1, Edge::End)]
        );

        // Zero-length hold: begin still precedes end at the same instant.
        let items = [item("a", 0.0, Activation::FromStart, 0.5)];
        let events = plan(&items, &mut StdRng::seed_from_u64(1));
        assert_eq!(order(&events), [(0, Edge::Begin), (0, Edge::End)]);
    }

    #[test]
    fn after_previous_chains() {
        let items = [
            item("a", 0.25, Activation::AfterPrevious, 0.0),
            item("b", 0.25, Activation::AfterPrevious, 0.0),
            item("c", 0.5, Activation::AfterPrevious, 0.0),
        ];
        let events = plan(&items, &mut StdRng::seed_from_u64(1));
        let begins: Vec<f64> = events.iter().filter(|e| e.edge == Edge::Begin).map(|e| e.at).collect();
        assert_eq!(begins, [0.0, 0.25, 0.5]);
        assert_eq!(span(&events), 1.0);
    }

    #[test]
    fn after_previous_follows_list_order_not_time() {
        let items = [
            item("a", 0.5, Activation::FromStart, 1.0),
            item("b", 0.25, Activation::AfterPrevious, 0.0),
        ];
        let events = plan(&items, &mut StdRng::seed_from_u64(1));
        let b_begin = events.iter().find(|e| e.index == 1 && e.edge == Edge::Begin).unwrap();
        assert_eq!(b_begin.at, 1.5);
    }
}
