// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording and playback.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps every event it receives
//! as a [`RecordedEvent`], in arrival order. [`replay`] feeds a recording back
//! into any other sink, so a run can be captured once and then printed,
//! exported, or inspected later.

use lookout_core::trace::{
    AdmissionEvent, DispatchBeginEvent, DispatchSummary, ListenerRunEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// RecordedEvent
// ---------------------------------------------------------------------------

/// A single recorded trace event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`DispatchBeginEvent`].
    DispatchBegin(DispatchBeginEvent),
    /// An [`AdmissionEvent`].
    Admission(AdmissionEvent),
    /// A [`ListenerRunEvent`].
    ListenerRun(ListenerRunEvent),
    /// A [`DispatchSummary`].
    DispatchSummary(DispatchSummary),
}

impl RecordedEvent {
    /// Returns the round this event belongs to.
    #[must_use]
    pub const fn tick_index(&self) -> u64 {
        match self {
            Self::DispatchBegin(e) => e.tick_index,
            Self::Admission(e) => e.tick_index,
            Self::ListenerRun(e) => e.tick_index,
            Self::DispatchSummary(s) => s.tick_index,
        }
    }

    /// Delivers this event to `sink` through the matching callback.
    pub fn deliver(&self, sink: &mut dyn TraceSink) {
        match self {
            Self::DispatchBegin(e) => sink.on_dispatch_begin(e),
            Self::Admission(e) => sink.on_admission(e),
            Self::ListenerRun(e) => sink.on_listener_run(e),
            Self::DispatchSummary(s) => sink.on_dispatch_summary(s),
        }
    }
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in arrival order.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns the per-round summaries only.
    pub fn summaries(&self) -> impl Iterator<Item = &DispatchSummary> {
        self.events.iter().filter_map(|e| match e {
            RecordedEvent::DispatchSummary(s) => Some(s),
            _ => None,
        })
    }
}

impl TraceSink for RecorderSink {
    fn on_dispatch_begin(&mut self, e: &DispatchBeginEvent) {
        self.events.push(RecordedEvent::DispatchBegin(*e));
    }

    fn on_admission(&mut self, e: &AdmissionEvent) {
        self.events.push(RecordedEvent::Admission(*e));
    }

    fn on_listener_run(&mut self, e: &ListenerRunEvent) {
        self.events.push(RecordedEvent::ListenerRun(*e));
    }

    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        self.events.push(RecordedEvent::DispatchSummary(*s));
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Feeds `events` into `sink` in order.
pub fn replay(events: &[RecordedEvent], sink: &mut dyn TraceSink) {
    for event in events {
        event.deliver(sink);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::admission::SequenceRandom;
    use lookout_core::clock::ManualClock;
    use lookout_core::trace::{TickKind, Tracer};
    use lookout_core::{
        Handler, ListenerOptions, Priority, SchedulerConfig, UpdateFlags, Viewport,
        ViewportProvider,
    };

    fn record_rounds(rounds: usize) -> RecorderSink {
        let clock = ManualClock::default();
        let provider = ViewportProvider::builder()
            .config(SchedulerConfig::adaptive())
            .clock(clock.clone())
            .random(SequenceRandom::new([0.99]))
            .build();
        let c = clock.clone();
        provider.subscribe(
            Handler::from_viewport(move |_| c.advance_millis(2.0)),
            ListenerOptions::scroll(),
        );
        let c = clock;
        provider.subscribe(
            Handler::from_viewport(move |_| c.advance_millis(40.0)),
            ListenerOptions::viewport().with_priority(Priority::Low),
        );

        let mut rec = RecorderSink::new();
        for _ in 0..rounds {
            provider.dispatch_traced(
                &Viewport::default(),
                UpdateFlags::SCROLL,
                TickKind::Frame,
                &mut Tracer::new(&mut rec),
            );
        }
        rec
    }

    #[test]
    fn records_events_in_order() {
        let rec = record_rounds(1);
        let events = rec.events();
        assert!(
            matches!(events.first(), Some(RecordedEvent::DispatchBegin(_))),
            "round must open with a begin event"
        );
        assert!(
            matches!(events.last(), Some(RecordedEvent::DispatchSummary(_))),
            "round must close with a summary"
        );
        let runs = events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::ListenerRun(_)))
            .count();
        assert_eq!(runs, 2, "both listeners run on the first round");
        assert!(
            events.iter().all(|e| e.tick_index() == events[0].tick_index()),
            "one round shares one tick index"
        );
    }

    #[test]
    fn second_round_skips_the_expensive_listener() {
        let rec = record_rounds(2);
        let summaries: Vec<_> = rec.summaries().copied().collect();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].skipped, 0);
        assert_eq!(summaries[1].skipped, 1);
        assert_eq!(summaries[1].admitted, 1);
        assert_eq!(summaries[1].total_cost, 2.0);
    }

    #[test]
    fn replay_reproduces_the_recording() {
        let first = record_rounds(3);
        let mut copy = RecorderSink::new();
        replay(first.events(), &mut copy);
        assert_eq!(copy.len(), first.len());
        for (a, b) in copy.events().iter().zip(first.events()) {
            assert_eq!(a.tick_index(), b.tick_index());
            assert_eq!(
                core::mem::discriminant(a),
                core::mem::discriminant(b),
                "event kinds must match"
            );
        }
    }

    #[test]
    fn clear_empties_the_recorder() {
        let mut rec = record_rounds(1);
        assert!(!rec.is_empty());
        rec.clear();
        assert!(rec.is_empty());
        assert_eq!(rec.into_events().len(), 0);
    }
}
