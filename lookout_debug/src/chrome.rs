// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads events captured by a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes
//! [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each notification round becomes a `B`/`E` span on thread 0. Every listener
//! gets its own thread row (`tid` is the listener id), with its layout
//! recompute and handler shown as `X` complete events. Admission skips are
//! instant events on the skipped listener's row.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use lookout_core::admission::Admission;
use lookout_core::time::HostTime;
use lookout_core::trace::TickKind;

use crate::recorder::RecordedEvent;

const ROUND_TID: u64 = 0;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let mut out: Vec<Value> = Vec::new();
    // Admission events carry no timestamp; they happen at the start of the
    // round they belong to.
    let mut round_start = HostTime::default();

    for recorded in events {
        match recorded {
            RecordedEvent::DispatchBegin(e) => {
                round_start = e.timestamp;
                out.push(json!({
                    "ph": "B",
                    "name": round_name(e.kind),
                    "cat": "Dispatch",
                    "ts": e.timestamp.as_micros_f64(),
                    "pid": 0,
                    "tid": ROUND_TID,
                    "args": {
                        "tick_index": e.tick_index,
                        "scroll": e.flags.scroll,
                        "dimensions": e.flags.dimensions,
                        "registered": e.registered,
                    }
                }));
            }
            RecordedEvent::Admission(e) => {
                if let Admission::Skip { probability, draw } = e.admission {
                    out.push(json!({
                        "ph": "i",
                        "name": "Skip",
                        "cat": "Admission",
                        "ts": round_start.as_micros_f64(),
                        "pid": 0,
                        "tid": e.listener.0,
                        "s": "t",
                        "args": {
                            "tick_index": e.tick_index,
                            "priority": e.priority.as_str(),
                            "average_ms": e.average_execution_cost,
                            "budget_ms": e.budget_ms,
                            "probability": probability,
                            "draw": draw,
                        }
                    }));
                }
            }
            RecordedEvent::ListenerRun(e) => {
                if let Some(start) = e.layout_start {
                    out.push(json!({
                        "ph": "X",
                        "name": "Layout",
                        "cat": "Listener",
                        "ts": start.as_micros_f64(),
                        "dur": e.layout_cost * 1000.0,
                        "pid": 0,
                        "tid": e.listener.0,
                        "args": {
                            "tick_index": e.tick_index,
                        }
                    }));
                }
                out.push(json!({
                    "ph": "X",
                    "name": "Handler",
                    "cat": "Listener",
                    "ts": e.handler_start.as_micros_f64(),
                    "dur": e.handler_end.saturating_duration_since(e.handler_start).as_micros_f64(),
                    "pid": 0,
                    "tid": e.listener.0,
                    "args": {
                        "tick_index": e.tick_index,
                        "execution_ms": e.execution_cost,
                    }
                }));
            }
            RecordedEvent::DispatchSummary(s) => {
                out.push(json!({
                    "ph": "E",
                    "name": round_name(s.kind),
                    "cat": "Dispatch",
                    "ts": s.finished.as_micros_f64(),
                    "pid": 0,
                    "tid": ROUND_TID,
                    "args": {
                        "tick_index": s.tick_index,
                        "candidates": s.candidates,
                        "admitted": s.admitted,
                        "skipped": s.skipped,
                        "total_cost_ms": s.total_cost,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &out)?;
    Ok(())
}

fn round_name(kind: TickKind) -> &'static str {
    match kind {
        TickKind::Frame => "FrameDispatch",
        TickKind::Idle => "IdleDispatch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use lookout_core::admission::SequenceRandom;
    use lookout_core::clock::ManualClock;
    use lookout_core::trace::Tracer;
    use lookout_core::{
        Handler, ListenerOptions, Priority, SchedulerConfig, UpdateFlags, Viewport,
        ViewportProvider,
    };

    fn export_to_values(events: &[RecordedEvent]) -> Vec<Value> {
        let mut out = Vec::new();
        export(events, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        serde_json::from_str(&json_str).unwrap()
    }

    #[test]
    fn export_produces_valid_json() {
        let clock = ManualClock::default();
        let provider = ViewportProvider::builder()
            .config(SchedulerConfig::adaptive())
            .clock(clock.clone())
            .random(SequenceRandom::new([0.99]))
            .build();
        let c = clock.clone();
        provider.subscribe(
            Handler::from_viewport(move |_| c.advance_millis(30.0)),
            ListenerOptions::viewport().with_priority(Priority::Low),
        );
        let c = clock.clone();
        provider.subscribe(
            Handler::with_layout(move |_, _: Option<&f64>| c.advance_millis(1.0)),
            ListenerOptions::layout_snapshot({
                let c = clock.clone();
                move |v: &Viewport| {
                    c.advance_millis(0.5);
                    v.scroll.y
                }
            }),
        );

        let mut rec = RecorderSink::new();
        for _ in 0..2 {
            clock.advance_millis(16.0);
            provider.dispatch_traced(
                &Viewport::default(),
                UpdateFlags::SCROLL,
                TickKind::Frame,
                &mut Tracer::new(&mut rec),
            );
        }

        let parsed = export_to_values(rec.events());
        let phases: Vec<&str> = parsed.iter().filter_map(|e| e["ph"].as_str()).collect();
        assert_eq!(phases.len(), parsed.len(), "every event has a phase");

        // Round one: begin, one bare handler, one layout plus handler, end.
        assert_eq!(phases[..5], ["B", "X", "X", "X", "E"]);
        assert_eq!(parsed[0]["name"], "FrameDispatch");
        let names: Vec<_> = parsed[1..4].iter().map(|e| e["name"].clone()).collect();
        assert_eq!(names, ["Handler", "Layout", "Handler"]);
        assert_eq!(parsed[2]["dur"], 500.0);
        assert_eq!(parsed[2]["tid"], parsed[3]["tid"]);

        // Round two: the expensive low-priority listener is skipped.
        assert!(
            parsed.iter().any(|e| e["ph"] == "i" && e["name"] == "Skip"),
            "skip must be exported as an instant event"
        );
        assert_eq!(phases.last(), Some(&"E"));
    }

    #[test]
    fn export_empty_recording() {
        assert!(export_to_values(&[]).is_empty());
    }
}
