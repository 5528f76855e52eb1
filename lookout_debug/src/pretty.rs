// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in microseconds, listener costs in milliseconds.

use std::io::Write;

use lookout_core::UpdateFlags;
use lookout_core::admission::{Admission, AdmitReason};
use lookout_core::trace::{
    AdmissionEvent, DispatchBeginEvent, DispatchSummary, ListenerRunEvent, TickKind, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    /// Print admitted decisions too, not just skips.
    verbose_admission: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose_admission", &self.verbose_admission)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose_admission: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose_admission: false,
        }
    }

    /// Also print a line for every admitted listener. By default only skips
    /// are printed.
    #[must_use]
    pub fn verbose_admission(mut self, verbose: bool) -> Self {
        self.verbose_admission = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn kind_name(kind: TickKind) -> &'static str {
    match kind {
        TickKind::Frame => "frame",
        TickKind::Idle => "idle",
    }
}

fn flags_name(flags: UpdateFlags) -> &'static str {
    match (flags.scroll, flags.dimensions) {
        (true, true) => "scroll+dimensions",
        (true, false) => "scroll",
        (false, true) => "dimensions",
        (false, false) => "none",
    }
}

fn reason_name(reason: AdmitReason) -> &'static str {
    match reason {
        AdmitReason::HighestPriority => "highest",
        AdmitReason::WithinBudget => "within-budget",
        AdmitReason::Negligible => "negligible",
        AdmitReason::StarvationCap => "starved",
        AdmitReason::Drawn { .. } => "drawn",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_dispatch_begin(&mut self, e: &DispatchBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[dispatch] tick={} {} flags={} registered={} at {:.1}µs",
            e.tick_index,
            kind_name(e.kind),
            flags_name(e.flags),
            e.registered,
            e.timestamp.as_micros_f64(),
        );
    }

    fn on_admission(&mut self, e: &AdmissionEvent) {
        match e.admission {
            Admission::Skip { probability, draw } => {
                let _ = writeln!(
                    self.writer,
                    "[skip] tick={} listener={} {} avg={:.2}ms budget={:.2}ms \
                     p={probability:.3} draw={draw:.3}",
                    e.tick_index,
                    e.listener,
                    e.priority,
                    e.average_execution_cost,
                    e.budget_ms,
                );
            }
            Admission::Admit(reason) if self.verbose_admission => {
                let _ = writeln!(
                    self.writer,
                    "[admit] tick={} listener={} {} avg={:.2}ms budget={:.2}ms reason={}",
                    e.tick_index,
                    e.listener,
                    e.priority,
                    e.average_execution_cost,
                    e.budget_ms,
                    reason_name(reason),
                );
            }
            Admission::Admit(_) => {}
        }
    }

    fn on_listener_run(&mut self, e: &ListenerRunEvent) {
        let _ = writeln!(
            self.writer,
            "[run] tick={} listener={} layout={:.2}ms exec={:.2}ms",
            e.tick_index, e.listener, e.layout_cost, e.execution_cost,
        );
    }

    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] tick={} {} candidates={} admitted={} skipped={} \
             cost={:.2}ms wall={:.1}µs",
            s.tick_index,
            kind_name(s.kind),
            s.candidates,
            s.admitted,
            s.skipped,
            s.total_cost,
            s.finished.saturating_duration_since(s.started).as_micros_f64(),
        );
    }
}
