// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the dispatch loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`NotificationDispatcher`](crate::dispatch::NotificationDispatcher) calls at
//! each stage of a notification round. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! These events are structural instrumentation for profilers and recorders.
//! Human-readable diagnostics go through the `tracing` facade instead.

use crate::admission::Admission;
use crate::listener::ListenerId;
use crate::priority::Priority;
use crate::time::HostTime;
use crate::viewport::UpdateFlags;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What triggered a notification round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// A per-frame tick. Admission control applies.
    #[default]
    Frame,
    /// An idle opportunity. Every relevant listener runs.
    Idle,
}

impl TickKind {
    /// Returns `true` for idle ticks.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a notification round starts.
#[derive(Clone, Copy, Debug)]
pub struct DispatchBeginEvent {
    /// Monotonic round counter.
    pub tick_index: u64,
    /// Frame or idle.
    pub kind: TickKind,
    /// What changed since the previous round.
    pub flags: UpdateFlags,
    /// Number of registered listeners, relevant or not.
    pub registered: usize,
    /// Host time at the start of the round.
    pub timestamp: HostTime,
}

/// Emitted once per candidate when admission control runs.
#[derive(Clone, Copy, Debug)]
pub struct AdmissionEvent {
    /// Round counter.
    pub tick_index: u64,
    /// Which listener was considered.
    pub listener: ListenerId,
    /// The listener's priority at decision time.
    pub priority: Priority,
    /// Average execution cost the decision was based on, in milliseconds.
    pub average_execution_cost: f64,
    /// Per-listener budget for this round, in milliseconds.
    pub budget_ms: f64,
    /// The outcome.
    pub admission: Admission,
}

/// Emitted after an admitted listener's handler returns.
#[derive(Clone, Copy, Debug)]
pub struct ListenerRunEvent {
    /// Round counter.
    pub tick_index: u64,
    /// Which listener ran.
    pub listener: ListenerId,
    /// Start of the layout recompute, if the listener has one.
    pub layout_start: Option<HostTime>,
    /// Layout recompute cost in milliseconds (zero without a callback).
    pub layout_cost: f64,
    /// Host time just before the handler was invoked.
    pub handler_start: HostTime,
    /// Host time just after the handler returned.
    pub handler_end: HostTime,
    /// Layout plus handler cost in milliseconds.
    pub execution_cost: f64,
}

/// Per-round summary, emitted at the end of every round.
#[derive(Clone, Copy, Debug)]
pub struct DispatchSummary {
    /// Round counter.
    pub tick_index: u64,
    /// Frame or idle.
    pub kind: TickKind,
    /// Host time at the start of the round.
    pub started: HostTime,
    /// Host time at the end of the round.
    pub finished: HostTime,
    /// Listeners that passed the relevance filter.
    pub candidates: usize,
    /// Listeners that passed admission control.
    pub admitted: usize,
    /// Candidates skipped by admission control.
    pub skipped: usize,
    /// Sum of execution costs of every listener that ran, in milliseconds.
    pub total_cost: f64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the dispatch loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a round starts.
    fn on_dispatch_begin(&mut self, e: &DispatchBeginEvent) {
        _ = e;
    }

    /// Called for each admission decision.
    fn on_admission(&mut self, e: &AdmissionEvent) {
        _ = e;
    }

    /// Called after each listener runs.
    fn on_listener_run(&mut self, e: &ListenerRunEvent) {
        _ = e;
    }

    /// Called with the per-round summary.
    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`DispatchBeginEvent`].
    #[inline]
    pub fn dispatch_begin(&mut self, e: &DispatchBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dispatch_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`AdmissionEvent`].
    #[inline]
    pub fn admission(&mut self, e: &AdmissionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_admission(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ListenerRunEvent`].
    #[inline]
    pub fn listener_run(&mut self, e: &ListenerRunEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_listener_run(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DispatchSummary`].
    #[inline]
    pub fn dispatch_summary(&mut self, s: &DispatchSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_dispatch_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
