// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One notification round.
//!
//! [`NotificationDispatcher::dispatch`] runs, in order:
//!
//! 1. **Relevance filter.** Idle-only listeners are dropped on frame ticks.
//!    The rest are kept if they want scroll changes and scroll changed, or
//!    want dimension changes and dimensions changed.
//! 2. **Admission.** On frame ticks with admission control enabled, the
//!    [`AdmissionController`] prunes the candidates and updates skip counters.
//! 3. **Early out.** With nothing admitted, the round ends here: no statistics
//!    change and the bridge is not told.
//! 4. **Layout phase.** Every admitted listener's layout recompute callback
//!    runs under a timer, before any handler.
//! 5. **Handler phase.** Handlers run in registration order under a second
//!    timer. Execution cost is layout plus handler time. Each listener's
//!    [`CostTracker`](crate::cost::CostTracker) records both.
//! 6. **Bridge.** The whole registry, relevant or not, is handed to the
//!    [`StatsBridge`].
//!
//! The candidate list is a snapshot taken before any user code runs. A
//! listener removed by a handler mid-round is skipped for its remaining
//! steps. No registry or dispatcher borrow is held while user code runs, so a
//! panicking callback leaves the dispatcher usable for the next round.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use crate::admission::{AdmissionController, RandomSource, ThreadRandom};
use crate::bridge::StatsBridge;
use crate::clock::{Clock, MonotonicClock};
use crate::config::SchedulerConfig;
use crate::listener::{LayoutSnapshot, Listener, ListenerId};
use crate::registry::ListenerRegistry;
use crate::time::HostTime;
use crate::trace::{DispatchBeginEvent, DispatchSummary, ListenerRunEvent, TickKind, Tracer};
use crate::viewport::{UpdateFlags, Viewport};

/// What happened during one round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Round counter.
    pub tick_index: u64,
    /// Frame or idle.
    pub kind: TickKind,
    /// Listeners that passed the relevance filter.
    pub candidates: usize,
    /// Listeners that passed admission control.
    pub admitted: usize,
    /// Candidates skipped by admission control.
    pub skipped: usize,
    /// Listeners whose handler was invoked, in invocation order.
    pub invoked: Vec<ListenerId>,
}

/// Returns `true` if `listener` should hear about this round's changes.
#[must_use]
pub fn is_relevant(listener: &Listener, flags: UpdateFlags, kind: TickKind) -> bool {
    if listener.only_when_idle() && !kind.is_idle() {
        return false;
    }
    (flags.scroll && listener.wants_scroll()) || (flags.dimensions && listener.wants_dimensions())
}

/// Borrows the shared random source for one draw at a time.
struct SharedRandom<'a>(&'a RefCell<Box<dyn RandomSource>>);

impl RandomSource for SharedRandom<'_> {
    fn next_unit(&mut self) -> f64 {
        self.0.borrow_mut().next_unit()
    }
}

/// Runs notification rounds against a [`ListenerRegistry`].
pub struct NotificationDispatcher {
    admission: Option<AdmissionController>,
    clock: Box<dyn Clock>,
    random: RefCell<Box<dyn RandomSource>>,
    tick_counter: Cell<u64>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher from `config`, timing with a [`MonotonicClock`]
    /// and drawing from [`ThreadRandom`].
    #[must_use]
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            admission: config
                .admission_control
                .then(|| AdmissionController::new(config.frame_budget_ms)),
            clock: Box::new(MonotonicClock::new()),
            random: RefCell::new(Box::new(ThreadRandom)),
            tick_counter: Cell::new(0),
        }
    }

    /// Replaces the clock used to time callbacks.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the random source used for admission draws.
    #[must_use]
    pub fn with_random(self, random: impl RandomSource + 'static) -> Self {
        *self.random.borrow_mut() = Box::new(random);
        self
    }

    /// The admission controller, if admission control is enabled.
    #[must_use]
    pub fn admission(&self) -> Option<&AdmissionController> {
        self.admission.as_ref()
    }

    /// The current time according to the dispatcher's clock.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.clock.now()
    }

    /// Runs one round without tracing.
    pub fn dispatch(
        &self,
        registry: &ListenerRegistry,
        bridge: Option<&StatsBridge>,
        viewport: &Viewport,
        flags: UpdateFlags,
        kind: TickKind,
    ) -> DispatchReport {
        self.dispatch_traced(registry, bridge, viewport, flags, kind, &mut Tracer::none())
    }

    /// Runs one round, reporting each stage to `tracer`.
    pub fn dispatch_traced(
        &self,
        registry: &ListenerRegistry,
        bridge: Option<&StatsBridge>,
        viewport: &Viewport,
        flags: UpdateFlags,
        kind: TickKind,
        tracer: &mut Tracer<'_>,
    ) -> DispatchReport {
        let tick_index = self.tick_counter.get();
        self.tick_counter.set(tick_index + 1);

        let snapshot = registry.snapshot();
        let started = self.clock.now();
        tracer.dispatch_begin(&DispatchBeginEvent {
            tick_index,
            kind,
            flags,
            registered: snapshot.len(),
            timestamp: started,
        });

        let candidates: Vec<Rc<Listener>> = snapshot
            .iter()
            .filter(|l| l.is_active() && is_relevant(l, flags, kind))
            .cloned()
            .collect();

        let admitted = match &self.admission {
            Some(controller) if !kind.is_idle() => controller.admit(
                &candidates,
                &mut SharedRandom(&self.random),
                tracer,
                tick_index,
            ),
            _ => candidates.clone(),
        };

        let mut report = DispatchReport {
            tick_index,
            kind,
            candidates: candidates.len(),
            admitted: admitted.len(),
            skipped: candidates.len() - admitted.len(),
            invoked: Vec::with_capacity(admitted.len()),
        };

        if admitted.is_empty() {
            self.finish(tracer, &report, started, 0.0);
            return report;
        }

        // Layout phase: all recomputes complete before the first handler.
        let mut layouts: Vec<(Option<LayoutSnapshot>, f64, Option<HostTime>)> =
            Vec::with_capacity(admitted.len());
        for listener in &admitted {
            if listener.is_active() && listener.has_layout() {
                let start = self.clock.now();
                let layout = listener.recalculate_layout(viewport);
                let cost = self.clock.now().saturating_duration_since(start).as_millis_f64();
                layouts.push((layout, cost, Some(start)));
            } else {
                layouts.push((None, 0.0, None));
            }
        }

        // Handler phase.
        let mut total_cost = 0.0;
        for (listener, (layout, layout_cost, layout_start)) in admitted.iter().zip(layouts) {
            if !listener.is_active() {
                continue;
            }
            let handler_start = self.clock.now();
            listener.handler().call(viewport, layout.as_deref());
            let handler_end = self.clock.now();
            let execution_cost =
                layout_cost + handler_end.saturating_duration_since(handler_start).as_millis_f64();
            total_cost += execution_cost;
            report.invoked.push(listener.id());

            if listener.is_active() {
                listener.update_stats(|s| s.cost.record_iteration(layout_cost, execution_cost));
            }
            tracer.listener_run(&ListenerRunEvent {
                tick_index,
                listener: listener.id(),
                layout_start,
                layout_cost,
                handler_start,
                handler_end,
                execution_cost,
            });
        }

        if let Some(bridge) = bridge {
            bridge.notify(registry.snapshot());
        }
        self.finish(tracer, &report, started, total_cost);
        report
    }

    fn finish(
        &self,
        tracer: &mut Tracer<'_>,
        report: &DispatchReport,
        started: HostTime,
        total_cost: f64,
    ) {
        tracing::trace!(
            tick = report.tick_index,
            candidates = report.candidates,
            admitted = report.admitted,
            skipped = report.skipped,
            total_cost,
            "dispatch finished"
        );
        tracer.dispatch_summary(&DispatchSummary {
            tick_index: report.tick_index,
            kind: report.kind,
            started,
            finished: self.clock.now(),
            candidates: report.candidates,
            admitted: report.admitted,
            skipped: report.skipped,
            total_cost,
        });
    }
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("admission", &self.admission)
            .field("ticks", &self.tick_counter.get())
            .finish_non_exhaustive()
    }
}
