// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drives a [`ViewportProvider`] from the browser.

use std::cell::Cell;
use std::rc::Rc;

use lookout_core::bridge::{IdleHandle, IdleScheduler};
use lookout_core::time::Duration;
use lookout_core::{ViewportContext, ViewportProvider};

use crate::idle::IdleCallbackScheduler;
use crate::raf::RafLoop;

/// Measures the viewport on every animation frame and feeds the provider.
///
/// Frames where something changed dispatch immediately. Each such frame also
/// (re)arms an idle callback; once the page has been quiet long enough for
/// the browser to go idle, listeners deferred until idle are notified with
/// everything that changed in between.
pub struct ViewportDriver {
    raf: RafLoop,
    idle: Rc<IdleState>,
}

struct IdleState {
    scheduler: IdleCallbackScheduler,
    timeout: Duration,
    pending: Cell<Option<IdleHandle>>,
}

impl IdleState {
    fn rearm(self: &Rc<Self>, context: &ViewportContext) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_idle(handle);
        }
        let context = context.clone();
        let state = Rc::downgrade(self);
        let handle = self.scheduler.request_idle(
            Box::new(move || {
                if let Some(state) = state.upgrade() {
                    state.pending.set(None);
                }
                _ = context.on_idle();
            }),
            self.timeout,
        );
        self.pending.set(Some(handle));
    }

    fn cancel(&self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_idle(handle);
        }
    }
}

impl ViewportDriver {
    /// Creates a stopped driver for `provider`.
    ///
    /// `idle_timeout` bounds how long idle-deferred listeners may wait after
    /// the last change.
    pub fn new(provider: ViewportProvider, idle_timeout: Duration) -> Self {
        let idle = Rc::new(IdleState {
            scheduler: IdleCallbackScheduler::new(),
            timeout: idle_timeout,
            pending: Cell::new(None),
        });
        let state = Rc::clone(&idle);
        // Idle tasks only see the provider weakly.
        let context = provider.context();
        let raf = RafLoop::new(move |_, _| {
            let Some(raw) = crate::measure() else {
                return;
            };
            if provider.on_frame(raw).is_some() {
                state.rearm(&context);
            }
        });
        Self { raf, idle }
    }

    /// Starts measuring.
    pub fn start(&self) {
        self.raf.start();
    }

    /// Stops measuring and drops any pending idle delivery.
    pub fn stop(&self) {
        self.raf.stop();
        self.idle.cancel();
    }

    /// Returns `true` while the driver is measuring.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.raf.is_running()
    }
}

impl Drop for ViewportDriver {
    fn drop(&mut self) {
        self.idle.cancel();
    }
}

impl core::fmt::Debug for ViewportDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ViewportDriver")
            .field("raf", &self.raf)
            .field("idle_pending", &self.idle.pending.get().is_some())
            .finish_non_exhaustive()
    }
}
