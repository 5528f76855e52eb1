// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clocks used to time listener phases.
//!
//! The dispatcher never reads platform time directly; it asks a [`Clock`].
//! [`MonotonicClock`] is backed by `web_time::Instant`, which maps to
//! `std::time::Instant` natively and to `performance.now()` on the web.
//! [`ManualClock`] is a shared, hand-advanced clock for deterministic tests
//! and simulations.

use std::cell::Cell;
use std::rc::Rc;

use web_time::Instant;

use crate::time::{Duration, HostTime};

/// A monotonic time source.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> HostTime;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> HostTime {
        (**self).now()
    }
}

/// A [`Clock`] reading the platform's monotonic clock.
///
/// Times are reported relative to the moment the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> HostTime {
        let nanos = self.origin.elapsed().as_nanos();
        HostTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A hand-advanced [`Clock`].
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance it from inside a listener while the dispatcher reads another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Creates a clock starting at the given time.
    #[must_use]
    pub fn starting_at(t: HostTime) -> Self {
        Self {
            now: Rc::new(Cell::new(t.0)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by.0));
    }

    /// Moves the clock forward by fractional milliseconds.
    pub fn advance_millis(&self, ms: f64) {
        self.advance(Duration::from_millis_f64(ms));
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, t: HostTime) {
        self.now.set(t.0);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        HostTime(self.now.get())
    }
}
