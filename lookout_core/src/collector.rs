// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measurement diffing.
//!
//! Platform backends read raw page offsets and dimensions once per frame and
//! hand them to a [`ViewportCollector`]. The collector advances the scroll
//! state, decides what changed, and remembers everything that changed since the
//! last idle delivery so idle-only listeners see the union of skipped frames.

use crate::viewport::{Dimensions, Scroll, UpdateFlags, Viewport};

/// One raw reading from the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawMeasurement {
    /// Horizontal page offset.
    pub scroll_x: f64,
    /// Vertical page offset.
    pub scroll_y: f64,
    /// Window and document dimensions.
    pub dimensions: Dimensions,
}

/// A snapshot plus the flags describing what changed to produce it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUpdate {
    /// The new snapshot.
    pub viewport: Viewport,
    /// What changed.
    pub flags: UpdateFlags,
}

/// Converts raw measurements into viewport snapshots and change flags.
#[derive(Clone, Debug, Default)]
pub struct ViewportCollector {
    current: Viewport,
    pending_idle: UpdateFlags,
}

impl ViewportCollector {
    /// Creates a collector seeded with an initial measurement.
    ///
    /// The seed establishes the baseline; it is not reported as a change.
    #[must_use]
    pub fn with_initial(raw: RawMeasurement) -> Self {
        let (x, y) = (raw.scroll_x + 0.0, raw.scroll_y + 0.0);
        let scroll = Scroll {
            x,
            y,
            x_turn: x,
            y_turn: y,
            ..Scroll::default()
        };
        Self {
            current: Viewport {
                scroll,
                dimensions: raw.dimensions,
            },
            pending_idle: UpdateFlags::default(),
        }
    }

    /// Returns the most recent snapshot.
    #[must_use]
    pub fn current(&self) -> Viewport {
        self.current
    }

    /// Feeds a new measurement.
    ///
    /// Returns `None` when neither the scroll position nor any dimension
    /// changed. Otherwise returns the new snapshot and records the flags for
    /// the next idle delivery.
    pub fn sample(&mut self, raw: RawMeasurement) -> Option<FrameUpdate> {
        let prev = self.current;
        let scroll = prev.scroll.advance(raw.scroll_x, raw.scroll_y);
        let flags = UpdateFlags {
            scroll: scroll.position_differs(&prev.scroll),
            dimensions: raw.dimensions != prev.dimensions,
        };
        if !flags.any() {
            return None;
        }

        self.current = Viewport {
            scroll,
            dimensions: raw.dimensions,
        };
        self.pending_idle = self.pending_idle.union(flags);
        Some(FrameUpdate {
            viewport: self.current,
            flags,
        })
    }

    /// Takes everything that changed since the previous idle delivery.
    ///
    /// Returns `None` if nothing changed in the meantime.
    pub fn take_idle(&mut self) -> Option<FrameUpdate> {
        let flags = core::mem::take(&mut self.pending_idle);
        flags.any().then_some(FrameUpdate {
            viewport: self.current,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(y: f64, width: f64) -> RawMeasurement {
        RawMeasurement {
            scroll_x: 0.0,
            scroll_y: y,
            dimensions: Dimensions {
                width,
                ..Dimensions::default()
            },
        }
    }

    #[test]
    fn seed_is_not_a_change() {
        let mut c = ViewportCollector::with_initial(raw(120.0, 800.0));
        assert_eq!(c.current().scroll.y, 120.0);
        assert!(c.sample(raw(120.0, 800.0)).is_none());
        assert!(c.take_idle().is_none());
    }

    #[test]
    fn reports_only_what_changed() {
        let mut c = ViewportCollector::with_initial(raw(0.0, 800.0));
        let u = c.sample(raw(0.0, 1024.0)).unwrap();
        assert_eq!(u.flags, UpdateFlags::DIMENSIONS);
        let u = c.sample(raw(50.0, 1024.0)).unwrap();
        assert_eq!(u.flags, UpdateFlags::SCROLL);
        assert!(u.viewport.scroll.is_scrolling_down);
    }

    #[test]
    fn idle_accumulates_between_deliveries() {
        let mut c = ViewportCollector::default();
        c.sample(raw(10.0, 0.0));
        c.sample(raw(10.0, 640.0));
        let idle = c.take_idle().unwrap();
        assert_eq!(idle.flags, UpdateFlags::ALL);
        assert_eq!(idle.viewport.dimensions.width, 640.0);
        assert!(c.take_idle().is_none());
    }
}
