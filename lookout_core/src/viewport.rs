// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport snapshot types.
//!
//! A [`Viewport`] is an immutable value made of a [`Scroll`] state and a
//! [`Dimensions`] record. Scroll state is derived sample-to-sample by
//! [`Scroll::advance`], which tracks a sticky direction per axis and the
//! coordinate where that direction last reversed (the turn point).

use core::cmp::Ordering;

/// The outcome of comparing two consecutive positions on one axis.
///
/// Produced by a total comparison, so every pair of `f64` inputs (including
/// NaN) maps to exactly one variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisDirection {
    /// The position decreased (up or left).
    Backward,
    /// The position is unchanged.
    Unchanged,
    /// The position increased (down or right).
    Forward,
}

impl AxisDirection {
    /// Compares a new position against the previous one.
    #[must_use]
    pub fn between(prev: f64, next: f64) -> Self {
        match canonical(next).total_cmp(&canonical(prev)) {
            Ordering::Less => Self::Backward,
            Ordering::Equal => Self::Unchanged,
            Ordering::Greater => Self::Forward,
        }
    }
}

/// Folds `-0.0` into `+0.0` so signed zeros compare equal under `total_cmp`.
#[inline]
fn canonical(v: f64) -> f64 {
    v + 0.0
}

/// Scroll position, turn points, and per-axis direction.
///
/// At most one of `is_scrolling_up`/`is_scrolling_down` is set, and likewise
/// for left/right. Both are unset only before the first movement on that axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Scroll {
    /// Horizontal page offset.
    pub x: f64,
    /// Vertical page offset.
    pub y: f64,
    /// Horizontal coordinate where the direction last reversed.
    pub x_turn: f64,
    /// Vertical coordinate where the direction last reversed.
    pub y_turn: f64,
    /// Horizontal distance travelled since the last turn.
    pub x_d_turn: f64,
    /// Vertical distance travelled since the last turn.
    pub y_d_turn: f64,
    /// The most recent vertical movement was upwards.
    pub is_scrolling_up: bool,
    /// The most recent vertical movement was downwards.
    pub is_scrolling_down: bool,
    /// The most recent horizontal movement was to the left.
    pub is_scrolling_left: bool,
    /// The most recent horizontal movement was to the right.
    pub is_scrolling_right: bool,
}

impl Scroll {
    /// Derives the next scroll state from raw page offsets.
    ///
    /// When an axis position is unchanged, that axis keeps its previous
    /// direction. The turn point moves to the current coordinate whenever the
    /// up (or left) flag flips.
    #[must_use]
    pub fn advance(&self, x: f64, y: f64) -> Self {
        let x = canonical(x);
        let y = canonical(y);

        let (is_scrolling_left, is_scrolling_right) = match AxisDirection::between(self.x, x) {
            AxisDirection::Backward => (true, false),
            AxisDirection::Forward => (false, true),
            AxisDirection::Unchanged => (self.is_scrolling_left, self.is_scrolling_right),
        };
        let (is_scrolling_up, is_scrolling_down) = match AxisDirection::between(self.y, y) {
            AxisDirection::Backward => (true, false),
            AxisDirection::Forward => (false, true),
            AxisDirection::Unchanged => (self.is_scrolling_up, self.is_scrolling_down),
        };

        let x_turn = if is_scrolling_left == self.is_scrolling_left {
            self.x_turn
        } else {
            x
        };
        let y_turn = if is_scrolling_up == self.is_scrolling_up {
            self.y_turn
        } else {
            y
        };

        Self {
            x,
            y,
            x_turn,
            y_turn,
            x_d_turn: x - x_turn,
            y_d_turn: y - y_turn,
            is_scrolling_up,
            is_scrolling_down,
            is_scrolling_left,
            is_scrolling_right,
        }
    }

    /// Returns `true` if the position differs from `other` on either axis.
    #[must_use]
    pub fn position_differs(&self, other: &Self) -> bool {
        AxisDirection::between(other.x, self.x) != AxisDirection::Unchanged
            || AxisDirection::between(other.y, self.y) != AxisDirection::Unchanged
    }
}

/// Window and document dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dimensions {
    /// Viewport (inner) width.
    pub width: f64,
    /// Viewport (inner) height.
    pub height: f64,
    /// Client width, excluding scrollbars.
    pub client_width: f64,
    /// Client height, excluding scrollbars.
    pub client_height: f64,
    /// Outer window width.
    pub outer_width: f64,
    /// Outer window height.
    pub outer_height: f64,
    /// Scrollable document width.
    pub document_width: f64,
    /// Scrollable document height.
    pub document_height: f64,
}

/// An immutable snapshot of the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    /// Scroll state.
    pub scroll: Scroll,
    /// Dimensions.
    pub dimensions: Dimensions,
}

/// Which parts of the viewport changed since the previous delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UpdateFlags {
    /// The scroll position changed.
    pub scroll: bool,
    /// Any dimension changed.
    pub dimensions: bool,
}

impl UpdateFlags {
    /// Only the scroll position changed.
    pub const SCROLL: Self = Self {
        scroll: true,
        dimensions: false,
    };

    /// Only the dimensions changed.
    pub const DIMENSIONS: Self = Self {
        scroll: false,
        dimensions: true,
    };

    /// Both parts changed.
    pub const ALL: Self = Self {
        scroll: true,
        dimensions: true,
    };

    /// Returns `true` if anything changed.
    #[must_use]
    pub const fn any(self) -> bool {
        self.scroll || self.dimensions
    }

    /// Returns the union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            scroll: self.scroll || other.scroll,
            dimensions: self.dimensions || other.dimensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_has_no_direction() {
        let s = Scroll::default();
        assert!(!s.is_scrolling_up && !s.is_scrolling_down);
        assert!(!s.is_scrolling_left && !s.is_scrolling_right);
    }

    #[test]
    fn scrolling_down_then_up_moves_turn_point() {
        let s = Scroll::default().advance(0.0, 100.0);
        assert!(s.is_scrolling_down);
        assert_eq!(s.y_turn, 0.0);
        assert_eq!(s.y_d_turn, 100.0);

        let s = s.advance(0.0, 300.0);
        assert_eq!(s.y_turn, 0.0);
        assert_eq!(s.y_d_turn, 300.0);

        let s = s.advance(0.0, 250.0);
        assert!(s.is_scrolling_up);
        assert!(!s.is_scrolling_down);
        assert_eq!(s.y_turn, 250.0);
        assert_eq!(s.y_d_turn, 0.0);

        let s = s.advance(0.0, 200.0);
        assert_eq!(s.y_turn, 250.0);
        assert_eq!(s.y_d_turn, -50.0);

        let s = s.advance(0.0, 260.0);
        assert!(s.is_scrolling_down);
        assert_eq!(s.y_turn, 260.0);
    }

    #[test]
    fn unchanged_position_keeps_direction() {
        let s = Scroll::default().advance(40.0, 0.0).advance(10.0, 0.0);
        assert!(s.is_scrolling_left);
        let still = s.advance(10.0, 0.0);
        assert!(still.is_scrolling_left);
        assert!(!still.is_scrolling_right);
        assert_eq!(still.x_turn, s.x_turn);
    }

    #[test]
    fn nan_input_is_ordered_not_fatal() {
        let s = Scroll::default().advance(0.0, f64::NAN);
        assert!(s.is_scrolling_up ^ s.is_scrolling_down);
    }

    #[test]
    fn signed_zero_is_unchanged() {
        assert_eq!(AxisDirection::between(0.0, -0.0), AxisDirection::Unchanged);
    }

    #[test]
    fn flags_union() {
        assert_eq!(UpdateFlags::SCROLL.union(UpdateFlags::DIMENSIONS), UpdateFlags::ALL);
        assert!(!UpdateFlags::default().any());
    }
}
