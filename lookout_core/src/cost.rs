// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-listener cost statistics.
//!
//! Each listener tracks two timed phases: the optional layout recompute that
//! runs before its handler, and the total execution cost (layout plus
//! handler). For each phase, [`PhaseCost`] keeps the last, minimum, maximum,
//! and average sample in fractional milliseconds.
//!
//! The average is a true running mean over every iteration, updated
//! incrementally:
//!
//! ```text
//! avg' = avg + (sample - avg) / n'
//! ```
//!
//! where `n'` is the iteration count including the sample being recorded.

/// Which timed phase a sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CostPhase {
    /// The layout recompute callback.
    Layout,
    /// Layout plus handler.
    Execution,
}

/// Running statistics for one phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseCost {
    last: f64,
    min: Option<f64>,
    max: f64,
    average: f64,
}

impl PhaseCost {
    fn record(&mut self, sample: f64, iterations: u64) {
        self.last = sample;
        self.max = self.max.max(sample);
        self.min = Some(self.min.map_or(sample, |m| m.min(sample)));
        self.average += (sample - self.average) / iterations as f64;
    }

    /// The most recent sample.
    #[must_use]
    pub fn last(&self) -> f64 {
        self.last
    }

    /// The smallest sample, or `None` before the first sample.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// The largest sample.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The running mean.
    #[must_use]
    pub fn average(&self) -> f64 {
        self.average
    }
}

/// Cost statistics for both phases of a listener.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CostTracker {
    iterations: u64,
    layout: PhaseCost,
    execution: PhaseCost,
}

impl CostTracker {
    /// Records a sample for one phase of the iteration in progress.
    ///
    /// The average divides by the iteration count the listener will have once
    /// this iteration is committed with [`finish_iteration`](Self::finish_iteration).
    pub fn record(&mut self, phase: CostPhase, sample: f64) {
        let n = self.iterations + 1;
        match phase {
            CostPhase::Layout => self.layout.record(sample, n),
            CostPhase::Execution => self.execution.record(sample, n),
        }
    }

    /// Commits the iteration in progress.
    pub fn finish_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Records both phases of one iteration and commits it.
    pub fn record_iteration(&mut self, layout: f64, execution: f64) {
        self.record(CostPhase::Layout, layout);
        self.record(CostPhase::Execution, execution);
        self.finish_iteration();
    }

    /// The number of committed iterations.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Layout phase statistics.
    #[must_use]
    pub fn layout(&self) -> &PhaseCost {
        &self.layout
    }

    /// Execution phase statistics.
    #[must_use]
    pub fn execution(&self) -> &PhaseCost {
        &self.execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_arithmetic_mean() {
        let mut t = CostTracker::default();
        for s in [4.0, 8.0, 0.0, 12.0] {
            t.record_iteration(0.0, s);
        }
        assert_eq!(t.iterations(), 4);
        assert!((t.execution().average() - 6.0).abs() < 1e-12);
        assert_eq!(t.execution().max(), 12.0);
        assert_eq!(t.execution().last(), 12.0);
    }

    #[test]
    fn zero_sample_becomes_min() {
        let mut t = CostTracker::default();
        assert_eq!(t.layout().min(), None);
        t.record_iteration(3.0, 5.0);
        t.record_iteration(0.0, 5.0);
        t.record_iteration(2.0, 5.0);
        assert_eq!(t.layout().min(), Some(0.0));
    }

    #[test]
    fn first_sample_sets_min_even_when_large() {
        let mut t = CostTracker::default();
        t.record_iteration(9.0, 9.5);
        assert_eq!(t.layout().min(), Some(9.0));
        assert_eq!(t.execution().min(), Some(9.5));
    }
}
