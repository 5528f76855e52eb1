// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Probabilistic admission control.
//!
//! On a frame tick with admission control enabled, every relevant listener is
//! weighed against a per-listener share of the frame budget:
//!
//! ```text
//! budget = frame_budget / candidates
//! ```
//!
//! The decision, in order:
//!
//! 1. [`Priority::Highest`] always runs.
//! 2. A listener that is not [`Priority::Low`] and whose average execution
//!    cost fits in `budget` always runs.
//! 3. Any listener whose average cost is at most `budget / 10` always runs.
//! 4. Otherwise `p = consecutive_skips / max_iterations(priority)`. When
//!    `p >= 1` the listener has hit its starvation cap and runs. Else a
//!    uniform draw `r` in `[0, 1)` is taken and the listener is skipped iff
//!    `r > p`.
//!
//! A skip increments both the consecutive and lifetime skip counters; any run
//! resets the consecutive counter. The chance of running therefore climbs
//! with every skip until the cap forces a run.

use std::rc::Rc;

use rand::Rng;

use crate::listener::Listener;
use crate::priority::Priority;
use crate::trace::{AdmissionEvent, Tracer};

// ---------------------------------------------------------------------------
// Random sources
// ---------------------------------------------------------------------------

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    /// Returns the next draw.
    fn next_unit(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Draws from the thread-local generator of the `rand` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// An empty sequence always draws `0.0`. Values are clamped into `[0, 1)`.
#[derive(Clone, Debug, Default)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Creates a source replaying `values`.
    #[must_use]
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// Number of draws taken so far.
    #[must_use]
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        if v.is_nan() {
            0.0
        } else {
            v.clamp(0.0, 1.0 - f64::EPSILON)
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a listener was admitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AdmitReason {
    /// Highest priority is never skipped.
    HighestPriority,
    /// Average cost fits the per-listener budget.
    WithinBudget,
    /// Average cost is at most a tenth of the per-listener budget.
    Negligible,
    /// Consecutive skips reached the priority's cap.
    StarvationCap,
    /// The draw fell at or below the run probability.
    Drawn {
        /// Run probability.
        probability: f64,
        /// The uniform draw.
        draw: f64,
    },
}

/// Outcome of one admission decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    /// The listener runs this tick.
    Admit(AdmitReason),
    /// The listener is skipped this tick.
    Skip {
        /// Run probability.
        probability: f64,
        /// The uniform draw, which exceeded `probability`.
        draw: f64,
    },
}

impl Admission {
    /// Returns `true` if the listener runs.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit(_))
    }
}

/// Decides whether one listener runs.
///
/// `random` is only drawn from when the outcome is actually uncertain.
pub fn decide(
    priority: Priority,
    average_cost: f64,
    consecutive_skips: u32,
    budget: f64,
    random: &mut dyn RandomSource,
) -> Admission {
    if priority == Priority::Highest {
        return Admission::Admit(AdmitReason::HighestPriority);
    }
    if priority != Priority::Low && average_cost <= budget {
        return Admission::Admit(AdmitReason::WithinBudget);
    }
    if average_cost <= budget / 10.0 {
        return Admission::Admit(AdmitReason::Negligible);
    }
    let probability = f64::from(consecutive_skips) / f64::from(priority.max_iterations());
    if probability >= 1.0 {
        return Admission::Admit(AdmitReason::StarvationCap);
    }
    let draw = random.next_unit();
    if draw > probability {
        Admission::Skip { probability, draw }
    } else {
        Admission::Admit(AdmitReason::Drawn { probability, draw })
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Applies [`decide`] to a batch of candidates and updates their skip
/// counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdmissionController {
    frame_budget_ms: f64,
}

impl AdmissionController {
    /// Creates a controller with the given per-tick budget in milliseconds.
    #[must_use]
    pub const fn new(frame_budget_ms: f64) -> Self {
        Self { frame_budget_ms }
    }

    /// The per-tick budget in milliseconds.
    #[must_use]
    pub const fn frame_budget_ms(&self) -> f64 {
        self.frame_budget_ms
    }

    /// Each candidate's share of the frame budget.
    #[must_use]
    pub fn budget_per_listener(&self, candidates: usize) -> f64 {
        self.frame_budget_ms / candidates.max(1) as f64
    }

    /// Filters `candidates` down to the listeners admitted this tick,
    /// preserving order.
    pub fn admit(
        &self,
        candidates: &[Rc<Listener>],
        random: &mut dyn RandomSource,
        tracer: &mut Tracer<'_>,
        tick_index: u64,
    ) -> Vec<Rc<Listener>> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let budget = self.budget_per_listener(candidates.len());
        let mut admitted = Vec::with_capacity(candidates.len());
        for listener in candidates {
            let priority = listener.priority();
            let stats = listener.stats();
            let average = stats.cost.execution().average();
            let admission = decide(
                priority,
                average,
                stats.skipped_iterations,
                budget,
                random,
            );
            listener.update_stats(|s| {
                if admission.is_admitted() {
                    s.skipped_iterations = 0;
                } else {
                    s.skipped_iterations = s.skipped_iterations.saturating_add(1);
                    s.total_skipped_iterations += 1;
                }
            });
            if let Admission::Skip { probability, draw } = admission {
                tracing::trace!(
                    listener = %listener.id(),
                    %priority,
                    average,
                    budget,
                    probability,
                    draw,
                    "skipping listener"
                );
            } else {
                admitted.push(Rc::clone(listener));
            }
            tracer.admission(&AdmissionEvent {
                tick_index,
                listener: listener.id(),
                priority,
                average_execution_cost: average,
                budget_ms: budget,
                admission,
            });
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_never_drawn() {
        let mut rng = SequenceRandom::new([0.99]);
        let a = decide(Priority::Highest, 1_000.0, 0, 1.0, &mut rng);
        assert_eq!(a, Admission::Admit(AdmitReason::HighestPriority));
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn cheap_normal_runs_but_cheap_low_is_weighed() {
        let mut rng = SequenceRandom::new([0.99]);
        assert_eq!(
            decide(Priority::Normal, 4.0, 0, 8.0, &mut rng),
            Admission::Admit(AdmitReason::WithinBudget)
        );
        // Low priority ignores the plain budget check.
        assert!(!decide(Priority::Low, 4.0, 0, 8.0, &mut rng).is_admitted());
        assert_eq!(
            decide(Priority::Low, 0.8, 0, 8.0, &mut rng),
            Admission::Admit(AdmitReason::Negligible)
        );
    }

    #[test]
    fn low_priority_half_way_scenario() {
        let mut rng = SequenceRandom::new([0.6, 0.4]);
        let first = decide(Priority::Low, 20.0, 32, 16.0, &mut rng);
        assert_eq!(
            first,
            Admission::Skip {
                probability: 0.5,
                draw: 0.6
            }
        );
        let second = decide(Priority::Low, 20.0, 32, 16.0, &mut rng);
        assert!(second.is_admitted());
    }

    #[test]
    fn cap_forces_run_without_draw() {
        let mut rng = SequenceRandom::new([0.99]);
        for (priority, cap) in [
            (Priority::High, 4),
            (Priority::Normal, 16),
            (Priority::Low, 64),
        ] {
            assert_eq!(
                decide(priority, 100.0, cap, 1.0, &mut rng),
                Admission::Admit(AdmitReason::StarvationCap)
            );
        }
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn zero_skips_skip_on_any_positive_draw() {
        let mut rng = SequenceRandom::new([0.000_1]);
        assert!(!decide(Priority::High, 100.0, 0, 1.0, &mut rng).is_admitted());
    }

    #[test]
    fn budget_is_split_between_candidates() {
        let c = AdmissionController::new(16.0);
        assert_eq!(c.budget_per_listener(4), 4.0);
        assert_eq!(c.budget_per_listener(0), 16.0);
    }

    #[test]
    fn sequence_cycles_and_clamps() {
        let mut rng = SequenceRandom::new([0.25, 3.0]);
        assert_eq!(rng.next_unit(), 0.25);
        assert!(rng.next_unit() < 1.0);
        assert_eq!(rng.next_unit(), 0.25);
        assert_eq!(SequenceRandom::default().next_unit(), 0.0);
    }

    #[test]
    fn thread_random_in_unit_interval() {
        let mut rng = ThreadRandom;
        for _ in 0..100 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
