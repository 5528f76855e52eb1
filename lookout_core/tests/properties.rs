// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for direction tracking, cost statistics, and admission.

use std::rc::Rc;

use lookout_core::admission::{Admission, AdmissionController, RandomSource, SequenceRandom, decide};
use lookout_core::clock::ManualClock;
use lookout_core::cost::CostTracker;
use lookout_core::dispatch::NotificationDispatcher;
use lookout_core::registry::ListenerRegistry;
use lookout_core::trace::{TickKind, Tracer};
use lookout_core::{
    Handler, ListenerOptions, Priority, SchedulerConfig, Scroll, UpdateFlags, Viewport,
};
use proptest::prelude::*;

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::High),
        Just(Priority::Highest),
    ]
}

proptest! {
    #[test]
    fn vertical_direction_is_exclusive_and_sticky(
        samples in prop::collection::vec(-5_000.0_f64..5_000.0, 1..64),
        repeat_mask in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut scroll = Scroll::default();
        let mut prev_y = 0.0;
        for (i, &raw) in samples.iter().enumerate() {
            // Randomly repeat the previous sample to exercise the sticky path.
            let y = if repeat_mask[i] { prev_y } else { raw };
            let next = scroll.advance(0.0, y);
            prop_assert!(!(next.is_scrolling_up && next.is_scrolling_down));
            prop_assert!(!(next.is_scrolling_left && next.is_scrolling_right));
            if y == scroll.y {
                prop_assert_eq!(next.is_scrolling_up, scroll.is_scrolling_up);
                prop_assert_eq!(next.is_scrolling_down, scroll.is_scrolling_down);
                prop_assert_eq!(next.y_turn, scroll.y_turn);
            }
            prop_assert_eq!(next.y_d_turn, next.y - next.y_turn);
            prev_y = y;
            scroll = next;
        }
    }

    #[test]
    fn running_mean_min_max(samples in prop::collection::vec(0.0_f64..100.0, 1..200)) {
        let mut tracker = CostTracker::default();
        for &s in &samples {
            tracker.record_iteration(0.0, s);
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let exec = tracker.execution();
        prop_assert!((exec.average() - mean).abs() < 1e-9 * mean.max(1.0));
        for &s in &samples {
            prop_assert!(exec.max() >= s);
            prop_assert!(exec.min().is_some_and(|m| m <= s));
        }
        prop_assert_eq!(tracker.iterations(), samples.len() as u64);
    }

    #[test]
    fn highest_is_always_admitted(
        average in 0.0_f64..1_000.0,
        skips in 0_u32..200,
        budget in 0.01_f64..32.0,
        draw in 0.0_f64..1.0,
    ) {
        let mut rng = SequenceRandom::new([draw]);
        let a = decide(Priority::Highest, average, skips, budget, &mut rng);
        prop_assert!(a.is_admitted());
    }

    #[test]
    fn capped_listeners_always_run(
        p in priority(),
        average in 0.0_f64..1_000.0,
        extra in 0_u32..10,
        draw in 0.0_f64..1.0,
    ) {
        let cap = p.max_iterations();
        let mut rng = SequenceRandom::new([draw]);
        prop_assert!(decide(p, average, cap + extra, 1.0, &mut rng).is_admitted());
    }

    #[test]
    fn skip_iff_draw_exceeds_probability(
        skips in 0_u32..64,
        draw in 0.0_f64..1.0,
    ) {
        let mut rng = SequenceRandom::new([draw]);
        let a = decide(Priority::Low, 50.0, skips, 16.0, &mut rng);
        let probability = f64::from(skips) / 64.0;
        prop_assert_eq!(a.is_admitted(), draw <= probability);
        if let Admission::Skip { probability: p, .. } = a {
            prop_assert_eq!(p, probability);
        }
    }

    #[test]
    fn controller_never_drops_highest(
        priorities in prop::collection::vec(priority(), 1..12),
        draws in prop::collection::vec(0.0_f64..1.0, 1..12),
    ) {
        let clock = ManualClock::default();
        let registry = ListenerRegistry::new();
        for &p in &priorities {
            let c = clock.clone();
            registry.add(
                Handler::from_viewport(move |_| c.advance_millis(50.0)),
                ListenerOptions::viewport().with_priority(p),
            );
        }
        // One eager round gives every listener an expensive history.
        NotificationDispatcher::new(&SchedulerConfig::eager())
            .with_clock(clock)
            .dispatch(&registry, None, &Viewport::default(), UpdateFlags::ALL, TickKind::Frame);

        let snapshot = registry.snapshot();
        let mut rng = SequenceRandom::new(draws);
        let admitted = AdmissionController::new(16.0).admit(
            &snapshot,
            &mut rng as &mut dyn RandomSource,
            &mut Tracer::none(),
            1,
        );
        for listener in &snapshot {
            if listener.priority() == Priority::Highest {
                prop_assert!(admitted.iter().any(|l| Rc::ptr_eq(l, listener)));
            } else {
                prop_assert!(listener.stats().cost.execution().average() > 16.0);
            }
        }
    }
}
