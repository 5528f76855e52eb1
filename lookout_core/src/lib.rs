// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport change scheduling with cost-adaptive listener notification.
//!
//! `lookout_core` tracks browser viewport state (scroll position, scroll
//! direction, window and document dimensions) and fans changes out to many
//! independent listeners. Each listener carries a priority and rolling cost
//! statistics; under load, expensive low-priority listeners are skipped
//! probabilistically so the whole notification round stays inside one frame.
//!
//! # Architecture
//!
//! The crate is organized around a per-frame dispatch loop fed by a platform
//! measurement source:
//!
//! ```text
//!   Backend (rAF / idle callbacks)
//!       │  RawMeasurement
//!       ▼
//!   ViewportCollector::sample() ──► (Viewport, UpdateFlags)
//!                                          │
//!                 ┌────────────────────────┘
//!                 ▼
//!   NotificationDispatcher::dispatch()
//!       relevance filter ──► AdmissionController ──► layout phase
//!                                                        │
//!                 ┌──────────────────────────────────────┘
//!                 ▼
//!       handler phase ──► CostTracker::record() ──► StatsBridge::notify()
//! ```
//!
//! **[`viewport`]**: Immutable viewport snapshot types and sticky scroll
//! direction tracking.
//!
//! **[`collector`]**: Turns raw measurements into snapshots plus "did this
//! change" flags, and accumulates changes for idle delivery.
//!
//! **[`listener`]** / **[`registry`]**: Listener records with live accessor
//! options, and the insertion-ordered set that owns them.
//!
//! **[`cost`]**: Running min/max/last/average cost per timed phase.
//!
//! **[`admission`]**: Probabilistic, priority-tiered admission control under
//! a per-tick time budget, with an injectable [`RandomSource`](admission::RandomSource).
//!
//! **[`dispatch`]**: One notification round: filter, admit, recompute
//! layouts, invoke handlers, record costs.
//!
//! **[`bridge`]**: Idle-deferred export of listener statistics to external
//! inspectors over a message channel.
//!
//! **[`provider`]**: The explicitly owned entry point wiring everything
//! together, plus the weak [`ViewportContext`](provider::ViewportContext)
//! handed to binding layers.
//!
//! **[`clock`]** / **[`time`]**: Monotonic time and injectable clocks.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! dispatch instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod admission;
pub mod bridge;
pub mod clock;
pub mod collector;
pub mod config;
pub mod cost;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod priority;
pub mod provider;
pub mod registry;
pub mod time;
pub mod trace;
pub mod viewport;

pub use config::SchedulerConfig;
pub use listener::{Handler, ListenerId, ListenerKind, ListenerOptions};
pub use priority::Priority;
pub use provider::{Subscription, ViewportContext, ViewportProvider};
pub use viewport::{Dimensions, Scroll, UpdateFlags, Viewport};
