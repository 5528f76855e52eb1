// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for lookout.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`measure`]: reads the window and document into a [`RawMeasurement`]
//! - [`PerformanceClock`]: a [`Clock`] backed by `performance.now()`
//! - [`RafLoop`]: `requestAnimationFrame` tick source
//! - [`IdleCallbackScheduler`]: `requestIdleCallback` implementation of the
//!   stats bridge's [`IdleScheduler`](lookout_core::bridge::IdleScheduler)
//! - [`MessagePortBridge`] and [`BridgeConnector`]: inspector channels over
//!   `MessagePort`, connected through `window` `message` events
//! - [`ViewportDriver`]: measures on every animation frame, dispatches to a
//!   [`ViewportProvider`](lookout_core::ViewportProvider), and delivers idle
//!   rounds once the page settles

mod driver;
mod idle;
mod port;
mod raf;

pub use driver::ViewportDriver;
pub use idle::IdleCallbackScheduler;
pub use port::{BridgeConnector, MessagePortBridge};
pub use raf::RafLoop;

use wasm_bindgen::JsValue;

use lookout_core::Dimensions;
use lookout_core::clock::Clock;
use lookout_core::collector::RawMeasurement;
use lookout_core::time::HostTime;

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now())
}

/// A [`Clock`] reading `performance.now()`.
///
/// Cheaper per call than `web_time::Instant`, and shares its origin with
/// `requestAnimationFrame` timestamps.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now(&self) -> HostTime {
        now()
    }
}

/// Reads the current scroll offsets and window/document dimensions.
///
/// Returns `None` outside a document context (for example in a worker).
#[must_use]
pub fn measure() -> Option<RawMeasurement> {
    let window = web_sys::window()?;
    let root = window.document()?.document_element()?;
    Some(RawMeasurement {
        scroll_x: window.scroll_x().unwrap_or(0.0),
        scroll_y: window.scroll_y().unwrap_or(0.0),
        dimensions: Dimensions {
            width: js_number(window.inner_width()),
            height: js_number(window.inner_height()),
            client_width: f64::from(root.client_width()),
            client_height: f64::from(root.client_height()),
            outer_width: js_number(window.outer_width()),
            outer_height: js_number(window.outer_height()),
            document_width: f64::from(root.scroll_width()),
            document_height: f64::from(root.scroll_height()),
        },
    })
}

fn js_number(value: Result<JsValue, JsValue>) -> f64 {
    value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
}
