// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, Chrome trace export, and inspector ports for
//! lookout diagnostics.
//!
//! This crate provides [`TraceSink`](lookout_core::trace::TraceSink)
//! implementations for development and post-mortem analysis, plus an
//! in-process stand-in for an external stats inspector:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: in-memory recording with
//!   [`recorder::replay`] for playback into any other sink.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   events.
//! - [`inspector::InspectorPort`]: a
//!   [`BridgePort`](lookout_core::bridge::BridgePort) that keeps what an
//!   external inspector would have received.

pub mod chrome;
pub mod inspector;
pub mod pretty;
pub mod recorder;
