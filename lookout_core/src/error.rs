// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Dispatch, admission, and cost tracking are total and have no error type.
//! Errors only arise at the edges: parsing configuration and priorities, and
//! talking to external inspectors through the stats bridge.

use thiserror::Error;

/// A scheduler configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input was not valid configuration JSON.
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The frame budget must be a positive, finite number of milliseconds.
    #[error("frame budget must be positive and finite, got {0}")]
    InvalidFrameBudget(f64),
    /// The bridge timeout must be a non-negative, finite number of milliseconds.
    #[error("bridge timeout must be non-negative and finite, got {0}")]
    InvalidBridgeTimeout(f64),
}

/// A string did not name a known priority.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown priority `{0}` (expected highest, high, normal, or low)")]
pub struct ParsePriorityError(pub String);

/// A bridge port failed to deliver a message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PortError {
    /// The payload could not be serialized.
    #[error("failed to serialize bridge payload: {0}")]
    Serialize(String),
    /// The underlying channel is closed or rejected the message.
    #[error("bridge port closed: {0}")]
    Closed(String),
}

/// An inbound bridge message could not be handled.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The message was not valid JSON or lacked required fields.
    #[error("malformed bridge message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A `connect` or `disconnect` message arrived without a port.
    #[error("control message carried no port")]
    MissingPort,
}
