// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-process inspector endpoint for the stats bridge.
//!
//! [`InspectorPort`] is what an external inspector would see: every message is
//! serialized to JSON, decoded again, and kept. It can be closed to exercise
//! the bridge's dead-port handling.

use std::cell::{Cell, RefCell};

use lookout_core::bridge::{BridgeMessage, BridgePort, ListenerSnapshot};
use lookout_core::error::PortError;

/// A [`BridgePort`] that records decoded bridge messages.
#[derive(Debug, Default)]
pub struct InspectorPort {
    messages: RefCell<Vec<BridgeMessage>>,
    bytes: Cell<usize>,
    closed: Cell<bool>,
}

impl InspectorPort {
    /// Creates an open port with no messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<BridgeMessage> {
        self.messages.borrow().clone()
    }

    /// Number of messages received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    /// Returns `true` if nothing has been received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    /// Total size of the JSON received, in bytes.
    #[must_use]
    pub fn bytes_received(&self) -> usize {
        self.bytes.get()
    }

    /// The listener table from the most recent message.
    #[must_use]
    pub fn latest(&self) -> Option<Vec<ListenerSnapshot>> {
        self.messages
            .borrow()
            .last()
            .map(|m| m.listeners().to_vec())
    }

    /// Makes every further delivery fail, as if the inspector went away.
    pub fn close(&self) {
        self.closed.set(true);
    }

    /// Drops the received messages.
    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl BridgePort for InspectorPort {
    fn post(&self, message: &BridgeMessage) -> Result<(), PortError> {
        if self.closed.get() {
            return Err(PortError::Closed("inspector closed".into()));
        }
        let json = message.to_json()?;
        let decoded: BridgeMessage =
            serde_json::from_str(&json).map_err(|e| PortError::Serialize(e.to_string()))?;
        self.bytes.set(self.bytes.get() + json.len());
        self.messages.borrow_mut().push(decoded);
        Ok(())
    }
}
