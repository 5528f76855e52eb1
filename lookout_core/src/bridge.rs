// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Idle-deferred export of listener statistics.
//!
//! The [`StatsBridge`] mirrors the registry to external inspectors (a devtools
//! panel, a test harness) connected over [`BridgePort`]s. Exports never run on
//! the hot path: [`notify`](StatsBridge::notify) only schedules an export on
//! the next idle opportunity through an [`IdleScheduler`], cancelling any
//! export still pending, so a burst of notifications collapses into one
//! message.
//!
//! # Wire format
//!
//! Outbound messages are JSON objects:
//!
//! ```text
//! { "source": "__LOOKOUT__", "version": "0.0.1", "type": "update",
//!   "listeners": [ { "id": 0, "type": "useScroll", "priority": "normal", ... } ] }
//! ```
//!
//! Inbound control messages carry the same `source` and a `type` of
//! `"connect"` or `"disconnect"`. Messages with any other source are ignored.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{MessageError, PortError};
use crate::listener::{Listener, ListenerId, ListenerKind};
use crate::priority::Priority;
use crate::time::Duration;

/// Tag identifying bridge traffic on a shared message channel.
pub const BRIDGE_SOURCE: &str = "__LOOKOUT__";

/// Version stamped on every outbound message.
pub const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Idle scheduling
// ---------------------------------------------------------------------------

/// Work deferred to an idle opportunity.
pub type IdleTask = Box<dyn FnOnce()>;

/// Identifies a pending idle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdleHandle(pub u64);

/// Runs deferred work when the host is idle.
///
/// Implementations must run each task at most once, no later than `timeout`
/// after the request, and never after it has been cancelled.
pub trait IdleScheduler {
    /// Schedules `task`.
    fn request_idle(&self, task: IdleTask, timeout: Duration) -> IdleHandle;

    /// Cancels a pending request. Unknown or completed handles are ignored.
    fn cancel_idle(&self, handle: IdleHandle);
}

impl<I: IdleScheduler + ?Sized> IdleScheduler for Box<I> {
    fn request_idle(&self, task: IdleTask, timeout: Duration) -> IdleHandle {
        (**self).request_idle(task, timeout)
    }

    fn cancel_idle(&self, handle: IdleHandle) {
        (**self).cancel_idle(handle);
    }
}

#[derive(Default)]
struct ManualIdleState {
    next: u64,
    queue: VecDeque<(IdleHandle, IdleTask)>,
    last_timeout: Option<Duration>,
}

/// An [`IdleScheduler`] that runs tasks only when told to.
///
/// Clones share the same queue, so a test can keep one handle and give the
/// other to a bridge.
#[derive(Clone, Default)]
pub struct ManualIdleScheduler {
    state: Rc<RefCell<ManualIdleState>>,
}

impl ManualIdleScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every task that was pending when called, returning how many ran.
    ///
    /// Tasks scheduled by those tasks stay queued for the next call.
    pub fn run_idle(&self) -> usize {
        let n = self.pending_len();
        let mut ran = 0;
        for _ in 0..n {
            let next = self.state.borrow_mut().queue.pop_front();
            let Some((_, task)) = next else { break };
            task();
            ran += 1;
        }
        ran
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// The timeout passed with the most recent request.
    #[must_use]
    pub fn last_timeout(&self) -> Option<Duration> {
        self.state.borrow().last_timeout
    }
}

impl IdleScheduler for ManualIdleScheduler {
    fn request_idle(&self, task: IdleTask, timeout: Duration) -> IdleHandle {
        let mut state = self.state.borrow_mut();
        let handle = IdleHandle(state.next);
        state.next += 1;
        state.last_timeout = Some(timeout);
        state.queue.push_back((handle, task));
        handle
    }

    fn cancel_idle(&self, handle: IdleHandle) {
        // Drop the task after the borrow is released.
        let removed = {
            let mut state = self.state.borrow_mut();
            let idx = state.queue.iter().position(|(h, _)| *h == handle);
            idx.and_then(|idx| state.queue.remove(idx))
        };
        drop(removed);
    }
}

impl fmt::Debug for ManualIdleScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualIdleScheduler")
            .field("pending", &self.pending_len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Ports and messages
// ---------------------------------------------------------------------------

/// Caller-assigned identity of a connected port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(pub u64);

/// One end of a message channel to an external inspector.
pub trait BridgePort {
    /// Delivers one message.
    fn post(&self, message: &BridgeMessage) -> Result<(), PortError>;
}

/// Resolved statistics for one listener, as sent to inspectors.
///
/// Accessor-backed options (priority, display name, notify flags) are
/// resolved when the snapshot is captured. Unset minimums export as `0.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerSnapshot {
    /// Listener id.
    pub id: ListenerId,
    /// Subscription mechanism.
    #[serde(rename = "type")]
    pub kind: ListenerKind,
    /// Display name, if the subscriber set one.
    pub display_name: Option<String>,
    /// Current priority.
    pub priority: Priority,
    /// Completed runs.
    pub iterations: u64,
    /// Skips since the last run.
    pub skipped_iterations: u32,
    /// Skips over the listener's lifetime.
    pub total_skipped_iterations: u64,
    /// Mean layout cost in milliseconds.
    pub average_layout_cost: f64,
    /// Mean execution cost in milliseconds.
    pub average_execution_cost: f64,
    /// Smallest layout cost in milliseconds.
    pub min_layout_cost: f64,
    /// Largest layout cost in milliseconds.
    pub max_layout_cost: f64,
    /// Latest layout cost in milliseconds.
    pub last_layout_cost: f64,
    /// Smallest execution cost in milliseconds.
    pub min_execution_cost: f64,
    /// Largest execution cost in milliseconds.
    pub max_execution_cost: f64,
    /// Latest execution cost in milliseconds.
    pub last_execution_cost: f64,
    /// Whether scroll changes are wanted.
    pub updates_on_scroll: bool,
    /// Whether dimension changes are wanted.
    pub updates_on_dimensions: bool,
    /// Whether the listener only runs on idle ticks.
    pub updates_on_idle: bool,
}

impl ListenerSnapshot {
    /// Resolves a listener's accessors and copies its statistics.
    #[must_use]
    pub fn capture(listener: &Listener) -> Self {
        let stats = listener.stats();
        let layout = stats.cost.layout();
        let execution = stats.cost.execution();
        Self {
            id: listener.id(),
            kind: listener.kind(),
            display_name: listener.display_name(),
            priority: listener.priority(),
            iterations: stats.cost.iterations(),
            skipped_iterations: stats.skipped_iterations,
            total_skipped_iterations: stats.total_skipped_iterations,
            average_layout_cost: layout.average(),
            average_execution_cost: execution.average(),
            min_layout_cost: layout.min().unwrap_or(0.0),
            max_layout_cost: layout.max(),
            last_layout_cost: layout.last(),
            min_execution_cost: execution.min().unwrap_or(0.0),
            max_execution_cost: execution.max(),
            last_execution_cost: execution.last(),
            updates_on_scroll: listener.wants_scroll(),
            updates_on_dimensions: listener.wants_dimensions(),
            updates_on_idle: listener.only_when_idle(),
        }
    }
}

/// Body of an outbound message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgePayload {
    /// The full listener roster.
    Update {
        /// One entry per active listener, in registration order.
        listeners: Vec<ListenerSnapshot>,
    },
}

/// An outbound bridge message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Always [`BRIDGE_SOURCE`] for messages this crate sends.
    pub source: String,
    /// The sending crate's version.
    pub version: String,
    /// The message body.
    #[serde(flatten)]
    pub payload: BridgePayload,
}

impl BridgeMessage {
    /// Builds an `update` message.
    #[must_use]
    pub fn update(listeners: Vec<ListenerSnapshot>) -> Self {
        Self {
            source: BRIDGE_SOURCE.to_owned(),
            version: BRIDGE_VERSION.to_owned(),
            payload: BridgePayload::Update { listeners },
        }
    }

    /// The listener roster carried by this message.
    #[must_use]
    pub fn listeners(&self) -> &[ListenerSnapshot] {
        match &self.payload {
            BridgePayload::Update { listeners } => listeners,
        }
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> Result<String, PortError> {
        serde_json::to_string(self).map_err(|e| PortError::Serialize(e.to_string()))
    }
}

/// Control message types an inspector may send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundKind {
    /// Start receiving updates on the attached port.
    Connect,
    /// Stop receiving updates on the attached port.
    Disconnect,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// An inbound control message.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    /// Origin tag; must equal [`BRIDGE_SOURCE`] to be acted on.
    #[serde(default)]
    pub source: String,
    /// What the inspector asks for.
    #[serde(rename = "type")]
    pub kind: InboundKind,
}

impl InboundMessage {
    /// Parses a JSON control message.
    pub fn parse(json: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns `true` if the message was sent for this bridge.
    #[must_use]
    pub fn is_ours(&self) -> bool {
        self.source == BRIDGE_SOURCE
    }
}

// ---------------------------------------------------------------------------
// StatsBridge
// ---------------------------------------------------------------------------

struct BridgeInner {
    idle: Box<dyn IdleScheduler>,
    timeout: Duration,
    ports: RefCell<Vec<(PortId, Rc<dyn BridgePort>)>>,
    pending: Cell<Option<IdleHandle>>,
    exports: Cell<u64>,
}

impl BridgeInner {
    fn export(&self, listeners: &[Rc<Listener>]) {
        let snapshots: Vec<_> = listeners
            .iter()
            .filter(|l| l.is_active())
            .map(|l| ListenerSnapshot::capture(l))
            .collect();
        let message = BridgeMessage::update(snapshots);
        let ports = self.ports.borrow().clone();
        let mut dead = Vec::new();
        for (id, port) in &ports {
            if let Err(err) = port.post(&message) {
                tracing::warn!(port = id.0, %err, "dropping bridge port");
                dead.push(*id);
            }
        }
        if !dead.is_empty() {
            self.ports.borrow_mut().retain(|(id, _)| !dead.contains(id));
        }
        self.exports.set(self.exports.get() + 1);
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.idle.cancel_idle(handle);
        }
    }
}

/// Mirrors listener statistics to connected inspectors on idle.
///
/// Cheap to clone; clones share ports and the pending export.
#[derive(Clone)]
pub struct StatsBridge {
    inner: Rc<BridgeInner>,
}

impl StatsBridge {
    /// Creates a bridge that defers exports through `idle`, waiting at most
    /// `timeout` for an idle opportunity.
    pub fn new(idle: impl IdleScheduler + 'static, timeout: Duration) -> Self {
        Self {
            inner: Rc::new(BridgeInner {
                idle: Box::new(idle),
                timeout,
                ports: RefCell::new(Vec::new()),
                pending: Cell::new(None),
                exports: Cell::new(0),
            }),
        }
    }

    /// Schedules an export of `listeners`, replacing any pending one.
    ///
    /// Does nothing while no port is connected.
    pub fn notify(&self, listeners: Vec<Rc<Listener>>) {
        if !self.has_ports() {
            return;
        }
        if let Some(handle) = self.inner.pending.take() {
            self.inner.idle.cancel_idle(handle);
        }
        let weak: Weak<BridgeInner> = Rc::downgrade(&self.inner);
        let task: IdleTask = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.pending.set(None);
                inner.export(&listeners);
            }
        });
        let handle = self.inner.idle.request_idle(task, self.inner.timeout);
        self.inner.pending.set(Some(handle));
    }

    /// Starts pushing updates to `port`. Reconnecting an id replaces its port.
    pub fn connect(&self, id: PortId, port: Rc<dyn BridgePort>) {
        let mut ports = self.inner.ports.borrow_mut();
        if let Some(slot) = ports.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = port;
        } else {
            ports.push((id, port));
        }
        tracing::debug!(port = id.0, connected = ports.len(), "bridge port connected");
    }

    /// Stops pushing updates to the port with `id`.
    ///
    /// Returns `false` if no such port was connected.
    pub fn disconnect(&self, id: PortId) -> bool {
        let mut ports = self.inner.ports.borrow_mut();
        let before = ports.len();
        ports.retain(|(existing, _)| *existing != id);
        let removed = ports.len() != before;
        if removed {
            tracing::debug!(port = id.0, connected = ports.len(), "bridge port disconnected");
        }
        removed
    }

    /// Handles a JSON control message.
    ///
    /// `port` is the channel the message arrived with, if any. Messages from
    /// another source and unknown message types are ignored.
    pub fn handle_message(
        &self,
        json: &str,
        port: Option<(PortId, Rc<dyn BridgePort>)>,
    ) -> Result<(), MessageError> {
        let message = InboundMessage::parse(json)?;
        if !message.is_ours() {
            return Ok(());
        }
        match message.kind {
            InboundKind::Connect => {
                let (id, port) = port.ok_or(MessageError::MissingPort)?;
                self.connect(id, port);
            }
            InboundKind::Disconnect => {
                let (id, _) = port.ok_or(MessageError::MissingPort)?;
                self.disconnect(id);
            }
            InboundKind::Unknown => {}
        }
        Ok(())
    }

    /// Returns `true` if at least one port is connected.
    #[must_use]
    pub fn has_ports(&self) -> bool {
        !self.inner.ports.borrow().is_empty()
    }

    /// Number of connected ports.
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.inner.ports.borrow().len()
    }

    /// Returns `true` if an export is scheduled but has not run.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Number of exports performed so far.
    #[must_use]
    pub fn export_count(&self) -> u64 {
        self.inner.exports.get()
    }
}

impl fmt::Debug for StatsBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsBridge")
            .field("timeout", &self.inner.timeout)
            .field("ports", &self.port_count())
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{Handler, ListenerOptions};
    use crate::registry::ListenerRegistry;

    #[derive(Default)]
    struct CollectPort {
        messages: RefCell<Vec<BridgeMessage>>,
    }

    impl BridgePort for CollectPort {
        fn post(&self, message: &BridgeMessage) -> Result<(), PortError> {
            self.messages.borrow_mut().push(message.clone());
            Ok(())
        }
    }

    struct ClosedPort;

    impl BridgePort for ClosedPort {
        fn post(&self, _: &BridgeMessage) -> Result<(), PortError> {
            Err(PortError::Closed("gone".into()))
        }
    }

    fn setup() -> (ManualIdleScheduler, StatsBridge, Rc<CollectPort>) {
        let idle = ManualIdleScheduler::new();
        let bridge = StatsBridge::new(idle.clone(), Duration::from_millis(300));
        let port = Rc::new(CollectPort::default());
        bridge.connect(PortId(1), port.clone());
        (idle, bridge, port)
    }

    #[test]
    fn no_ports_means_no_request() {
        let idle = ManualIdleScheduler::new();
        let bridge = StatsBridge::new(idle.clone(), Duration::from_millis(300));
        bridge.notify(Vec::new());
        assert_eq!(idle.pending_len(), 0);
    }

    #[test]
    fn bursts_coalesce_into_one_export() {
        let (idle, bridge, port) = setup();
        let reg = ListenerRegistry::new();
        reg.add(Handler::from_viewport(|_| {}), ListenerOptions::scroll());
        bridge.notify(reg.snapshot());
        bridge.notify(reg.snapshot());
        bridge.notify(reg.snapshot());
        assert_eq!(idle.pending_len(), 1);
        assert_eq!(idle.last_timeout(), Some(Duration::from_millis(300)));
        assert_eq!(idle.run_idle(), 1);
        assert!(!bridge.has_pending());
        let messages = port.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].listeners().len(), 1);
        assert_eq!(messages[0].source, BRIDGE_SOURCE);
    }

    #[test]
    fn accessors_resolve_at_export_time() {
        let (idle, bridge, port) = setup();
        let reg = ListenerRegistry::new();
        let priority = Rc::new(Cell::new(Priority::Low));
        let p = Rc::clone(&priority);
        reg.add(
            Handler::from_viewport(|_| {}),
            ListenerOptions::viewport().priority(move || p.get()),
        );
        bridge.notify(reg.snapshot());
        priority.set(Priority::High);
        idle.run_idle();
        assert_eq!(
            port.messages.borrow()[0].listeners()[0].priority,
            Priority::High
        );
    }

    #[test]
    fn removed_listeners_are_not_exported() {
        let (idle, bridge, port) = setup();
        let reg = ListenerRegistry::new();
        let h = Handler::from_viewport(|_| {});
        reg.add(h.clone(), ListenerOptions::viewport());
        bridge.notify(reg.snapshot());
        reg.remove(&h);
        idle.run_idle();
        assert!(port.messages.borrow()[0].listeners().is_empty());
    }

    #[test]
    fn failing_port_is_dropped() {
        let (idle, bridge, port) = setup();
        bridge.connect(PortId(2), Rc::new(ClosedPort));
        bridge.notify(Vec::new());
        idle.run_idle();
        assert_eq!(bridge.port_count(), 1);
        assert_eq!(port.messages.borrow().len(), 1);
    }

    #[test]
    fn dropping_bridge_cancels_pending_export() {
        let (idle, bridge, _port) = setup();
        bridge.notify(Vec::new());
        drop(bridge);
        assert_eq!(idle.pending_len(), 0);
    }

    #[test]
    fn control_messages() {
        let idle = ManualIdleScheduler::new();
        let bridge = StatsBridge::new(idle, Duration::from_millis(300));
        let port: Rc<dyn BridgePort> = Rc::new(CollectPort::default());
        let connect = format!(r#"{{"source":"{BRIDGE_SOURCE}","type":"connect"}}"#);
        let disconnect = format!(r#"{{"source":"{BRIDGE_SOURCE}","type":"disconnect"}}"#);

        bridge
            .handle_message(r#"{"source":"other","type":"connect"}"#, Some((PortId(7), port.clone())))
            .unwrap();
        assert!(!bridge.has_ports());

        bridge.handle_message(&connect, Some((PortId(7), port.clone()))).unwrap();
        assert_eq!(bridge.port_count(), 1);

        assert!(matches!(
            bridge.handle_message(&connect, None),
            Err(MessageError::MissingPort)
        ));
        let err = bridge.handle_message(&disconnect, None).unwrap_err();
        assert!(matches!(err, MessageError::MissingPort));
        assert_eq!(err.to_string(), "control message carried no port");
        assert_eq!(bridge.port_count(), 1);
        assert!(matches!(
            bridge.handle_message("not json", None),
            Err(MessageError::Malformed(_))
        ));

        bridge.handle_message(&disconnect, Some((PortId(7), port))).unwrap();
        assert!(!bridge.has_ports());
    }

    #[test]
    fn message_shape() {
        let msg = BridgeMessage::update(Vec::new());
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["source"], BRIDGE_SOURCE);
        assert!(value["listeners"].as_array().unwrap().is_empty());
    }
}
