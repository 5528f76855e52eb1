// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inspector channels over `MessagePort`.
//!
//! An inspector (a devtools panel, another frame) opens a `MessageChannel` and
//! posts one end to the page's `window` with a `connect` control message.
//! [`BridgeConnector`] listens for those messages and hands each port to the
//! [`StatsBridge`] wrapped in a [`MessagePortBridge`]. A `disconnect` message
//! carrying the same port detaches it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{JSON, Object};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, MessagePort, Window};

use lookout_core::bridge::{
    BridgeMessage, BridgePort, InboundKind, InboundMessage, PortId, StatsBridge,
};
use lookout_core::error::PortError;

// ---------------------------------------------------------------------------
// MessagePortBridge
// ---------------------------------------------------------------------------

/// A [`BridgePort`] posting bridge messages as plain JS objects.
#[derive(Clone, Debug)]
pub struct MessagePortBridge {
    port: MessagePort,
}

impl MessagePortBridge {
    /// Wraps a `MessagePort`.
    #[must_use]
    pub fn new(port: MessagePort) -> Self {
        Self { port }
    }
}

impl BridgePort for MessagePortBridge {
    fn post(&self, message: &BridgeMessage) -> Result<(), PortError> {
        let json = message.to_json()?;
        let value = JSON::parse(&json).map_err(|e| PortError::Serialize(describe(&e)))?;
        self.port
            .post_message(&value)
            .map_err(|e| PortError::Closed(describe(&e)))
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

// ---------------------------------------------------------------------------
// BridgeConnector
// ---------------------------------------------------------------------------

struct ConnectorInner {
    bridge: StatsBridge,
    /// Ports seen so far, so `disconnect` can find the id `connect` assigned.
    known: RefCell<Vec<(PortId, MessagePort)>>,
    next_id: Cell<u64>,
}

impl ConnectorInner {
    fn on_message(&self, event: &MessageEvent) {
        let data = event.data();
        let json = match data.as_string() {
            Some(s) => s,
            None => match JSON::stringify(&data) {
                Ok(s) => String::from(s),
                Err(_) => return,
            },
        };
        // Pages receive plenty of unrelated `message` events.
        let Ok(message) = InboundMessage::parse(&json) else {
            return;
        };
        if !message.is_ours() {
            return;
        }
        let Some(port) = event.ports().get(0).dyn_into::<MessagePort>().ok() else {
            tracing::warn!(kind = ?message.kind, "inspector message carried no port");
            return;
        };
        match message.kind {
            InboundKind::Connect => {
                let id = self.port_id(&port);
                self.bridge
                    .connect(id, Rc::new(MessagePortBridge::new(port)));
            }
            InboundKind::Disconnect => {
                if let Some(id) = self.forget(&port) {
                    self.bridge.disconnect(id);
                }
            }
            InboundKind::Unknown => {}
        }
    }

    fn port_id(&self, port: &MessagePort) -> PortId {
        let mut known = self.known.borrow_mut();
        if let Some((id, _)) = known.iter().find(|(_, p)| Object::is(p, port)) {
            return *id;
        }
        let id = PortId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        known.push((id, port.clone()));
        id
    }

    fn forget(&self, port: &MessagePort) -> Option<PortId> {
        let mut known = self.known.borrow_mut();
        let index = known.iter().position(|(_, p)| Object::is(p, port))?;
        Some(known.swap_remove(index).0)
    }
}

/// Listens for inspector `connect`/`disconnect` messages on `window`.
///
/// The listener is removed when the connector is dropped.
pub struct BridgeConnector {
    window: Window,
    closure: Closure<dyn FnMut(MessageEvent)>,
    inner: Rc<ConnectorInner>,
}

impl BridgeConnector {
    /// Installs a `message` listener routing inspector ports to `bridge`.
    ///
    /// Returns `None` outside a window context or if the listener could not
    /// be added.
    pub fn install(bridge: StatsBridge) -> Option<Self> {
        let window = web_sys::window()?;
        let inner = Rc::new(ConnectorInner {
            bridge,
            known: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        });
        let handler = Rc::clone(&inner);
        let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
            handler.on_message(&event);
        }) as Box<dyn FnMut(MessageEvent)>);
        window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            .ok()?;
        Some(Self {
            window,
            closure,
            inner,
        })
    }

    /// Number of distinct ports that have connected and not yet disconnected.
    #[must_use]
    pub fn known_ports(&self) -> usize {
        self.inner.known.borrow().len()
    }
}

impl Drop for BridgeConnector {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("message", self.closure.as_ref().unchecked_ref());
    }
}

impl core::fmt::Debug for BridgeConnector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BridgeConnector")
            .field("bridge", &self.inner.bridge)
            .field("known_ports", &self.known_ports())
            .finish_non_exhaustive()
    }
}
