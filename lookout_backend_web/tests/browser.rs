// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser tests for idle scheduling and inspector connections.
//!
//! Run with `wasm-pack test --headless --firefox lookout_backend_web`.

#![cfg(target_arch = "wasm32")]

use std::rc::Rc;

use js_sys::{Array, JSON, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{MessageChannel, MessageEvent, MessageEventInit, MessagePort};

use lookout_backend_web::{BridgeConnector, IdleCallbackScheduler};
use lookout_core::bridge::{BRIDGE_SOURCE, IdleScheduler, StatsBridge};
use lookout_core::time::Duration;

wasm_bindgen_test_configure!(run_in_browser);

fn token_task(token: &Rc<()>) -> Box<dyn FnOnce()> {
    let held = Rc::clone(token);
    Box::new(move || drop(held))
}

#[wasm_bindgen_test]
fn cancelled_request_releases_its_task() {
    let scheduler = IdleCallbackScheduler::new();
    let token = Rc::new(());
    let handle = scheduler.request_idle(token_task(&token), Duration::from_millis(50));
    assert_eq!(scheduler.held(), 1);
    assert_eq!(Rc::strong_count(&token), 2);

    scheduler.cancel_idle(handle);
    assert_eq!(scheduler.held(), 0);
    assert_eq!(Rc::strong_count(&token), 1);
}

#[wasm_bindgen_test]
fn rearming_keeps_one_request_alive() {
    let scheduler = IdleCallbackScheduler::new();
    let token = Rc::new(());
    let mut pending = None;
    for _ in 0..100 {
        if let Some(handle) = pending.take() {
            scheduler.cancel_idle(handle);
        }
        pending = Some(scheduler.request_idle(token_task(&token), Duration::from_millis(50)));
    }
    assert_eq!(scheduler.held(), 1);
    assert_eq!(Rc::strong_count(&token), 2);
}

#[wasm_bindgen_test]
fn dropping_scheduler_releases_pending_tasks() {
    let scheduler = IdleCallbackScheduler::new();
    let token = Rc::new(());
    let _ = scheduler.request_idle(token_task(&token), Duration::from_millis(50));
    let _ = scheduler.request_idle(token_task(&token), Duration::from_millis(50));
    assert_eq!(Rc::strong_count(&token), 3);
    drop(scheduler);
    assert_eq!(Rc::strong_count(&token), 1);
}

fn post_to_window(data: &JsValue, port: Option<&MessagePort>) {
    let init: MessageEventInit = Object::new().unchecked_into();
    let _ = Reflect::set(&init, &JsValue::from_str("data"), data);
    let ports = Array::new();
    if let Some(port) = port {
        ports.push(port);
    }
    let _ = Reflect::set(&init, &JsValue::from_str("ports"), &ports);
    let event = MessageEvent::new_with_event_init_dict("message", &init).unwrap();
    web_sys::window().unwrap().dispatch_event(&event).unwrap();
}

fn control(kind: &str) -> JsValue {
    JSON::parse(&format!(r#"{{"source":"{BRIDGE_SOURCE}","type":"{kind}"}}"#)).unwrap()
}

#[wasm_bindgen_test]
fn connector_tracks_ports_by_identity() {
    let bridge = StatsBridge::new(IdleCallbackScheduler::new(), Duration::from_millis(300));
    let connector = BridgeConnector::install(bridge.clone()).unwrap();
    let first = MessageChannel::new().unwrap();
    let second = MessageChannel::new().unwrap();

    post_to_window(&control("connect"), Some(&first.port1()));
    post_to_window(&control("connect"), Some(&first.port1()));
    assert_eq!(connector.known_ports(), 1);
    assert_eq!(bridge.port_count(), 1);

    post_to_window(&control("connect"), Some(&second.port1()));
    assert_eq!(connector.known_ports(), 2);
    assert_eq!(bridge.port_count(), 2);

    post_to_window(&JsValue::from_str("unrelated"), None);
    post_to_window(&control("connect"), None);
    assert_eq!(bridge.port_count(), 2);

    post_to_window(&control("disconnect"), Some(&first.port1()));
    assert_eq!(connector.known_ports(), 1);
    assert_eq!(bridge.port_count(), 1);

    drop(connector);
    post_to_window(&control("connect"), Some(&first.port1()));
    assert_eq!(bridge.port_count(), 1);
}
