// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestIdleCallback` scheduling.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::{Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use lookout_core::bridge::{IdleHandle, IdleScheduler, IdleTask};
use lookout_core::time::Duration;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "requestIdleCallback")]
    fn request_idle_callback(callback: &JsValue, options: &JsValue) -> u32;

    #[wasm_bindgen(js_name = "cancelIdleCallback")]
    fn cancel_idle_callback(handle: u32);
}

type IdleClosure = Closure<dyn FnMut()>;

/// An [`IdleScheduler`] backed by the browser's `requestIdleCallback`.
///
/// The scheduler owns the JS closure of every request. A cancelled request's
/// closure, and the task it captured, is dropped by
/// [`cancel_idle`](IdleScheduler::cancel_idle). A closure that ran is dropped
/// on the next request or cancellation. Dropping the last clone cancels
/// everything still pending.
///
/// Clones share the same set of requests.
#[derive(Clone, Default)]
pub struct IdleCallbackScheduler {
    inner: Rc<IdleCallbacks>,
}

#[derive(Default)]
struct IdleCallbacks {
    /// Closures registered with `requestIdleCallback`, by request id.
    live: RefCell<HashMap<u32, IdleClosure>>,
    /// Ids whose callback has run. Their closures can't be dropped from
    /// inside the call, so they are swept later.
    spent: RefCell<Vec<u32>>,
}

impl IdleCallbacks {
    fn sweep(&self) {
        let spent = core::mem::take(&mut *self.spent.borrow_mut());
        if spent.is_empty() {
            return;
        }
        // Drop the closures after the borrow is released.
        let removed: Vec<IdleClosure> = {
            let mut live = self.live.borrow_mut();
            spent.iter().filter_map(|id| live.remove(id)).collect()
        };
        drop(removed);
    }
}

impl Drop for IdleCallbacks {
    fn drop(&mut self) {
        for id in self.live.get_mut().keys() {
            cancel_idle_callback(*id);
        }
    }
}

impl IdleCallbackScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of closures currently held, pending or already run.
    #[must_use]
    pub fn held(&self) -> usize {
        self.inner.live.borrow().len()
    }
}

impl IdleScheduler for IdleCallbackScheduler {
    fn request_idle(&self, task: IdleTask, timeout: Duration) -> IdleHandle {
        self.inner.sweep();

        let id_slot = Rc::new(Cell::new(None::<u32>));
        let slot = Rc::clone(&id_slot);
        let callbacks: Weak<IdleCallbacks> = Rc::downgrade(&self.inner);
        let mut task = Some(task);
        let closure = Closure::wrap(Box::new(move || {
            if let Some(task) = task.take() {
                task();
            }
            if let (Some(id), Some(callbacks)) = (slot.get(), callbacks.upgrade()) {
                callbacks.spent.borrow_mut().push(id);
            }
        }) as Box<dyn FnMut()>);

        let options = Object::new();
        // Setting a plain data property on a fresh object cannot fail.
        let _ = Reflect::set(
            &options,
            &JsValue::from_str("timeout"),
            &JsValue::from_f64(timeout.as_millis_f64()),
        );
        let id = request_idle_callback(closure.as_ref(), &options);
        id_slot.set(Some(id));
        self.inner.live.borrow_mut().insert(id, closure);
        IdleHandle(u64::from(id))
    }

    fn cancel_idle(&self, handle: IdleHandle) {
        self.inner.sweep();
        let Ok(id) = u32::try_from(handle.0) else {
            return;
        };
        let removed = self.inner.live.borrow_mut().remove(&id);
        if removed.is_some() {
            cancel_idle_callback(id);
        }
        drop(removed);
    }
}

impl core::fmt::Debug for IdleCallbackScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdleCallbackScheduler")
            .field("held", &self.held())
            .finish_non_exhaustive()
    }
}
