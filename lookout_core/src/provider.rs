// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The owned entry point and the handles given to binding layers.
//!
//! A [`ViewportProvider`] is constructed explicitly by the application and
//! owns the registry, the dispatcher, the collector, and optionally a
//! [`StatsBridge`]. The platform backend feeds it raw measurements through
//! [`on_frame`](ViewportProvider::on_frame) and
//! [`on_idle`](ViewportProvider::on_idle). Binding layers get a
//! [`ViewportContext`], a weak handle that degrades to a no-op once the
//! provider is gone.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::{Rc, Weak};

use crate::admission::RandomSource;
use crate::bridge::{IdleScheduler, ListenerSnapshot, StatsBridge};
use crate::clock::Clock;
use crate::collector::{FrameUpdate, RawMeasurement, ViewportCollector};
use crate::config::SchedulerConfig;
use crate::dispatch::{DispatchReport, NotificationDispatcher};
use crate::listener::{Handler, Listener, ListenerId, ListenerOptions};
use crate::registry::ListenerRegistry;
use crate::trace::{TickKind, Tracer};
use crate::viewport::{UpdateFlags, Viewport};

/// Options accepted by [`ViewportProvider::subscribe`].
pub type SubscribeOptions = ListenerOptions;

struct ProviderInner {
    registry: ListenerRegistry,
    dispatcher: NotificationDispatcher,
    bridge: Option<StatsBridge>,
    collector: RefCell<ViewportCollector>,
}

impl ProviderInner {
    fn subscribe(&self, handler: Handler, options: ListenerOptions) -> ListenerId {
        let kind = options.kind();
        let id = self.registry.add(handler, options);
        tracing::debug!(listener = %id, ?kind, total = self.registry.len(), "listener subscribed");
        self.notify_bridge();
        id
    }

    fn unsubscribe(&self, handler: &Handler) -> bool {
        let Some(removed) = self.registry.remove(handler) else {
            return false;
        };
        tracing::debug!(
            listener = %removed.id(),
            total = self.registry.len(),
            "listener unsubscribed"
        );
        drop(removed);
        self.notify_bridge();
        true
    }

    fn notify_bridge(&self) {
        if let Some(bridge) = &self.bridge {
            bridge.notify(self.registry.snapshot());
        }
    }

    fn dispatch(
        &self,
        update: FrameUpdate,
        kind: TickKind,
        tracer: &mut Tracer<'_>,
    ) -> DispatchReport {
        self.dispatcher.dispatch_traced(
            &self.registry,
            self.bridge.as_ref(),
            &update.viewport,
            update.flags,
            kind,
            tracer,
        )
    }

    fn idle(&self, tracer: &mut Tracer<'_>) -> Option<DispatchReport> {
        let update = self.collector.borrow_mut().take_idle()?;
        Some(self.dispatch(update, TickKind::Idle, tracer))
    }
}

/// Builds a [`ViewportProvider`].
#[must_use]
pub struct ProviderBuilder {
    config: SchedulerConfig,
    clock: Option<Box<dyn Clock>>,
    random: Option<Box<dyn RandomSource>>,
    idle: Option<Box<dyn IdleScheduler>>,
    initial: Option<RawMeasurement>,
}

impl ProviderBuilder {
    /// Uses `config` for admission control and the bridge timeout.
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Times callbacks with `clock`.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Draws admission decisions from `random`.
    pub fn random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    /// Enables the stats bridge, deferring exports through `idle`.
    pub fn stats_bridge(mut self, idle: impl IdleScheduler + 'static) -> Self {
        self.idle = Some(Box::new(idle));
        self
    }

    /// Seeds the collector so the first sample is diffed against `raw`.
    pub fn initial_measurement(mut self, raw: RawMeasurement) -> Self {
        self.initial = Some(raw);
        self
    }

    /// Builds the provider.
    pub fn build(self) -> ViewportProvider {
        let mut dispatcher = NotificationDispatcher::new(&self.config);
        if let Some(clock) = self.clock {
            dispatcher = dispatcher.with_clock(clock);
        }
        if let Some(random) = self.random {
            dispatcher = dispatcher.with_random(random);
        }
        let timeout = self.config.bridge_timeout();
        let bridge = self.idle.map(|idle| StatsBridge::new(idle, timeout));
        let collector = self
            .initial
            .map_or_else(ViewportCollector::default, ViewportCollector::with_initial);
        ViewportProvider {
            inner: Rc::new(ProviderInner {
                registry: ListenerRegistry::new(),
                dispatcher,
                bridge,
                collector: RefCell::new(collector),
            }),
        }
    }
}

impl fmt::Debug for ProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBuilder")
            .field("config", &self.config)
            .field("stats_bridge", &self.idle.is_some())
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

/// Owns the listener registry and drives notification rounds.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct ViewportProvider {
    inner: Rc<ProviderInner>,
}

impl ViewportProvider {
    /// Creates a provider with `config`, a monotonic clock, thread-local
    /// randomness, and no stats bridge.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts building a provider with default configuration.
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder {
            config: SchedulerConfig::default(),
            clock: None,
            random: None,
            idle: None,
            initial: None,
        }
    }

    /// Registers `handler`. Subscribing an already registered handler returns
    /// its existing id.
    pub fn subscribe(&self, handler: Handler, options: ListenerOptions) -> ListenerId {
        self.inner.subscribe(handler, options)
    }

    /// Registers `handler` and returns a guard that unsubscribes on drop.
    pub fn subscribe_scoped(&self, handler: Handler, options: ListenerOptions) -> Subscription {
        let id = self.inner.subscribe(handler.clone(), options);
        Subscription {
            id,
            handler,
            provider: Rc::downgrade(&self.inner),
        }
    }

    /// Removes the listener for `handler`. Returns `false` if it was not
    /// registered.
    pub fn unsubscribe(&self, handler: &Handler) -> bool {
        self.inner.unsubscribe(handler)
    }

    /// The latest measured viewport.
    #[must_use]
    pub fn current_viewport(&self) -> Viewport {
        self.inner.collector.borrow().current()
    }

    /// Returns `true` if at least one listener is registered.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.inner.registry.is_empty()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// The listener with `id`.
    #[must_use]
    pub fn listener(&self, id: ListenerId) -> Option<Rc<Listener>> {
        self.inner.registry.get(id)
    }

    /// Feeds a per-frame measurement, dispatching if anything changed.
    pub fn on_frame(&self, raw: RawMeasurement) -> Option<DispatchReport> {
        self.on_frame_traced(raw, &mut Tracer::none())
    }

    /// Like [`on_frame`](Self::on_frame), reporting to `tracer`.
    pub fn on_frame_traced(
        &self,
        raw: RawMeasurement,
        tracer: &mut Tracer<'_>,
    ) -> Option<DispatchReport> {
        let update = self.inner.collector.borrow_mut().sample(raw)?;
        Some(self.inner.dispatch(update, TickKind::Frame, tracer))
    }

    /// Delivers everything that changed since the last idle tick to all
    /// relevant listeners, bypassing admission control.
    pub fn on_idle(&self) -> Option<DispatchReport> {
        self.on_idle_traced(&mut Tracer::none())
    }

    /// Like [`on_idle`](Self::on_idle), reporting to `tracer`.
    pub fn on_idle_traced(&self, tracer: &mut Tracer<'_>) -> Option<DispatchReport> {
        self.inner.idle(tracer)
    }

    /// Runs one round with an externally produced snapshot.
    pub fn dispatch(&self, viewport: &Viewport, flags: UpdateFlags, kind: TickKind) -> DispatchReport {
        self.dispatch_traced(viewport, flags, kind, &mut Tracer::none())
    }

    /// Like [`dispatch`](Self::dispatch), reporting to `tracer`.
    pub fn dispatch_traced(
        &self,
        viewport: &Viewport,
        flags: UpdateFlags,
        kind: TickKind,
        tracer: &mut Tracer<'_>,
    ) -> DispatchReport {
        self.inner.dispatch(
            FrameUpdate {
                viewport: *viewport,
                flags,
            },
            kind,
            tracer,
        )
    }

    /// Resolved statistics for every listener, in registration order.
    #[must_use]
    pub fn listener_stats(&self) -> Vec<ListenerSnapshot> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(|l| ListenerSnapshot::capture(l))
            .collect()
    }

    /// The stats bridge, if enabled.
    #[must_use]
    pub fn bridge(&self) -> Option<&StatsBridge> {
        self.inner.bridge.as_ref()
    }

    /// A weak handle for binding layers.
    #[must_use]
    pub fn context(&self) -> ViewportContext {
        ViewportContext {
            provider: Rc::downgrade(&self.inner),
            warned: Cell::new(false),
        }
    }
}

impl fmt::Debug for ViewportProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportProvider")
            .field("listeners", &self.inner.registry.len())
            .field("dispatcher", &self.inner.dispatcher)
            .field("bridge", &self.inner.bridge)
            .finish_non_exhaustive()
    }
}

/// A weak handle to a provider, held by binding layers.
///
/// Once the provider is dropped, or for a context created with
/// [`detached`](Self::detached), subscribing logs one warning per context and
/// returns `None`.
pub struct ViewportContext {
    provider: Weak<ProviderInner>,
    warned: Cell<bool>,
}

impl ViewportContext {
    /// A context with no provider behind it.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            provider: Weak::new(),
            warned: Cell::new(false),
        }
    }

    /// Returns `true` while the provider is alive.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.strong_count() > 0
    }

    /// Registers `handler` with the provider.
    ///
    /// The returned guard unsubscribes on drop.
    pub fn subscribe(&self, handler: Handler, options: ListenerOptions) -> Option<Subscription> {
        let Some(inner) = self.provider.upgrade() else {
            if !self.warned.replace(true) {
                tracing::warn!(
                    kind = ?options.kind(),
                    "no viewport provider is alive; subscription ignored"
                );
            }
            return None;
        };
        let id = inner.subscribe(handler.clone(), options);
        Some(Subscription {
            id,
            handler,
            provider: Rc::downgrade(&inner),
        })
    }

    /// Removes the listener for `handler`. Silent when detached.
    pub fn unsubscribe(&self, handler: &Handler) -> bool {
        self.provider
            .upgrade()
            .is_some_and(|inner| inner.unsubscribe(handler))
    }

    /// The latest measured viewport, if the provider is alive.
    #[must_use]
    pub fn current_viewport(&self) -> Option<Viewport> {
        self.provider
            .upgrade()
            .map(|inner| inner.collector.borrow().current())
    }

    /// Runs [`ViewportProvider::on_idle`] if the provider is still alive.
    ///
    /// Deferred idle tasks hold a context rather than the provider, so a
    /// pending task never keeps a dropped provider alive.
    pub fn on_idle(&self) -> Option<DispatchReport> {
        self.provider
            .upgrade()
            .and_then(|inner| inner.idle(&mut Tracer::none()))
    }
}

impl Clone for ViewportContext {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            warned: Cell::new(self.warned.get()),
        }
    }
}

impl fmt::Debug for ViewportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportContext")
            .field("has_provider", &self.has_provider())
            .field("warned", &self.warned.get())
            .finish()
    }
}

/// Keeps a listener registered until dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: ListenerId,
    handler: Handler,
    provider: Weak<ProviderInner>,
}

impl Subscription {
    /// The listener's id.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribes now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.provider.upgrade() {
            inner.unsubscribe(&self.handler);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &(self.provider.strong_count() > 0))
            .finish_non_exhaustive()
    }
}
