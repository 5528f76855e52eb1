// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener records and subscription options.
//!
//! A [`Listener`] is created for every active subscription and owned by the
//! [`ListenerRegistry`](crate::registry::ListenerRegistry). Its subscription
//! intent (which changes it cares about, its priority, its display name) is
//! held as accessor closures in [`ListenerOptions`] and re-read on every tick,
//! so a subscriber can change intent without re-subscribing.

use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cost::CostTracker;
use crate::priority::Priority;
use crate::viewport::Viewport;

/// The value produced by a layout recompute callback.
pub type LayoutSnapshot = Box<dyn Any>;

type HandlerFn = dyn Fn(&Viewport, Option<&dyn Any>);
type LayoutFn = dyn Fn(&Viewport) -> LayoutSnapshot;

/// Unique identifier of a listener.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ListenerId(pub u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which subscription mechanism created a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerKind {
    /// A render-prop observer component.
    #[serde(rename = "ObserveViewport")]
    ObserveViewport,
    /// A higher-order component wrapper.
    #[serde(rename = "connectViewport")]
    ConnectViewport,
    /// A scroll-only hook.
    #[serde(rename = "useScroll")]
    UseScroll,
    /// A dimensions-only hook.
    #[serde(rename = "useDimensions")]
    UseDimensions,
    /// A full viewport hook.
    #[serde(rename = "useViewport")]
    UseViewport,
    /// A hook that only exposes the layout recompute result.
    #[serde(rename = "useLayoutSnapshot")]
    UseLayoutSnapshot,
}

/// The callback invoked with each admitted viewport change.
///
/// Handlers are compared by identity: two clones of the same `Handler` are
/// equal, two handlers built from identical closures are not.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    /// Wraps a closure receiving the snapshot and the type-erased layout
    /// recompute result, if any.
    pub fn new(f: impl Fn(&Viewport, Option<&dyn Any>) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Wraps a closure that ignores layout results.
    pub fn from_viewport(f: impl Fn(&Viewport) + 'static) -> Self {
        Self::new(move |viewport, _| f(viewport))
    }

    /// Wraps a closure receiving a typed layout result.
    ///
    /// The layout argument is `None` when the listener has no layout callback
    /// or the callback produced a different type.
    pub fn with_layout<T: 'static>(f: impl Fn(&Viewport, Option<&T>) + 'static) -> Self {
        Self::new(move |viewport, layout| f(viewport, layout.and_then(<dyn Any>::downcast_ref)))
    }

    /// Invokes the handler.
    pub fn call(&self, viewport: &Viewport, layout: Option<&dyn Any>) {
        (self.0)(viewport, layout);
    }

    /// Returns `true` if both handles refer to the same closure.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Subscription intent, expressed as live accessors.
///
/// The builder methods taking closures install accessors; the `with_*` and
/// `disable_*` helpers install constant accessors.
pub struct ListenerOptions {
    kind: ListenerKind,
    notify_scroll: Box<dyn Fn() -> bool>,
    notify_dimensions: Box<dyn Fn() -> bool>,
    notify_only_when_idle: Box<dyn Fn() -> bool>,
    priority: Box<dyn Fn() -> Priority>,
    display_name: Box<dyn Fn() -> Option<String>>,
    recalculate_layout: Option<Box<LayoutFn>>,
}

impl ListenerOptions {
    /// Options that react to every change, at normal priority, with no name
    /// and no layout callback.
    #[must_use]
    pub fn new(kind: ListenerKind) -> Self {
        Self {
            kind,
            notify_scroll: Box::new(|| true),
            notify_dimensions: Box::new(|| true),
            notify_only_when_idle: Box::new(|| false),
            priority: Box::new(Priority::default),
            display_name: Box::new(|| None),
            recalculate_layout: None,
        }
    }

    /// Options for a scroll-only subscriber.
    #[must_use]
    pub fn scroll() -> Self {
        Self::new(ListenerKind::UseScroll).disable_dimensions_updates()
    }

    /// Options for a dimensions-only subscriber.
    #[must_use]
    pub fn dimensions() -> Self {
        Self::new(ListenerKind::UseDimensions).disable_scroll_updates()
    }

    /// Options for a subscriber interested in the whole viewport.
    #[must_use]
    pub fn viewport() -> Self {
        Self::new(ListenerKind::UseViewport)
    }

    /// Options for a subscriber that consumes a layout recompute result.
    #[must_use]
    pub fn layout_snapshot<T: 'static>(f: impl Fn(&Viewport) -> T + 'static) -> Self {
        Self::new(ListenerKind::UseLayoutSnapshot).recalculate_layout(f)
    }

    /// Installs the "wants scroll changes" accessor.
    #[must_use]
    pub fn notify_scroll(mut self, f: impl Fn() -> bool + 'static) -> Self {
        self.notify_scroll = Box::new(f);
        self
    }

    /// Installs the "wants dimension changes" accessor.
    #[must_use]
    pub fn notify_dimensions(mut self, f: impl Fn() -> bool + 'static) -> Self {
        self.notify_dimensions = Box::new(f);
        self
    }

    /// Installs the "only notify on idle ticks" accessor.
    #[must_use]
    pub fn notify_only_when_idle(mut self, f: impl Fn() -> bool + 'static) -> Self {
        self.notify_only_when_idle = Box::new(f);
        self
    }

    /// Installs the priority accessor.
    #[must_use]
    pub fn priority(mut self, f: impl Fn() -> Priority + 'static) -> Self {
        self.priority = Box::new(f);
        self
    }

    /// Installs the display name accessor.
    #[must_use]
    pub fn display_name(mut self, f: impl Fn() -> Option<String> + 'static) -> Self {
        self.display_name = Box::new(f);
        self
    }

    /// Installs a layout recompute callback, run under its own timer before
    /// the handler on every admitted tick.
    #[must_use]
    pub fn recalculate_layout<T: 'static>(mut self, f: impl Fn(&Viewport) -> T + 'static) -> Self {
        self.recalculate_layout = Some(Box::new(move |viewport| Box::new(f(viewport))));
        self
    }

    /// Stops reacting to scroll changes.
    #[must_use]
    pub fn disable_scroll_updates(self) -> Self {
        self.notify_scroll(|| false)
    }

    /// Stops reacting to dimension changes.
    #[must_use]
    pub fn disable_dimensions_updates(self) -> Self {
        self.notify_dimensions(|| false)
    }

    /// Only reacts on idle ticks.
    #[must_use]
    pub fn defer_update_until_idle(self) -> Self {
        self.notify_only_when_idle(|| true)
    }

    /// Uses a fixed priority.
    #[must_use]
    pub fn with_priority(self, priority: Priority) -> Self {
        self.priority(move || priority)
    }

    /// Uses a fixed display name.
    #[must_use]
    pub fn with_display_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.display_name(move || Some(name.clone()))
    }

    /// The kind tag.
    #[must_use]
    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Overrides the kind tag.
    #[must_use]
    pub fn with_kind(mut self, kind: ListenerKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Debug for ListenerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerOptions")
            .field("kind", &self.kind)
            .field("has_layout", &self.recalculate_layout.is_some())
            .finish_non_exhaustive()
    }
}

/// Mutable per-listener statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ListenerStats {
    /// Layout and execution cost tracking, including the iteration count.
    pub cost: CostTracker,
    /// Skips since the listener last ran.
    pub skipped_iterations: u32,
    /// Skips over the listener's lifetime.
    pub total_skipped_iterations: u64,
}

/// One active subscription.
pub struct Listener {
    id: ListenerId,
    handler: Handler,
    options: ListenerOptions,
    stats: RefCell<ListenerStats>,
    active: Cell<bool>,
}

impl Listener {
    pub(crate) fn new(id: ListenerId, handler: Handler, options: ListenerOptions) -> Self {
        Self {
            id,
            handler,
            options,
            stats: RefCell::new(ListenerStats::default()),
            active: Cell::new(true),
        }
    }

    /// The listener's id.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The subscription mechanism that created this listener.
    #[must_use]
    pub fn kind(&self) -> ListenerKind {
        self.options.kind
    }

    /// The handler this listener invokes.
    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Current value of the "wants scroll changes" accessor.
    #[must_use]
    pub fn wants_scroll(&self) -> bool {
        (self.options.notify_scroll)()
    }

    /// Current value of the "wants dimension changes" accessor.
    #[must_use]
    pub fn wants_dimensions(&self) -> bool {
        (self.options.notify_dimensions)()
    }

    /// Current value of the "only on idle ticks" accessor.
    #[must_use]
    pub fn only_when_idle(&self) -> bool {
        (self.options.notify_only_when_idle)()
    }

    /// Current value of the priority accessor.
    #[must_use]
    pub fn priority(&self) -> Priority {
        (self.options.priority)()
    }

    /// Current value of the display name accessor.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        (self.options.display_name)()
    }

    /// Returns `true` if the listener has a layout recompute callback.
    #[must_use]
    pub fn has_layout(&self) -> bool {
        self.options.recalculate_layout.is_some()
    }

    /// Returns `false` once the listener has been removed from its registry.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// A copy of the current statistics.
    #[must_use]
    pub fn stats(&self) -> ListenerStats {
        *self.stats.borrow()
    }

    pub(crate) fn update_stats<R>(&self, f: impl FnOnce(&mut ListenerStats) -> R) -> R {
        f(&mut self.stats.borrow_mut())
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }

    pub(crate) fn recalculate_layout(&self, viewport: &Viewport) -> Option<LayoutSnapshot> {
        self.options.recalculate_layout.as_ref().map(|f| f(viewport))
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &self.options.kind)
            .field("active", &self.active.get())
            .field("stats", &self.stats.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_identity() {
        let a = Handler::from_viewport(|_| {});
        let b = Handler::from_viewport(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn accessors_are_live() {
        let priority = Rc::new(Cell::new(Priority::Low));
        let p = Rc::clone(&priority);
        let listener = Listener::new(
            ListenerId(1),
            Handler::from_viewport(|_| {}),
            ListenerOptions::viewport().priority(move || p.get()),
        );
        assert_eq!(listener.priority(), Priority::Low);
        priority.set(Priority::Highest);
        assert_eq!(listener.priority(), Priority::Highest);
    }

    #[test]
    fn typed_layout_reaches_handler() {
        let seen = Rc::new(Cell::new(0_u32));
        let s = Rc::clone(&seen);
        let handler = Handler::with_layout(move |_, layout: Option<&u32>| {
            s.set(layout.copied().unwrap_or(0));
        });
        let listener = Listener::new(
            ListenerId(2),
            handler.clone(),
            ListenerOptions::layout_snapshot(|v: &Viewport| v.dimensions.width as u32),
        );
        let viewport = Viewport {
            dimensions: crate::viewport::Dimensions {
                width: 320.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let layout = listener.recalculate_layout(&viewport);
        handler.call(&viewport, layout.as_deref());
        assert_eq!(seen.get(), 320);
    }

    #[test]
    fn kind_serializes_to_binding_names() {
        let json = serde_json::to_string(&ListenerKind::ConnectViewport).unwrap();
        assert_eq!(json, "\"connectViewport\"");
    }
}
