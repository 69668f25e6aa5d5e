use std::cell::Cell;
use std::rc::{Rc, Weak};

use virtualized_core::{
    Modifier, Scheduler, Scope, Signal, SubId, View, ViewId, effect, new_view_id, on_unmount,
    scoped_effect, signal,
};

use crate::config::VirtualizedConfig;
use crate::decision::RenderDecision;
use crate::height::HeightMemory;
use crate::proximity::{Connection, ProximityOptions, ProximitySource, ProximityWatcher};
use crate::scroll::{ScrollCompensator, ScrollTracker};
use crate::visibility::{DebouncedVisibility, VisibilityState};
use crate::window::Window;

/// Host capabilities an item runs against.
#[derive(Clone)]
pub struct ItemEnv {
    pub window: Rc<dyn Window>,
    pub proximity: Rc<dyn ProximitySource>,
    pub scheduler: Rc<dyn Scheduler>,
}

pub type Children = Rc<dyn Fn() -> View>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemStats {
    /// Raw proximity signals received.
    pub signals: u64,
    /// Debounced visibility changes.
    pub flips: u64,
    pub content_renders: u64,
    pub placeholder_renders: u64,
    pub compensations: u64,
    pub height_writes: u64,
}

/// One virtualized item.
///
/// The host drives it in two steps per pass: [`render`](Self::render) builds
/// the subtree, the host lays it out, then [`commit`](Self::commit) runs the
/// post-layout work (subscribing the sentinel, measuring, compensating).
/// Listeners registered with [`on_invalidate`](Self::on_invalidate) are told
/// when the item wants another pass.
///
/// Dropping the item unmounts it.
pub struct VirtualizedItem {
    inner: Rc<ItemInner>,
}

struct ItemInner {
    config: VirtualizedConfig,
    env: ItemEnv,
    children: Children,
    root_id: ViewId,
    content_id: ViewId,
    placeholder_id: ViewId,
    visibility: Rc<DebouncedVisibility>,
    height: HeightMemory,
    scroll: Rc<ScrollTracker>,
    compensator: ScrollCompensator,
    watcher: Rc<ProximityWatcher>,
    scope: Scope,
    rendered: Cell<Option<RenderDecision>>,
    committed: Cell<Option<RenderDecision>>,
    degraded: Cell<bool>,
    invalidated: Signal<u64>,
    stats: Cell<ItemStats>,
}

impl VirtualizedItem {
    pub fn mount(config: VirtualizedConfig, children: Children, env: ItemEnv) -> Self {
        let config = config.sanitized();
        let visibility = DebouncedVisibility::new(
            config.initial_visible,
            env.scheduler.clone(),
            config.settle_delay,
        );
        let scroll = ScrollTracker::new(env.window.scroll_y(), env.scheduler.clone());
        let watcher = Rc::new(ProximityWatcher::new(
            env.proximity.clone(),
            ProximityOptions {
                root: config.root,
                margin: config.visible_offset,
            },
        ));

        let inner = Rc::new(ItemInner {
            height: HeightMemory::new(config.default_height),
            compensator: ScrollCompensator::new(config.height_epsilon),
            root_id: new_view_id(),
            content_id: new_view_id(),
            placeholder_id: new_view_id(),
            config,
            env,
            children,
            visibility,
            scroll,
            watcher,
            scope: Scope::new(),
            rendered: Cell::new(None),
            committed: Cell::new(None),
            degraded: Cell::new(false),
            invalidated: signal(0),
            stats: Cell::new(ItemStats::default()),
        });
        inner.install();

        log::debug!(
            "mounted item {} (visible={}, height={}px)",
            inner.root_id,
            inner.config.initial_visible,
            inner.height.get()
        );
        Self { inner }
    }

    pub fn config(&self) -> &VirtualizedConfig {
        &self.inner.config
    }

    /// The outer node; it doubles as the proximity sentinel.
    pub fn root_id(&self) -> ViewId {
        self.inner.root_id
    }

    /// Wrapper around the real children, present only while rendered.
    pub fn content_id(&self) -> ViewId {
        self.inner.content_id
    }

    pub fn placeholder_id(&self) -> ViewId {
        self.inner.placeholder_id
    }

    pub fn visibility(&self) -> VisibilityState {
        self.inner.visibility.state()
    }

    pub fn decision(&self) -> RenderDecision {
        self.inner.evaluate()
    }

    /// Decision used by the most recent [`render`](Self::render).
    pub fn rendered(&self) -> Option<RenderDecision> {
        self.inner.rendered.get()
    }

    pub fn height(&self) -> f32 {
        self.inner.height.get()
    }

    pub fn last_scroll_y(&self) -> f32 {
        self.inner.scroll.last_scroll_y()
    }

    pub fn is_scrolling(&self) -> bool {
        self.inner.scroll.is_scrolling()
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.watcher.is_connected()
    }

    pub fn has_pending_flip(&self) -> bool {
        self.inner.visibility.is_pending()
    }

    /// True once the proximity source refused to watch; content then stays
    /// rendered.
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.get()
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.scope.is_disposed()
    }

    pub fn stats(&self) -> ItemStats {
        let mut stats = self.inner.stats.get();
        stats.flips = self.inner.visibility.flips();
        stats.height_writes = self.inner.height.writes();
        stats
    }

    /// `f` runs whenever the render decision may have changed since the last
    /// render.
    pub fn on_invalidate(&self, f: impl Fn() + 'static) -> SubId {
        self.inner.invalidated.subscribe(move |_| f())
    }

    pub fn render(&self) -> View {
        self.inner.render()
    }

    pub fn commit(&self) {
        self.inner.commit()
    }

    /// Releases the subscription, the pending flip, the scroll listener, and
    /// the pending frame reset. Idempotent.
    pub fn unmount(&self) {
        if self.inner.scope.is_disposed() {
            return;
        }
        log::debug!("unmounting item {}", self.inner.root_id);
        self.inner.scope.clone().dispose();
    }
}

impl Drop for VirtualizedItem {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl ItemInner {
    fn install(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);

        self.scope.run(|| {
            scoped_effect({
                let weak = weak.clone();
                let window = self.env.window.clone();
                move || {
                    let listener = window.add_scroll_listener(Rc::new(move || {
                        if let Some(inner) = live(&weak) {
                            inner.on_scroll();
                        }
                    }));
                    let cleanup: Box<dyn FnOnce()> = Box::new(move || listener.run());
                    cleanup
                }
            });

            effect({
                let weak = weak.clone();
                let visibility = self.visibility.clone();
                move || {
                    let id = visibility.signal().subscribe(move |_| {
                        if let Some(inner) = live(&weak) {
                            inner.invalidate_if_changed();
                        }
                    });
                    on_unmount(move || visibility.signal().unsubscribe(id))
                }
            });

            // Only the falling edge re-evaluates: the flag may keep content
            // alive through a gesture but never mounts it on its own.
            effect({
                let weak = weak.clone();
                let scroll = self.scroll.clone();
                move || {
                    let id = scroll.scrolling_signal().subscribe(move |scrolling| {
                        if *scrolling {
                            return;
                        }
                        if let Some(inner) = live(&weak) {
                            inner.invalidate_if_changed();
                        }
                    });
                    on_unmount(move || scroll.scrolling_signal().unsubscribe(id))
                }
            });
        });

        let watcher = self.watcher.clone();
        let visibility = self.visibility.clone();
        let scroll = self.scroll.clone();
        self.scope.add_disposer(move || {
            watcher.disconnect();
            visibility.cancel_pending();
            scroll.cancel_frame();
        });
    }

    fn evaluate(&self) -> RenderDecision {
        RenderDecision::evaluate(
            self.visibility.state(),
            self.config.stay_rendered,
            self.scroll.is_scrolling(),
        )
    }

    fn invalidate_if_changed(&self) {
        let next = self.evaluate();
        if self.rendered.get() != Some(next) {
            log::trace!("item {}: invalidated ({next:?})", self.root_id);
            self.invalidated.update(|g| *g += 1);
        }
    }

    fn bump(&self, f: impl FnOnce(&mut ItemStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn render(&self) -> View {
        let decision = self.evaluate();
        if self.rendered.replace(Some(decision)) != Some(decision) {
            match decision {
                RenderDecision::Rendered => self.bump(|s| s.content_renders += 1),
                RenderDecision::Placeholder => self.bump(|s| s.placeholder_renders += 1),
            }
        }

        let height = self.height.get();
        let body = match decision {
            RenderDecision::Rendered => View::element(self.content_id, "div")
                .modifier(Modifier::new().min_height(height))
                .child((self.children)()),
            RenderDecision::Placeholder => {
                View::element(self.placeholder_id, self.config.placeholder_element.as_str())
                    .modifier(
                        Modifier::new()
                            .class(self.config.placeholder_classes())
                            .height(height),
                    )
            }
        };

        View::element(self.root_id, self.config.root_element.as_str())
            .modifier(Modifier::new().class(self.config.root_classes()))
            .child(body)
    }

    fn commit(self: &Rc<Self>) {
        if self.scope.is_disposed() {
            return;
        }
        self.committed.set(self.rendered.get());
        self.ensure_subscribed();

        let rendered = self.committed.get().is_some_and(RenderDecision::is_rendered);
        if rendered && self.visibility.state().is_visible {
            let applied = self.compensator.compensate(
                self.env.window.as_ref(),
                &self.scroll,
                &self.height,
                self.content_id,
            );
            if applied.is_some() {
                self.bump(|s| s.compensations += 1);
            }
        }
    }

    fn ensure_subscribed(self: &Rc<Self>) {
        if self.watcher.is_connected() || self.degraded.get() {
            return;
        }
        let weak = Rc::downgrade(self);
        let outcome = self.watcher.connect(
            self.root_id,
            Rc::new(move |intersecting| {
                if let Some(inner) = live(&weak) {
                    inner.on_proximity(intersecting);
                }
            }),
        );
        if outcome == Connection::Unavailable {
            // Without proximity signals the only safe choice is real content.
            log::warn!("item {}: proximity unavailable; rendering content", self.root_id);
            self.degraded.set(true);
            self.visibility.force_visible();
        }
    }

    fn on_proximity(&self, intersecting: bool) {
        self.bump(|s| s.signals += 1);
        log::debug!("item {}: near viewport = {intersecting}", self.root_id);

        // The content is still mounted at this point; capture its height
        // before the placeholder replaces it.
        if !intersecting && self.rendered.get().is_some_and(RenderDecision::is_rendered) {
            match self.env.window.measure_height(self.content_id) {
                Ok(h) => {
                    self.height.record(h);
                }
                Err(e) => log::debug!("item {}: no height snapshot: {e}", self.root_id),
            }
        }

        self.visibility.schedule(intersecting);
    }

    fn on_scroll(&self) {
        let y = self.env.window.scroll_y();
        log::trace!("item {}: scroll {y}", self.root_id);
        self.scroll.record(y);
    }
}

fn live(weak: &Weak<ItemInner>) -> Option<Rc<ItemInner>> {
    weak.upgrade().filter(|inner| !inner.scope.is_disposed())
}
