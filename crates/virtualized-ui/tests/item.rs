use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use virtualized_core::{Dispose, Error, ManualScheduler, Result, View, ViewId, new_view_id};
use virtualized_ui::*;
use web_time::Duration;

/// Window double: heights are set by hand, scrolls are recorded.
#[derive(Default)]
struct FakeWindow {
    scroll_y: Cell<f32>,
    heights: RefCell<HashMap<ViewId, f32>>,
    scrolls: RefCell<Vec<f32>>,
    listeners: Rc<RefCell<Vec<Option<Rc<dyn Fn()>>>>>,
}

impl FakeWindow {
    fn set_height(&self, node: ViewId, h: f32) {
        self.heights.borrow_mut().insert(node, h);
    }

    fn user_scroll(&self, y: f32) {
        self.scroll_y.set(y);
        self.fire();
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().iter().flatten().count()
    }

    fn fire(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self.listeners.borrow().iter().flatten().cloned().collect();
        for l in listeners {
            l();
        }
    }
}

impl Window for FakeWindow {
    fn scroll_y(&self) -> f32 {
        self.scroll_y.get()
    }

    fn scroll_to(&self, y: f32) {
        self.scrolls.borrow_mut().push(y);
        self.scroll_y.set(y);
        self.fire();
    }

    fn add_scroll_listener(&self, listener: Rc<dyn Fn()>) -> Dispose {
        let idx = {
            let mut l = self.listeners.borrow_mut();
            l.push(Some(listener));
            l.len() - 1
        };
        let listeners = self.listeners.clone();
        Dispose::new(move || listeners.borrow_mut()[idx] = None)
    }

    fn measure_height(&self, node: ViewId) -> Result<f32> {
        self.heights
            .borrow()
            .get(&node)
            .copied()
            .ok_or(Error::NoBox(node))
    }
}

struct Harness {
    window: Rc<FakeWindow>,
    proximity: Rc<SyntheticProximity>,
    scheduler: Rc<ManualScheduler>,
    item: VirtualizedItem,
    invalidations: Rc<Cell<u32>>,
}

impl Harness {
    fn new(config: VirtualizedConfig) -> Self {
        Self::with_proximity(config, SyntheticProximity::new())
    }

    fn with_proximity(config: VirtualizedConfig, proximity: SyntheticProximity) -> Self {
        let window = Rc::new(FakeWindow::default());
        let proximity = Rc::new(proximity);
        let scheduler = Rc::new(ManualScheduler::new());
        let body = new_view_id();
        let item = VirtualizedItem::mount(
            config,
            Rc::new(move || View::text(body, "row")),
            ItemEnv {
                window: window.clone(),
                proximity: proximity.clone(),
                scheduler: scheduler.clone(),
            },
        );
        let invalidations = Rc::new(Cell::new(0));
        {
            let invalidations = invalidations.clone();
            item.on_invalidate(move || invalidations.set(invalidations.get() + 1));
        }
        Self {
            window,
            proximity,
            scheduler,
            item,
            invalidations,
        }
    }

    /// render + commit, as a host would after layout.
    fn pass(&self) -> View {
        let view = self.item.render();
        self.item.commit();
        view
    }

    fn emit(&self, intersecting: bool) {
        self.proximity.emit(self.item.root_id(), intersecting);
    }

    fn advance_ms(&self, ms: u64) {
        self.scheduler.advance(Duration::from_millis(ms));
    }
}

fn placeholder_of(view: &View) -> &View {
    assert_eq!(view.children.len(), 1);
    &view.children[0]
}

#[test]
fn placeholder_uses_default_height_before_any_signal() {
    let h = Harness::new(VirtualizedConfig::new().default_height(300.0));
    let view = h.pass();

    assert_eq!(view.tag(), Some("div"));
    assert_eq!(view.modifier.class.as_deref(), Some("virtualized"));
    let placeholder = placeholder_of(&view);
    assert_eq!(placeholder.id, h.item.placeholder_id());
    assert_eq!(placeholder.modifier.height, Some(300.0));
    assert_eq!(
        placeholder.modifier.class.as_deref(),
        Some("virtualized-placeholder")
    );
    assert!(placeholder.children.is_empty());
    assert_eq!(h.item.rendered(), Some(RenderDecision::Placeholder));
    assert!(h.item.is_subscribed());
}

#[test]
fn settled_enter_renders_content_and_compensates_scroll() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    h.window.user_scroll(1000.0);
    h.scheduler.run_frame();
    assert!(!h.item.is_scrolling());
    assert_eq!(h.item.last_scroll_y(), 1000.0);

    h.emit(true);
    h.advance_ms(99);
    assert_eq!(h.item.decision(), RenderDecision::Placeholder);
    assert_eq!(h.invalidations.get(), 0);

    h.advance_ms(1);
    assert!(h.item.visibility().is_visible);
    assert_eq!(h.invalidations.get(), 1);

    h.window.set_height(h.item.content_id(), 450.0);
    let view = h.pass();
    let content = placeholder_of(&view);
    assert_eq!(content.id, h.item.content_id());
    assert_eq!(content.modifier.min_height, Some(300.0));
    assert_eq!(content.children.len(), 1);

    assert_eq!(*h.window.scrolls.borrow(), vec![1150.0]);
    assert_eq!(h.item.height(), 450.0);
    assert_eq!(h.item.stats().compensations, 1);

    // Next render reserves the measured height.
    let view = h.pass();
    assert_eq!(placeholder_of(&view).modifier.min_height, Some(450.0));
    assert_eq!(h.window.scrolls.borrow().len(), 1);
}

#[test]
fn stay_rendered_keeps_content_after_leaving() {
    let h = Harness::new(VirtualizedConfig::new().stay_rendered(true));
    h.pass();
    h.emit(true);
    h.advance_ms(100);
    h.window.set_height(h.item.content_id(), 300.0);
    h.pass();

    h.emit(false);
    h.advance_ms(100);
    let state = h.item.visibility();
    assert!(!state.is_visible);
    assert!(state.was_ever_visible);
    assert_eq!(h.item.decision(), RenderDecision::Rendered);
    assert_eq!(h.pass().children[0].id, h.item.content_id());
}

#[test]
fn quick_exit_then_enter_never_shows_placeholder() {
    let h = Harness::new(VirtualizedConfig::new().initial_visible(true));
    h.window.set_height(h.item.content_id(), 300.0);
    h.pass();
    assert_eq!(h.item.rendered(), Some(RenderDecision::Rendered));

    h.emit(false);
    h.advance_ms(50);
    h.emit(true);
    // Past the first signal's deadline: it was superseded.
    h.advance_ms(60);
    assert!(h.item.visibility().is_visible);
    assert_eq!(h.item.decision(), RenderDecision::Rendered);
    h.advance_ms(100);
    assert!(h.item.visibility().is_visible);
    assert_eq!(h.invalidations.get(), 0);
    assert_eq!(h.item.stats().flips, 0);
    assert_eq!(h.item.stats().placeholder_renders, 0);
}

#[test]
fn sub_pixel_change_is_ignored() {
    let h = Harness::new(VirtualizedConfig::new().initial_visible(true));
    h.window.set_height(h.item.content_id(), 300.5);
    h.pass();

    assert!(h.window.scrolls.borrow().is_empty());
    assert_eq!(h.item.height(), 300.0);
    assert_eq!(h.item.stats().compensations, 0);
    assert_eq!(h.item.stats().height_writes, 0);
}

#[test]
fn burst_of_signals_applies_only_the_last() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    for (i, v) in [true, false, true, false, true].into_iter().enumerate() {
        if i > 0 {
            h.advance_ms(20);
        }
        h.emit(v);
    }
    assert!(h.item.has_pending_flip());
    h.advance_ms(99);
    assert!(!h.item.visibility().is_visible);
    h.advance_ms(1);
    assert!(h.item.visibility().is_visible);
    assert_eq!(h.item.stats().flips, 1);
    assert_eq!(h.item.stats().signals, 5);
}

#[test]
fn burst_ending_in_exit_leaves_state_untouched() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    h.emit(true);
    h.advance_ms(40);
    h.emit(false);
    h.advance_ms(200);
    assert!(!h.item.visibility().is_visible);
    assert!(!h.item.visibility().was_ever_visible);
    assert_eq!(h.invalidations.get(), 0);
}

#[test]
fn was_ever_visible_is_sticky() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    h.emit(true);
    h.advance_ms(100);
    for v in [false, true, false, false] {
        h.emit(v);
        h.advance_ms(150);
        assert!(h.item.visibility().was_ever_visible);
    }
    assert!(!h.item.visibility().is_visible);
    assert_eq!(h.item.decision(), RenderDecision::Placeholder);
}

#[test]
fn exit_snapshots_content_height_for_the_placeholder() {
    let h = Harness::new(VirtualizedConfig::new().initial_visible(true));
    h.window.set_height(h.item.content_id(), 300.0);
    h.pass();

    // Content grew on its own while visible; the exit snapshot catches it.
    h.window.set_height(h.item.content_id(), 640.0);
    h.emit(false);
    assert_eq!(h.item.height(), 640.0);
    h.advance_ms(100);

    let view = h.pass();
    let placeholder = placeholder_of(&view);
    assert_eq!(placeholder.id, h.item.placeholder_id());
    assert_eq!(placeholder.modifier.height, Some(640.0));
}

#[test]
fn exit_during_layout_snapshots_freshly_rendered_content() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    h.emit(true);
    h.advance_ms(100);

    // Content is rendered and laid out, but the exit arrives before commit.
    let view = h.item.render();
    assert!(view.find(h.item.content_id()).is_some());
    h.window.set_height(h.item.content_id(), 520.0);
    h.emit(false);
    assert_eq!(h.item.height(), 520.0);

    h.item.commit();
    h.advance_ms(100);
    let view = h.pass();
    assert_eq!(placeholder_of(&view).modifier.height, Some(520.0));
}

#[test]
fn repeated_identical_signals_do_not_compensate_again() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    h.emit(true);
    h.advance_ms(100);
    h.window.set_height(h.item.content_id(), 500.0);
    h.pass();
    let before = h.item.stats();
    assert_eq!(before.compensations, 1);

    for _ in 0..3 {
        h.emit(true);
        h.advance_ms(100);
        h.pass();
    }
    let after = h.item.stats();
    assert_eq!(after.compensations, 1);
    assert_eq!(after.height_writes, before.height_writes);
    assert_eq!(h.window.scrolls.borrow().len(), 1);
}

#[test]
fn zero_measurement_skips_compensation() {
    let h = Harness::new(VirtualizedConfig::new().initial_visible(true));
    h.window.set_height(h.item.content_id(), 0.0);
    h.pass();
    assert!(h.window.scrolls.borrow().is_empty());
    assert_eq!(h.item.height(), 300.0);

    // Unmeasurable content behaves the same.
    h.window.heights.borrow_mut().clear();
    h.pass();
    assert!(h.window.scrolls.borrow().is_empty());
}

#[test]
fn scrolling_keeps_content_until_the_next_frame() {
    let h = Harness::new(VirtualizedConfig::new().initial_visible(true));
    h.window.set_height(h.item.content_id(), 300.0);
    h.pass();

    h.window.user_scroll(40.0);
    h.emit(false);
    h.advance_ms(100);
    assert!(!h.item.visibility().is_visible);
    assert!(h.item.is_scrolling());
    assert_eq!(h.item.decision(), RenderDecision::Rendered);
    let invalidations = h.invalidations.get();

    h.scheduler.run_frame();
    assert!(!h.item.is_scrolling());
    assert_eq!(h.item.decision(), RenderDecision::Placeholder);
    assert_eq!(h.invalidations.get(), invalidations + 1);
}

#[test]
fn scroll_start_does_not_mount_a_placeholder_item() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    h.window.user_scroll(200.0);
    assert!(h.item.is_scrolling());
    assert_eq!(h.invalidations.get(), 0);
    assert_eq!(h.item.rendered(), Some(RenderDecision::Placeholder));
}

#[test]
fn unmount_releases_everything() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    assert_eq!(h.proximity.active(), 1);
    assert_eq!(h.window.listener_count(), 1);

    h.window.user_scroll(10.0);
    h.emit(true);
    assert_eq!(h.scheduler.pending_timeouts(), 1);
    assert_eq!(h.scheduler.pending_frames(), 1);

    h.item.unmount();
    assert!(!h.item.is_mounted());
    assert_eq!(h.proximity.active(), 0);
    assert_eq!(h.window.listener_count(), 0);
    assert_eq!(h.scheduler.pending_timeouts(), 0);
    assert_eq!(h.scheduler.pending_frames(), 0);

    assert_eq!(h.proximity.emit(h.item.root_id(), true), 0);
    h.advance_ms(500);
    assert!(!h.item.visibility().is_visible);
    h.item.commit();
    assert!(!h.item.is_subscribed());
}

#[test]
fn dropping_the_item_unmounts_it() {
    let h = Harness::new(VirtualizedConfig::new());
    h.pass();
    let Harness {
        window,
        proximity,
        item,
        ..
    } = h;
    drop(item);
    assert_eq!(proximity.active(), 0);
    assert_eq!(window.listener_count(), 0);
}

#[test]
fn unavailable_proximity_degrades_to_content() {
    let h = Harness::with_proximity(VirtualizedConfig::new(), SyntheticProximity::unavailable());
    h.pass();
    assert!(h.item.is_degraded());
    assert!(!h.item.is_subscribed());
    assert!(h.item.visibility().is_visible);
    assert_eq!(h.invalidations.get(), 1);
    assert_eq!(h.item.decision(), RenderDecision::Rendered);
}

#[test]
fn options_reach_the_proximity_source() {
    let h = Harness::new(
        VirtualizedConfig::new()
            .visible_offset(250.0)
            .root(ProximityRoot::Node(7)),
    );
    h.pass();
    let options = h.proximity.options_for(h.item.root_id()).unwrap();
    assert_eq!(options.margin, 250.0);
    assert_eq!(options.root, ProximityRoot::Node(7));

    // One subscription per mount, however many commits.
    h.pass();
    h.pass();
    assert_eq!(h.proximity.active(), 1);
}

#[test]
fn element_overrides_apply_to_root_and_placeholder() {
    let h = Harness::new(
        VirtualizedConfig::new()
            .root_element("li", "feed-row")
            .placeholder_element("section", "skeleton"),
    );
    let view = h.pass();
    assert_eq!(view.tag(), Some("li"));
    assert_eq!(view.modifier.class.as_deref(), Some("virtualized feed-row"));
    let placeholder = placeholder_of(&view);
    assert_eq!(placeholder.tag(), Some("section"));
    assert_eq!(
        placeholder.modifier.class.as_deref(),
        Some("virtualized-placeholder skeleton")
    );
}

#[test]
fn negative_default_height_is_clamped() {
    let h = Harness::new(VirtualizedConfig::new().default_height(-20.0));
    let view = h.pass();
    assert_eq!(placeholder_of(&view).modifier.height, Some(0.0));
    assert_eq!(h.item.height(), 0.0);
}

/// Source that ignores disposal and keeps every callback it was handed.
#[derive(Default)]
struct RetainingProximity {
    callbacks: RefCell<Vec<ProximityCallback>>,
}

impl RetainingProximity {
    fn deliver(&self, intersecting: bool) {
        let callbacks = self.callbacks.borrow().clone();
        for cb in callbacks {
            cb(intersecting);
        }
    }
}

impl ProximitySource for RetainingProximity {
    fn observe(
        &self,
        _sentinel: ViewId,
        _options: ProximityOptions,
        on_change: ProximityCallback,
    ) -> Result<Dispose> {
        self.callbacks.borrow_mut().push(on_change);
        Ok(Dispose::noop())
    }
}

#[test]
fn watcher_drops_signals_after_disconnect() {
    let source = Rc::new(RetainingProximity::default());
    let watcher = ProximityWatcher::new(
        source.clone(),
        ProximityOptions {
            root: ProximityRoot::Viewport,
            margin: 0.0,
        },
    );
    let seen = Rc::new(Cell::new(0));
    let counter = seen.clone();
    let outcome = watcher.connect(
        new_view_id(),
        Rc::new(move |_: bool| counter.set(counter.get() + 1)),
    );
    assert_eq!(outcome, Connection::Connected);

    source.deliver(true);
    assert_eq!(seen.get(), 1);

    watcher.disconnect();
    assert!(!watcher.is_connected());
    source.deliver(false);
    assert_eq!(seen.get(), 1);
    assert_eq!(
        watcher.connect(new_view_id(), Rc::new(|_: bool| {})),
        Connection::Unavailable
    );
}

#[test]
fn unmounted_item_ignores_late_signals() {
    let window = Rc::new(FakeWindow::default());
    let source = Rc::new(RetainingProximity::default());
    let scheduler = Rc::new(ManualScheduler::new());
    let body = new_view_id();
    let item = VirtualizedItem::mount(
        VirtualizedConfig::new(),
        Rc::new(move || View::text(body, "row")),
        ItemEnv {
            window,
            proximity: source.clone(),
            scheduler: scheduler.clone(),
        },
    );
    item.render();
    item.commit();
    source.deliver(true);
    assert_eq!(item.stats().signals, 1);

    item.unmount();
    source.deliver(false);
    assert_eq!(item.stats().signals, 1);
    assert!(!item.has_pending_flip());
    assert_eq!(scheduler.pending_timeouts(), 0);
}
