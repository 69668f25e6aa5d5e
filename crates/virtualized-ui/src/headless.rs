//! # Headless host
//!
//! A geometric stand-in for a browser document, for tests, demos, and
//! non-browser embedders:
//!
//! - [`HeadlessWindow`] lays views out top to bottom, keeps a viewport and a
//!   scroll offset, fires scroll listeners, and answers proximity queries by
//!   intersecting laid-out boxes with the (inflated) viewport.
//! - [`HeadlessFeed`] owns a column of [`VirtualizedItem`]s on top of a
//!   `HeadlessWindow` and a [`ManualScheduler`], and runs the
//!   render → layout → commit loop until nothing is invalidated.
//!
//! Layout is deliberately simple: a node's height is its fixed `height`, or
//! the sum of its children (text leaves count one line), raised to its
//! `min_height`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};
use virtualized_core::{
    Dispose, Error, ManualScheduler, Rect, Result, View, ViewId, ViewKind,
};
use web_time::Duration;

use crate::config::VirtualizedConfig;
use crate::decision::RenderDecision;
use crate::item::{Children, ItemEnv, VirtualizedItem};
use crate::proximity::{ProximityCallback, ProximityOptions, ProximityRoot, ProximitySource};
use crate::window::Window;

pub const LINE_HEIGHT: f32 = 20.0;
const MAX_PASSES: usize = 8;

new_key_type! {
    struct ListenerKey;
    struct ObserverKey;
}

struct Observer {
    sentinel: ViewId,
    options: ProximityOptions,
    last: Option<bool>,
    on_change: ProximityCallback,
}

struct Doc {
    width: f32,
    height: f32,
    scroll_y: f32,
    document_height: f32,
    boxes: HashMap<ViewId, Rect>,
    listeners: SlotMap<ListenerKey, Rc<dyn Fn()>>,
    observers: SlotMap<ObserverKey, Observer>,
    scroll_events: u64,
}

impl Doc {
    fn max_scroll(&self) -> f32 {
        (self.document_height - self.height).max(0.0)
    }

    fn intersects(&self, sentinel: ViewId, options: &ProximityOptions) -> bool {
        let root = match options.root {
            ProximityRoot::Viewport => Some(Rect::new(0.0, self.scroll_y, self.width, self.height)),
            ProximityRoot::Node(id) => self.boxes.get(&id).copied(),
        };
        match (root, self.boxes.get(&sentinel)) {
            (Some(root), Some(target)) => target.overlaps_y(&root.inflate_y(options.margin)),
            _ => false,
        }
    }
}

pub struct HeadlessWindow {
    doc: Rc<RefCell<Doc>>,
}

impl HeadlessWindow {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            doc: Rc::new(RefCell::new(Doc {
                width,
                height,
                scroll_y: 0.0,
                document_height: 0.0,
                boxes: HashMap::new(),
                listeners: SlotMap::with_key(),
                observers: SlotMap::with_key(),
                scroll_events: 0,
            })),
        }
    }

    pub fn viewport(&self) -> Rect {
        let doc = self.doc.borrow();
        Rect::new(0.0, doc.scroll_y, doc.width, doc.height)
    }

    pub fn document_height(&self) -> f32 {
        self.doc.borrow().document_height
    }

    pub fn rect_of(&self, node: ViewId) -> Option<Rect> {
        self.doc.borrow().boxes.get(&node).copied()
    }

    pub fn scroll_events(&self) -> u64 {
        self.doc.borrow().scroll_events
    }

    pub fn observer_count(&self) -> usize {
        self.doc.borrow().observers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.doc.borrow().listeners.len()
    }

    /// Replaces the document with `roots` stacked vertically, then delivers
    /// any proximity changes the new layout causes.
    ///
    /// A document that shrinks below the current offset pulls the scroll back,
    /// which counts as a scroll event.
    pub fn layout(&self, roots: &[View]) {
        let listeners: Vec<Rc<dyn Fn()>> = {
            let mut doc = self.doc.borrow_mut();
            let width = doc.width;
            doc.boxes.clear();
            let mut y = 0.0;
            for root in roots {
                y += place(root, y, width, &mut doc.boxes);
            }
            doc.document_height = y;
            let max = doc.max_scroll();
            if doc.scroll_y > max {
                log::debug!("layout clamped scroll {} -> {max}", doc.scroll_y);
                doc.scroll_y = max;
                doc.scroll_events += 1;
                doc.listeners.values().cloned().collect()
            } else {
                Vec::new()
            }
        };
        for listener in listeners {
            listener();
        }
        self.refresh();
    }

    /// Re-runs intersection for every observer, notifying those whose answer
    /// changed (or that have not been answered yet).
    pub fn refresh(&self) {
        let pending: Vec<(ProximityCallback, bool)> = {
            let mut doc = self.doc.borrow_mut();
            let answers: Vec<(ObserverKey, bool)> = doc
                .observers
                .iter()
                .map(|(k, o)| (k, doc.intersects(o.sentinel, &o.options)))
                .collect();
            answers
                .into_iter()
                .filter_map(|(k, now)| {
                    let o = doc.observers.get_mut(k)?;
                    if o.last == Some(now) {
                        return None;
                    }
                    o.last = Some(now);
                    Some((o.on_change.clone(), now))
                })
                .collect()
        };
        for (cb, intersecting) in pending {
            cb(intersecting);
        }
    }
}

fn place(view: &View, y: f32, width: f32, boxes: &mut HashMap<ViewId, Rect>) -> f32 {
    let mut cursor = y;
    for child in &view.children {
        cursor += place(child, cursor, width, boxes);
    }
    let intrinsic = match view.kind {
        ViewKind::Text(_) if view.children.is_empty() => LINE_HEIGHT,
        _ => cursor - y,
    };
    let mut h = view.modifier.height.unwrap_or(intrinsic);
    if let Some(min) = view.modifier.min_height {
        h = h.max(min);
    }
    boxes.insert(view.id, Rect::new(0.0, y, width, h));
    h
}

impl Window for HeadlessWindow {
    fn scroll_y(&self) -> f32 {
        self.doc.borrow().scroll_y
    }

    fn scroll_to(&self, y: f32) {
        let listeners: Vec<Rc<dyn Fn()>> = {
            let mut doc = self.doc.borrow_mut();
            let y = y.clamp(0.0, doc.max_scroll());
            if y == doc.scroll_y {
                return;
            }
            doc.scroll_y = y;
            doc.scroll_events += 1;
            doc.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener();
        }
        self.refresh();
    }

    fn add_scroll_listener(&self, listener: Rc<dyn Fn()>) -> Dispose {
        let key = self.doc.borrow_mut().listeners.insert(listener);
        let doc: Weak<RefCell<Doc>> = Rc::downgrade(&self.doc);
        Dispose::new(move || {
            if let Some(doc) = doc.upgrade() {
                doc.borrow_mut().listeners.remove(key);
            }
        })
    }

    fn measure_height(&self, node: ViewId) -> Result<f32> {
        self.rect_of(node).map(|r| r.h).ok_or(Error::NoBox(node))
    }
}

impl ProximitySource for HeadlessWindow {
    fn observe(
        &self,
        sentinel: ViewId,
        options: ProximityOptions,
        on_change: ProximityCallback,
    ) -> Result<Dispose> {
        let key = {
            let mut doc = self.doc.borrow_mut();
            if !doc.boxes.contains_key(&sentinel) {
                return Err(Error::Detached(sentinel));
            }
            if let ProximityRoot::Node(root) = options.root {
                if !doc.boxes.contains_key(&root) {
                    return Err(Error::Detached(root));
                }
            }
            doc.observers.insert(Observer {
                sentinel,
                options,
                last: None,
                on_change,
            })
        };
        // Like the browser primitive, report the initial state right away.
        self.refresh();

        let doc: Weak<RefCell<Doc>> = Rc::downgrade(&self.doc);
        Ok(Dispose::new(move || {
            if let Some(doc) = doc.upgrade() {
                doc.borrow_mut().observers.remove(key);
            }
        }))
    }
}

struct Slot {
    item: VirtualizedItem,
    view: Option<View>,
    dirty: Rc<Cell<bool>>,
}

/// A column of virtualized items on a headless document.
pub struct HeadlessFeed {
    window: Rc<HeadlessWindow>,
    scheduler: Rc<ManualScheduler>,
    header: Option<View>,
    slots: Vec<Slot>,
}

impl HeadlessFeed {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            window: Rc::new(HeadlessWindow::new(width, height)),
            scheduler: Rc::new(ManualScheduler::new()),
            header: None,
            slots: Vec::new(),
        }
    }

    pub fn env(&self) -> ItemEnv {
        ItemEnv {
            window: self.window.clone(),
            proximity: self.window.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    pub fn window(&self) -> &HeadlessWindow {
        &self.window
    }

    pub fn scheduler(&self) -> &ManualScheduler {
        &self.scheduler
    }

    /// Static content laid out above the items.
    pub fn set_header(&mut self, header: Option<View>) {
        self.header = header;
    }

    pub fn push(&mut self, config: VirtualizedConfig, children: Children) -> usize {
        let item = VirtualizedItem::mount(config, children, self.env());
        let dirty = Rc::new(Cell::new(true));
        {
            let dirty = dirty.clone();
            item.on_invalidate(move || dirty.set(true));
        }
        self.slots.push(Slot {
            item,
            view: None,
            dirty,
        });
        self.slots.len() - 1
    }

    /// Unmounts and removes item `index`.
    pub fn remove(&mut self, index: usize) {
        let slot = self.slots.remove(index);
        slot.item.unmount();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn item(&self, index: usize) -> &VirtualizedItem {
        &self.slots[index].item
    }

    pub fn items(&self) -> impl Iterator<Item = &VirtualizedItem> {
        self.slots.iter().map(|s| &s.item)
    }

    /// Items currently showing real content.
    pub fn rendered_count(&self) -> usize {
        self.items()
            .filter(|i| i.rendered().is_some_and(RenderDecision::is_rendered))
            .count()
    }

    /// Render → layout → commit until no item is invalidated. Returns the
    /// number of passes.
    pub fn pump(&mut self) -> usize {
        for pass in 0..MAX_PASSES {
            for slot in &mut self.slots {
                if slot.dirty.replace(false) || slot.view.is_none() {
                    slot.view = Some(slot.item.render());
                }
            }

            let views: Vec<View> = self
                .header
                .iter()
                .cloned()
                .chain(self.slots.iter().filter_map(|s| s.view.clone()))
                .collect();
            self.window.layout(&views);

            for slot in &self.slots {
                slot.item.commit();
            }

            if !self.slots.iter().any(|s| s.dirty.get()) {
                return pass + 1;
            }
        }
        log::warn!("headless feed did not settle after {MAX_PASSES} passes");
        MAX_PASSES
    }

    pub fn scroll_to(&mut self, y: f32) {
        self.window.scroll_to(y);
        self.pump();
    }

    pub fn advance(&mut self, by: Duration) {
        self.scheduler.advance(by);
        self.pump();
    }

    pub fn frame(&mut self) {
        self.scheduler.run_frame();
        self.pump();
    }
}
