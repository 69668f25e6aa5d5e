//! # Proximity watching
//!
//! A [`ProximitySource`] is the host's "is this node near the viewport?"
//! primitive (an `IntersectionObserver` on the web). The contract is narrow:
//!
//! - `observe` starts watching one sentinel node and returns a [`Dispose`]
//!   that releases the subscription.
//! - The callback receives `true` while the sentinel overlaps the root box
//!   grown by `margin` above and below, and `false` otherwise. Any non-zero
//!   overlap counts.
//! - A sentinel that is not attached yet is reported as
//!   [`Error::Detached`]; the caller retries later.
//!
//! [`ProximityWatcher`] owns the one subscription a mounted item is allowed
//! and gates delivery so nothing arrives after [`ProximityWatcher::disconnect`].
//! [`SyntheticProximity`] is a hand-driven source for tests and non-browser
//! hosts.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use virtualized_core::{Dispose, Error, Result, ViewId};

/// Box the margin is applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProximityRoot {
    #[default]
    Viewport,
    Node(ViewId),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProximityOptions {
    pub root: ProximityRoot,
    pub margin: f32,
}

pub type ProximityCallback = Rc<dyn Fn(bool)>;

pub trait ProximitySource {
    fn observe(
        &self,
        sentinel: ViewId,
        options: ProximityOptions,
        on_change: ProximityCallback,
    ) -> Result<Dispose>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connection {
    Connected,
    /// Sentinel not attached yet; try again after the next commit.
    Pending,
    /// The source cannot watch at all.
    Unavailable,
}

pub struct ProximityWatcher {
    source: Rc<dyn ProximitySource>,
    options: ProximityOptions,
    subscription: RefCell<Option<Dispose>>,
    live: Rc<Cell<bool>>,
}

impl ProximityWatcher {
    pub fn new(source: Rc<dyn ProximitySource>, options: ProximityOptions) -> Self {
        Self {
            source,
            options,
            subscription: RefCell::new(None),
            live: Rc::new(Cell::new(true)),
        }
    }

    pub fn options(&self) -> ProximityOptions {
        self.options
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    /// Subscribes `sentinel` unless a subscription already exists.
    pub fn connect(&self, sentinel: ViewId, on_change: ProximityCallback) -> Connection {
        if self.is_connected() {
            return Connection::Connected;
        }
        if !self.live.get() {
            return Connection::Unavailable;
        }

        let live = self.live.clone();
        let gated: ProximityCallback = Rc::new(move |intersecting| {
            if live.get() {
                on_change(intersecting);
            }
        });

        match self.source.observe(sentinel, self.options, gated) {
            Ok(subscription) => {
                log::debug!(
                    "proximity: watching node {sentinel} (margin {}px, root {:?})",
                    self.options.margin,
                    self.options.root
                );
                *self.subscription.borrow_mut() = Some(subscription);
                Connection::Connected
            }
            Err(Error::Detached(node)) => {
                log::trace!("proximity: node {node} not attached yet; retrying on next commit");
                Connection::Pending
            }
            Err(e) => {
                log::warn!("proximity: cannot watch node {sentinel}: {e}");
                Connection::Unavailable
            }
        }
    }

    /// Releases the subscription. No signal is delivered afterwards.
    pub fn disconnect(&self) {
        self.live.set(false);
        let subscription = self.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.run();
        }
    }
}

new_key_type! {
    struct SyntheticKey;
}

struct SyntheticSub {
    sentinel: ViewId,
    options: ProximityOptions,
    on_change: ProximityCallback,
}

/// Proximity source driven by hand.
#[derive(Default)]
pub struct SyntheticProximity {
    subs: Rc<RefCell<SlotMap<SyntheticKey, SyntheticSub>>>,
    unavailable: bool,
}

impl SyntheticProximity {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every `observe` fails, like a host without the primitive.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn active(&self) -> usize {
        self.subs.borrow().len()
    }

    pub fn options_for(&self, sentinel: ViewId) -> Option<ProximityOptions> {
        self.subs
            .borrow()
            .values()
            .find(|s| s.sentinel == sentinel)
            .map(|s| s.options)
    }

    /// Delivers `intersecting` to every subscription on `sentinel`. Returns
    /// how many callbacks ran.
    pub fn emit(&self, sentinel: ViewId, intersecting: bool) -> usize {
        let callbacks: Vec<ProximityCallback> = self
            .subs
            .borrow()
            .values()
            .filter(|s| s.sentinel == sentinel)
            .map(|s| s.on_change.clone())
            .collect();
        for cb in &callbacks {
            cb(intersecting);
        }
        callbacks.len()
    }
}

impl ProximitySource for SyntheticProximity {
    fn observe(
        &self,
        sentinel: ViewId,
        options: ProximityOptions,
        on_change: ProximityCallback,
    ) -> Result<Dispose> {
        if self.unavailable {
            return Err(Error::ProximityUnavailable(
                "synthetic source disabled".to_string(),
            ));
        }
        let key = self.subs.borrow_mut().insert(SyntheticSub {
            sentinel,
            options,
            on_change,
        });
        let subs = Rc::downgrade(&self.subs);
        Ok(Dispose::new(move || {
            if let Some(subs) = subs.upgrade() {
                subs.borrow_mut().remove(key);
            }
        }))
    }
}
