//! # Scroll tracking and compensation
//!
//! When a placeholder is swapped for real content of a different height,
//! everything below the item moves. If the item sits above the reading
//! position the page appears to jump. The compensator measures the swapped-in
//! content after layout and shifts the window scroll by the height delta,
//! starting from the offset recorded by the [`ScrollTracker`] at the last
//! scroll event.
//!
//! The tracker also exposes a one-frame `is_scrolling` flag: set on every
//! scroll event, cleared by the next animation frame.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use virtualized_core::{Scheduler, Signal, TaskId, ViewId, signal};

use crate::height::HeightMemory;
use crate::window::Window;

pub struct ScrollTracker {
    last_scroll_y: Cell<f32>,
    is_scrolling: Signal<bool>,
    frame: Cell<Option<TaskId>>,
    scheduler: Rc<dyn Scheduler>,
    this: Weak<ScrollTracker>,
}

impl ScrollTracker {
    pub fn new(initial_y: f32, scheduler: Rc<dyn Scheduler>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            last_scroll_y: Cell::new(initial_y),
            is_scrolling: signal(false),
            frame: Cell::new(None),
            scheduler,
            this: this.clone(),
        })
    }

    pub fn last_scroll_y(&self) -> f32 {
        self.last_scroll_y.get()
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling.get()
    }

    pub fn scrolling_signal(&self) -> &Signal<bool> {
        &self.is_scrolling
    }

    /// Scroll event handler.
    pub fn record(&self, y: f32) {
        self.last_scroll_y.set(y);
        if self.is_scrolling.get() {
            return;
        }
        self.is_scrolling.set(true);
        let this = self.this.clone();
        let id = self.scheduler.request_frame(Box::new(move || {
            if let Some(this) = this.upgrade() {
                this.frame.set(None);
                this.is_scrolling.set(false);
            }
        }));
        self.frame.set(Some(id));
    }

    /// Drops the pending frame reset (teardown).
    pub fn cancel_frame(&self) {
        if let Some(id) = self.frame.take() {
            self.scheduler.cancel(id);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Compensation {
    pub delta: f32,
    pub scroll_to: f32,
}

pub struct ScrollCompensator {
    epsilon: f32,
}

impl ScrollCompensator {
    pub fn new(epsilon: f32) -> Self {
        Self { epsilon }
    }

    /// Height change worth correcting, if any.
    pub fn delta(&self, remembered: f32, measured: f32) -> Option<f32> {
        if !measured.is_finite() || measured <= 0.0 {
            return None;
        }
        let delta = measured - remembered;
        (delta.abs() > self.epsilon).then_some(delta)
    }

    /// Measures `content`, and when its height moved past the threshold,
    /// scrolls by the delta and stores the new height.
    pub fn compensate(
        &self,
        window: &dyn Window,
        tracker: &ScrollTracker,
        memory: &HeightMemory,
        content: ViewId,
    ) -> Option<Compensation> {
        let measured = match window.measure_height(content) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("compensation skipped: {e}");
                return None;
            }
        };
        let delta = self.delta(memory.get(), measured)?;
        let scroll_to = tracker.last_scroll_y() + delta;
        log::info!(
            "content {content} resized {} -> {measured}px; scrolling to {scroll_to}",
            memory.get()
        );
        window.scroll_to(scroll_to);
        memory.record(measured);
        Some(Compensation { delta, scroll_to })
    }
}
