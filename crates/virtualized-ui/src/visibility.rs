use std::cell::Cell;
use std::rc::{Rc, Weak};

use virtualized_core::{Scheduler, Signal, TaskId, signal};
use web_time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityState {
    pub is_visible: bool,
    /// Latches on the first visible flip and never clears.
    pub was_ever_visible: bool,
}

impl VisibilityState {
    pub fn initial(visible: bool) -> Self {
        Self {
            is_visible: visible,
            was_ever_visible: visible,
        }
    }

    pub fn with_visible(self, visible: bool) -> Self {
        Self {
            is_visible: visible,
            was_ever_visible: self.was_ever_visible || visible,
        }
    }
}

/// Trailing debounce over raw proximity signals.
///
/// Every call to [`schedule`](Self::schedule) supersedes the pending flip, so
/// a burst of signals collapses into the last one once the settle delay
/// passes without another signal.
pub struct DebouncedVisibility {
    state: Signal<VisibilityState>,
    scheduler: Rc<dyn Scheduler>,
    settle: Duration,
    pending: Cell<Option<(TaskId, Instant)>>,
    flips: Cell<u64>,
    this: Weak<DebouncedVisibility>,
}

impl DebouncedVisibility {
    pub fn new(initial: bool, scheduler: Rc<dyn Scheduler>, settle: Duration) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            state: signal(VisibilityState::initial(initial)),
            scheduler,
            settle,
            pending: Cell::new(None),
            flips: Cell::new(0),
            this: this.clone(),
        })
    }

    pub fn state(&self) -> VisibilityState {
        self.state.get()
    }

    pub fn signal(&self) -> &Signal<VisibilityState> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Number of debounced writes that changed the state.
    pub fn flips(&self) -> u64 {
        self.flips.get()
    }

    pub fn schedule(&self, visible: bool) {
        self.cancel_pending();
        let this = self.this.clone();
        let id = self.scheduler.set_timeout(
            self.settle,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    let since = this.pending.take().map(|(_, at)| at);
                    if this.apply(visible) {
                        if let Some(since) = since {
                            let settled =
                                this.scheduler.clock().now().saturating_duration_since(since);
                            log::debug!("visibility -> {visible} (settled after {settled:?})");
                        }
                    }
                }
            }),
        );
        self.pending.set(Some((id, self.scheduler.clock().now())));
    }

    pub fn cancel_pending(&self) {
        if let Some((id, _)) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }

    /// Skips the debounce. Used when the host cannot watch proximity at all.
    pub fn force_visible(&self) {
        self.cancel_pending();
        self.apply(true);
    }

    fn apply(&self, visible: bool) -> bool {
        let next = self.state.get().with_visible(visible);
        let changed = self.state.set_if_changed(next);
        if changed {
            self.flips.set(self.flips.get() + 1);
        }
        changed
    }
}
