//! Cancellable delayed continuations.
//!
//! Hosts supply a [`Scheduler`]: one-shot timeouts (`setTimeout` on the web)
//! and next-frame callbacks (`requestAnimationFrame`). Both hand back a
//! [`TaskId`] that can be cancelled before the task runs.
//!
//! [`ManualScheduler`] is the deterministic implementation used by tests and
//! headless hosts: time only moves when [`ManualScheduler::advance`] is called
//! and frames only tick on [`ManualScheduler::run_frame`].

use std::cell::{Cell, RefCell};

use slotmap::{SlotMap, new_key_type};
use web_time::Duration;

use crate::clock::{Clock, TestClock};

new_key_type! {
    pub struct TaskId;
}

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler {
    fn clock(&self) -> &dyn Clock;
    fn set_timeout(&self, delay: Duration, task: Task) -> TaskId;
    fn request_frame(&self, task: Task) -> TaskId;
    /// Returns `false` when the task already ran or was cancelled before.
    fn cancel(&self, id: TaskId) -> bool;
}

enum Due {
    At(Duration),
    Frame(u64),
}

struct Entry {
    due: Due,
    seq: u64,
    task: Task,
}

pub struct ManualScheduler {
    clock: TestClock,
    tasks: RefCell<SlotMap<TaskId, Entry>>,
    seq: Cell<u64>,
    frame: Cell<u64>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::with_clock(TestClock::new())
    }

    pub fn with_clock(clock: TestClock) -> Self {
        Self {
            clock,
            tasks: RefCell::new(SlotMap::with_key()),
            seq: Cell::new(0),
            frame: Cell::new(0),
        }
    }

    pub fn clock(&self) -> &TestClock {
        &self.clock
    }

    pub fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn pending_timeouts(&self) -> usize {
        self.tasks
            .borrow()
            .values()
            .filter(|e| matches!(e.due, Due::At(_)))
            .count()
    }

    pub fn pending_frames(&self) -> usize {
        self.tasks
            .borrow()
            .values()
            .filter(|e| matches!(e.due, Due::Frame(_)))
            .count()
    }

    /// Moves virtual time forward, running every timeout that falls due in
    /// deadline order. Timeouts scheduled by a running task are honoured if
    /// they fall inside the window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.elapsed() + by;
        let mut ran = 0;
        loop {
            let next = {
                let tasks = self.tasks.borrow();
                tasks
                    .iter()
                    .filter_map(|(id, e)| match e.due {
                        Due::At(at) if at <= target => Some((at, e.seq, id)),
                        _ => None,
                    })
                    .min()
            };
            let Some((at, _, id)) = next else { break };
            let entry = self.tasks.borrow_mut().remove(id);
            if let Some(entry) = entry {
                self.clock.set_elapsed(at);
                (entry.task)();
                ran += 1;
            }
        }
        self.clock.set_elapsed(target);
        ran
    }

    /// Runs one animation frame: every frame task requested before this call.
    /// Frame requests made while the frame runs land in the next frame.
    pub fn run_frame(&self) -> usize {
        let frame = self.frame.get();
        self.frame.set(frame + 1);

        let mut due: Vec<(u64, TaskId)> = self
            .tasks
            .borrow()
            .iter()
            .filter_map(|(id, e)| match e.due {
                Due::Frame(f) if f <= frame => Some((e.seq, id)),
                _ => None,
            })
            .collect();
        due.sort_unstable();

        let mut ran = 0;
        for (_, id) in due {
            // An earlier task in this frame may have cancelled it.
            let entry = self.tasks.borrow_mut().remove(id);
            if let Some(entry) = entry {
                (entry.task)();
                ran += 1;
            }
        }
        ran
    }

    fn push(&self, due: Due, task: Task) -> TaskId {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.tasks.borrow_mut().insert(Entry { due, seq, task })
    }
}

impl Scheduler for ManualScheduler {
    fn clock(&self) -> &dyn Clock {
        &self.clock
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TaskId {
        let at = self.clock.elapsed() + delay;
        self.push(Due::At(at), task)
    }

    fn request_frame(&self, task: Task) -> TaskId {
        self.push(Due::Frame(self.frame.get()), task)
    }

    fn cancel(&self, id: TaskId) -> bool {
        self.tasks.borrow_mut().remove(id).is_some()
    }
}
