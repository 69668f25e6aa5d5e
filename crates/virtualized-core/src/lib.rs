//! # Signals, scopes, and scheduled work
//!
//! `virtualized-core` holds the small runtime the virtualization layer sits
//! on. There are four pieces:
//!
//! - `Signal<T>`: observable value with change notification.
//! - `Scope` / `Dispose`: teardown ownership for a mounted instance.
//! - `Scheduler`: cancellable timeouts and next-frame callbacks.
//! - `View`: the minimal element tree handed to the host.
//!
//! ## Signals
//!
//! ```rust
//! use virtualized_core::*;
//!
//! let visible = signal(false);
//! visible.set(true);
//! assert!(!visible.set_if_changed(true));
//! assert!(visible.get());
//! ```
//!
//! ## Teardown
//!
//! Everything an instance subscribes to is registered on its `Scope`.
//! Disposing the scope releases subscriptions and cancels pending tasks:
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use virtualized_core::*;
//!
//! let released = Rc::new(Cell::new(false));
//! let scope = Scope::new();
//! scope.run(|| {
//!     let released = released.clone();
//!     effect(move || on_unmount(move || released.set(true)));
//! });
//! scope.dispose();
//! assert!(released.get());
//! ```
//!
//! ## Scheduling
//!
//! `ManualScheduler` drives virtual time for tests and headless hosts:
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use virtualized_core::*;
//!
//! let sched = ManualScheduler::new();
//! let fired = Rc::new(Cell::new(false));
//! let f = fired.clone();
//! sched.set_timeout(Duration::from_millis(100), Box::new(move || f.set(true)));
//! sched.advance(Duration::from_millis(99));
//! assert!(!fired.get());
//! sched.advance(Duration::from_millis(1));
//! assert!(fired.get());
//! ```

pub mod clock;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod modifier;
pub mod prelude;
pub mod scheduler;
pub mod scope;
pub mod signal;
pub mod view;

pub use prelude::*;
