//! # Virtualized items
//!
//! A [`VirtualizedItem`] keeps one list item out of the render tree until it
//! comes near the viewport. Off-screen it renders an empty placeholder sized
//! to the item's last known height; near the viewport it renders the real
//! children and, if they turn out taller or shorter than the placeholder,
//! corrects the window scroll so the page does not jump.
//!
//! Per item, four pieces cooperate:
//!
//! - [`ProximityWatcher`]: one subscription on the host's proximity source
//!   for the item's root node, with `visible_offset` px of margin.
//! - [`DebouncedVisibility`]: raw signals settle for `settle_delay` (100 ms)
//!   before they flip `is_visible`; `was_ever_visible` latches.
//! - [`HeightMemory`]: last measured content height, used as placeholder `height`,
//!   content `min_height`, and the baseline for compensation.
//! - [`ScrollCompensator`] + [`ScrollTracker`]: after a visible render,
//!   scroll by `measured − remembered` when it exceeds 1 px.
//!
//! The render decision is
//! `is_visible || (stay_rendered && was_ever_visible) || is_scrolling`.
//!
//! ```rust
//! use std::rc::Rc;
//! use std::time::Duration;
//! use virtualized_core::{Modifier, View, new_view_id};
//! use virtualized_ui::*;
//!
//! let mut feed = HeadlessFeed::new(800.0, 600.0);
//! for _ in 0..50 {
//!     let body = new_view_id();
//!     feed.push(
//!         VirtualizedConfig::new().visible_offset(200.0),
//!         Rc::new(move || View::element(body, "p").modifier(Modifier::new().height(420.0))),
//!     );
//! }
//! feed.pump();
//! feed.advance(Duration::from_millis(100));
//!
//! // Only the items near the top are real; the rest are 300 px placeholders.
//! assert!(feed.rendered_count() < 5);
//! ```
//!
//! Hosts implement [`Window`] and [`ProximitySource`] and drive each item
//! with `render` → layout → `commit`. [`HeadlessWindow`] and
//! [`HeadlessFeed`] do this without a browser.

pub mod config;
pub mod decision;
pub mod headless;
pub mod height;
pub mod item;
pub mod proximity;
pub mod scroll;
pub mod visibility;
pub mod window;

pub use config::VirtualizedConfig;
pub use decision::RenderDecision;
pub use headless::{HeadlessFeed, HeadlessWindow};
pub use height::HeightMemory;
pub use item::{Children, ItemEnv, ItemStats, VirtualizedItem};
pub use proximity::{
    Connection, ProximityCallback, ProximityOptions, ProximityRoot, ProximitySource,
    ProximityWatcher, SyntheticProximity,
};
pub use scroll::{Compensation, ScrollCompensator, ScrollTracker};
pub use visibility::{DebouncedVisibility, VisibilityState};
pub use window::Window;
