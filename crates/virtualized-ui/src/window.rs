use std::rc::Rc;

use virtualized_core::{Dispose, Result, ViewId};

/// The host's scrolling document, narrowed to what an item needs.
pub trait Window {
    /// Current vertical scroll offset (px).
    fn scroll_y(&self) -> f32;
    fn scroll_to(&self, y: f32);
    /// Passive listener, called after every scroll. Disposing removes it.
    fn add_scroll_listener(&self, listener: Rc<dyn Fn()>) -> Dispose;
    /// Laid-out height of `node` from the most recent layout.
    fn measure_height(&self, node: ViewId) -> Result<f32>;
}
