use web_time::Duration;

use virtualized_core::join_classes;

use crate::proximity::ProximityRoot;

pub const DEFAULT_HEIGHT: f32 = 300.0;
pub const DEFAULT_VISIBLE_OFFSET: f32 = 1000.0;
/// Quiet period a proximity signal must survive before it flips visibility.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Height changes at or below this many px are layout noise.
pub const HEIGHT_EPSILON: f32 = 1.0;

pub const ROOT_CLASS: &str = "virtualized";
pub const PLACEHOLDER_CLASS: &str = "virtualized-placeholder";
pub const DEFAULT_ELEMENT: &str = "div";

/// Per-instance settings, fixed at mount.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct VirtualizedConfig {
    pub initial_visible: bool,
    /// Placeholder height before anything has been measured (px).
    pub default_height: f32,
    /// Proximity margin above and below the root box (px).
    pub visible_offset: f32,
    pub stay_rendered: bool,
    pub root: ProximityRoot,
    pub root_element: String,
    pub root_element_class: String,
    pub placeholder_element: String,
    pub placeholder_element_class: String,
    pub settle_delay: Duration,
    pub height_epsilon: f32,
}

impl Default for VirtualizedConfig {
    fn default() -> Self {
        Self {
            initial_visible: false,
            default_height: DEFAULT_HEIGHT,
            visible_offset: DEFAULT_VISIBLE_OFFSET,
            stay_rendered: false,
            root: ProximityRoot::Viewport,
            root_element: DEFAULT_ELEMENT.to_string(),
            root_element_class: String::new(),
            placeholder_element: DEFAULT_ELEMENT.to_string(),
            placeholder_element_class: String::new(),
            settle_delay: SETTLE_DELAY,
            height_epsilon: HEIGHT_EPSILON,
        }
    }
}

impl VirtualizedConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn initial_visible(mut self, v: bool) -> Self {
        self.initial_visible = v;
        self
    }
    pub fn default_height(mut self, px: f32) -> Self {
        self.default_height = px;
        self
    }
    pub fn visible_offset(mut self, px: f32) -> Self {
        self.visible_offset = px;
        self
    }
    pub fn stay_rendered(mut self, v: bool) -> Self {
        self.stay_rendered = v;
        self
    }
    pub fn root(mut self, root: ProximityRoot) -> Self {
        self.root = root;
        self
    }
    pub fn root_element(mut self, tag: impl Into<String>, class: impl Into<String>) -> Self {
        self.root_element = tag.into();
        self.root_element_class = class.into();
        self
    }
    pub fn placeholder_element(mut self, tag: impl Into<String>, class: impl Into<String>) -> Self {
        self.placeholder_element = tag.into();
        self.placeholder_element_class = class.into();
        self
    }
    pub fn settle_delay(mut self, d: Duration) -> Self {
        self.settle_delay = d;
        self
    }
    pub fn height_epsilon(mut self, px: f32) -> Self {
        self.height_epsilon = px;
        self
    }

    pub fn root_classes(&self) -> String {
        join_classes(ROOT_CLASS, &self.root_element_class)
    }

    pub fn placeholder_classes(&self) -> String {
        join_classes(PLACEHOLDER_CLASS, &self.placeholder_element_class)
    }

    /// Replaces values that cannot be honoured with their defaults.
    pub fn sanitized(mut self) -> Self {
        if !self.default_height.is_finite() {
            log::warn!(
                "default_height {} is not finite; using {DEFAULT_HEIGHT}",
                self.default_height
            );
            self.default_height = DEFAULT_HEIGHT;
        } else if self.default_height < 0.0 {
            log::warn!("default_height {} is negative; using 0", self.default_height);
            self.default_height = 0.0;
        }
        if !self.visible_offset.is_finite() {
            log::warn!(
                "visible_offset {} is not finite; using {DEFAULT_VISIBLE_OFFSET}",
                self.visible_offset
            );
            self.visible_offset = DEFAULT_VISIBLE_OFFSET;
        }
        if !self.height_epsilon.is_finite() || self.height_epsilon < 0.0 {
            log::warn!(
                "height_epsilon {} is invalid; using {HEIGHT_EPSILON}",
                self.height_epsilon
            );
            self.height_epsilon = HEIGHT_EPSILON;
        }
        if self.root_element.trim().is_empty() {
            self.root_element = DEFAULT_ELEMENT.to_string();
        }
        if self.placeholder_element.trim().is_empty() {
            self.placeholder_element = DEFAULT_ELEMENT.to_string();
        }
        self
    }
}
