/// Presentation attributes the virtualization layer sets on its nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Modifier {
    pub class: Option<String>,
    /// Fixed height in px.
    pub height: Option<f32>,
    pub min_height: Option<f32>,
}

impl Modifier {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        self.class = if class.is_empty() { None } else { Some(class) };
        self
    }
    pub fn height(mut self, h: f32) -> Self {
        self.height = Some(h);
        self
    }
    pub fn min_height(mut self, h: f32) -> Self {
        self.min_height = Some(h);
        self
    }
}

/// `"base extra"` with surrounding whitespace removed.
pub fn join_classes(base: &str, extra: &str) -> String {
    format!("{base} {extra}").trim().to_string()
}
