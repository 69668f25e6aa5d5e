#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Grows the rect by `margin` above and below. Negative margins shrink it
    /// (height never goes below zero).
    pub fn inflate_y(&self, margin: f32) -> Rect {
        let h = (self.h + 2.0 * margin).max(0.0);
        Rect {
            x: self.x,
            y: self.y - margin,
            w: self.w,
            h,
        }
    }

    /// Vertical overlap test. A zero-height rect counts when it sits inside
    /// `region`, so empty nodes can still be detected.
    pub fn overlaps_y(&self, region: &Rect) -> bool {
        if self.h <= 0.0 {
            return self.y >= region.y && self.y <= region.bottom();
        }
        self.y < region.bottom() && region.y < self.bottom()
    }
}
