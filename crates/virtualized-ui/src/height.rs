use std::cell::Cell;

/// Last known rendered height of an item's content, in px.
///
/// Sizes the placeholder and seeds the content wrapper's `min_height`. Only
/// finite, positive measurements are accepted, so the value never goes
/// negative.
#[derive(Debug)]
pub struct HeightMemory {
    px: Cell<f32>,
    writes: Cell<u64>,
}

impl HeightMemory {
    pub fn new(initial: f32) -> Self {
        let initial = if initial.is_finite() { initial.max(0.0) } else { 0.0 };
        Self {
            px: Cell::new(initial),
            writes: Cell::new(0),
        }
    }

    pub fn get(&self) -> f32 {
        self.px.get()
    }

    /// Overwrites with a measurement. Returns `false` when the measurement was
    /// rejected or equal to the stored value.
    pub fn record(&self, measured: f32) -> bool {
        if !measured.is_finite() || measured <= 0.0 {
            log::trace!("height memory: ignoring measurement {measured}");
            return false;
        }
        if measured == self.px.get() {
            return false;
        }
        self.px.set(measured);
        self.writes.set(self.writes.get() + 1);
        true
    }

    pub fn writes(&self) -> u64 {
        self.writes.get()
    }
}
