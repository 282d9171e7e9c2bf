// crates/snipcut-core/src/state.rs
// Normalized trim selection. Pure data.

/// Normalized `[start, end]` range within a clip's duration.
///
/// Always satisfies `0 <= start <= end <= 1`; [`Selection::new`] clamps and
/// orders whatever the slider hands it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    start: f64,
    end:   f64,
}

impl Selection {
    pub const FULL: Selection = Selection { start: 0.0, end: 1.0 };

    pub fn new(start: f64, end: f64) -> Self {
        let start = clamp_unit(start, 0.0);
        let end   = clamp_unit(end, 1.0);
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn start(&self) -> f64 { self.start }
    pub fn end(&self) -> f64 { self.end }

    /// Absolute `(start, end)` seconds for a clip of `duration` seconds.
    pub fn to_seconds(&self, duration: f64) -> (f64, f64) {
        (duration * self.start, duration * self.end)
    }
}

impl Default for Selection {
    fn default() -> Self { Self::FULL }
}

// NaN falls back to `fallback`; infinities saturate.
fn clamp_unit(v: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v.clamp(0.0, 1.0) }
}
