use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lower bound of the continuous scale (very negative)
pub const SCALE_MIN: f64 = 0.0;
/// Upper bound of the continuous scale (very positive)
pub const SCALE_MAX: f64 = 100.0;
/// Neutral midpoint the pointer is re-centred to after each checkpoint
pub const SCALE_CENTER: f64 = 50.0;

/// Produces the instantaneous continuous value on demand
///
/// Implementations do no buffering: `sample` is a pure read of the latest value.
pub trait SampleSource: Send {
    /// Current value in [0, 100]
    fn sample(&self) -> f64;

    /// Move the input back to the neutral midpoint
    fn recenter(&mut self);
}

/// Horizontal pointer position mapped onto the 0-100 scale
///
/// The input side holds a `PointerHandle` and writes positions as the
/// pointer moves; the sampling engine reads through the `SampleSource` impl.
pub struct PointerSource {
    value: Arc<AtomicU64>,
    width: f64,
}

/// Write side of a `PointerSource`
#[derive(Clone)]
pub struct PointerHandle {
    value: Arc<AtomicU64>,
    width: f64,
}

impl PointerSource {
    /// Create a source for a track `width` units wide, starting at the midpoint
    pub fn new(width: f64) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(SCALE_CENTER.to_bits())),
            width: width.max(f64::EPSILON),
        }
    }

    pub fn handle(&self) -> PointerHandle {
        PointerHandle {
            value: Arc::clone(&self.value),
            width: self.width,
        }
    }
}

impl SampleSource for PointerSource {
    fn sample(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::SeqCst))
    }

    fn recenter(&mut self) {
        self.value.store(SCALE_CENTER.to_bits(), Ordering::SeqCst);
    }
}

impl PointerHandle {
    /// Record a pointer at horizontal offset `x` from the left edge of the track
    pub fn move_to(&self, x: f64) {
        self.set_value(x / self.width * SCALE_MAX);
    }

    /// Set the scale value directly, clamped to [0, 100]
    pub fn set_value(&self, value: f64) {
        let clamped = if value.is_nan() {
            SCALE_CENTER
        } else {
            value.clamp(SCALE_MIN, SCALE_MAX)
        };
        self.value.store(clamped.to_bits(), Ordering::SeqCst);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::SeqCst))
    }
}
