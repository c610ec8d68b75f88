use serde::{Deserialize, Serialize};

/// Storage-level band a broker works towards.
///
/// Below `low` the broker's generator may be started to help charge storage;
/// at or above `high` it may be stopped. Both bounds lie in `[0, 1]` and
/// `low <= high` holds after every mutation.
///
/// Persisted as a two-element array, e.g. `storage_target = [0.2, 0.8]`.
///
/// # Examples
///
/// ```
/// use backup_power::broker::StorageTargetRange;
///
/// let mut range = StorageTargetRange::new(0.2, 0.8);
/// range.set_low(0.9);
/// assert_eq!((range.low(), range.high()), (0.9, 0.9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct StorageTargetRange {
    low: f32,
    high: f32,
}

impl Default for StorageTargetRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl StorageTargetRange {
    /// The full `[0, 1]` band.
    pub const FULL: Self = Self {
        low: 0.0,
        high: 1.0,
    };

    /// Creates a range, clamping both bounds to `[0, 1]` and swapping them if
    /// they arrive out of order.
    pub fn new(low: f32, high: f32) -> Self {
        let (a, b) = (unit(low), unit(high));
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    /// Replaces both bounds.
    pub fn set(&mut self, low: f32, high: f32) {
        *self = Self::new(low, high);
    }

    /// Moves the lower bound; raises the upper bound if it would fall below.
    pub fn set_low(&mut self, low: f32) {
        self.low = unit(low);
        self.high = self.high.max(self.low);
    }

    /// Moves the upper bound; lowers the lower bound if it would rise above.
    pub fn set_high(&mut self, high: f32) {
        self.high = unit(high);
        self.low = self.low.min(self.high);
    }
}

impl From<(f32, f32)> for StorageTargetRange {
    fn from((low, high): (f32, f32)) -> Self {
        Self::new(low, high)
    }
}

impl From<StorageTargetRange> for (f32, f32) {
    fn from(range: StorageTargetRange) -> Self {
        (range.low, range.high)
    }
}

fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_full_range() {
        let range = StorageTargetRange::default();
        assert_eq!(range.low(), 0.0);
        assert_eq!(range.high(), 1.0);
    }

    #[test]
    fn new_reorders_and_clamps() {
        let range = StorageTargetRange::new(1.5, -0.2);
        assert_eq!(range.low(), 0.0);
        assert_eq!(range.high(), 1.0);

        let range = StorageTargetRange::new(0.7, 0.3);
        assert_eq!(range.low(), 0.3);
        assert_eq!(range.high(), 0.7);
    }

    #[test]
    fn set_high_pushes_low_down() {
        let mut range = StorageTargetRange::new(0.5, 0.8);
        range.set_high(0.2);
        assert_eq!(range.low(), 0.2);
        assert_eq!(range.high(), 0.2);
    }

    #[test]
    fn nan_bounds_collapse_to_zero() {
        let range = StorageTargetRange::new(f32::NAN, 0.4);
        assert_eq!(range.low(), 0.0);
        assert_eq!(range.high(), 0.4);
    }
}
