use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, gaussian_noise};

/// A consumer with a daily demand pattern.
///
/// Demand is a baseline plus a sinusoidal daily swing plus Gaussian noise,
/// floored at zero.
///
/// # Examples
///
/// ```
/// use backup_power::devices::{BaseLoad, Device, DeviceContext};
/// use backup_power::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(24, 1, 42);
/// let mut load = BaseLoad::new(2.0, 0.5, 0.0, 0.0, 42);
/// let kw = load.power_kw(&DeviceContext::new(0, &cfg));
/// assert!((kw - 2.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Baseline power consumption in kilowatts
    pub base_kw: f32,

    /// Amplitude of the sinusoidal variation in kilowatts
    pub amp_kw: f32,

    /// Phase offset of the sinusoidal pattern in radians
    pub phase_rad: f32,

    /// Standard deviation of the Gaussian noise in kilowatts
    pub noise_std: f32,

    /// Demand computed on the most recent tick.
    last_demand_kw: f32,

    /// Whether the load was supplied on the most recent tick.
    powered: bool,

    rng: StdRng,
}

impl BaseLoad {
    /// Creates a new load.
    ///
    /// # Arguments
    ///
    /// * `base_kw` - The baseline power consumption in kilowatts
    /// * `amp_kw` - The amplitude of sinusoidal daily variation in kilowatts
    /// * `phase_rad` - The phase offset in radians
    /// * `noise_std` - The standard deviation of Gaussian noise in kilowatts
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(base_kw: f32, amp_kw: f32, phase_rad: f32, noise_std: f32, seed: u64) -> Self {
        Self {
            base_kw,
            amp_kw,
            phase_rad,
            noise_std,
            last_demand_kw: 0.0,
            powered: true,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn demand_kw(&self) -> f32 {
        self.last_demand_kw
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub(crate) fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }
}

impl Device for BaseLoad {
    fn power_kw(&mut self, context: &DeviceContext) -> f32 {
        let angle = 2.0 * std::f32::consts::PI * context.day_fraction() + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std);
        let kw = (self.base_kw + self.amp_kw * angle.sin() + noise).max(0.0);
        self.last_demand_kw = kw;
        kw
    }

    fn device_type(&self) -> &'static str {
        "BaseLoad"
    }
}
