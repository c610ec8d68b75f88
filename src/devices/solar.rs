use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, daylight_frac, gaussian_noise};

/// An unmanaged solar array: fluctuating supply the brokers balance against.
///
/// Output follows a half-cosine between sunrise and sunset with
/// multiplicative noise for passing clouds.
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Maximum power output in kilowatts under ideal conditions.
    pub kw_peak: f32,

    /// Hour of sunrise (inclusive).
    pub sunrise_hr: f32,

    /// Hour of sunset (exclusive).
    pub sunset_hr: f32,

    /// Standard deviation of the Gaussian noise as a fraction of output.
    pub noise_std: f32,

    last_output_kw: f32,

    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar array.
    ///
    /// # Panics
    ///
    /// Panics if `sunrise_hr >= sunset_hr` or either lies outside `[0, 24]`.
    pub fn new(kw_peak: f32, sunrise_hr: f32, sunset_hr: f32, noise_std: f32, seed: u64) -> Self {
        assert!(sunrise_hr < sunset_hr);
        assert!((0.0..=24.0).contains(&sunrise_hr) && (0.0..=24.0).contains(&sunset_hr));
        Self {
            kw_peak: kw_peak.max(0.0),
            sunrise_hr,
            sunset_hr,
            noise_std: noise_std.max(0.0),
            last_output_kw: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn output_kw(&self) -> f32 {
        self.last_output_kw
    }
}

impl Device for SolarPv {
    fn power_kw(&mut self, context: &DeviceContext) -> f32 {
        let hour = context.day_fraction() * 24.0;
        let frac = daylight_frac(hour, self.sunrise_hr, self.sunset_hr);
        let kw = if frac <= 0.0 {
            0.0
        } else {
            let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
            (self.kw_peak * frac * noise_mult).max(0.0)
        };
        self.last_output_kw = kw;
        kw
    }

    fn device_type(&self) -> &'static str {
        "SolarPV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::SimConfig;

    #[test]
    fn no_output_at_night() {
        let cfg = SimConfig::new(24, 1, 0);
        let mut pv = SolarPv::new(5.0, 6.0, 18.0, 0.05, 42);
        assert_eq!(pv.power_kw(&DeviceContext::new(2, &cfg)), 0.0);
        assert_eq!(pv.power_kw(&DeviceContext::new(20, &cfg)), 0.0);
    }

    #[test]
    fn peak_at_noon_without_noise() {
        let cfg = SimConfig::new(24, 1, 0);
        let mut pv = SolarPv::new(5.0, 6.0, 18.0, 0.0, 42);
        let kw = pv.power_kw(&DeviceContext::new(12, &cfg));
        assert!((kw - 5.0).abs() < 1e-5);
        assert_eq!(pv.output_kw(), kw);
    }

    #[test]
    #[should_panic]
    fn inverted_daylight_window_panics() {
        SolarPv::new(5.0, 18.0, 6.0, 0.0, 1);
    }
}
