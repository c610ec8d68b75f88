//! Common types and traits for simulated grid devices.

use rand::{Rng, rngs::StdRng};

use crate::sim::types::{SimConfig, Tick};

/// Contextual information passed to devices each tick.
/// # Fields
/// * `tick` - Current host tick
/// * `ticks_per_day` - Length of a simulated day in ticks
/// * `dt_hours` - Duration of one tick in hours
/// * `setpoint_kw` - Optional power setpoint for controllable devices (kW)
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext {
    pub tick: Tick,
    pub ticks_per_day: Tick,
    pub dt_hours: f32,
    pub setpoint_kw: Option<f32>,
}

impl DeviceContext {
    /// Creates a context for `tick` with no setpoint.
    pub fn new(tick: Tick, config: &SimConfig) -> Self {
        Self {
            tick,
            ticks_per_day: config.ticks_per_day,
            dt_hours: config.dt_hours,
            setpoint_kw: None,
        }
    }

    /// Returns a copy carrying a setpoint.
    pub fn with_setpoint(self, setpoint_kw: f32) -> Self {
        Self {
            setpoint_kw: Some(setpoint_kw),
            ..self
        }
    }

    /// Position within the simulated day in `[0, 1)`.
    pub fn day_fraction(&self) -> f32 {
        (self.tick % self.ticks_per_day) as f32 / self.ticks_per_day as f32
    }
}

/// A device that produces, consumes or stores electricity on a simulated grid.
pub trait Device {
    /// Advances the device one tick and returns its power magnitude in kW.
    ///
    /// Loads return their demand, producers their output, and storage the
    /// power actually absorbed (positive) or released (negative) for the
    /// setpoint in `context`.
    fn power_kw(&mut self, context: &DeviceContext) -> f32;

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;
}

/// Gaussian noise via the Box-Muller transform.
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}

/// Half-cosine daylight shape: 0 outside `[sunrise_hr, sunset_hr)`, 1 at solar noon.
pub fn daylight_frac(hour: f32, sunrise_hr: f32, sunset_hr: f32) -> f32 {
    if hour < sunrise_hr || hour >= sunset_hr || sunset_hr <= sunrise_hr {
        return 0.0;
    }
    let x = (hour - sunrise_hr) / (sunset_hr - sunrise_hr);
    (std::f32::consts::PI * x).sin().max(0.0)
}
