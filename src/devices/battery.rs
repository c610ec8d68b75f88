use crate::devices::types::{Device, DeviceContext};

/// A storage cell on a simulated network.
///
/// Enforces charge/discharge power limits, capacity bounds and round-trip
/// losses when given a setpoint.
///
/// # Power Flow Convention
/// - Positive setpoint/return: charging (absorbing surplus)
/// - Negative setpoint/return: discharging (covering deficit)
#[derive(Debug, Clone)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f32,

    /// State of charge as a fraction (0.0 to 1.0).
    pub soc: f32,

    /// Maximum charge power in kilowatts (positive value).
    pub max_charge_kw: f32,

    /// Maximum discharge power in kilowatts (positive value).
    pub max_discharge_kw: f32,

    /// Charging efficiency (0..1.0).
    pub eta_c: f32,

    /// Discharging efficiency (0..1.0).
    pub eta_d: f32,
}

impl Battery {
    /// Creates a new battery.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative, SOC out of range, or efficiencies invalid.
    pub fn new(
        capacity_kwh: f32,
        soc: f32,
        max_charge_kw: f32,
        max_discharge_kw: f32,
        eta_c: f32,
        eta_d: f32,
    ) -> Self {
        assert!(capacity_kwh > 0.0);
        assert!((0.0..=1.0).contains(&soc));
        assert!(max_charge_kw >= 0.0 && max_discharge_kw >= 0.0);
        assert!(eta_c > 0.0 && eta_c <= 1.0);
        assert!(eta_d > 0.0 && eta_d <= 1.0);

        Self {
            capacity_kwh,
            soc,
            max_charge_kw,
            max_discharge_kw,
            eta_c,
            eta_d,
        }
    }

    /// Energy currently stored in kWh.
    pub fn stored_kwh(&self) -> f32 {
        self.soc * self.capacity_kwh
    }
}

impl Device for Battery {
    fn power_kw(&mut self, context: &DeviceContext) -> f32 {
        let setpoint_kw = context.setpoint_kw.unwrap_or(0.0);
        let dt = context.dt_hours;

        let cmd_kw = if setpoint_kw >= 0.0 {
            setpoint_kw.min(self.max_charge_kw)
        } else {
            setpoint_kw.max(-self.max_discharge_kw)
        };

        if cmd_kw > 0.0 {
            // limited by remaining headroom
            let max_kw_soc = (1.0 - self.soc) * self.capacity_kwh / self.eta_c / dt;
            let actual_kw = cmd_kw.min(max_kw_soc.max(0.0));
            self.soc += (actual_kw * dt * self.eta_c) / self.capacity_kwh;
            self.soc = self.soc.clamp(0.0, 1.0);
            actual_kw
        } else if cmd_kw < 0.0 {
            // limited by stored energy
            let max_kw_soc = self.soc * self.capacity_kwh * self.eta_d / dt;
            let actual_abs_kw = (-cmd_kw).min(max_kw_soc.max(0.0));
            self.soc -= (actual_abs_kw * dt) / (self.capacity_kwh * self.eta_d);
            self.soc = self.soc.clamp(0.0, 1.0);
            -actual_abs_kw
        } else {
            0.0
        }
    }

    fn device_type(&self) -> &'static str {
        "Battery"
    }
}
