use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext};
use crate::host::{Capabilities, EndpointId, EndpointReading};

/// A switchable backup generator.
///
/// Produces its rated output while switched on, fuelled and intact. Fuel is
/// tracked as hours of runtime left; `None` means the generator needs no fuel.
/// While running it may break down at random and stays dead for
/// `repair_hours`.
#[derive(Debug, Clone)]
pub struct Generator {
    /// Output in kW while running.
    pub rated_kw: f32,

    /// Chance of a breakdown per simulated day of runtime.
    pub breakdown_chance_per_day: f32,

    /// Hours a breakdown takes to repair.
    pub repair_hours: f32,

    switch_on: bool,
    fuel_hours: Option<f32>,
    broken_remaining_hours: f32,
    last_output_kw: f32,
    rng: StdRng,
}

impl Generator {
    /// Creates a generator that starts switched off.
    ///
    /// # Arguments
    ///
    /// * `rated_kw` - Output while running
    /// * `fuel_hours` - Runtime in the tank, `None` for an unfuelled plant
    /// * `breakdown_chance_per_day` - Probability of failure per day of runtime
    /// * `repair_hours` - Downtime after a failure
    /// * `seed` - Random seed for breakdown rolls
    pub fn new(
        rated_kw: f32,
        fuel_hours: Option<f32>,
        breakdown_chance_per_day: f32,
        repair_hours: f32,
        seed: u64,
    ) -> Self {
        Self {
            rated_kw: rated_kw.max(0.0),
            breakdown_chance_per_day: breakdown_chance_per_day.clamp(0.0, 1.0),
            repair_hours: repair_hours.max(0.0),
            switch_on: false,
            fuel_hours: fuel_hours.map(|h| h.max(0.0)),
            broken_remaining_hours: 0.0,
            last_output_kw: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn is_switched_on(&self) -> bool {
        self.switch_on
    }

    /// Flips the switch. Setting the current state again does nothing.
    pub fn set_switch(&mut self, on: bool) {
        self.switch_on = on;
    }

    pub fn fuel_hours(&self) -> Option<f32> {
        self.fuel_hours
    }

    pub fn refuel(&mut self, hours: f32) {
        if let Some(fuel) = self.fuel_hours.as_mut() {
            *fuel += hours.max(0.0);
        }
    }

    pub fn has_fuel(&self) -> bool {
        self.fuel_hours.is_none_or(|h| h > 0.0)
    }

    pub fn is_broken_down(&self) -> bool {
        self.broken_remaining_hours > 0.0
    }

    /// Forces a breakdown lasting `repair_hours`.
    pub fn break_down(&mut self) {
        self.broken_remaining_hours = self.repair_hours.max(f32::MIN_POSITIVE);
    }

    pub fn output_kw(&self) -> f32 {
        self.last_output_kw
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            is_generator: true,
            has_fuel_gate: self.fuel_hours.is_some(),
            has_breakdown_gate: self.breakdown_chance_per_day > 0.0,
            can_actuate: true,
        }
    }

    /// The host-side view of this generator.
    pub fn reading(&self, id: EndpointId) -> EndpointReading {
        EndpointReading {
            id,
            capabilities: self.capabilities(),
            is_on: self.last_output_kw > 0.0,
            wants_on: self.switch_on,
            power_flow: self.last_output_kw,
            desired_output: self.rated_kw,
            has_fuel: self.has_fuel(),
            broken_down: self.is_broken_down(),
        }
    }
}

impl Device for Generator {
    fn power_kw(&mut self, context: &DeviceContext) -> f32 {
        let dt = context.dt_hours;

        if self.is_broken_down() {
            self.broken_remaining_hours = (self.broken_remaining_hours - dt).max(0.0);
            self.last_output_kw = 0.0;
            return 0.0;
        }

        if !self.switch_on || !self.has_fuel() {
            self.last_output_kw = 0.0;
            return 0.0;
        }

        if let Some(fuel) = self.fuel_hours.as_mut() {
            *fuel = (*fuel - dt).max(0.0);
        }

        let p = self.breakdown_chance_per_day * dt / 24.0;
        if p > 0.0 && self.rng.random::<f32>() < p {
            self.break_down();
        }

        self.last_output_kw = self.rated_kw;
        self.rated_kw
    }

    fn device_type(&self) -> &'static str {
        "Generator"
    }
}
