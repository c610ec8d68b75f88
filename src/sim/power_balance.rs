//! Per-endpoint power accounting and network aggregation.

use crate::host::{EndpointReading, NetworkSnapshot};

/// Demand an endpoint places on its network.
///
/// An endpoint that wants power counts as demand even when it is momentarily
/// starved and switched off.
pub fn consumption(reading: &EndpointReading) -> f32 {
    if !reading.is_on && !reading.wants_on {
        return 0.0;
    }
    (-reading.power_flow).max(0.0)
}

/// Output a generator is delivering right now.
pub fn current_production(reading: &EndpointReading) -> f32 {
    if !reading.capabilities.is_generator || !reading.is_on {
        return 0.0;
    }
    reading.power_flow.max(0.0)
}

/// Output a generator could deliver if it were started.
///
/// Zero if fuel-starved or broken down, otherwise the larger of its desired
/// and current output.
pub fn potential_production(reading: &EndpointReading) -> f32 {
    if !reading.capabilities.is_generator {
        return 0.0;
    }
    if reading.is_fuel_starved() || reading.is_broken_down() {
        return 0.0;
    }
    reading.desired_output.max(reading.power_flow).max(0.0)
}

/// Accounting figures for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointBalance {
    pub consumption: f32,
    pub current_production: f32,
    pub potential_production: f32,
}

impl EndpointBalance {
    pub fn of(reading: &EndpointReading) -> Self {
        Self {
            consumption: consumption(reading),
            current_production: current_production(reading),
            potential_production: potential_production(reading),
        }
    }
}

/// Network-wide totals used by the shutdown and startup policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkBalance {
    pub need: f32,
    pub production: f32,
    pub has_storage: bool,
    pub storage_level: f32,
}

impl NetworkBalance {
    /// Sums endpoint figures and reads storage from the snapshot.
    pub fn of(snapshot: &NetworkSnapshot) -> Self {
        let (need, production) = snapshot
            .endpoints
            .iter()
            .map(EndpointBalance::of)
            .fold((0.0_f32, 0.0_f32), |(need, prod), e| {
                (need + e.consumption, prod + e.current_production)
            });
        Self {
            need,
            production,
            has_storage: snapshot.has_storage(),
            storage_level: snapshot.storage_level(),
        }
    }

    /// Production above need; negative in deficit.
    pub fn surplus(&self) -> f32 {
        self.production - self.need
    }

    /// Whether the shutdown policy should look for candidates.
    pub fn wants_shutdown_pass(&self) -> bool {
        self.production > self.need || (self.has_storage && self.storage_level > 0.0)
    }

    /// Whether the startup policy should look for candidates.
    pub fn wants_startup_pass(&self) -> bool {
        self.production < self.need || (self.has_storage && self.storage_level < 1.0)
    }
}
