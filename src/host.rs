//! Host boundary: the narrow interface the balancing core needs from whatever
//! owns the buildings, fuel tanks and power networks.
//!
//! The core never holds on to host objects. Every evaluation re-queries the
//! host through [`NetworkView`] and issues its only side effect through
//! [`PowerActuator`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a power endpoint (producer, consumer or storage device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub u32);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint#{}", self.0)
    }
}

/// Identifies an electrical network. Network ids are only meaningful for the
/// tick in which they were resolved; the host may renumber them at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u32);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Optional host behaviors present on a structure.
///
/// Resolved once when a broker binds to its generator, so the evaluation loop
/// never has to ask the host which components a structure carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The structure produces power (it is a power plant).
    pub is_generator: bool,
    /// Output is gated on a fuel tank.
    pub has_fuel_gate: bool,
    /// Output is gated on a breakdown state.
    pub has_breakdown_gate: bool,
    /// The structure can be switched on and off remotely.
    pub can_actuate: bool,
}

/// Point-in-time state of one endpoint on a network.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointReading {
    pub id: EndpointId,
    pub capabilities: Capabilities,
    /// Current power-flow state.
    pub is_on: bool,
    /// Whether the device's own logic requests power flow, regardless of
    /// whether it currently gets it.
    pub wants_on: bool,
    /// Signed flow: negative consumes, positive produces.
    pub power_flow: f32,
    /// Output the device would like to produce right now.
    pub desired_output: f32,
    /// Only meaningful when `capabilities.has_fuel_gate` is set.
    pub has_fuel: bool,
    /// Only meaningful when `capabilities.has_breakdown_gate` is set.
    pub broken_down: bool,
}

impl EndpointReading {
    /// True if a fuel gate exists and the tank is empty.
    pub fn is_fuel_starved(&self) -> bool {
        self.capabilities.has_fuel_gate && !self.has_fuel
    }

    /// True if a breakdown gate exists and the structure is broken.
    pub fn is_broken_down(&self) -> bool {
        self.capabilities.has_breakdown_gate && self.broken_down
    }
}

/// Aggregate stored energy across every storage device on a network.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StorageSummary {
    /// Number of connected storage devices.
    pub devices: usize,
    pub stored: f32,
    pub capacity: f32,
}

impl StorageSummary {
    pub fn has_storage(&self) -> bool {
        self.devices > 0
    }

    /// Stored / capacity in [0, 1]; 0 when there is no storage.
    pub fn level(&self) -> f32 {
        if !self.has_storage() || self.capacity <= 0.0 {
            return 0.0;
        }
        (self.stored / self.capacity).clamp(0.0, 1.0)
    }
}

/// Everything the engine needs to know about a network for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSnapshot {
    pub id: NetworkId,
    pub endpoints: Vec<EndpointReading>,
    pub storage: StorageSummary,
}

impl NetworkSnapshot {
    pub fn has_storage(&self) -> bool {
        self.storage.has_storage()
    }

    pub fn storage_level(&self) -> f32 {
        self.storage.level()
    }
}

/// Read-side host queries.
pub trait NetworkView {
    /// The network a structure is currently connected to, if any.
    fn network_of(&self, endpoint: EndpointId) -> Option<NetworkId>;

    /// The current state of a network, or `None` if it no longer exists.
    fn snapshot(&self, network: NetworkId) -> Option<NetworkSnapshot>;

    /// The current state of a single endpoint, used when binding a broker.
    fn endpoint(&self, endpoint: EndpointId) -> Option<EndpointReading>;
}

/// Write-side host command.
pub trait PowerActuator {
    /// Switch a generator on or off. Must be a no-op if it is already in the
    /// requested state.
    fn set_power_state(&mut self, generator: EndpointId, on: bool);
}
