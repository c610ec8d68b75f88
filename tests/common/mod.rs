//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

use backup_power::broker::BrokerState;
use backup_power::host::{
    Capabilities, EndpointId, EndpointReading, NetworkId, NetworkSnapshot, NetworkView,
    PowerActuator, StorageSummary,
};
use backup_power::settings::BrokerSettings;
use backup_power::sim::BrokerRegistry;

/// A host whose readings are set by hand.
///
/// Switching a generator updates its reading the way a real plant would on
/// the next tick: on means `power_flow = desired_output`, off means zero.
#[derive(Debug, Default, Clone)]
pub struct ScriptedHost {
    pub networks: BTreeMap<NetworkId, NetworkSnapshot>,
    /// Every command issued, in order.
    pub commands: Vec<(EndpointId, bool)>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a network; `storage` is the level of a single 100 kWh bank.
    pub fn with_network(mut self, id: u32, storage: Option<f32>) -> Self {
        let summary = match storage {
            Some(level) => StorageSummary {
                devices: 1,
                stored: level * 100.0,
                capacity: 100.0,
            },
            None => StorageSummary::default(),
        };
        self.networks.insert(
            NetworkId(id),
            NetworkSnapshot {
                id: NetworkId(id),
                endpoints: Vec::new(),
                storage: summary,
            },
        );
        self
    }

    pub fn with_endpoint(mut self, network: u32, reading: EndpointReading) -> Self {
        if let Some(net) = self.networks.get_mut(&NetworkId(network)) {
            net.endpoints.push(reading);
        }
        self
    }

    pub fn reading(&self, id: EndpointId) -> Option<&EndpointReading> {
        self.networks
            .values()
            .flat_map(|n| n.endpoints.iter())
            .find(|r| r.id == id)
    }

    pub fn remove_network(&mut self, id: u32) {
        self.networks.remove(&NetworkId(id));
    }

    pub fn starts(&self) -> Vec<EndpointId> {
        self.commands.iter().filter(|c| c.1).map(|c| c.0).collect()
    }

    pub fn stops(&self) -> Vec<EndpointId> {
        self.commands.iter().filter(|c| !c.1).map(|c| c.0).collect()
    }
}

impl NetworkView for ScriptedHost {
    fn network_of(&self, endpoint: EndpointId) -> Option<NetworkId> {
        self.networks
            .values()
            .find(|n| n.endpoints.iter().any(|r| r.id == endpoint))
            .map(|n| n.id)
    }

    fn snapshot(&self, network: NetworkId) -> Option<NetworkSnapshot> {
        self.networks.get(&network).cloned()
    }

    fn endpoint(&self, endpoint: EndpointId) -> Option<EndpointReading> {
        self.reading(endpoint).cloned()
    }
}

impl PowerActuator for ScriptedHost {
    fn set_power_state(&mut self, generator: EndpointId, on: bool) {
        self.commands.push((generator, on));
        for net in self.networks.values_mut() {
            for r in net.endpoints.iter_mut().filter(|r| r.id == generator) {
                r.is_on = on;
                r.wants_on = on;
                r.power_flow = if on { r.desired_output } else { 0.0 };
            }
        }
    }
}

/// A consumer drawing `kw`.
pub fn load(id: u32, kw: f32) -> EndpointReading {
    EndpointReading {
        id: EndpointId(id),
        capabilities: Capabilities::default(),
        is_on: true,
        wants_on: true,
        power_flow: -kw,
        desired_output: 0.0,
        has_fuel: true,
        broken_down: false,
    }
}

/// A producer nobody can switch, delivering `kw`.
pub fn unmanaged_supply(id: u32, kw: f32) -> EndpointReading {
    EndpointReading {
        id: EndpointId(id),
        capabilities: Capabilities {
            is_generator: true,
            ..Capabilities::default()
        },
        is_on: true,
        wants_on: true,
        power_flow: kw,
        desired_output: kw,
        has_fuel: true,
        broken_down: false,
    }
}

/// A switchable generator rated `rated_kw`, running if `running`.
pub fn generator(id: u32, rated_kw: f32, running: bool) -> EndpointReading {
    EndpointReading {
        id: EndpointId(id),
        capabilities: Capabilities {
            is_generator: true,
            has_fuel_gate: true,
            has_breakdown_gate: true,
            can_actuate: true,
        },
        is_on: running,
        wants_on: running,
        power_flow: if running { rated_kw } else { 0.0 },
        desired_output: rated_kw,
        has_fuel: true,
        broken_down: false,
    }
}

pub fn state(low: f32, high: f32, run_on_batteries_only: bool) -> BrokerState {
    let mut state = BrokerState::default();
    state.storage_target.set(low, high);
    state.run_on_batteries_only = run_on_batteries_only;
    state
}

/// Attaches one broker per id with the same state.
pub fn registry_for(host: &ScriptedHost, ids: &[u32], broker_state: BrokerState) -> BrokerRegistry {
    let mut registry = BrokerRegistry::new("test");
    for id in ids {
        registry
            .attach(host, EndpointId(*id), broker_state)
            .expect("fixture generator should bind");
    }
    registry
}

/// Default interval (60) and minimum on-time (600).
pub fn default_settings() -> BrokerSettings {
    BrokerSettings::default()
}
