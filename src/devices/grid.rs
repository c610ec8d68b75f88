//! In-memory host: networks of loads, solar arrays, storage and generators.
//!
//! [`SimGrid`] is the reference implementation of the host boundary. It
//! settles each network once per tick and answers the engine's queries from
//! the settled state.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::devices::types::{Device, DeviceContext};
use crate::devices::{BaseLoad, Battery, Generator, SolarPv};
use crate::error::GridError;
use crate::host::{
    Capabilities, EndpointId, EndpointReading, NetworkId, NetworkSnapshot, NetworkView,
    PowerActuator, StorageSummary,
};

/// Tolerance below which an unserved remainder counts as served.
const SERVED_EPS_KW: f32 = 1e-4;

#[derive(Debug, Clone)]
enum Endpoint {
    Load(BaseLoad),
    Solar(SolarPv),
    Generator(Generator),
}

impl Endpoint {
    fn reading(&self, id: EndpointId) -> EndpointReading {
        match self {
            Endpoint::Load(load) => EndpointReading {
                id,
                capabilities: Capabilities::default(),
                is_on: load.is_powered(),
                wants_on: true,
                power_flow: -load.demand_kw(),
                desired_output: 0.0,
                has_fuel: true,
                broken_down: false,
            },
            Endpoint::Solar(pv) => EndpointReading {
                id,
                capabilities: Capabilities {
                    is_generator: true,
                    ..Capabilities::default()
                },
                is_on: true,
                wants_on: true,
                power_flow: pv.output_kw(),
                desired_output: pv.output_kw(),
                has_fuel: true,
                broken_down: false,
            },
            Endpoint::Generator(generator) => generator.reading(id),
        }
    }

    fn device_type(&self) -> &'static str {
        match self {
            Endpoint::Load(load) => load.device_type(),
            Endpoint::Solar(pv) => pv.device_type(),
            Endpoint::Generator(generator) => generator.device_type(),
        }
    }
}

/// Energy flows of one network on the last settled tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkFlows {
    pub demand_kw: f32,
    pub supply_kw: f32,
    /// Positive while charging storage, negative while discharging.
    pub storage_kw: f32,
    /// Demand neither supply nor storage could cover.
    pub unserved_kw: f32,
}

#[derive(Debug, Clone, Default)]
struct Network {
    name: String,
    batteries: Vec<Battery>,
    flows: NetworkFlows,
}

/// A set of isolated power networks.
///
/// Endpoint ids are allocated sequentially and never reused. Batteries are
/// not endpoints; they only show up in each network's storage summary.
#[derive(Debug, Clone, Default)]
pub struct SimGrid {
    networks: BTreeMap<NetworkId, Network>,
    endpoints: BTreeMap<EndpointId, Endpoint>,
    membership: BTreeMap<EndpointId, NetworkId>,
    next_network: u32,
    next_endpoint: u32,
}

impl SimGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty network.
    pub fn add_network(&mut self, name: impl Into<String>) -> NetworkId {
        let id = NetworkId(self.next_network);
        self.next_network += 1;
        self.networks.insert(
            id,
            Network {
                name: name.into(),
                ..Network::default()
            },
        );
        id
    }

    pub fn network_name(&self, network: NetworkId) -> Option<&str> {
        self.networks.get(&network).map(|n| n.name.as_str())
    }

    pub fn network_ids(&self) -> impl Iterator<Item = NetworkId> + '_ {
        self.networks.keys().copied()
    }

    pub fn add_load(&mut self, network: NetworkId, load: BaseLoad) -> Result<EndpointId, GridError> {
        self.add_endpoint(network, Endpoint::Load(load))
    }

    pub fn add_solar(&mut self, network: NetworkId, pv: SolarPv) -> Result<EndpointId, GridError> {
        self.add_endpoint(network, Endpoint::Solar(pv))
    }

    pub fn add_generator(
        &mut self,
        network: NetworkId,
        generator: Generator,
    ) -> Result<EndpointId, GridError> {
        self.add_endpoint(network, Endpoint::Generator(generator))
    }

    pub fn add_battery(&mut self, network: NetworkId, battery: Battery) -> Result<(), GridError> {
        let net = self
            .networks
            .get_mut(&network)
            .ok_or(GridError::UnknownNetwork(network))?;
        debug!(%network, device = battery.device_type(), "storage added");
        net.batteries.push(battery);
        Ok(())
    }

    fn add_endpoint(
        &mut self,
        network: NetworkId,
        endpoint: Endpoint,
    ) -> Result<EndpointId, GridError> {
        if !self.networks.contains_key(&network) {
            return Err(GridError::UnknownNetwork(network));
        }
        let id = EndpointId(self.next_endpoint);
        self.next_endpoint += 1;
        debug!(endpoint = %id, %network, device = endpoint.device_type(), "endpoint added");
        self.endpoints.insert(id, endpoint);
        self.membership.insert(id, network);
        Ok(id)
    }

    pub fn generator(&self, id: EndpointId) -> Option<&Generator> {
        match self.endpoints.get(&id) {
            Some(Endpoint::Generator(g)) => Some(g),
            _ => None,
        }
    }

    pub fn generator_mut(&mut self, id: EndpointId) -> Option<&mut Generator> {
        match self.endpoints.get_mut(&id) {
            Some(Endpoint::Generator(g)) => Some(g),
            _ => None,
        }
    }

    /// Connects an endpoint to a network, moving it off its current one or
    /// reconnecting it after [`SimGrid::disconnect`].
    ///
    /// # Errors
    ///
    /// Fails if either the endpoint or the target network is unknown.
    pub fn move_endpoint(&mut self, id: EndpointId, to: NetworkId) -> Result<(), GridError> {
        if !self.networks.contains_key(&to) {
            return Err(GridError::UnknownNetwork(to));
        }
        let device = self
            .endpoints
            .get(&id)
            .ok_or(GridError::UnknownEndpoint(id))?
            .device_type();
        let from = self.membership.insert(id, to);
        debug!(endpoint = %id, device, ?from, %to, "endpoint moved");
        Ok(())
    }

    /// Disconnects an endpoint without destroying it.
    pub fn disconnect(&mut self, id: EndpointId) -> Result<(), GridError> {
        if !self.endpoints.contains_key(&id) {
            return Err(GridError::UnknownEndpoint(id));
        }
        self.membership.remove(&id);
        Ok(())
    }

    /// Removes an endpoint entirely.
    pub fn destroy(&mut self, id: EndpointId) -> Result<(), GridError> {
        let endpoint = self
            .endpoints
            .remove(&id)
            .ok_or(GridError::UnknownEndpoint(id))?;
        self.membership.remove(&id);
        info!(endpoint = %id, device = endpoint.device_type(), "endpoint destroyed");
        Ok(())
    }

    /// Flows of a network on the last settled tick.
    pub fn flows(&self, network: NetworkId) -> Option<NetworkFlows> {
        self.networks.get(&network).map(|n| n.flows)
    }

    /// Advances every device one tick and settles each network.
    ///
    /// Surplus charges storage and storage covers deficits. If a deficit
    /// remains, every load on the network browns out for the tick.
    pub fn advance(&mut self, context: &DeviceContext) {
        let mut demand: BTreeMap<NetworkId, f32> = BTreeMap::new();
        let mut supply: BTreeMap<NetworkId, f32> = BTreeMap::new();

        for (id, endpoint) in self.endpoints.iter_mut() {
            let Some(network) = self.membership.get(id).copied() else {
                continue;
            };
            match endpoint {
                Endpoint::Load(load) => {
                    *demand.entry(network).or_default() += load.power_kw(context);
                }
                Endpoint::Solar(pv) => {
                    *supply.entry(network).or_default() += pv.power_kw(context);
                }
                Endpoint::Generator(g) => {
                    *supply.entry(network).or_default() += g.power_kw(context);
                }
            }
        }

        for (id, net) in self.networks.iter_mut() {
            let demand_kw = demand.get(id).copied().unwrap_or(0.0);
            let supply_kw = supply.get(id).copied().unwrap_or(0.0);
            let mut remaining = supply_kw - demand_kw;
            let mut storage_kw = 0.0;

            for battery in net.batteries.iter_mut() {
                if remaining.abs() <= SERVED_EPS_KW {
                    break;
                }
                let actual = battery.power_kw(&context.with_setpoint(remaining));
                storage_kw += actual;
                remaining -= actual;
            }

            let unserved_kw = if remaining < -SERVED_EPS_KW {
                -remaining
            } else {
                0.0
            };
            net.flows = NetworkFlows {
                demand_kw,
                supply_kw,
                storage_kw,
                unserved_kw,
            };
        }

        for (id, endpoint) in self.endpoints.iter_mut() {
            if let Endpoint::Load(load) = endpoint {
                let powered = self
                    .membership
                    .get(id)
                    .and_then(|n| self.networks.get(n))
                    .is_some_and(|n| n.flows.unserved_kw == 0.0);
                load.set_powered(powered);
            }
        }
    }

    fn storage_of(network: &Network) -> StorageSummary {
        StorageSummary {
            devices: network.batteries.len(),
            stored: network.batteries.iter().map(Battery::stored_kwh).sum(),
            capacity: network.batteries.iter().map(|b| b.capacity_kwh).sum(),
        }
    }
}

impl NetworkView for SimGrid {
    fn network_of(&self, endpoint: EndpointId) -> Option<NetworkId> {
        self.membership.get(&endpoint).copied()
    }

    fn snapshot(&self, network: NetworkId) -> Option<NetworkSnapshot> {
        let net = self.networks.get(&network)?;
        let endpoints = self
            .membership
            .iter()
            .filter(|(_, n)| **n == network)
            .filter_map(|(id, _)| self.endpoints.get(id).map(|e| e.reading(*id)))
            .collect();
        Some(NetworkSnapshot {
            id: network,
            endpoints,
            storage: Self::storage_of(net),
        })
    }

    fn endpoint(&self, endpoint: EndpointId) -> Option<EndpointReading> {
        self.endpoints.get(&endpoint).map(|e| e.reading(endpoint))
    }
}

impl PowerActuator for SimGrid {
    fn set_power_state(&mut self, generator: EndpointId, on: bool) {
        if let Some(g) = self.generator_mut(generator) {
            if g.is_switched_on() != on {
                debug!(generator = %generator, on, "switch flicked");
                g.set_switch(on);
            }
        }
    }
}
