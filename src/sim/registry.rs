//! Per-domain set of live brokers.
//!
//! One registry exists per domain (a map, a region, a simulated world). It is
//! an ordinary value owned by whoever drives that domain, so independent
//! domains never share broker state.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use crate::broker::{BrokerState, GeneratorBroker};
use crate::error::{BindError, ErrorOnce, RegistryError};
use crate::host::{EndpointId, NetworkId, NetworkView};

/// Brokers that currently resolve to the same network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkGroup {
    pub network: NetworkId,
    pub brokers: Vec<EndpointId>,
}

/// Live brokers of one domain, keyed by generator identity.
#[derive(Debug, Default)]
pub struct BrokerRegistry {
    domain: String,
    brokers: BTreeMap<EndpointId, GeneratorBroker>,
    reported: ErrorOnce,
}

impl BrokerRegistry {
    /// Creates an empty registry for a domain. The label only appears in logs.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            brokers: BTreeMap::new(),
            reported: ErrorOnce::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn len(&self) -> usize {
        self.brokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }

    pub fn contains(&self, id: EndpointId) -> bool {
        self.brokers.contains_key(&id)
    }

    pub fn get(&self, id: EndpointId) -> Option<&GeneratorBroker> {
        self.brokers.get(&id)
    }

    pub fn get_mut(&mut self, id: EndpointId) -> Option<&mut GeneratorBroker> {
        self.brokers.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratorBroker> {
        self.brokers.values()
    }

    /// Adds a broker.
    ///
    /// With `force_regroup`, any entry for the same generator is replaced;
    /// this is how a reconnected generator gets regrouped. Without it, a
    /// duplicate is reported and the existing entry is kept.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateBroker`] when the identity is already present
    /// and `force_regroup` is false. The error has already been logged.
    pub fn register(
        &mut self,
        broker: GeneratorBroker,
        force_regroup: bool,
    ) -> Result<(), RegistryError> {
        let id = broker.id();
        if force_regroup {
            self.brokers.remove(&id);
        } else if self.brokers.contains_key(&id) {
            let err = RegistryError::DuplicateBroker(id);
            self.reported.report(&err);
            return Err(err);
        }
        debug!(domain = %self.domain, generator = %id, "registered broker");
        self.brokers.insert(id, broker);
        Ok(())
    }

    /// Removes a broker and hands it back.
    ///
    /// # Errors
    ///
    /// [`RegistryError::MissingBroker`] when no broker is registered for `id`.
    /// The error has already been logged and the registry is unchanged.
    pub fn deregister(&mut self, id: EndpointId) -> Result<GeneratorBroker, RegistryError> {
        match self.brokers.remove(&id) {
            Some(broker) => {
                debug!(domain = %self.domain, generator = %id, "deregistered broker");
                Ok(broker)
            }
            None => {
                let err = RegistryError::MissingBroker(id);
                self.reported.report(&err);
                Err(err)
            }
        }
    }

    /// Groups brokers by the network their generator is connected to right
    /// now. Brokers whose generator has no network are left out.
    pub fn group_by_network(&self, view: &impl NetworkView) -> Vec<NetworkGroup> {
        let mut groups: BTreeMap<NetworkId, Vec<EndpointId>> = BTreeMap::new();
        for id in self.brokers.keys() {
            if let Some(network) = view.network_of(*id) {
                groups.entry(network).or_default().push(*id);
            }
        }
        groups
            .into_iter()
            .map(|(network, brokers)| NetworkGroup { network, brokers })
            .collect()
    }

    /// Binds a new broker to `generator` and registers it.
    ///
    /// # Errors
    ///
    /// Returns the [`BindError`] if the structure cannot host a broker. A
    /// duplicate registration is logged but not returned.
    pub fn attach(
        &mut self,
        view: &impl NetworkView,
        generator: EndpointId,
        state: BrokerState,
    ) -> Result<(), BindError> {
        let broker = GeneratorBroker::bind_to(view, generator, state)?;
        let _ = self.register(broker, false);
        Ok(())
    }

    /// Re-binds the broker for `generator` after its structure changed,
    /// keeping its configuration and forcing a regroup.
    ///
    /// If the generator can no longer be bound, the broker is detached with a
    /// warning and the bind error is returned.
    pub fn reattach(
        &mut self,
        view: &impl NetworkView,
        generator: EndpointId,
    ) -> Result<(), BindError> {
        let state = self
            .get(generator)
            .map(GeneratorBroker::state)
            .unwrap_or_default();
        let last_start = self.get(generator).and_then(GeneratorBroker::last_start_tick);
        match GeneratorBroker::bind_to(view, generator, state) {
            Ok(mut broker) => {
                if let Some(tick) = last_start {
                    broker.restore_last_start(tick);
                }
                let _ = self.register(broker, true);
                Ok(())
            }
            Err(err) => {
                warn!(
                    domain = %self.domain,
                    generator = %generator,
                    "backup power attachment removed: {err}"
                );
                self.detach(generator);
                Err(err)
            }
        }
    }

    /// Deregisters `generator` and carries on if that fails.
    ///
    /// A missing broker was already reported once by [`Self::deregister`];
    /// anything else is logged in full.
    pub fn detach(&mut self, generator: EndpointId) -> Option<GeneratorBroker> {
        match self.deregister(generator) {
            Ok(broker) => Some(broker),
            Err(RegistryError::MissingBroker(_)) => None,
            Err(err) => {
                error!(domain = %self.domain, ?err, "error deregistering broker");
                None
            }
        }
    }

    /// Detaches every broker. Used on domain unload; never aborts part way.
    pub fn teardown(&mut self) -> usize {
        let ids: Vec<EndpointId> = self.brokers.keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.detach(*id).is_some())
            .count()
    }
}
