//! The balancing loop: decides which backup generators to start and stop.

use rand::seq::IndexedRandom;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, trace, warn};

use crate::broker::StorageTargetRange;
use crate::host::{EndpointId, NetworkView, PowerActuator};
use crate::settings::BrokerSettings;

use super::clock::is_due;
use super::power_balance::{EndpointBalance, NetworkBalance};
use super::registry::{BrokerRegistry, NetworkGroup};
use super::types::{StepResult, Tick};

/// A brokered endpoint as seen during one evaluation.
#[derive(Debug, Clone, Copy)]
struct Matched {
    id: EndpointId,
    flows: EndpointBalance,
    storage_target: StorageTargetRange,
    run_on_batteries_only: bool,
    can_stop: bool,
}

/// Drives every registered broker of a domain.
///
/// Each due tick the engine groups brokers by network and, per network,
/// stops at most one running generator and starts at most one idle one.
/// Picks are weighted random: small producers are stopped first, large
/// potential producers are started first.
pub struct BalanceEngine {
    settings: BrokerSettings,
    rng: StdRng,
}

impl BalanceEngine {
    /// Creates an engine with a seeded random source.
    pub fn new(settings: BrokerSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(settings: BrokerSettings, rng: StdRng) -> Self {
        Self { settings, rng }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Replaces the settings; takes effect on the next evaluation.
    pub fn set_settings(&mut self, settings: BrokerSettings) {
        self.settings = settings;
    }

    /// Runs an evaluation if `now` falls on the update interval.
    ///
    /// # Returns
    ///
    /// * `Some(results)` - One [`StepResult`] per evaluated network
    /// * `None` - If the interval has not elapsed
    pub fn tick<H>(
        &mut self,
        now: Tick,
        registry: &mut BrokerRegistry,
        host: &mut H,
    ) -> Option<Vec<StepResult>>
    where
        H: NetworkView + PowerActuator,
    {
        if !is_due(now, self.settings.update_interval) {
            return None;
        }
        Some(self.evaluate(now, registry, host))
    }

    /// Evaluates every network that has at least one resolvable broker.
    pub fn evaluate<H>(
        &mut self,
        now: Tick,
        registry: &mut BrokerRegistry,
        host: &mut H,
    ) -> Vec<StepResult>
    where
        H: NetworkView + PowerActuator,
    {
        let groups = registry.group_by_network(&*host);
        groups
            .iter()
            .filter_map(|group| self.evaluate_network(now, group, registry, host))
            .collect()
    }

    /// Applies the shutdown and startup policies to one network.
    ///
    /// Returns `None` if the network vanished since it was grouped.
    pub fn evaluate_network<H>(
        &mut self,
        now: Tick,
        group: &NetworkGroup,
        registry: &mut BrokerRegistry,
        host: &mut H,
    ) -> Option<StepResult>
    where
        H: NetworkView + PowerActuator,
    {
        let snapshot = host.snapshot(group.network)?;
        let balance = NetworkBalance::of(&snapshot);
        let minimum_on_time = self.settings.minimum_on_time;

        let matched: Vec<Matched> = snapshot
            .endpoints
            .iter()
            .filter(|reading| group.brokers.contains(&reading.id))
            .filter_map(|reading| {
                let broker = registry.get(reading.id)?;
                Some(Matched {
                    id: reading.id,
                    flows: EndpointBalance::of(reading),
                    storage_target: broker.storage_target,
                    run_on_batteries_only: broker.run_on_batteries_only,
                    can_stop: broker.can_stop(now, minimum_on_time),
                })
            })
            .collect();

        trace!(
            network = %group.network,
            need = balance.need,
            production = balance.production,
            has_storage = balance.has_storage,
            storage_level = balance.storage_level,
            brokers = matched.len(),
            "network balance"
        );

        let mut result = StepResult {
            tick: now,
            network: group.network,
            need: balance.need,
            production: balance.production,
            has_storage: balance.has_storage,
            storage_level: balance.storage_level,
            brokers: matched.len(),
            shutdown_candidates: 0,
            startup_candidates: 0,
            stopped: None,
            started: None,
        };

        if balance.wants_shutdown_pass() {
            let candidates = shutdown_candidates(&balance, &matched);
            result.shutdown_candidates = candidates.len();
            if let Some(id) = self.pick(&candidates) {
                if let Some(broker) = registry.get(id) {
                    debug!(network = %group.network, generator = %id, "shutdown pick");
                    broker.stop(&mut *host);
                    result.stopped = Some(id);
                }
            }
        }

        if balance.wants_startup_pass() {
            let candidates = startup_candidates(&balance, &matched);
            result.startup_candidates = candidates.len();
            if let Some(id) = self.pick(&candidates) {
                if let Some(broker) = registry.get_mut(id) {
                    debug!(network = %group.network, generator = %id, "startup pick");
                    broker.start(now, &mut *host);
                    result.started = Some(id);
                }
            }
        }

        Some(result)
    }

    /// Weighted random pick; `None` for an empty or degenerate candidate set.
    fn pick(&mut self, candidates: &[(EndpointId, f32)]) -> Option<EndpointId> {
        if candidates.is_empty() {
            return None;
        }
        match candidates.choose_weighted(&mut self.rng, |c: &(EndpointId, f32)| c.1) {
            Ok((id, _)) => Some(*id),
            Err(err) => {
                warn!(%err, candidates = candidates.len(), "no weighted pick");
                None
            }
        }
    }
}

/// Running brokers that may be stopped, weighted `1 / current_production`.
///
/// Without storage the level reads 0, so a batteries-only broker only
/// qualifies if its upper target is 0 as well.
fn shutdown_candidates(balance: &NetworkBalance, matched: &[Matched]) -> Vec<(EndpointId, f32)> {
    let surplus = balance.surplus();
    matched
        .iter()
        .filter(|m| {
            let current = m.flows.current_production;
            current > 0.0
                && (current <= surplus || m.run_on_batteries_only)
                && ((!balance.has_storage && !m.run_on_batteries_only)
                    || balance.storage_level >= m.storage_target.high())
                && m.can_stop
        })
        .map(|m| (m.id, 1.0 / m.flows.current_production))
        .collect()
}

/// Idle brokers that could produce, weighted by `potential_production`.
fn startup_candidates(balance: &NetworkBalance, matched: &[Matched]) -> Vec<(EndpointId, f32)> {
    matched
        .iter()
        .filter(|m| {
            m.flows.current_production.abs() < f32::EPSILON
                && m.flows.potential_production > 0.0
                && (!balance.has_storage || balance.storage_level <= m.storage_target.low())
        })
        .map(|m| (m.id, m.flows.potential_production))
        .collect()
}
