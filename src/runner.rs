//! Runs a scenario end to end on the in-memory grid.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::broker::BrokerState;
use crate::config::{EventAction, EventConfig, ScenarioConfig};
use crate::devices::{BaseLoad, Battery, DeviceContext, Generator, SimGrid, SolarPv};
use crate::error::GridError;
use crate::host::{EndpointId, NetworkId};
use crate::sim::clock::Clock;
use crate::sim::engine::BalanceEngine;
use crate::sim::kpi::KpiReport;
use crate::sim::registry::BrokerRegistry;
use crate::sim::types::{SimConfig, StepResult};

/// Registry domain used for scenario runs.
pub const SCENARIO_DOMAIN: &str = "scenario";

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// One record per network per evaluation, in tick order.
    pub results: Vec<StepResult>,
    pub kpi: KpiReport,
    /// Brokers still attached when the run ended, before teardown.
    pub active_brokers: usize,
}

/// Name-to-id lookups for replaying events.
#[derive(Debug, Default)]
struct Names {
    networks: HashMap<String, NetworkId>,
    generators: HashMap<String, EndpointId>,
}

/// Builds the grid and attaches a broker to every managed generator.
///
/// Device seeds are derived from the master seed in declaration order.
fn build(config: &ScenarioConfig, registry: &mut BrokerRegistry) -> Result<(SimGrid, Names), GridError> {
    let mut grid = SimGrid::new();
    let mut names = Names::default();
    let mut seeds = (1..).map(|i: u64| config.simulation.seed.wrapping_add(i));
    let mut next_seed = || seeds.next().unwrap_or_default();

    for net in &config.networks {
        let network = grid.add_network(net.name.clone());
        names.networks.insert(net.name.clone(), network);

        for l in &net.loads {
            let load = BaseLoad::new(l.base_kw, l.amp_kw, l.phase_rad, l.noise_std, next_seed());
            grid.add_load(network, load)?;
        }
        for s in &net.solar {
            let pv = SolarPv::new(s.kw_peak, s.sunrise_hr, s.sunset_hr, s.noise_std, next_seed());
            grid.add_solar(network, pv)?;
        }
        for b in &net.batteries {
            let battery = Battery::new(
                b.capacity_kwh,
                b.initial_soc,
                b.max_charge_kw,
                b.max_discharge_kw,
                b.eta_charge,
                b.eta_discharge,
            );
            grid.add_battery(network, battery)?;
        }
        for g in &net.generators {
            let generator = Generator::new(
                g.rated_kw,
                g.fuel_hours,
                g.breakdown_chance_per_day,
                g.repair_hours,
                next_seed(),
            );
            let id = grid.add_generator(network, generator)?;
            names.generators.insert(g.name.clone(), id);

            if g.managed {
                let state = BrokerState {
                    storage_target: g.storage_target,
                    run_on_batteries_only: g.run_on_batteries_only,
                };
                if let Err(err) = registry.attach(&grid, id, state) {
                    warn!(generator = %g.name, %err, "could not attach broker");
                }
            }
        }
    }

    Ok((grid, names))
}

/// Applies one scripted event, then rebinds the affected broker so the
/// registry follows the structure change.
fn apply_event(event: &EventConfig, names: &Names, grid: &mut SimGrid, registry: &mut BrokerRegistry) {
    let Some(&id) = names.generators.get(&event.generator) else {
        warn!(generator = %event.generator, "event for unknown generator skipped");
        return;
    };
    info!(
        tick = event.at_tick,
        generator = %event.generator,
        action = ?event.action,
        "applying event"
    );

    let outcome = match event.action {
        EventAction::Destroy => grid.destroy(id),
        EventAction::Move => {
            let target = event
                .network
                .as_ref()
                .and_then(|name| names.networks.get(name).copied());
            match target {
                Some(network) => grid.move_endpoint(id, network),
                None => {
                    warn!(generator = %event.generator, "move without a known target network");
                    return;
                }
            }
        }
        EventAction::BreakDown => match grid.generator_mut(id) {
            Some(g) => {
                g.break_down();
                Ok(())
            }
            None => Err(GridError::NotAGenerator(id)),
        },
        EventAction::Refuel => match grid.generator_mut(id) {
            Some(g) => {
                g.refuel(event.hours.unwrap_or(0.0));
                Ok(())
            }
            None => Err(GridError::NotAGenerator(id)),
        },
    };

    if let Err(err) = outcome {
        warn!(generator = %event.generator, %err, "event failed");
        return;
    }

    if matches!(event.action, EventAction::Destroy | EventAction::Move) && registry.contains(id) {
        // a failed rebind detaches the broker and has already been logged
        let _ = registry.reattach(&*grid, id);
    }
}

/// Runs a scenario to completion.
///
/// Each tick replays due events, advances the grid, then lets the engine
/// evaluate. All brokers are torn down at the end of the run.
///
/// # Errors
///
/// Returns a [`GridError`] if the grid cannot be built from `config`.
///
/// # Panics
///
/// Panics if `ticks_per_day` or `days` is zero; call
/// [`ScenarioConfig::validate`] first.
pub fn run_scenario(config: &ScenarioConfig) -> Result<SimulationResult, GridError> {
    let sim = SimConfig::new(
        config.simulation.ticks_per_day,
        config.simulation.days,
        config.simulation.seed,
    );
    let mut registry = BrokerRegistry::new(SCENARIO_DOMAIN);
    let (mut grid, names) = build(config, &mut registry)?;
    let mut engine = BalanceEngine::new(config.settings.clamped(), sim.seed);

    info!(
        networks = config.networks.len(),
        generators = names.generators.len(),
        brokers = registry.len(),
        ticks = sim.total_ticks(),
        "scenario built"
    );

    let mut events: Vec<&EventConfig> = config.events.iter().collect();
    events.sort_by_key(|e| e.at_tick);
    let mut pending = events.into_iter().peekable();

    let mut results = Vec::new();
    let mut unserved_kwh = 0.0_f32;
    let mut brownout_ticks = 0_usize;

    let mut clock = Clock::new(sim.total_ticks());
    clock.run(|t| {
        while let Some(event) = pending.next_if(|e| e.at_tick <= t) {
            apply_event(event, &names, &mut grid, &mut registry);
        }

        grid.advance(&DeviceContext::new(t, &sim));
        for network in grid.network_ids() {
            if let Some(flows) = grid.flows(network) {
                if flows.unserved_kw > 0.0 {
                    brownout_ticks += 1;
                    unserved_kwh += flows.unserved_kw * sim.dt_hours;
                }
            }
        }

        if let Some(evaluated) = engine.tick(t, &mut registry, &mut grid) {
            for r in &evaluated {
                debug!("{r}");
            }
            results.extend(evaluated);
        }
    });

    let active_brokers = registry.len();
    let detached = registry.teardown();
    debug!(detached, "brokers torn down");

    let kpi = KpiReport::from_results(&results, unserved_kwh, brownout_ticks);
    Ok(SimulationResult {
        results,
        kpi,
        active_brokers,
    })
}
