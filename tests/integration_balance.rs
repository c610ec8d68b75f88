mod common;

use backup_power::host::EndpointId;
use backup_power::settings::BrokerSettings;
use backup_power::sim::BalanceEngine;

use common::{ScriptedHost, default_settings, generator, load, registry_for, state, unmanaged_supply};

#[test]
fn oversized_generator_is_not_stopped_without_storage() {
    // need 100, production 150, broker produces 80: surplus of 50 cannot absorb it
    let mut host = ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, load(10, 100.0))
        .with_endpoint(1, unmanaged_supply(11, 70.0))
        .with_endpoint(1, generator(1, 80.0, true));
    let mut registry = registry_for(&host, &[1], state(0.0, 1.0, false));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    let results = engine.evaluate(0, &mut registry, &mut host);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].need, 100.0);
    assert_eq!(results[0].production, 150.0);
    assert_eq!(results[0].stopped, None);
    assert!(host.stops().is_empty());
}

#[test]
fn generator_fitting_the_surplus_is_stopped() {
    let mut host = ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, load(10, 100.0))
        .with_endpoint(1, unmanaged_supply(11, 110.0))
        .with_endpoint(1, generator(1, 40.0, true));
    let mut registry = registry_for(&host, &[1], state(0.0, 1.0, false));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    let results = engine.evaluate(0, &mut registry, &mut host);

    assert_eq!(results[0].stopped, Some(EndpointId(1)));
    assert_eq!(host.stops(), vec![EndpointId(1)]);
    assert!(!host.reading(EndpointId(1)).map(|r| r.is_on).unwrap_or(true));
}

#[test]
fn full_storage_stops_generator_even_in_deficit() {
    let mut host = ScriptedHost::new()
        .with_network(1, Some(0.9))
        .with_endpoint(1, load(10, 100.0))
        .with_endpoint(1, generator(1, 30.0, true));
    let mut registry = registry_for(&host, &[1], state(0.2, 0.8, true));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    let results = engine.evaluate(0, &mut registry, &mut host);

    assert!(results[0].in_deficit());
    assert_eq!(results[0].stopped, Some(EndpointId(1)));
    assert_eq!(results[0].started, None);
}

#[test]
fn full_storage_stops_generator_in_surplus() {
    let mut host = ScriptedHost::new()
        .with_network(1, Some(0.9))
        .with_endpoint(1, load(10, 10.0))
        .with_endpoint(1, generator(1, 30.0, true));
    let mut registry = registry_for(&host, &[1], state(0.2, 0.8, true));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    let results = engine.evaluate(0, &mut registry, &mut host);
    assert_eq!(results[0].stopped, Some(EndpointId(1)));
}

#[test]
fn deficit_starts_exactly_one_generator() {
    let mut host = deficit_host();
    let mut registry = registry_for(&host, &[1, 2], state(0.0, 1.0, true));
    let mut engine = BalanceEngine::new(default_settings(), 3);

    let results = engine.evaluate(0, &mut registry, &mut host);

    assert_eq!(results[0].startup_candidates, 2);
    assert_eq!(host.starts().len(), 1);
    let started = results[0].started.expect("one generator should start");
    assert_eq!(
        registry.get(started).and_then(|b| b.last_start_tick()),
        Some(0)
    );
}

#[test]
fn larger_potential_is_started_proportionally_more_often() {
    const TRIALS: u64 = 4000;
    let mut big = 0;
    for seed in 0..TRIALS {
        let mut host = deficit_host();
        let mut registry = registry_for(&host, &[1, 2], state(0.0, 1.0, true));
        let mut engine = BalanceEngine::new(default_settings(), seed);
        let results = engine.evaluate(0, &mut registry, &mut host);
        if results[0].started == Some(EndpointId(2)) {
            big += 1;
        }
    }
    let share = big as f64 / TRIALS as f64;
    assert!(
        (share - 7.0 / 11.0).abs() < 0.04,
        "70 kW generator started in {share:.3} of trials"
    );
}

#[test]
fn missing_broker_is_reported_not_propagated() {
    let host = deficit_host();
    let mut registry = registry_for(&host, &[1, 2], state(0.0, 1.0, true));

    assert!(registry.detach(EndpointId(99)).is_none());
    assert_eq!(registry.len(), 2);
    assert!(registry.deregister(EndpointId(99)).is_err());
    assert_eq!(registry.len(), 2);
}

#[test]
fn balanced_network_without_storage_is_left_alone() {
    let mut host = ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, load(10, 50.0))
        .with_endpoint(1, generator(1, 50.0, true))
        .with_endpoint(1, generator(2, 20.0, false));
    let mut registry = registry_for(&host, &[1, 2], state(0.0, 1.0, false));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    let results = engine.evaluate(0, &mut registry, &mut host);

    assert_eq!(results[0].shutdown_candidates, 0);
    assert_eq!(results[0].startup_candidates, 0);
    assert!(host.commands.is_empty());
}

#[test]
fn batteries_only_generator_keeps_running_without_storage() {
    let mut host = ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, load(10, 5.0))
        .with_endpoint(1, unmanaged_supply(11, 500.0))
        .with_endpoint(1, generator(1, 10.0, true));
    let mut registry = registry_for(&host, &[1], state(0.0, 1.0, true));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    for tick in (0..6000).step_by(60) {
        engine.tick(tick, &mut registry, &mut host);
    }
    assert!(host.stops().is_empty());
}

#[test]
fn generator_runs_for_the_minimum_on_time() {
    let mut host = ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, unmanaged_supply(11, 500.0))
        .with_endpoint(1, generator(1, 50.0, false));
    let mut registry = registry_for(&host, &[1], state(0.0, 1.0, false));
    let settings = BrokerSettings {
        update_interval: 60,
        minimum_on_time: 600,
    };
    let mut engine = BalanceEngine::new(settings, 1);

    if let Some(broker) = registry.get_mut(EndpointId(1)) {
        broker.start(0, &mut host);
    }

    let mut stopped_at = None;
    for tick in 1..=1200 {
        let stopped = engine
            .tick(tick, &mut registry, &mut host)
            .and_then(|results| results[0].stopped);
        if stopped.is_some() {
            stopped_at = Some(tick);
            break;
        }
    }
    assert_eq!(stopped_at, Some(600));
}

#[test]
fn engine_only_runs_on_interval_ticks() {
    let mut host = deficit_host();
    let mut registry = registry_for(&host, &[1, 2], state(0.0, 1.0, true));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    assert!(engine.tick(59, &mut registry, &mut host).is_none());
    assert!(host.commands.is_empty());
    assert!(engine.tick(120, &mut registry, &mut host).is_some());
}

#[test]
fn each_network_is_balanced_independently() {
    let mut host = ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, load(10, 100.0))
        .with_endpoint(1, generator(1, 40.0, false))
        .with_network(2, None)
        .with_endpoint(2, load(20, 100.0))
        .with_endpoint(2, generator(2, 40.0, false))
        .with_endpoint(2, generator(3, 40.0, false));
    let mut registry = registry_for(&host, &[1, 2, 3], state(0.0, 1.0, true));
    let mut engine = BalanceEngine::new(default_settings(), 1);

    let results = engine.evaluate(0, &mut registry, &mut host);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].brokers, 1);
    assert_eq!(results[1].brokers, 2);
    assert_eq!(host.starts().len(), 2);
    assert!(host.starts().contains(&EndpointId(1)));
}

#[test]
fn broker_whose_network_vanished_is_skipped() {
    let mut host = deficit_host();
    let mut registry = registry_for(&host, &[1, 2], state(0.0, 1.0, true));
    host.remove_network(1);
    let mut engine = BalanceEngine::new(default_settings(), 1);

    assert!(engine.evaluate(0, &mut registry, &mut host).is_empty());
    assert_eq!(registry.len(), 2);
}

/// need 100, production 60 from an unmanaged source, idle generators of
/// 40 and 70 kW with ids 1 and 2.
fn deficit_host() -> ScriptedHost {
    ScriptedHost::new()
        .with_network(1, None)
        .with_endpoint(1, load(10, 100.0))
        .with_endpoint(1, unmanaged_supply(11, 60.0))
        .with_endpoint(1, generator(1, 40.0, false))
        .with_endpoint(1, generator(2, 70.0, false))
}
