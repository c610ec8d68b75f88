//! Per-generator control wrapper.
//!
//! A [`GeneratorBroker`] is created when a backup-power attachment binds to a
//! host generator that can be switched remotely. It holds the player's
//! configuration for that generator and the tick of its last start, which the
//! minimum-run-time guard reads.

mod range;
mod state;

pub use range::StorageTargetRange;
pub use state::BrokerState;

use std::fmt;

use tracing::debug;

use crate::error::BindError;
use crate::host::{Capabilities, EndpointId, EndpointReading, NetworkView, PowerActuator};
use crate::sim::types::Tick;

/// Observable condition of a brokered generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerStatus {
    /// Switched off and able to run.
    Standby,
    /// Switched on.
    Running,
    /// Broken down or out of fuel; overrides the on/off bit.
    Error,
}

impl fmt::Display for BrokerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BrokerStatus::Standby => "standby",
            BrokerStatus::Running => "running",
            BrokerStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Control wrapper around one backup generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorBroker {
    generator: EndpointId,
    capabilities: Capabilities,
    /// Storage-level band this generator works towards.
    pub storage_target: StorageTargetRange,
    /// Keep running to fill storage even when production already covers need.
    pub run_on_batteries_only: bool,
    last_start_tick: Option<Tick>,
}

impl GeneratorBroker {
    /// Binds a broker to a generator reading with default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the structure does not produce power or cannot be actuated.
    pub fn bind(reading: &EndpointReading) -> Result<Self, BindError> {
        Self::bind_with_state(reading, BrokerState::default())
    }

    /// Binds a broker and applies previously persisted configuration.
    pub fn bind_with_state(reading: &EndpointReading, state: BrokerState) -> Result<Self, BindError> {
        let caps = reading.capabilities;
        if !caps.is_generator {
            return Err(BindError::NotAGenerator(reading.id));
        }
        if !caps.can_actuate {
            return Err(BindError::NotActuatable(reading.id));
        }
        Ok(Self {
            generator: reading.id,
            capabilities: caps,
            storage_target: state.storage_target,
            run_on_batteries_only: state.run_on_batteries_only,
            last_start_tick: None,
        })
    }

    /// Looks the generator up on the host and binds to it.
    pub fn bind_to(
        view: &impl NetworkView,
        generator: EndpointId,
        state: BrokerState,
    ) -> Result<Self, BindError> {
        let reading = view
            .endpoint(generator)
            .ok_or(BindError::EndpointMissing(generator))?;
        Self::bind_with_state(&reading, state)
    }

    /// Identity of the broker, equal to its bound generator's endpoint id.
    pub fn id(&self) -> EndpointId {
        self.generator
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Tick of the last start command, `None` if never started.
    pub fn last_start_tick(&self) -> Option<Tick> {
        self.last_start_tick
    }

    /// Carries the hysteresis timestamp over when a broker is re-bound.
    pub(crate) fn restore_last_start(&mut self, tick: Tick) {
        self.last_start_tick = Some(tick);
    }

    /// Clamps, reorders and stores a new storage target band.
    pub fn set_range(&mut self, low: f32, high: f32) {
        self.storage_target.set(low, high);
    }

    /// True once the generator has run for at least `minimum_on_time` ticks
    /// since its last start.
    pub fn can_stop(&self, now: Tick, minimum_on_time: Tick) -> bool {
        match self.last_start_tick {
            None => true,
            Some(started) => now.saturating_sub(started) >= minimum_on_time,
        }
    }

    /// Records the start tick and switches the generator on.
    pub fn start(&mut self, now: Tick, actuator: &mut impl PowerActuator) {
        debug!(generator = %self.generator, tick = now, "starting backup generator");
        self.last_start_tick = Some(now);
        actuator.set_power_state(self.generator, true);
    }

    /// Switches the generator off.
    pub fn stop(&self, actuator: &mut impl PowerActuator) {
        debug!(generator = %self.generator, "stopping backup generator");
        actuator.set_power_state(self.generator, false);
    }

    /// Derives the status from the generator's current reading. Never cached:
    /// fuel and breakdowns change outside the broker's control.
    pub fn status(&self, reading: &EndpointReading) -> BrokerStatus {
        if reading.is_broken_down() || reading.is_fuel_starved() {
            BrokerStatus::Error
        } else if reading.is_on {
            BrokerStatus::Running
        } else {
            BrokerStatus::Standby
        }
    }

    /// Copies configuration used by bulk "copy to" actions. Only the storage
    /// target travels; the batteries-only flag stays per generator.
    pub fn copy_config_to(&self, other: &mut GeneratorBroker) {
        other.storage_target = self.storage_target;
    }

    /// Snapshot of the persisted part of this broker.
    pub fn state(&self) -> BrokerState {
        BrokerState {
            storage_target: self.storage_target,
            run_on_batteries_only: self.run_on_batteries_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::EndpointId;

    struct Switches(Vec<(EndpointId, bool)>);

    impl PowerActuator for Switches {
        fn set_power_state(&mut self, generator: EndpointId, on: bool) {
            self.0.push((generator, on));
        }
    }

    fn generator_reading() -> EndpointReading {
        EndpointReading {
            id: EndpointId(7),
            capabilities: Capabilities {
                is_generator: true,
                has_fuel_gate: true,
                has_breakdown_gate: true,
                can_actuate: true,
            },
            is_on: false,
            wants_on: false,
            power_flow: 0.0,
            desired_output: 1000.0,
            has_fuel: true,
            broken_down: false,
        }
    }

    #[test]
    fn bind_requires_generator_and_actuator() {
        let mut reading = generator_reading();
        assert!(GeneratorBroker::bind(&reading).is_ok());

        reading.capabilities.can_actuate = false;
        assert_eq!(
            GeneratorBroker::bind(&reading),
            Err(BindError::NotActuatable(EndpointId(7)))
        );

        reading.capabilities.is_generator = false;
        assert_eq!(
            GeneratorBroker::bind(&reading),
            Err(BindError::NotAGenerator(EndpointId(7)))
        );
    }

    #[test]
    fn defaults_match_persisted_defaults() {
        let broker = GeneratorBroker::bind(&generator_reading()).expect("binds");
        assert_eq!(broker.storage_target, StorageTargetRange::FULL);
        assert!(broker.run_on_batteries_only);
        assert_eq!(broker.last_start_tick(), None);
    }

    #[test]
    fn never_started_broker_can_stop() {
        let broker = GeneratorBroker::bind(&generator_reading()).expect("binds");
        assert!(broker.can_stop(0, 600));
    }

    #[test]
    fn can_stop_respects_minimum_on_time() {
        let mut broker = GeneratorBroker::bind(&generator_reading()).expect("binds");
        let mut switches = Switches(Vec::new());
        broker.start(1000, &mut switches);

        assert!(!broker.can_stop(1000, 600));
        assert!(!broker.can_stop(1599, 600));
        assert!(broker.can_stop(1600, 600));
        assert_eq!(switches.0, vec![(EndpointId(7), true)]);
    }

    #[test]
    fn stop_issues_off_command() {
        let broker = GeneratorBroker::bind(&generator_reading()).expect("binds");
        let mut switches = Switches(Vec::new());
        broker.stop(&mut switches);
        assert_eq!(switches.0, vec![(EndpointId(7), false)]);
    }

    #[test]
    fn status_is_derived_from_reading() {
        let broker = GeneratorBroker::bind(&generator_reading()).expect("binds");
        let mut reading = generator_reading();
        assert_eq!(broker.status(&reading), BrokerStatus::Standby);

        reading.is_on = true;
        assert_eq!(broker.status(&reading), BrokerStatus::Running);

        reading.has_fuel = false;
        assert_eq!(broker.status(&reading), BrokerStatus::Error);

        reading.has_fuel = true;
        reading.broken_down = true;
        reading.is_on = false;
        assert_eq!(broker.status(&reading), BrokerStatus::Error);
    }

    #[test]
    fn copy_config_only_copies_range() {
        let mut source = GeneratorBroker::bind(&generator_reading()).expect("binds");
        source.set_range(0.3, 0.6);
        source.run_on_batteries_only = false;

        let mut target = GeneratorBroker::bind(&generator_reading()).expect("binds");
        source.copy_config_to(&mut target);

        assert_eq!(target.storage_target, StorageTargetRange::new(0.3, 0.6));
        assert!(target.run_on_batteries_only);
    }
}
