//! Backup generator balancing for isolated power networks.
//!
//! A [`GeneratorBroker`](broker::GeneratorBroker) is attached to each
//! switchable generator. On a fixed tick interval the
//! [`BalanceEngine`](sim::BalanceEngine) groups brokers by network and starts
//! or stops at most one generator per network in each direction, keeping
//! stored energy inside each broker's target band.

pub mod broker;
/// Scenario configuration and presets.
pub mod config;
pub mod devices;
pub mod error;
pub mod host;
pub mod io;
pub mod runner;
/// Persisted broker settings.
pub mod settings;
pub mod sim;
