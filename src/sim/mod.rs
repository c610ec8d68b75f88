//! The balancing core: registry, engine, clock and accounting.

/// Tick clock and interval gating.
pub mod clock;
pub mod engine;
pub mod kpi;
pub mod power_balance;
/// Per-domain broker bookkeeping.
pub mod registry;
pub mod types;

pub use engine::BalanceEngine;
pub use registry::{BrokerRegistry, NetworkGroup};
