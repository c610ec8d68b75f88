//! Core simulation types: ticks, run configuration, and per-evaluation records.

use std::fmt;

use crate::host::{EndpointId, NetworkId};

/// Discrete host time.
pub type Tick = u64;

/// Timing of a simulated run.
///
/// # Examples
///
/// ```
/// use backup_power::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(2400, 2, 42);
/// assert_eq!(cfg.total_ticks(), 4800);
/// assert!((cfg.dt_hours - 0.01).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of ticks per simulated day.
    pub ticks_per_day: Tick,
    /// Number of days to simulate.
    pub days: u64,
    /// Duration of one tick in hours, derived as `24.0 / ticks_per_day`.
    pub dt_hours: f32,
    /// Master random seed for reproducibility.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new run configuration.
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_day` or `days` is zero.
    pub fn new(ticks_per_day: Tick, days: u64, seed: u64) -> Self {
        assert!(ticks_per_day > 0, "ticks_per_day must be > 0");
        assert!(days > 0, "days must be > 0");
        Self {
            ticks_per_day,
            days,
            dt_hours: 24.0 / ticks_per_day as f32,
            seed,
        }
    }

    /// Total number of ticks across all days, saturating at `Tick::MAX`.
    pub fn total_ticks(&self) -> Tick {
        self.ticks_per_day.saturating_mul(self.days)
    }
}

/// Outcome of evaluating one network on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub tick: Tick,
    pub network: NetworkId,
    /// Total demand of endpoints that draw or want to draw power.
    pub need: f32,
    /// Total output of generators that are on.
    pub production: f32,
    pub has_storage: bool,
    /// Stored / capacity across the network, 0 without storage.
    pub storage_level: f32,
    /// Number of brokers on the network that resolved this tick.
    pub brokers: usize,
    pub shutdown_candidates: usize,
    pub startup_candidates: usize,
    pub stopped: Option<EndpointId>,
    pub started: Option<EndpointId>,
}

impl StepResult {
    /// True if production falls short of demand.
    pub fn in_deficit(&self) -> bool {
        self.production < self.need
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>6} {} | need={:>8.1}  prod={:>8.1}",
            self.tick, self.network, self.need, self.production
        )?;
        if self.has_storage {
            write!(f, "  store={:>5.1}%", self.storage_level * 100.0)?;
        } else {
            write!(f, "  store=  n/a ")?;
        }
        write!(
            f,
            " | brokers={} cand(stop={}, start={})",
            self.brokers, self.shutdown_candidates, self.startup_candidates
        )?;
        if let Some(id) = self.stopped {
            write!(f, " stop={id}")?;
        }
        if let Some(id) = self.started {
            write!(f, " start={id}")?;
        }
        Ok(())
    }
}
