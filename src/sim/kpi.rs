//! Post-hoc KPI computation from evaluation results.

use std::collections::BTreeSet;
use std::fmt;

use super::types::StepResult;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from `Vec<StepResult>` so the report always agrees with
/// the per-evaluation records. Grid-side figures are passed in by the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// Network evaluations performed.
    pub evaluations: usize,
    /// Distinct networks that were evaluated at least once.
    pub networks: usize,
    /// Generators started by the engine.
    pub starts: usize,
    /// Generators stopped by the engine.
    pub stops: usize,
    /// Evaluations where production was below need.
    pub deficit_evaluations: usize,
    /// Lowest storage level seen on a network with storage, if any.
    pub min_storage_level: Option<f32>,
    /// Energy demanded but not delivered (kWh).
    pub unserved_kwh: f32,
    /// Network-ticks with browned-out loads.
    pub brownout_ticks: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete result vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Every evaluation of the run
    /// * `unserved_kwh` - Energy the grid failed to deliver
    /// * `brownout_ticks` - Network-ticks where loads went dark
    pub fn from_results(results: &[StepResult], unserved_kwh: f32, brownout_ticks: usize) -> Self {
        let networks: BTreeSet<_> = results.iter().map(|r| r.network).collect();
        let min_storage_level = results
            .iter()
            .filter(|r| r.has_storage)
            .map(|r| r.storage_level)
            .reduce(f32::min);

        Self {
            evaluations: results.len(),
            networks: networks.len(),
            starts: results.iter().filter(|r| r.started.is_some()).count(),
            stops: results.iter().filter(|r| r.stopped.is_some()).count(),
            deficit_evaluations: results.iter().filter(|r| r.in_deficit()).count(),
            min_storage_level,
            unserved_kwh,
            brownout_ticks,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "Evaluations:           {} across {} network(s)",
            self.evaluations, self.networks
        )?;
        writeln!(f, "Generator starts:      {}", self.starts)?;
        writeln!(f, "Generator stops:       {}", self.stops)?;
        writeln!(f, "Deficit evaluations:   {}", self.deficit_evaluations)?;
        match self.min_storage_level {
            Some(level) => writeln!(f, "Min storage level:     {:.1}%", level * 100.0)?,
            None => writeln!(f, "Min storage level:     n/a")?,
        }
        writeln!(f, "Unserved energy:       {:.2} kWh", self.unserved_kwh)?;
        write!(f, "Brownout ticks:        {}", self.brownout_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EndpointId, NetworkId};

    fn step(network: u32, need: f32, production: f32, storage: Option<f32>) -> StepResult {
        StepResult {
            tick: 0,
            network: NetworkId(network),
            need,
            production,
            has_storage: storage.is_some(),
            storage_level: storage.unwrap_or(0.0),
            brokers: 1,
            shutdown_candidates: 0,
            startup_candidates: 0,
            stopped: None,
            started: None,
        }
    }

    #[test]
    fn empty_results_give_zero_report() {
        let kpi = KpiReport::from_results(&[], 0.0, 0);
        assert_eq!(kpi.evaluations, 0);
        assert_eq!(kpi.min_storage_level, None);
    }

    #[test]
    fn counts_transitions_and_deficits() {
        let mut a = step(0, 10.0, 4.0, Some(0.6));
        a.started = Some(EndpointId(1));
        let mut b = step(0, 2.0, 4.0, Some(0.4));
        b.stopped = Some(EndpointId(1));
        let c = step(1, 5.0, 5.0, None);

        let kpi = KpiReport::from_results(&[a, b, c], 1.5, 3);
        assert_eq!(kpi.evaluations, 3);
        assert_eq!(kpi.networks, 2);
        assert_eq!(kpi.starts, 1);
        assert_eq!(kpi.stops, 1);
        assert_eq!(kpi.deficit_evaluations, 1);
        assert_eq!(kpi.min_storage_level, Some(0.4));
        assert_eq!(kpi.brownout_ticks, 3);
    }

    #[test]
    fn display_includes_all_lines() {
        let kpi = KpiReport::from_results(&[step(0, 1.0, 0.0, None)], 0.25, 1);
        let s = format!("{kpi}");
        assert!(s.contains("KPI Report"));
        assert!(s.contains("Min storage level:     n/a"));
        assert!(s.contains("0.25 kWh"));
    }
}
