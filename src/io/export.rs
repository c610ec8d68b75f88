//! CSV export for evaluation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::host::EndpointId;
use crate::sim::types::StepResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "tick,network,need_kw,production_kw,has_storage,storage_level,\
                       brokers,shutdown_candidates,startup_candidates,stopped,started";

/// Exports evaluation results to a CSV file at the given path.
///
/// Writes a header row followed by one row per evaluation. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes evaluation results as CSV to any writer.
///
/// Network and generator ids are written as bare numbers; an empty
/// `stopped`/`started` cell means no transition.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    let id_cell = |id: Option<EndpointId>| id.map(|id| id.0.to_string()).unwrap_or_default();
    for r in results {
        wtr.write_record(&[
            r.tick.to_string(),
            r.network.0.to_string(),
            format!("{:.4}", r.need),
            format!("{:.4}", r.production),
            r.has_storage.to_string(),
            format!("{:.4}", r.storage_level),
            r.brokers.to_string(),
            r.shutdown_candidates.to_string(),
            r.startup_candidates.to_string(),
            id_cell(r.stopped),
            id_cell(r.started),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
