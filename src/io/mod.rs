//! File output for run results.

/// CSV export of evaluation results.
pub mod export;
