//! Pluggable job-size heuristics for priority-ordered scheduling.
//!
//! A job's size is only ever used as an ordering key: larger numbers
//! mean "believed more expensive to run". Estimation is best-effort —
//! any IO failure reading the source file falls back to size `0`
//! rather than aborting the unit.

use std::path::Path;

/// Estimates the relative cost of compiling a translation unit.
pub trait JobSizeEstimator: Send + Sync {
    /// Estimate the size of the unit rooted at `source_file`. Errors
    /// reading the file are swallowed and reported as size `0`.
    fn estimate(&self, source_file: &Path) -> u64;
}

/// Counts source lines.
pub struct LocEstimator;

impl JobSizeEstimator for LocEstimator {
    fn estimate(&self, source_file: &Path) -> u64 {
        read(source_file)
            .map(|text| text.lines().count() as u64)
            .unwrap_or(0)
    }
}

/// Counts `;` bytes, a rough proxy for statement count.
pub struct SemicolonEstimator;

impl JobSizeEstimator for SemicolonEstimator {
    fn estimate(&self, source_file: &Path) -> u64 {
        read(source_file)
            .map(|text| text.bytes().filter(|&b| b == b';').count() as u64)
            .unwrap_or(0)
    }
}

/// Counts `,` bytes, a rough proxy for expression/argument density.
pub struct CommaEstimator;

impl JobSizeEstimator for CommaEstimator {
    fn estimate(&self, source_file: &Path) -> u64 {
        read(source_file)
            .map(|text| text.bytes().filter(|&b| b == b',').count() as u64)
            .unwrap_or(0)
    }
}

fn read(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

/// Which metric to use, as selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Line count.
    Loc,
    /// Semicolon count.
    Semicolon,
    /// Comma count.
    Comma,
}

impl Metric {
    /// Build the estimator implementing this metric.
    pub fn build(self) -> Box<dyn JobSizeEstimator> {
        match self {
            Metric::Loc => Box::new(LocEstimator),
            Metric::Semicolon => Box::new(SemicolonEstimator),
            Metric::Comma => Box::new(CommaEstimator),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loc" => Ok(Metric::Loc),
            "semicolon" => Ok(Metric::Semicolon),
            "comma" => Ok(Metric::Comma),
            other => Err(format!("unknown job-size metric `{other}`")),
        }
    }
}
