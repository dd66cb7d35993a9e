//! Sequencing depth estimates for the folders of a run.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{NanoAsmError, Result};
use crate::reads::{count_bases, read_files_in};
use crate::selector::FolderSelector;

/// Below this depth typing is unreliable.
pub const LOW_COVERAGE: f64 = 30.0;

/// Below this depth racon polishing is worth enabling.
pub const MODERATE_COVERAGE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageAdvice {
    Low,
    Moderate,
    Adequate,
}

impl CoverageAdvice {
    /// Recommendation shown to the user, if any.
    pub fn message(self) -> Option<&'static str> {
        match self {
            CoverageAdvice::Low => Some(
                "Typing might be imprecise and further sequencing is recommended.",
            ),
            CoverageAdvice::Moderate => {
                Some("Racon polishing is recommended to potentially enhance typing.")
            }
            CoverageAdvice::Adequate => None,
        }
    }
}

pub fn advise(coverage: f64) -> CoverageAdvice {
    if coverage < LOW_COVERAGE {
        CoverageAdvice::Low
    } else if coverage < MODERATE_COVERAGE {
        CoverageAdvice::Moderate
    } else {
        CoverageAdvice::Adequate
    }
}

/// Total bases in the read files directly inside `dir`.
pub fn total_bases(dir: &Path) -> Result<u64> {
    let mut bases = 0;
    for file in read_files_in(dir)? {
        bases += count_bases(&file)?;
    }
    Ok(bases)
}

fn genome_bases(genome_size_mb: f64) -> Result<f64> {
    if !genome_size_mb.is_finite() || genome_size_mb <= 0.0 {
        return Err(NanoAsmError::InvalidConfig(format!(
            "genome size must be a positive number of megabases, got {genome_size_mb}"
        )));
    }
    Ok(genome_size_mb * 1_000_000.0)
}

/// Mean depth of the reads in `dir` over a genome of `genome_size_mb`.
pub fn estimate(dir: &Path, genome_size_mb: f64) -> Result<f64> {
    let genome = genome_bases(genome_size_mb)?;
    Ok(total_bases(dir)? as f64 / genome)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub directory: PathBuf,
    pub name: String,
    pub bases: u64,
    pub coverage: f64,
    pub advice: CoverageAdvice,
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.1}x ({} bases)", self.name, self.coverage, self.bases)?;
        match self.advice {
            CoverageAdvice::Low => write!(f, ". Coverage is below {LOW_COVERAGE}x")?,
            CoverageAdvice::Moderate => write!(f, ". Coverage is below {MODERATE_COVERAGE}x")?,
            CoverageAdvice::Adequate => {}
        }
        if let Some(message) = self.advice.message() {
            write!(f, ". {message}")?;
        }
        Ok(())
    }
}

/// Estimates the coverage of every folder `selector` picks below `base`.
pub fn check_coverages(
    base: &Path,
    selector: &FolderSelector,
    genome_size_mb: f64,
) -> Result<Vec<CoverageReport>> {
    let genome = genome_bases(genome_size_mb)?;
    let mut reports = Vec::new();
    for dir in selector.select(base)? {
        let bases = total_bases(dir.path())?;
        let coverage = bases as f64 / genome;
        let report = CoverageReport {
            directory: dir.path().to_path_buf(),
            name: dir.stem().to_string(),
            bases,
            coverage,
            advice: advise(coverage),
        };
        match report.advice {
            CoverageAdvice::Adequate => tracing::info!("{report}"),
            _ => tracing::warn!("{report}"),
        }
        reports.push(report);
    }
    Ok(reports)
}
