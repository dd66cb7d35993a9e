//! Pipeline stages.
//!
//! A [`Stage`] is one unit of work or cleanup against a single working
//! directory. The set of stages is closed; [`StageKind`] names each one.
//! Stages capture their configuration and tool locations when the plan is
//! built and hold no per-directory state, so a plan is reused unchanged for
//! every selected folder.
//!
//! Every stage checks the artifacts it depends on before doing anything and
//! reports a missing one as [`StageError::MissingArtifact`], which turns the
//! implicit "which files exist" state of a folder into explicit failures.

mod cleanup;
mod work;

use std::fmt;
use std::path::Path;

use crate::assembler::AssemblyVariant;
use crate::error::{stderr_tail, StageError};
use crate::tools::{Invocation, ToolInvoker, ToolOutput};
use crate::workdir::WorkingDirectory;

pub use cleanup::{CleanAssembleStage, CleanDuplexStage, CleanFilterStage, FinalCleanStage};
pub use work::{AssembleStage, ConsensusStage, DuplexStage, FilterStage, RaconStage};

/// Identity of a stage within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Duplex,
    Filter,
    Assemble(AssemblyVariant),
    RaconPolish,
    Consensus(AssemblyVariant),
    CleanDuplex,
    CleanFilter,
    CleanAssemble(AssemblyVariant),
    FinalClean,
}

impl StageKind {
    /// Cleanup stages remove artifacts of an earlier work stage and are
    /// the only stages run after a failure.
    pub fn is_cleanup(self) -> bool {
        matches!(
            self,
            StageKind::CleanDuplex
                | StageKind::CleanFilter
                | StageKind::CleanAssemble(_)
                | StageKind::FinalClean
        )
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Duplex => f.write_str("duplex"),
            StageKind::Filter => f.write_str("filter"),
            StageKind::Assemble(v) => write!(f, "assemble[{v}]"),
            StageKind::RaconPolish => f.write_str("racon"),
            StageKind::Consensus(v) => write!(f, "consensus[{v}]"),
            StageKind::CleanDuplex => f.write_str("clean-duplex"),
            StageKind::CleanFilter => f.write_str("clean-filter"),
            StageKind::CleanAssemble(v) => write!(f, "clean-assemble[{v}]"),
            StageKind::FinalClean => f.write_str("final-clean"),
        }
    }
}

/// What the engine needs from a stage.
pub trait Step {
    /// Label used in events and logs.
    fn name(&self) -> String;

    fn is_cleanup(&self) -> bool;

    fn run(&self, dir: &WorkingDirectory, invoker: &dyn ToolInvoker) -> Result<(), StageError>;
}

/// Every stage the pipeline knows about.
#[derive(Debug, Clone)]
pub enum Stage {
    Duplex(DuplexStage),
    Filter(FilterStage),
    Assemble(AssembleStage),
    RaconPolish(RaconStage),
    Consensus(ConsensusStage),
    CleanDuplex(CleanDuplexStage),
    CleanFilter(CleanFilterStage),
    CleanAssemble(CleanAssembleStage),
    FinalClean(FinalCleanStage),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Duplex(_) => StageKind::Duplex,
            Stage::Filter(_) => StageKind::Filter,
            Stage::Assemble(s) => StageKind::Assemble(s.variant),
            Stage::RaconPolish(_) => StageKind::RaconPolish,
            Stage::Consensus(s) => StageKind::Consensus(s.variant),
            Stage::CleanDuplex(_) => StageKind::CleanDuplex,
            Stage::CleanFilter(_) => StageKind::CleanFilter,
            Stage::CleanAssemble(s) => StageKind::CleanAssemble(s.variant),
            Stage::FinalClean(_) => StageKind::FinalClean,
        }
    }
}

impl Step for Stage {
    fn name(&self) -> String {
        self.kind().to_string()
    }

    fn is_cleanup(&self) -> bool {
        self.kind().is_cleanup()
    }

    fn run(&self, dir: &WorkingDirectory, invoker: &dyn ToolInvoker) -> Result<(), StageError> {
        match self {
            Stage::Duplex(s) => s.run(dir, invoker),
            Stage::Filter(s) => s.run(dir, invoker),
            Stage::Assemble(s) => s.run(dir, invoker),
            Stage::RaconPolish(s) => s.run(dir, invoker),
            Stage::Consensus(s) => s.run(dir, invoker),
            Stage::CleanDuplex(s) => s.run(dir),
            Stage::CleanFilter(s) => s.run(dir),
            Stage::CleanAssemble(s) => s.run(dir),
            Stage::FinalClean(s) => s.run(dir),
        }
    }
}

/// Runs a tool and turns a non-zero exit into a stage failure.
fn run_tool(invoker: &dyn ToolInvoker, invocation: &Invocation) -> Result<ToolOutput, StageError> {
    tracing::info!("running {invocation}");
    let output = invoker.invoke(invocation)?;
    if !output.stdout.is_empty() {
        tracing::debug!("{}", String::from_utf8_lossy(&output.stdout));
    }
    if !output.success() {
        return Err(StageError::ToolFailed {
            tool: invocation.tool.to_string(),
            code: output.exit_code,
            stderr_tail: stderr_tail(&output.stderr),
        });
    }
    Ok(output)
}

fn require(stage: StageKind, path: &Path) -> Result<(), StageError> {
    if path.exists() {
        Ok(())
    } else {
        Err(StageError::missing(stage.to_string(), path))
    }
}

fn create_dir(path: &Path) -> Result<(), StageError> {
    std::fs::create_dir_all(path)
        .map_err(|e| StageError::io(format!("creating {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_kinds() {
        let cleanups = [
            StageKind::CleanDuplex,
            StageKind::CleanFilter,
            StageKind::CleanAssemble(AssemblyVariant::Raven),
            StageKind::FinalClean,
        ];
        for kind in cleanups {
            assert!(kind.is_cleanup(), "{kind} should be a cleanup");
        }
        let work = [
            StageKind::Duplex,
            StageKind::Filter,
            StageKind::Assemble(AssemblyVariant::Flye),
            StageKind::RaconPolish,
            StageKind::Consensus(AssemblyVariant::Miniasm),
        ];
        for kind in work {
            assert!(!kind.is_cleanup(), "{kind} should not be a cleanup");
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(StageKind::Assemble(AssemblyVariant::Flye).to_string(), "assemble[Flye]");
        assert_eq!(StageKind::CleanAssemble(AssemblyVariant::Miniasm).to_string(), "clean-assemble[Miniasm]");
        assert_eq!(StageKind::FinalClean.to_string(), "final-clean");
    }
}
