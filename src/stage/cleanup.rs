//! Cleanup stages: each removes what one work stage produced.
//!
//! A cleanup does as much as it can and then reports the first problem it
//! met, so a half-processed folder is returned as close as possible to its
//! starting state.

use std::path::Path;

use super::StageKind;
use crate::assembler::AssemblyVariant;
use crate::error::StageError;
use crate::workdir::WorkingDirectory;

fn remove_tree(kind: StageKind, path: &Path) -> Result<(), StageError> {
    if !path.exists() {
        return Err(StageError::missing(kind.to_string(), path));
    }
    std::fs::remove_dir_all(path)
        .map_err(|e| StageError::io(format!("removing {}", path.display()), e))?;
    tracing::debug!("Removed {}", path.display());
    Ok(())
}

/// Removes the duplex-tools output directory.
#[derive(Debug, Clone, Default)]
pub struct CleanDuplexStage;

impl CleanDuplexStage {
    pub(super) fn run(&self, dir: &WorkingDirectory) -> Result<(), StageError> {
        remove_tree(StageKind::CleanDuplex, &dir.split_dir())
    }
}

/// Removes the filtered reads.
#[derive(Debug, Clone, Default)]
pub struct CleanFilterStage;

impl CleanFilterStage {
    pub(super) fn run(&self, dir: &WorkingDirectory) -> Result<(), StageError> {
        remove_tree(StageKind::CleanFilter, &dir.filtered_dir())
    }
}

/// Removes the intermediates of one assembler's chain, leaving only the
/// renamed output under `assemblies/`.
#[derive(Debug, Clone)]
pub struct CleanAssembleStage {
    pub(crate) variant: AssemblyVariant,
    racon_ran: bool,
}

impl CleanAssembleStage {
    pub fn new(variant: AssemblyVariant, racon_ran: bool) -> Self {
        Self { variant, racon_ran }
    }

    pub(super) fn run(&self, dir: &WorkingDirectory) -> Result<(), StageError> {
        let kind = StageKind::CleanAssemble(self.variant);
        let mut targets = vec![dir.assembly_dir(self.variant), dir.medaka_dir()];
        if self.variant == AssemblyVariant::Miniasm {
            targets.push(dir.overlap_dir());
        }
        if self.racon_ran {
            targets.push(dir.mapping_dir());
            targets.push(dir.racon_dir());
        }

        let mut first_error = None;
        for target in &targets {
            if let Err(e) = remove_tree(kind, target) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Puts the original reads back and removes the concatenated read file.
#[derive(Debug, Clone, Default)]
pub struct FinalCleanStage;

impl FinalCleanStage {
    pub(super) fn run(&self, dir: &WorkingDirectory) -> Result<(), StageError> {
        let kind = StageKind::FinalClean;
        let mut first_error = None;

        let original = dir.original_dir();
        match restore_originals(&original, dir.path()) {
            Ok(restored) => {
                tracing::debug!("Restored {restored} original read files in {dir}");
                if let Err(e) = std::fs::remove_dir_all(&original) {
                    first_error.get_or_insert(StageError::io(
                        format!("removing {}", original.display()),
                        e,
                    ));
                }
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }

        let combined = dir.concatenated_reads();
        if combined.exists() {
            if let Err(e) = std::fs::remove_file(&combined) {
                first_error.get_or_insert(StageError::io(
                    format!("removing {}", combined.display()),
                    e,
                ));
            }
        } else {
            first_error.get_or_insert(StageError::missing(kind.to_string(), combined));
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn restore_originals(original: &Path, dest: &Path) -> Result<usize, StageError> {
    if !original.is_dir() {
        return Err(StageError::missing(
            StageKind::FinalClean.to_string(),
            original,
        ));
    }
    let entries = std::fs::read_dir(original)
        .map_err(|e| StageError::io(format!("listing {}", original.display()), e))?;
    let mut restored = 0;
    for entry in entries {
        let entry =
            entry.map_err(|e| StageError::io(format!("listing {}", original.display()), e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        std::fs::rename(&from, &to)
            .map_err(|e| StageError::io(format!("restoring {}", from.display()), e))?;
        restored += 1;
    }
    Ok(restored)
}
