//! Discovery of the sample folders a run should process.

use std::path::Path;

use crate::error::{NanoAsmError, Result};
use crate::reads::has_read_files;
use crate::workdir::{WorkingDirectory, ASSEMBLIES_DIR, ORIGINAL_DIR};

const UNCLASSIFIED_PREFIX: &str = "unclassified";

/// Chooses working directories below a base directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderSelector {
    /// Ignore children whose name starts with `unclassified`
    pub skip_unclassified: bool,
}

impl FolderSelector {
    pub fn new(skip_unclassified: bool) -> Self {
        Self { skip_unclassified }
    }

    /// Lists the folders to process, in order.
    ///
    /// Immediate children of `base` that directly contain FASTQ files come
    /// first, sorted by name. Children named `original*` or `assemblies*`
    /// belong to the pipeline itself and are never selected. `base` is
    /// appended last when it holds FASTQ files of its own.
    ///
    /// An empty result means there is nothing to do.
    pub fn select(&self, base: &Path) -> Result<Vec<WorkingDirectory>> {
        if !base.is_dir() {
            return Err(NanoAsmError::DirectoryNotFound(base.to_path_buf()));
        }

        let mut children = Vec::new();
        for entry in std::fs::read_dir(base)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_eligible_name(&name) && has_read_files(&entry.path()) {
                children.push(entry.path());
            }
        }
        children.sort();

        let mut selected = children
            .into_iter()
            .map(WorkingDirectory::new)
            .collect::<Result<Vec<_>>>()?;
        if has_read_files(base) {
            selected.push(WorkingDirectory::new(base)?);
        }
        Ok(selected)
    }

    fn is_eligible_name(&self, name: &str) -> bool {
        if name.starts_with(ORIGINAL_DIR) || name.starts_with(ASSEMBLIES_DIR) {
            return false;
        }
        !(self.skip_unclassified && name.starts_with(UNCLASSIFIED_PREFIX))
    }
}
