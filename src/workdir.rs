//! Working directories and the artifact names derived from them.
//!
//! Every name here is shared with the wrapped tools and with earlier runs,
//! so changing one breaks re-runs over existing folders.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::assembler::AssemblyVariant;
use crate::error::{NanoAsmError, Result};

/// Folder that holds the untouched input reads while a run is in progress.
pub const ORIGINAL_DIR: &str = "original";

/// Folder that collects the renamed, polished assemblies.
pub const ASSEMBLIES_DIR: &str = "assemblies";

/// One sample folder, identified by its directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    path: PathBuf,
    stem: String,
}

impl WorkingDirectory {
    /// Wraps a directory path, deriving the stem from its last component.
    ///
    /// Paths without a usable final component (`.`, `..`) are canonicalized
    /// first.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stem = match stem_of(&path) {
            Some(stem) => stem,
            None => {
                let canonical = path.canonicalize()?;
                stem_of(&canonical).ok_or_else(|| {
                    NanoAsmError::InvalidConfig(format!(
                        "cannot derive a sample name from {}",
                        path.display()
                    ))
                })?
            }
        };
        Ok(Self { path, stem })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// `{stem}.fastq.gz`, the concatenated duplex-split reads.
    pub fn concatenated_reads(&self) -> PathBuf {
        self.path.join(format!("{}.fastq.gz", self.stem))
    }

    pub fn original_dir(&self) -> PathBuf {
        self.path.join(ORIGINAL_DIR)
    }

    /// `{stem}_split/`, written by duplex-tools.
    pub fn split_dir(&self) -> PathBuf {
        self.path.join(format!("{}_split", self.stem))
    }

    pub fn filtered_dir(&self) -> PathBuf {
        self.path.join("filtered_reads")
    }

    pub fn filtered_reads(&self) -> PathBuf {
        self.filtered_dir()
            .join(format!("{}_filtered.fastq.gz", self.stem))
    }

    /// `{stem}_{variant}_assembly/`
    pub fn assembly_dir(&self, variant: AssemblyVariant) -> PathBuf {
        self.path
            .join(format!("{}_{}_assembly", self.stem, variant.dir_name()))
    }

    pub fn assembly_fasta(&self, variant: AssemblyVariant) -> PathBuf {
        self.assembly_dir(variant).join("assembly.fasta")
    }

    /// Raw miniasm graph, converted to `assembly.fasta` afterwards.
    pub fn assembly_gfa(&self) -> PathBuf {
        self.assembly_dir(AssemblyVariant::Miniasm).join("assembly.gfa")
    }

    pub fn overlap_dir(&self) -> PathBuf {
        self.path.join("read_overlap")
    }

    pub fn overlap_paf(&self) -> PathBuf {
        self.overlap_dir()
            .join(format!("{}_overlap.paf.gz", self.stem))
    }

    pub fn mapping_dir(&self) -> PathBuf {
        self.path.join("nanopore_mapping")
    }

    pub fn mapping_sam(&self) -> PathBuf {
        self.mapping_dir().join("mapping.sam")
    }

    pub fn racon_dir(&self) -> PathBuf {
        self.path.join(format!("{}_racon_polishing", self.stem))
    }

    pub fn racon_fasta(&self) -> PathBuf {
        self.racon_dir().join("racon.fasta")
    }

    pub fn medaka_dir(&self) -> PathBuf {
        self.path.join("medaka_polished")
    }

    pub fn consensus_fasta(&self) -> PathBuf {
        self.medaka_dir().join("consensus.fasta")
    }

    pub fn assemblies_dir(&self) -> PathBuf {
        self.path.join(ASSEMBLIES_DIR)
    }

    /// `{stem}_{Variant}_{rm|m}_coverage.fasta`
    pub fn output_name(&self, variant: AssemblyVariant, racon_ran: bool) -> String {
        let polish_flag = if racon_ran { "rm" } else { "m" };
        format!(
            "{}_{}_{}_coverage.fasta",
            self.stem,
            variant.display_name(),
            polish_flag
        )
    }

    pub fn final_output(&self, variant: AssemblyVariant, racon_ran: bool) -> PathBuf {
        self.assemblies_dir()
            .join(self.output_name(variant, racon_ran))
    }
}

impl fmt::Display for WorkingDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        let dir = WorkingDirectory::new("/data/run1/barcode01").unwrap();
        assert_eq!(dir.stem(), "barcode01");
        assert_eq!(
            dir.concatenated_reads(),
            Path::new("/data/run1/barcode01/barcode01.fastq.gz")
        );
        assert_eq!(
            dir.split_dir(),
            Path::new("/data/run1/barcode01/barcode01_split")
        );
        assert_eq!(
            dir.filtered_reads(),
            Path::new("/data/run1/barcode01/filtered_reads/barcode01_filtered.fastq.gz")
        );
        assert_eq!(
            dir.assembly_fasta(AssemblyVariant::Raven),
            Path::new("/data/run1/barcode01/barcode01_raven_assembly/assembly.fasta")
        );
        assert_eq!(
            dir.assembly_gfa(),
            Path::new("/data/run1/barcode01/barcode01_miniasm_assembly/assembly.gfa")
        );
        assert_eq!(
            dir.mapping_sam(),
            Path::new("/data/run1/barcode01/nanopore_mapping/mapping.sam")
        );
        assert_eq!(
            dir.consensus_fasta(),
            Path::new("/data/run1/barcode01/medaka_polished/consensus.fasta")
        );
    }

    #[test]
    fn test_output_name_racon_infix() {
        let dir = WorkingDirectory::new("/data/sample").unwrap();
        assert_eq!(
            dir.output_name(AssemblyVariant::Flye, true),
            "sample_Flye_rm_coverage.fasta"
        );
        assert_eq!(
            dir.output_name(AssemblyVariant::Flye, false),
            "sample_Flye_m_coverage.fasta"
        );
        assert_eq!(
            dir.final_output(AssemblyVariant::Miniasm, false),
            Path::new("/data/sample/assemblies/sample_Miniasm_m_coverage.fasta")
        );
    }

    #[test]
    fn test_dot_path_uses_canonical_name() {
        let tmp = tempfile::tempdir().unwrap();
        let inner = tmp.path().join("sampleA");
        std::fs::create_dir(&inner).unwrap();
        let dir = WorkingDirectory::new(inner.join(".")).unwrap();
        assert_eq!(dir.stem(), "sampleA");
    }
}
