//! Work stages: each drives one external tool (or a short chain of them)
//! and leaves its artifacts inside the working directory.

use std::path::Path;
use std::sync::Arc;

use super::{create_dir, require, run_tool, StageKind};
use crate::assembler::AssemblyVariant;
use crate::error::StageError;
use crate::gfa::gfa_to_fasta;
use crate::reads::{concatenate_gzip, read_files_in};
use crate::tools::{Invocation, StdoutSink, Tool, ToolInvoker, ToolPaths};
use crate::workdir::WorkingDirectory;

/// Splits duplex reads with duplex-tools, moves the input reads aside into
/// `original/` and concatenates the split output into `{stem}.fastq.gz`.
#[derive(Debug, Clone)]
pub struct DuplexStage {
    threads: usize,
    tools: Arc<ToolPaths>,
}

impl DuplexStage {
    pub fn new(threads: usize, tools: Arc<ToolPaths>) -> Self {
        Self { threads, tools }
    }

    pub(super) fn run(
        &self,
        dir: &WorkingDirectory,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        let kind = StageKind::Duplex;
        let inputs = read_files_in(dir.path())
            .map_err(|e| StageError::io(format!("listing {dir}"), e))?;
        if inputs.is_empty() {
            return Err(StageError::missing(kind.to_string(), dir.path().join("*.fastq")));
        }
        let original = dir.original_dir();
        if original.exists() {
            return Err(StageError::ArtifactExists(original));
        }

        let split_dir = dir.split_dir();
        let invocation = Invocation::new(Tool::DuplexTools, &self.tools)
            .current_dir(dir.path())
            .arg("split_on_adapter")
            .path_arg(dir.path())
            .path_arg(&split_dir)
            .arg("Native")
            .arg("--threads")
            .arg(self.threads.to_string());
        run_tool(invoker, &invocation)?;
        require(kind, &split_dir)?;

        create_dir(&original)?;
        for input in &inputs {
            let Some(name) = input.file_name() else {
                continue;
            };
            std::fs::rename(input, original.join(name))
                .map_err(|e| StageError::io(format!("moving {} aside", input.display()), e))?;
        }

        let split_reads = read_files_in(&split_dir)
            .map_err(|e| StageError::io(format!("listing {}", split_dir.display()), e))?;
        if split_reads.is_empty() {
            return Err(StageError::missing(kind.to_string(), split_dir.join("*.fastq.gz")));
        }
        let combined = dir.concatenated_reads();
        concatenate_gzip(&split_reads, &combined)
            .map_err(|e| StageError::io(format!("writing {}", combined.display()), e))?;
        tracing::info!(
            "Concatenated {} split read files into {}",
            split_reads.len(),
            combined.display()
        );
        Ok(())
    }
}

/// Length- and quality-filters the concatenated reads with filtlong.
#[derive(Debug, Clone)]
pub struct FilterStage {
    min_length: u64,
    target_bases: u64,
    tools: Arc<ToolPaths>,
}

impl FilterStage {
    pub fn new(min_length: u64, target_bases: u64, tools: Arc<ToolPaths>) -> Self {
        Self {
            min_length,
            target_bases,
            tools,
        }
    }

    pub(super) fn run(
        &self,
        dir: &WorkingDirectory,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        let reads = dir.concatenated_reads();
        require(StageKind::Filter, &reads)?;
        create_dir(&dir.filtered_dir())?;

        let invocation = Invocation::new(Tool::Filtlong, &self.tools)
            .arg("--min_length")
            .arg(self.min_length.to_string())
            .arg("--keep_percent")
            .arg("90")
            .arg("--target_bases")
            .arg(self.target_bases.to_string())
            .path_arg(&reads)
            .stdout_to(StdoutSink::GzipFile(dir.filtered_reads()));
        run_tool(invoker, &invocation)?;
        Ok(())
    }
}

/// Assembles the filtered reads with one assembler, producing
/// `{stem}_{variant}_assembly/assembly.fasta`.
#[derive(Debug, Clone)]
pub struct AssembleStage {
    threads: usize,
    pub(crate) variant: AssemblyVariant,
    tools: Arc<ToolPaths>,
}

impl AssembleStage {
    pub fn new(threads: usize, variant: AssemblyVariant, tools: Arc<ToolPaths>) -> Self {
        Self {
            threads,
            variant,
            tools,
        }
    }

    pub(super) fn run(
        &self,
        dir: &WorkingDirectory,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        let kind = StageKind::Assemble(self.variant);
        let reads = dir.filtered_reads();
        require(kind, &reads)?;

        match self.variant {
            AssemblyVariant::Flye => self.run_flye(dir, &reads, invoker)?,
            AssemblyVariant::Raven => self.run_raven(dir, &reads, invoker)?,
            AssemblyVariant::Miniasm => self.run_miniasm(dir, &reads, invoker)?,
        }
        require(kind, &dir.assembly_fasta(self.variant))
    }

    fn run_flye(
        &self,
        dir: &WorkingDirectory,
        reads: &Path,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        let invocation = Invocation::new(Tool::Flye, &self.tools)
            .arg("-o")
            .path_arg(&dir.assembly_dir(AssemblyVariant::Flye))
            .arg("--threads")
            .arg(self.threads.to_string())
            .arg("--nano-hq")
            .path_arg(reads);
        run_tool(invoker, &invocation)?;
        Ok(())
    }

    fn run_raven(
        &self,
        dir: &WorkingDirectory,
        reads: &Path,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        create_dir(&dir.assembly_dir(AssemblyVariant::Raven))?;
        let invocation = Invocation::new(Tool::Raven, &self.tools)
            .arg("--threads")
            .arg(self.threads.to_string())
            .path_arg(reads)
            .stdout_to(StdoutSink::File(dir.assembly_fasta(AssemblyVariant::Raven)));
        run_tool(invoker, &invocation)?;
        Ok(())
    }

    fn run_miniasm(
        &self,
        dir: &WorkingDirectory,
        reads: &Path,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        create_dir(&dir.overlap_dir())?;
        create_dir(&dir.assembly_dir(AssemblyVariant::Miniasm))?;

        let overlaps = dir.overlap_paf();
        let overlap = Invocation::new(Tool::Minimap2, &self.tools)
            .arg("-x")
            .arg("ava-ont")
            .arg("-t")
            .arg(self.threads.to_string())
            .path_arg(reads)
            .path_arg(reads)
            .stdout_to(StdoutSink::GzipFile(overlaps.clone()));
        run_tool(invoker, &overlap)?;
        require(StageKind::Assemble(AssemblyVariant::Miniasm), &overlaps)?;

        let gfa = dir.assembly_gfa();
        let assemble = Invocation::new(Tool::Miniasm, &self.tools)
            .arg("-f")
            .path_arg(reads)
            .path_arg(&overlaps)
            .stdout_to(StdoutSink::File(gfa.clone()));
        run_tool(invoker, &assemble)?;

        let fasta = dir.assembly_fasta(AssemblyVariant::Miniasm);
        let contigs = gfa_to_fasta(&gfa, &fasta)
            .map_err(|e| StageError::io(format!("converting {}", gfa.display()), e))?;
        if contigs == 0 {
            return Err(StageError::InvalidOutput(format!(
                "miniasm produced no contigs in {}",
                gfa.display()
            )));
        }
        tracing::info!("Converted {contigs} miniasm segments to FASTA");
        Ok(())
    }
}

/// Polishes the Flye assembly with racon after mapping the reads back
/// onto it with minimap2.
#[derive(Debug, Clone)]
pub struct RaconStage {
    threads: usize,
    tools: Arc<ToolPaths>,
}

impl RaconStage {
    pub fn new(threads: usize, tools: Arc<ToolPaths>) -> Self {
        Self { threads, tools }
    }

    pub(super) fn run(
        &self,
        dir: &WorkingDirectory,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        let kind = StageKind::RaconPolish;
        let reads = dir.filtered_reads();
        let assembly = dir.assembly_fasta(AssemblyVariant::Flye);
        require(kind, &reads)?;
        require(kind, &assembly)?;
        create_dir(&dir.mapping_dir())?;
        create_dir(&dir.racon_dir())?;

        let mapping = dir.mapping_sam();
        let map = Invocation::new(Tool::Minimap2, &self.tools)
            .arg("-ax")
            .arg("map-ont")
            .arg("-t")
            .arg(self.threads.to_string())
            .path_arg(&assembly)
            .path_arg(&reads)
            .stdout_to(StdoutSink::File(mapping.clone()));
        run_tool(invoker, &map)?;

        let polish = Invocation::new(Tool::Racon, &self.tools)
            .args(["-m", "8", "-x", "-6", "-g", "-8", "-w", "500"])
            .arg("--threads")
            .arg(self.threads.to_string())
            .path_arg(&reads)
            .path_arg(&mapping)
            .path_arg(&assembly)
            .stdout_to(StdoutSink::File(dir.racon_fasta()));
        run_tool(invoker, &polish)?;
        require(kind, &dir.racon_fasta())
    }
}

/// Builds a medaka consensus for one assembly and files the result under
/// `assemblies/` with its final name.
#[derive(Debug, Clone)]
pub struct ConsensusStage {
    threads: usize,
    pub(crate) variant: AssemblyVariant,
    model: String,
    racon_ran: bool,
    tools: Arc<ToolPaths>,
}

impl ConsensusStage {
    pub fn new(
        threads: usize,
        variant: AssemblyVariant,
        model: impl Into<String>,
        racon_ran: bool,
        tools: Arc<ToolPaths>,
    ) -> Self {
        Self {
            threads,
            variant,
            model: model.into(),
            racon_ran,
            tools,
        }
    }

    pub fn racon_ran(&self) -> bool {
        self.racon_ran
    }

    pub(super) fn run(
        &self,
        dir: &WorkingDirectory,
        invoker: &dyn ToolInvoker,
    ) -> Result<(), StageError> {
        let kind = StageKind::Consensus(self.variant);
        let reads = dir.filtered_reads();
        let draft = if self.racon_ran {
            dir.racon_fasta()
        } else {
            dir.assembly_fasta(self.variant)
        };
        require(kind, &reads)?;
        require(kind, &draft)?;

        let invocation = Invocation::new(Tool::Medaka, &self.tools)
            .current_dir(dir.path())
            .arg("-i")
            .path_arg(&reads)
            .arg("-d")
            .path_arg(&draft)
            .arg("-o")
            .path_arg(&dir.medaka_dir())
            .arg("-t")
            .arg(self.threads.to_string())
            .arg("-m")
            .arg(&self.model)
            .arg("-f");
        run_tool(invoker, &invocation)?;

        let consensus = dir.consensus_fasta();
        require(kind, &consensus)?;
        create_dir(&dir.assemblies_dir())?;
        let output = dir.final_output(self.variant, self.racon_ran);
        std::fs::copy(&consensus, &output)
            .map_err(|e| StageError::io(format!("copying consensus to {}", output.display()), e))?;
        tracing::info!("Wrote {}", output.display());
        Ok(())
    }
}
