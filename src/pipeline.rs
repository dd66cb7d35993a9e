//! One-call entry point tying selection, planning and execution together.

use std::collections::BTreeSet;
use std::path::Path;

use crate::assembler::AssemblyVariant;
use crate::config::Config;
use crate::engine::{PipelineEngine, RunSummary, StageObserver};
use crate::error::{NanoAsmError, Result};
use crate::plan::StagePlan;
use crate::selector::FolderSelector;
use crate::tools::{Tool, ToolInvoker, ToolPaths};
use crate::workdir::WorkingDirectory;

/// Checks everything that can be checked before a run starts.
///
/// Returns `Ok(None)` when the base directory holds nothing to process.
pub fn preflight(
    base: &Path,
    config: &Config,
    selector: &FolderSelector,
) -> Result<Option<Vec<WorkingDirectory>>> {
    if !base.is_dir() {
        return Err(NanoAsmError::DirectoryNotFound(base.to_path_buf()));
    }
    config.validate()?;
    let selected = selector.select(base)?;
    if selected.is_empty() {
        return Ok(None);
    }
    Ok(Some(selected))
}

/// Tools a run with `config` will invoke.
pub fn required_tools(config: &Config) -> BTreeSet<Tool> {
    let mut tools = BTreeSet::from([Tool::DuplexTools, Tool::Filtlong]);
    for &variant in &config.assemblers {
        match variant {
            AssemblyVariant::Flye => tools.insert(Tool::Flye),
            AssemblyVariant::Raven => tools.insert(Tool::Raven),
            AssemblyVariant::Miniasm => {
                tools.insert(Tool::Minimap2);
                tools.insert(Tool::Miniasm)
            }
        };
        if config.racon_runs_for(variant) {
            tools.insert(Tool::Minimap2);
            tools.insert(Tool::Racon);
        }
        tools.insert(Tool::Medaka);
    }
    tools
}

/// A configured pipeline ready to process base directories.
pub struct Pipeline<'a> {
    config: Config,
    tools: ToolPaths,
    invoker: &'a dyn ToolInvoker,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: Config, tools: ToolPaths, invoker: &'a dyn ToolInvoker) -> Self {
        Self {
            config,
            tools,
            invoker,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The stage plan every selected folder goes through.
    pub fn plan(&self) -> StagePlan {
        StagePlan::build(&self.config, self.tools.clone())
    }

    /// Processes every eligible folder below `base`.
    ///
    /// Errors are limited to problems found before the first stage runs;
    /// stage failures are reported to `observer` and in the summary.
    pub fn run<O>(&self, base: &Path, observer: &mut O) -> Result<RunSummary>
    where
        O: StageObserver + ?Sized,
    {
        let selector = FolderSelector::new(self.config.skip_unclassified);
        let Some(directories) = preflight(base, &self.config, &selector)? else {
            tracing::info!("No folders with FASTQ files found in {}", base.display());
            return Ok(RunSummary::default());
        };

        self.config.log_summary();
        let unresolved = self.tools.missing();
        let missing: Vec<String> = required_tools(&self.config)
            .into_iter()
            .filter(|tool| unresolved.contains(tool))
            .map(|tool| tool.to_string())
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                "Not found on the search path: {}; stages using them will fail",
                missing.join(", ")
            );
        }

        let plan = self.plan();
        tracing::debug!("Stage plan:\n{plan}");
        tracing::info!("Processing {} folder(s)", directories.len());
        Ok(PipelineEngine::new(self.invoker).run(plan.stages(), directories, observer))
    }
}
