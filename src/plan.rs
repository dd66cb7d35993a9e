//! Construction of the ordered stage list for a run.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::stage::{
    AssembleStage, CleanAssembleStage, CleanDuplexStage, CleanFilterStage, ConsensusStage,
    DuplexStage, FilterStage, FinalCleanStage, RaconStage, Stage, StageKind,
};
use crate::tools::ToolPaths;

/// Ordered stages for one run, shared by every selected folder.
///
/// The order is always
/// `Duplex, Filter, [CleanDuplex], (Assemble, [Racon], Consensus, [CleanAssemble])*, [CleanFilter, FinalClean]`
/// with one parenthesised chain per enabled assembler. Cleanup stages are
/// present only when intermediates are not kept, and each one follows the
/// work stage whose output it removes.
#[derive(Debug, Clone)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Builds the plan for `config`, capturing `tools` in every stage.
    pub fn build(config: &Config, tools: ToolPaths) -> Self {
        let tools = Arc::new(tools);
        let threads = config.threads;
        let clean = !config.keep_intermediate;
        let mut stages = Vec::new();

        stages.push(Stage::Duplex(DuplexStage::new(threads, Arc::clone(&tools))));
        stages.push(Stage::Filter(FilterStage::new(
            config.min_read_length,
            config.target_bases(),
            Arc::clone(&tools),
        )));
        if clean {
            stages.push(Stage::CleanDuplex(CleanDuplexStage));
        }

        for &variant in &config.assemblers {
            let racon = config.racon_runs_for(variant);
            stages.push(Stage::Assemble(AssembleStage::new(
                threads,
                variant,
                Arc::clone(&tools),
            )));
            if racon {
                stages.push(Stage::RaconPolish(RaconStage::new(threads, Arc::clone(&tools))));
            }
            stages.push(Stage::Consensus(ConsensusStage::new(
                threads,
                variant,
                config.model.clone(),
                racon,
                Arc::clone(&tools),
            )));
            if clean {
                stages.push(Stage::CleanAssemble(CleanAssembleStage::new(variant, racon)));
            }
        }

        if clean {
            stages.push(Stage::CleanFilter(CleanFilterStage));
            stages.push(Stage::FinalClean(FinalCleanStage));
        }

        StagePlan { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for StagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, stage) in self.stages.iter().enumerate() {
            writeln!(f, "{:>2}. {}", index + 1, stage.kind())?;
        }
        Ok(())
    }
}
