//! Execution of a stage plan over a sequence of working directories.
//!
//! Folders are processed strictly one after another and stages strictly in
//! plan order. When a work stage fails in a folder, every cleanup stage of
//! the plan is attempted (in plan order, each on its own) and the folder is
//! abandoned; the next folder starts from the beginning of the plan as if
//! nothing had happened.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::stage::Step;
use crate::tools::ToolInvoker;
use crate::workdir::WorkingDirectory;

/// Whether a stage ran as part of the plan or during failure containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Run,
    Containment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// One stage attempt against one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    pub directory: PathBuf,
    pub stage: String,
    pub phase: Phase,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::Success => "ok",
            Outcome::Failure => "failed",
        };
        write!(f, "{} [{}] {outcome}", self.directory.display(), self.stage)?;
        if self.phase == Phase::Containment {
            f.write_str(" (cleanup after failure)")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// Receives every stage event of a run.
pub trait StageObserver {
    fn on_event(&mut self, event: &StageEvent);
}

impl<F> StageObserver for F
where
    F: FnMut(&StageEvent),
{
    fn on_event(&mut self, event: &StageEvent) {
        self(event)
    }
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_event(&mut self, event: &StageEvent) {
        match (event.outcome, event.phase) {
            (Outcome::Success, _) => tracing::info!("{event}"),
            (Outcome::Failure, Phase::Run) => tracing::error!("{event}"),
            (Outcome::Failure, Phase::Containment) => tracing::warn!("{event}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<StageEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// Events recorded for one directory, in order.
    pub fn for_directory<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a StageEvent> + 'a {
        self.events.iter().filter(move |e| e.directory == dir)
    }
}

impl StageObserver for EventLog {
    fn on_event(&mut self, event: &StageEvent) {
        self.events.push(event.clone());
    }
}

/// Final state of one directory after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    Completed,
    Failed { stage: String, error: String },
}

/// Per-directory outcomes of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: Vec<(PathBuf, DirectoryOutcome)>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.directories
            .iter()
            .filter(|(_, o)| *o == DirectoryOutcome::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.directories.len() - self.completed()
    }

    /// True when no directory was processed at all.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

/// Runs plans against directories with failure containment.
pub struct PipelineEngine<'a> {
    invoker: &'a dyn ToolInvoker,
}

impl<'a> PipelineEngine<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker) -> Self {
        Self { invoker }
    }

    /// Runs every stage of `plan` on every directory.
    ///
    /// Failures never escape: they are reported to `observer` and reflected
    /// in the returned summary.
    pub fn run<S, O>(
        &self,
        plan: &[S],
        directories: impl IntoIterator<Item = WorkingDirectory>,
        observer: &mut O,
    ) -> RunSummary
    where
        S: Step,
        O: StageObserver + ?Sized,
    {
        let mut summary = RunSummary::default();
        for dir in directories {
            tracing::info!("Executing chosen pipeline in {dir}");
            let outcome = self.run_directory(plan, &dir, observer);
            summary.directories.push((dir.path().to_path_buf(), outcome));
        }
        if summary.is_empty() {
            tracing::info!("No folders selected, nothing to do");
        } else {
            tracing::info!(
                "Pipeline finished: {} completed, {} failed",
                summary.completed(),
                summary.failed()
            );
        }
        summary
    }

    fn run_directory<S, O>(
        &self,
        plan: &[S],
        dir: &WorkingDirectory,
        observer: &mut O,
    ) -> DirectoryOutcome
    where
        S: Step,
        O: StageObserver + ?Sized,
    {
        for stage in plan {
            match stage.run(dir, self.invoker) {
                Ok(()) => emit(observer, dir, stage, Phase::Run, Ok(())),
                Err(e) if stage.is_cleanup() => {
                    // A cleanup that cannot finish never stops the folder.
                    let detail = e.to_string();
                    emit(observer, dir, stage, Phase::Run, Err(detail));
                }
                Err(e) => {
                    let error = e.to_string();
                    emit(observer, dir, stage, Phase::Run, Err(error.clone()));
                    tracing::error!("Failed to execute pipeline in {dir}");
                    self.contain(plan, dir, observer);
                    return DirectoryOutcome::Failed {
                        stage: stage.name(),
                        error,
                    };
                }
            }
        }
        DirectoryOutcome::Completed
    }

    /// Attempts every cleanup stage of the plan after a failure.
    fn contain<S, O>(&self, plan: &[S], dir: &WorkingDirectory, observer: &mut O)
    where
        S: Step,
        O: StageObserver + ?Sized,
    {
        tracing::info!("Attempting to perform cleanup in {dir}...");
        for stage in plan.iter().filter(|s| s.is_cleanup()) {
            let result = stage.run(dir, self.invoker).map_err(|e| e.to_string());
            emit(observer, dir, stage, Phase::Containment, result);
        }
    }
}

fn emit<S, O>(
    observer: &mut O,
    dir: &WorkingDirectory,
    stage: &S,
    phase: Phase,
    result: Result<(), String>,
) where
    S: Step,
    O: StageObserver + ?Sized,
{
    let (outcome, detail) = match result {
        Ok(()) => (Outcome::Success, None),
        Err(detail) => (Outcome::Failure, Some(detail)),
    };
    observer.on_event(&StageEvent {
        directory: dir.path().to_path_buf(),
        stage: stage.name(),
        phase,
        outcome,
        detail,
    });
}
