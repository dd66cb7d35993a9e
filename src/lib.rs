//! # nanoasm: Nanopore Genome Assembly Pipeline
//!
//! This library drives the external tools of a nanopore bacterial genome
//! assembly workflow (duplex splitting, read filtering, assembly, optional
//! racon polishing and medaka consensus) over a directory of sequencing runs.
//!
//! ## Overview
//!
//! nanoasm allows you to:
//! - Select the sample folders below a base directory that contain reads
//! - Build an ordered stage plan from a [`Config`]
//! - Run the plan over every folder, containing failures to the folder they
//!   happened in and cleaning up after them
//! - Pick the medaka model closest to a partial flow cell/device/basecaller
//!   selection
//!
//! ## Example Usage
//!
//! ```no_run
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! use nanoasm::{AssemblyVariant, Config, Pipeline, ProcessInvoker, ToolPaths, TracingObserver};
//! use std::path::Path;
//!
//! let config = Config::builder()
//!     .threads(8)
//!     .genome_size_mb(5.0)
//!     .assembler(AssemblyVariant::Raven)
//!     .build();
//!
//! let invoker = ProcessInvoker::new();
//! let pipeline = Pipeline::new(config, ToolPaths::discover(&[]), &invoker);
//! let summary = pipeline.run(Path::new("/data/run_2024_01"), &mut TracingObserver)?;
//! println!("{} folders assembled, {} failed", summary.completed(), summary.failed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - `selector`: which folders to process
//! - `plan` and `stage`: the ordered, closed set of work and cleanup stages
//! - `engine`: sequential execution with failure containment
//! - `tools`: locating and invoking the external programs
//! - `model` and `resolver`: medaka model catalog and nearest-version lookup
//!
//! Everything runs on the calling thread. Parallelism is left to the external
//! tools through the configured thread count.

pub mod assembler;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod gfa;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod reads;
pub mod resolver;
pub mod selector;
pub mod stage;
pub mod tools;
pub mod workdir;

pub use assembler::AssemblyVariant;
pub use config::{Config, ConfigBuilder, DEFAULT_MODEL};
pub use engine::{
    DirectoryOutcome, EventLog, Outcome, Phase, PipelineEngine, RunSummary, StageEvent,
    StageObserver, TracingObserver,
};
pub use error::{NanoAsmError, Result, StageError};
pub use model::{BasecallerVariant, Device, FlowCell, Model, ModelCatalog, ModelQuery, VersionTag};
pub use pipeline::{preflight, Pipeline};
pub use plan::StagePlan;
pub use resolver::{nearest_version, resolve, resolve_or_default, MatchTier, Resolution};
pub use selector::FolderSelector;
pub use stage::{Stage, StageKind, Step};
pub use tools::{Invocation, ProcessInvoker, StdoutSink, Tool, ToolInvoker, ToolOutput, ToolPaths};
pub use workdir::WorkingDirectory;
