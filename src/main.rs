use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use nanoasm::coverage::check_coverages;
use nanoasm::logging;
use nanoasm::{
    resolve_or_default, AssemblyVariant, BasecallerVariant, Config, Device, FolderSelector,
    ModelCatalog, ModelQuery, Pipeline, ProcessInvoker, StagePlan, ToolPaths, TracingObserver,
    VersionTag, DEFAULT_MODEL,
};

/// nanoasm - nanopore bacterial genome assembly
#[derive(Parser, Debug)]
#[command(name = "nanoasm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assemble and polish nanopore reads for every sample folder of a run", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(global = true, long = "verbose", short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline over every sample folder below BASE
    Run {
        /// Directory holding the sample folders (or reads itself)
        #[arg(value_name = "BASE")]
        base: PathBuf,

        #[command(flatten)]
        options: PipelineArgs,

        /// Directory searched for the external tools before PATH (repeatable)
        #[arg(long = "tool-prefix", value_name = "DIR")]
        tool_prefixes: Vec<PathBuf>,
    },

    /// Print the stage plan without running anything
    Plan {
        #[command(flatten)]
        options: PipelineArgs,
    },

    /// Estimate read coverage of every sample folder below BASE
    Coverage {
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Expected genome size in megabases
        #[arg(long = "genome-size", default_value_t = 4.2)]
        genome_size_mb: f64,

        /// Also check folders named unclassified*
        #[arg(long = "include-unclassified")]
        include_unclassified: bool,
    },

    /// Pick the medaka model closest to a flow cell/device/basecaller selection
    ResolveModel {
        /// Flow cell, e.g. r941 or r104_e81
        #[arg(long)]
        cell: String,

        /// Device: min or prom
        #[arg(long)]
        device: Option<Device>,

        /// Basecaller variant: fast, hac, high or sup
        #[arg(long)]
        variant: BasecallerVariant,

        /// Basecaller version, e.g. g507 or 5.0.7
        #[arg(long)]
        version: Option<VersionTag>,

        /// File with one model name per line (default: built-in list)
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
}

/// Options shared by every command that builds a plan.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// TOML configuration file; flags override its values
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long = "threads", short = 't')]
    threads: Option<usize>,

    /// Expected genome size in megabases
    #[arg(long = "genome-size")]
    genome_size_mb: Option<f64>,

    /// Target coverage for read filtering
    #[arg(long = "coverage")]
    coverage: Option<u32>,

    /// Minimum read length kept by filtlong
    #[arg(long = "min-length")]
    min_read_length: Option<u64>,

    /// Medaka model
    #[arg(long = "model")]
    model: Option<String>,

    /// Assembler to run: flye, raven or miniasm (repeatable)
    #[arg(long = "assembler", short = 'a', value_name = "NAME")]
    assemblers: Vec<AssemblyVariant>,

    /// Polish Flye assemblies with racon before medaka
    #[arg(long = "racon")]
    racon: bool,

    /// Keep intermediate files
    #[arg(long = "keep-intermediate")]
    keep_intermediate: bool,

    /// Also process folders named unclassified*
    #[arg(long = "include-unclassified")]
    include_unclassified: bool,
}

impl PipelineArgs {
    fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(size) = self.genome_size_mb {
            config.genome_size_mb = size;
        }
        if let Some(coverage) = self.coverage {
            config.coverage = coverage;
        }
        if let Some(min_len) = self.min_read_length {
            config.min_read_length = min_len;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if !self.assemblers.is_empty() {
            config.assemblers = self.assemblers.iter().copied().collect();
        }
        if self.racon {
            config.skip_racon = false;
        }
        if self.keep_intermediate {
            config.keep_intermediate = true;
        }
        if self.include_unclassified {
            config.skip_unclassified = false;
        }
        config.validate().context("Invalid pipeline configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            base,
            options,
            tool_prefixes,
        } => cmd_run(&base, &options, &tool_prefixes, cli.verbose),
        Commands::Plan { options } => {
            logging::init(cli.verbose, None)?;
            let config = options.to_config()?;
            print!("{}", StagePlan::build(&config, ToolPaths::new()));
            Ok(())
        }
        Commands::Coverage {
            base,
            genome_size_mb,
            include_unclassified,
        } => {
            logging::init(cli.verbose, None)?;
            let selector = FolderSelector::new(!include_unclassified);
            let reports = check_coverages(&base, &selector, genome_size_mb)
                .with_context(|| format!("Failed to check coverage below {}", base.display()))?;
            for report in &reports {
                println!("{report}");
            }
            Ok(())
        }
        Commands::ResolveModel {
            cell,
            device,
            variant,
            version,
            catalog,
        } => {
            logging::init(cli.verbose, None)?;
            let catalog = match catalog {
                Some(path) => ModelCatalog::from_file(&path)
                    .with_context(|| format!("Failed to read model catalog {}", path.display()))?,
                None => ModelCatalog::default_models(),
            };
            let mut query = ModelQuery::new(cell.as_str(), variant);
            query.device = device;
            query.version = version;
            println!("{}", resolve_or_default(&query, &catalog, DEFAULT_MODEL));
            Ok(())
        }
    }
}

fn cmd_run(base: &Path, options: &PipelineArgs, prefixes: &[PathBuf], verbose: bool) -> Result<()> {
    if !base.is_dir() {
        bail!("The given path {} is not a directory", base.display());
    }
    logging::init(verbose, Some(&logging::log_path(base)))
        .context("Failed to set up logging")?;

    let config = options.to_config()?;
    let invoker = ProcessInvoker::new();
    let pipeline = Pipeline::new(config, ToolPaths::discover(prefixes), &invoker);
    let summary = pipeline
        .run(base, &mut TracingObserver)
        .with_context(|| format!("Failed to run pipeline in {}", base.display()))?;

    if summary.failed() > 0 {
        bail!(
            "{} of {} folder(s) failed, see {}",
            summary.failed(),
            summary.directories.len(),
            logging::log_path(base).display()
        );
    }
    Ok(())
}
