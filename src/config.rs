//! Configuration options for an assembly pipeline run.
//!
//! This module provides a builder pattern for configuring pipeline parameters,
//! and loading of the same record from a TOML file.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::assembler::AssemblyVariant;
use crate::error::{NanoAsmError, Result};

/// Medaka model used when nothing better can be resolved.
pub const DEFAULT_MODEL: &str = "r104_e81_sup_g5015";

/// Configuration for a pipeline run.
///
/// # Default Values
/// - `threads`: Number of CPU cores
/// - `keep_intermediate`: false
/// - `genome_size_mb`: 4.2
/// - `coverage`: 100
/// - `min_read_length`: 1000 bp
/// - `model`: `r104_e81_sup_g5015`
/// - `skip_racon`: true
/// - `skip_unclassified`: true
/// - `assemblers`: Flye only
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Threads forwarded to every external tool
    pub threads: usize,

    /// Leave intermediate artifacts in place (no cleanup stages)
    pub keep_intermediate: bool,

    /// Expected genome size in megabases
    pub genome_size_mb: f64,

    /// Target coverage used to cap the filtered read set
    pub coverage: u32,

    /// Minimum read length kept by filtlong
    pub min_read_length: u64,

    /// Medaka model identifier
    pub model: String,

    /// Skip racon polishing of the Flye assembly
    pub skip_racon: bool,

    /// Ignore folders whose name starts with `unclassified`
    pub skip_unclassified: bool,

    /// Enabled assemblers, iterated in plan order
    pub assemblers: BTreeSet<AssemblyVariant>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threads: num_cpus::get().max(1),
            keep_intermediate: false,
            genome_size_mb: 4.2,
            coverage: 100,
            min_read_length: 1_000,
            model: DEFAULT_MODEL.to_string(),
            skip_racon: true,
            skip_unclassified: true,
            assemblers: BTreeSet::from([AssemblyVariant::Flye]),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Example
    /// ```
    /// use nanoasm::{AssemblyVariant, Config};
    ///
    /// let config = Config::builder()
    ///     .threads(4)
    ///     .genome_size_mb(5.0)
    ///     .assembler(AssemblyVariant::Raven)
    ///     .build();
    /// assert_eq!(config.target_bases(), 500_000_000);
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Base-pair budget handed to the read filter.
    ///
    /// The genome size is rounded to whole kilobases before scaling so that
    /// values like 4.2 Mb do not pick up floating point noise.
    pub fn target_bases(&self) -> u64 {
        let kilobases = (self.genome_size_mb * 1_000.0).round() as u64;
        kilobases * 1_000 * u64::from(self.coverage)
    }

    /// Whether racon polishing runs for the given assembler.
    pub fn racon_runs_for(&self, variant: AssemblyVariant) -> bool {
        variant.supports_racon() && !self.skip_racon
    }

    /// Checks the value constraints of every field.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(NanoAsmError::InvalidConfig(
                "threads must be positive".to_string(),
            ));
        }
        if !self.genome_size_mb.is_finite() || self.genome_size_mb <= 0.0 {
            return Err(NanoAsmError::InvalidConfig(format!(
                "genome size must be a positive number of megabases, got {}",
                self.genome_size_mb
            )));
        }
        if self.coverage == 0 {
            return Err(NanoAsmError::InvalidConfig(
                "coverage must be positive".to_string(),
            ));
        }
        let model = self.model.trim();
        if model.is_empty() || model == "--" {
            return Err(NanoAsmError::InvalidConfig(
                "a medaka model must be specified".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads a configuration from a TOML file.
    ///
    /// Fields missing from the file keep their default values.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            NanoAsmError::ConfigParse { message, .. } => NanoAsmError::ConfigParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| NanoAsmError::ConfigParse {
            path: Default::default(),
            message: e.to_string(),
        })?;
        Ok(file.into_builder(Config::builder()).build())
    }

    /// Logs the parameter summary of a run.
    pub fn log_summary(&self) {
        let assemblers: Vec<&str> = self.assemblers.iter().map(|a| a.display_name()).collect();
        tracing::info!("Setting up pipeline with the following parameters:");
        tracing::info!(
            "  Threads: {}, Filtlong min-len: {}",
            self.threads,
            self.min_read_length
        );
        tracing::info!(
            "  Genome Size: {}, Coverage: {}",
            self.genome_size_mb,
            self.coverage
        );
        tracing::info!(
            "  Assemblers: {:?}, Racon Polishing: {}",
            assemblers,
            !self.skip_racon
        );
        tracing::info!("  Medaka Model: {}", self.model);
    }
}

/// On-disk layout of a configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    threads: Option<usize>,
    keep_intermediate: Option<bool>,
    genome_size_mb: Option<f64>,
    coverage: Option<u32>,
    min_read_length: Option<u64>,
    model: Option<String>,
    skip_racon: Option<bool>,
    skip_unclassified: Option<bool>,
    assemblers: Option<Vec<AssemblyVariant>>,
}

impl ConfigFile {
    fn into_builder(self, mut builder: ConfigBuilder) -> ConfigBuilder {
        if let Some(threads) = self.threads {
            builder.config.threads = threads;
        }
        if let Some(keep) = self.keep_intermediate {
            builder = builder.keep_intermediate(keep);
        }
        if let Some(size) = self.genome_size_mb {
            builder.config.genome_size_mb = size;
        }
        if let Some(coverage) = self.coverage {
            builder.config.coverage = coverage;
        }
        if let Some(min_len) = self.min_read_length {
            builder = builder.min_read_length(min_len);
        }
        if let Some(model) = self.model {
            builder = builder.model(model);
        }
        if let Some(skip) = self.skip_racon {
            builder = builder.skip_racon(skip);
        }
        if let Some(skip) = self.skip_unclassified {
            builder = builder.skip_unclassified(skip);
        }
        if let Some(assemblers) = self.assemblers {
            builder = builder.assemblers(assemblers);
        }
        builder
    }
}

/// Builder for constructing Config instances.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Starts from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Sets the number of threads passed to external tools.
    ///
    /// Default: Number of CPU cores
    pub fn threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Number of threads must be positive");
        self.config.threads = threads;
        self
    }

    /// Keep intermediate results instead of cleaning up.
    ///
    /// Default: false
    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.config.keep_intermediate = keep;
        self
    }

    /// Sets the expected genome size in megabases.
    ///
    /// Default: 4.2
    pub fn genome_size_mb(mut self, size: f64) -> Self {
        assert!(
            size.is_finite() && size > 0.0,
            "Genome size must be positive"
        );
        self.config.genome_size_mb = size;
        self
    }

    /// Sets the target coverage.
    ///
    /// Default: 100
    pub fn coverage(mut self, coverage: u32) -> Self {
        assert!(coverage > 0, "Coverage must be positive");
        self.config.coverage = coverage;
        self
    }

    /// Sets the minimum read length kept by the filter.
    ///
    /// Default: 1000
    pub fn min_read_length(mut self, length: u64) -> Self {
        self.config.min_read_length = length;
        self
    }

    /// Sets the medaka model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Skip racon polishing of Flye assemblies.
    ///
    /// Default: true
    pub fn skip_racon(mut self, skip: bool) -> Self {
        self.config.skip_racon = skip;
        self
    }

    /// Skip folders named `unclassified*`.
    ///
    /// Default: true
    pub fn skip_unclassified(mut self, skip: bool) -> Self {
        self.config.skip_unclassified = skip;
        self
    }

    /// Enables one more assembler.
    pub fn assembler(mut self, variant: AssemblyVariant) -> Self {
        self.config.assemblers.insert(variant);
        self
    }

    /// Replaces the set of enabled assemblers.
    pub fn assemblers(mut self, variants: impl IntoIterator<Item = AssemblyVariant>) -> Self {
        self.config.assemblers = variants.into_iter().collect();
        self
    }

    /// Builds the final Config instance.
    pub fn build(self) -> Config {
        self.config
    }
}
