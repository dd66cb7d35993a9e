//! External tool discovery and invocation.
//!
//! Stages never spawn processes themselves. They describe what to run as an
//! [`Invocation`] and hand it to a [`ToolInvoker`], which keeps the pipeline
//! testable without the bioinformatics tools installed.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::StageError;

/// Every external program the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    DuplexTools,
    Filtlong,
    Flye,
    Raven,
    Minimap2,
    Miniasm,
    Racon,
    Medaka,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::DuplexTools,
        Tool::Filtlong,
        Tool::Flye,
        Tool::Raven,
        Tool::Minimap2,
        Tool::Miniasm,
        Tool::Racon,
        Tool::Medaka,
    ];

    /// Executable name looked up on the search path.
    pub fn executable(self) -> &'static str {
        match self {
            Tool::DuplexTools => "duplex_tools",
            Tool::Filtlong => "filtlong",
            Tool::Flye => "flye",
            Tool::Raven => "raven",
            Tool::Minimap2 => "minimap2",
            Tool::Miniasm => "miniasm",
            Tool::Racon => "racon",
            Tool::Medaka => "medaka_consensus",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Resolved executable locations plus directories to prepend to `PATH`.
///
/// Built once before a run and captured by every stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPaths {
    resolved: BTreeMap<Tool, PathBuf>,
    search_prefixes: Vec<PathBuf>,
}

impl ToolPaths {
    /// No resolved tools; every program is looked up by bare name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every tool, trying each prefix (and its `bin/`) before `PATH`.
    ///
    /// Tools that cannot be found are left unresolved; see [`ToolPaths::missing`].
    pub fn discover(prefixes: &[PathBuf]) -> Self {
        let mut paths = ToolPaths {
            resolved: BTreeMap::new(),
            search_prefixes: expand_prefixes(prefixes),
        };
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let prefix_path = std::env::join_paths(&paths.search_prefixes).ok();

        for tool in Tool::ALL {
            let found = prefix_path
                .as_ref()
                .filter(|p| !p.is_empty())
                .and_then(|p| which::which_in(tool.executable(), Some(p), &cwd).ok())
                .or_else(|| which::which(tool.executable()).ok());
            match found {
                Some(path) => {
                    tracing::debug!("Found {tool} at {}", path.display());
                    paths.resolved.insert(tool, path);
                }
                None => tracing::debug!("{tool} not found"),
            }
        }
        paths
    }

    /// Pins a tool to an explicit executable.
    pub fn with_tool(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.resolved.insert(tool, path.into());
        self
    }

    /// Adds a directory that is prepended to the child's `PATH`.
    pub fn with_search_prefix(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_prefixes.push(dir.into());
        self
    }

    /// Program to execute for `tool`.
    pub fn program(&self, tool: Tool) -> PathBuf {
        self.resolved
            .get(&tool)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(tool.executable()))
    }

    /// Tools with no resolved location.
    pub fn missing(&self) -> Vec<Tool> {
        Tool::ALL
            .into_iter()
            .filter(|tool| !self.resolved.contains_key(tool))
            .collect()
    }

    /// `PATH` value for child processes, or `None` when no prefixes are set.
    pub fn search_path(&self) -> Option<OsString> {
        if self.search_prefixes.is_empty() {
            return None;
        }
        let mut dirs = self.search_prefixes.clone();
        if let Some(current) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&current));
        }
        std::env::join_paths(dirs).ok()
    }
}

fn expand_prefixes(prefixes: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for prefix in prefixes {
        let bin = prefix.join("bin");
        if bin.is_dir() {
            dirs.push(bin);
        }
        dirs.push(prefix.clone());
    }
    dirs
}

/// Where a tool's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutSink {
    /// Kept in memory and returned in [`ToolOutput::stdout`]
    Capture,
    /// Streamed into a file
    File(PathBuf),
    /// Streamed into a gzip-compressed file
    GzipFile(PathBuf),
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub search_path: Option<OsString>,
    pub stdout: StdoutSink,
}

impl Invocation {
    pub fn new(tool: Tool, paths: &ToolPaths) -> Self {
        Self {
            tool,
            program: paths.program(tool),
            args: Vec::new(),
            working_dir: None,
            search_path: paths.search_path(),
            stdout: StdoutSink::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn stdout_to(mut self, sink: StdoutSink) -> Self {
        self.stdout = sink;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        match &self.stdout {
            StdoutSink::Capture => Ok(()),
            StdoutSink::File(path) => write!(f, " > {}", path.display()),
            StdoutSink::GzipFile(path) => write!(f, " | gzip > {}", path.display()),
        }
    }
}

/// Result of a completed external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit status; `-1` when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external tool to completion.
///
/// Implementations block until the process exits. A non-zero exit code is
/// reported through [`ToolOutput::exit_code`], not as an `Err`; `Err` means
/// the process could not be run at all.
pub trait ToolInvoker {
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, StageError>;
}

/// Invoker backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        ProcessInvoker
    }
}

impl ToolInvoker for ProcessInvoker {
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, StageError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(path) = &invocation.search_path {
            cmd.env("PATH", path);
        }
        cmd.stdin(Stdio::null());

        tracing::debug!("Executing: {invocation}");

        let launch_error = |source| StageError::ToolLaunch {
            tool: invocation.tool.to_string(),
            source,
        };

        let target = match &invocation.stdout {
            StdoutSink::Capture => {
                let output = cmd.output().map_err(launch_error)?;
                return Ok(ToolOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: output.stdout,
                    stderr: output.stderr,
                });
            }
            StdoutSink::File(path) | StdoutSink::GzipFile(path) => path,
        };

        let file = File::create(target)
            .map_err(|e| StageError::io(format!("creating {}", target.display()), e))?;

        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(launch_error)?;

        // Drain stderr concurrently so a chatty tool cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let copied = match child.stdout.take() {
            Some(mut stdout) => match &invocation.stdout {
                StdoutSink::GzipFile(_) => {
                    let mut encoder = GzEncoder::new(file, Compression::default());
                    io::copy(&mut stdout, &mut encoder)
                        .and_then(|_| encoder.finish())
                        .and_then(|mut f| f.flush())
                }
                _ => {
                    let mut file = file;
                    io::copy(&mut stdout, &mut file).and_then(|_| file.flush())
                }
            },
            None => Ok(()),
        };

        let status = child
            .wait()
            .map_err(|e| StageError::io(format!("waiting for {}", invocation.tool), e))?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        copied.map_err(|e| StageError::io(format!("writing {}", target.display()), e))?;

        Ok(ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: Vec::new(),
            stderr,
        })
    }
}
