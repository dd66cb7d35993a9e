//! Scripted stand-in for the external tools.
//!
//! `FakeInvoker` records every invocation and writes the files each tool
//! would have produced, so whole pipeline runs can be checked without any
//! bioinformatics software installed.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use nanoasm::{Invocation, StageError, StdoutSink, Tool, ToolInvoker, ToolOutput};

pub const READS: &str = "@read1\nACGTACGTAC\n+\n!!!!!!!!!!\n@read2\nGGGGCCCC\n+\n!!!!!!!!\n";

#[derive(Default)]
pub struct FakeInvoker {
    calls: RefCell<Vec<Invocation>>,
    failures: Vec<(Tool, String)>,
    outputs: Vec<(Tool, String)>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `tool` exit with status 1 whenever one of its arguments
    /// contains `needle`.
    pub fn failing(mut self, tool: Tool, needle: impl Into<String>) -> Self {
        self.failures.push((tool, needle.into()));
        self
    }

    /// Replaces what `tool` writes to its standard output.
    pub fn with_output(mut self, tool: Tool, content: impl Into<String>) -> Self {
        self.outputs.push((tool, content.into()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn tools_called(&self) -> Vec<Tool> {
        self.calls.borrow().iter().map(|c| c.tool).collect()
    }

    fn should_fail(&self, invocation: &Invocation) -> bool {
        self.failures.iter().any(|(tool, needle)| {
            *tool == invocation.tool
                && invocation
                    .args
                    .iter()
                    .any(|a| a.to_string_lossy().contains(needle.as_str()))
        })
    }

    fn fabricate(&self, invocation: &Invocation) -> std::io::Result<()> {
        let args = &invocation.args;
        if let Some((_, content)) = self.outputs.iter().find(|(t, _)| *t == invocation.tool) {
            return write_sink(&invocation.stdout, content);
        }
        match invocation.tool {
            Tool::DuplexTools => {
                let out = PathBuf::from(&args[2]);
                fs::create_dir_all(&out)?;
                write_gz(&out.join("split_1.fastq.gz"), READS)?;
                write_gz(&out.join("split_2.fastq.gz"), READS)?;
            }
            Tool::Flye => {
                let out = PathBuf::from(value_after(args, "-o"));
                fs::create_dir_all(&out)?;
                fs::write(out.join("assembly.fasta"), ">contig_1\nACGTACGT\n")?;
            }
            Tool::Medaka => {
                let out = PathBuf::from(value_after(args, "-o"));
                fs::create_dir_all(&out)?;
                fs::write(out.join("consensus.fasta"), ">contig_1\nACGTACGA\n")?;
            }
            Tool::Miniasm => {
                write_sink(&invocation.stdout, "S\tutg000001l\tACGTACGT\tLN:i:8\n")?;
            }
            Tool::Raven | Tool::Racon => {
                write_sink(&invocation.stdout, ">contig_1\nACGTACGT\n")?;
            }
            Tool::Filtlong => write_sink(&invocation.stdout, READS)?,
            Tool::Minimap2 => write_sink(&invocation.stdout, "r1\t10\t0\t10\t+\tr2\n")?,
        }
        Ok(())
    }
}

impl ToolInvoker for FakeInvoker {
    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, StageError> {
        self.calls.borrow_mut().push(invocation.clone());
        if self.should_fail(invocation) {
            return Ok(ToolOutput {
                exit_code: 1,
                stdout: Vec::new(),
                stderr: b"simulated failure\n".to_vec(),
            });
        }
        self.fabricate(invocation).map_err(|source| StageError::ToolLaunch {
            tool: invocation.tool.to_string(),
            source,
        })?;
        Ok(ToolOutput::default())
    }
}

fn value_after<'a>(args: &'a [OsString], flag: &str) -> &'a OsString {
    let index = args
        .iter()
        .position(|a| a == flag)
        .unwrap_or_else(|| panic!("missing {flag} in {args:?}"));
    &args[index + 1]
}

fn write_sink(sink: &StdoutSink, content: &str) -> std::io::Result<()> {
    match sink {
        StdoutSink::Capture => Ok(()),
        StdoutSink::File(path) => fs::write(path, content),
        StdoutSink::GzipFile(path) => write_gz(path, content),
    }
}

pub fn write_gz(path: &Path, content: &str) -> std::io::Result<()> {
    let mut encoder = GzEncoder::new(fs::File::create(path)?, Compression::default());
    encoder.write_all(content.as_bytes())?;
    encoder.finish()?;
    Ok(())
}

/// Creates `base/name/` holding two plain read files.
pub fn sample(base: &Path, name: &str) -> PathBuf {
    let dir = base.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("pass_1.fastq"), READS).unwrap();
    fs::write(dir.join("pass_2.fastq"), READS).unwrap();
    dir
}

/// Sorted names of the entries directly inside `dir`.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
