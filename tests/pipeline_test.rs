//! End-to-end pipeline runs against scripted tools.

mod common;

use anyhow::Result;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

use common::{entries, sample, FakeInvoker};
use nanoasm::AssemblyVariant::{Flye, Miniasm, Raven};
use nanoasm::{
    Config, DirectoryOutcome, EventLog, Outcome, Phase, Pipeline, Tool, ToolPaths,
};

fn run(config: Config, invoker: &FakeInvoker, base: &std::path::Path) -> Result<(nanoasm::RunSummary, EventLog)> {
    let mut log = EventLog::new();
    let summary = Pipeline::new(config, ToolPaths::new(), invoker).run(base, &mut log)?;
    Ok((summary, log))
}

#[test]
fn test_flye_with_racon_leaves_only_final_assembly() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "barcode01");
    let config = Config::builder()
        .threads(2)
        .assemblers([Flye])
        .skip_racon(false)
        .build();
    let invoker = FakeInvoker::new();

    let (summary, _) = run(config, &invoker, base.path())?;

    assert_eq!(summary.completed(), 1);
    assert_eq!(entries(&dir), vec!["assemblies", "pass_1.fastq", "pass_2.fastq"]);
    assert_eq!(
        entries(&dir.join("assemblies")),
        vec!["barcode01_Flye_rm_coverage.fasta"]
    );
    assert_eq!(
        fs::read_to_string(dir.join("assemblies/barcode01_Flye_rm_coverage.fasta"))?,
        ">contig_1\nACGTACGA\n"
    );
    assert_eq!(
        invoker.tools_called(),
        vec![
            Tool::DuplexTools,
            Tool::Filtlong,
            Tool::Flye,
            Tool::Minimap2,
            Tool::Racon,
            Tool::Medaka
        ]
    );
    Ok(())
}

#[test]
fn test_output_name_without_racon() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "barcode07");
    let config = Config::builder().assemblers([Flye]).skip_racon(true).build();
    let invoker = FakeInvoker::new();

    run(config, &invoker, base.path())?;

    assert_eq!(
        entries(&dir.join("assemblies")),
        vec!["barcode07_Flye_m_coverage.fasta"]
    );
    assert!(!invoker.tools_called().contains(&Tool::Racon));
    Ok(())
}

#[test]
fn test_every_assembler_gets_its_own_output() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "s");
    let config = Config::builder()
        .assemblers([Miniasm, Raven, Flye])
        .skip_racon(false)
        .build();
    let invoker = FakeInvoker::new();

    let (summary, _) = run(config, &invoker, base.path())?;

    assert_eq!(summary.failed(), 0);
    assert_eq!(
        entries(&dir.join("assemblies")),
        vec![
            "s_Flye_rm_coverage.fasta",
            "s_Miniasm_m_coverage.fasta",
            "s_Raven_m_coverage.fasta",
        ]
    );
    assert_eq!(entries(&dir), vec!["assemblies", "pass_1.fastq", "pass_2.fastq"]);
    Ok(())
}

#[test]
fn test_keep_intermediate_leaves_artifacts() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "barcode01");
    let config = Config::builder()
        .assemblers([Flye])
        .keep_intermediate(true)
        .build();
    let invoker = FakeInvoker::new();

    run(config, &invoker, base.path())?;

    assert_eq!(
        entries(&dir),
        vec![
            "assemblies",
            "barcode01.fastq.gz",
            "barcode01_flye_assembly",
            "barcode01_split",
            "filtered_reads",
            "medaka_polished",
            "original",
        ]
    );
    assert_eq!(
        entries(&dir.join("original")),
        vec!["pass_1.fastq", "pass_2.fastq"]
    );
    Ok(())
}

#[test]
fn test_failure_in_one_folder_is_contained() -> Result<()> {
    let base = tempdir()?;
    let failing = sample(base.path(), "barcode01");
    let healthy = sample(base.path(), "barcode02");
    let config = Config::builder().assemblers([Flye]).build();
    let invoker = FakeInvoker::new().failing(Tool::Flye, "barcode01");

    let (summary, log) = run(config, &invoker, base.path())?;

    assert_eq!(summary.completed(), 1);
    assert_eq!(summary.failed(), 1);
    match &summary.directories[0] {
        (path, DirectoryOutcome::Failed { stage, error }) => {
            assert_eq!(path, &failing);
            assert_eq!(stage, "assemble[Flye]");
            assert!(error.contains("simulated failure"), "{error}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let trace: Vec<(String, Phase, Outcome)> = log
        .for_directory(&failing)
        .map(|e| (e.stage.clone(), e.phase, e.outcome))
        .collect();
    assert_eq!(
        trace,
        vec![
            ("duplex".to_string(), Phase::Run, Outcome::Success),
            ("filter".to_string(), Phase::Run, Outcome::Success),
            ("clean-duplex".to_string(), Phase::Run, Outcome::Success),
            ("assemble[Flye]".to_string(), Phase::Run, Outcome::Failure),
            ("clean-duplex".to_string(), Phase::Containment, Outcome::Failure),
            ("clean-assemble[Flye]".to_string(), Phase::Containment, Outcome::Failure),
            ("clean-filter".to_string(), Phase::Containment, Outcome::Success),
            ("final-clean".to_string(), Phase::Containment, Outcome::Success),
        ]
    );

    // The failed folder is back to its input reads.
    assert_eq!(entries(&failing), vec!["pass_1.fastq", "pass_2.fastq"]);
    assert_eq!(
        entries(&healthy.join("assemblies")),
        vec!["barcode02_Flye_m_coverage.fasta"]
    );

    let medaka_in_failed = invoker
        .calls()
        .iter()
        .filter(|c| c.tool == Tool::Medaka)
        .filter(|c| c.to_string().contains("barcode01"))
        .count();
    assert_eq!(medaka_in_failed, 0);
    Ok(())
}

#[test]
fn test_failed_duplex_leaves_reads_in_place() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "barcode03");
    let config = Config::builder().assemblers([Raven]).build();
    let invoker = FakeInvoker::new().failing(Tool::DuplexTools, "barcode03");

    let (summary, _) = run(config, &invoker, base.path())?;

    assert_eq!(summary.failed(), 1);
    assert_eq!(entries(&dir), vec!["pass_1.fastq", "pass_2.fastq"]);
    assert_eq!(invoker.tools_called(), vec![Tool::DuplexTools]);
    Ok(())
}

#[test]
fn test_base_folder_processed_after_children() -> Result<()> {
    let base = tempdir()?;
    let child = sample(base.path(), "barcode01");
    fs::write(base.path().join("own.fastq"), common::READS)?;
    let config = Config::builder().assemblers([Raven]).build();
    let invoker = FakeInvoker::new();

    let (summary, _) = run(config, &invoker, base.path())?;

    let order: Vec<_> = summary.directories.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(order, vec![child, base.path().to_path_buf()]);
    assert_eq!(summary.completed(), 2);
    assert_eq!(
        entries(base.path()),
        vec!["assemblies", "barcode01", "own.fastq"]
    );
    Ok(())
}

#[test]
fn test_rerun_over_finished_folder() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "barcode05");
    let config = Config::builder().assemblers([Raven]).build();

    let (first, _) = run(config.clone(), &FakeInvoker::new(), base.path())?;
    let (second, _) = run(config, &FakeInvoker::new(), base.path())?;

    assert_eq!(first.completed(), 1);
    assert_eq!(second.completed(), 1);
    assert_eq!(entries(&dir), vec!["assemblies", "pass_1.fastq", "pass_2.fastq"]);
    Ok(())
}

#[test]
fn test_empty_base_is_nothing_to_do() -> Result<()> {
    let base = tempdir()?;
    fs::create_dir(base.path().join("unclassified"))?;
    fs::write(base.path().join("unclassified/reads.fastq"), common::READS)?;
    let invoker = FakeInvoker::new();

    let (summary, log) = run(Config::default(), &invoker, base.path())?;

    assert!(summary.is_empty());
    assert!(log.events().is_empty());
    assert!(invoker.calls().is_empty());
    Ok(())
}

#[test]
fn test_tool_arguments() -> Result<()> {
    let base = tempdir()?;
    let dir = sample(base.path(), "bc");
    let config = Config::builder()
        .threads(3)
        .genome_size_mb(2.0)
        .coverage(50)
        .min_read_length(500)
        .model("r941_min_sup_g507")
        .assemblers([Flye])
        .build();
    let invoker = FakeInvoker::new();

    run(config, &invoker, base.path())?;

    let calls = invoker.calls();
    let filtlong = calls.iter().find(|c| c.tool == Tool::Filtlong).unwrap();
    let reads = dir.join("bc.fastq.gz");
    assert_eq!(
        filtlong.to_string(),
        format!(
            "filtlong --min_length 500 --keep_percent 90 --target_bases 100000000 {} | gzip > {}",
            reads.display(),
            dir.join("filtered_reads/bc_filtered.fastq.gz").display()
        )
    );

    let medaka = calls.iter().find(|c| c.tool == Tool::Medaka).unwrap();
    let rendered = medaka.to_string();
    assert!(rendered.contains("-t 3 -m r941_min_sup_g507 -f"), "{rendered}");
    assert_eq!(medaka.working_dir.as_deref(), Some(dir.as_path()));
    Ok(())
}
