//! Preconditions and artifacts of individual stages.

mod common;

use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

use common::{entries, sample, FakeInvoker};
use nanoasm::reads::count_bases;
use nanoasm::stage::{
    AssembleStage, CleanAssembleStage, CleanFilterStage, DuplexStage, FilterStage,
    FinalCleanStage,
};
use nanoasm::AssemblyVariant::{Flye, Miniasm};
use nanoasm::{Stage, StageError, Step, Tool, ToolPaths, WorkingDirectory};

fn tools() -> Arc<ToolPaths> {
    Arc::new(ToolPaths::new())
}

#[test]
fn test_duplex_moves_reads_aside_and_concatenates() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(sample(base.path(), "bc01")).unwrap();
    let invoker = FakeInvoker::new();

    Stage::Duplex(DuplexStage::new(4, tools()))
        .run(&dir, &invoker)
        .unwrap();

    assert_eq!(
        entries(dir.path()),
        vec!["bc01.fastq.gz", "bc01_split", "original"]
    );
    assert_eq!(
        entries(&dir.original_dir()),
        vec!["pass_1.fastq", "pass_2.fastq"]
    );
    // Two split files of two reads each (10 + 8 bases per file).
    assert_eq!(count_bases(&dir.concatenated_reads()).unwrap(), 36);

    let call = &invoker.calls()[0];
    assert_eq!(call.working_dir.as_deref(), Some(dir.path()));
    assert!(call.to_string().ends_with("Native --threads 4"));
}

#[test]
fn test_duplex_refuses_existing_original() {
    let base = tempdir().unwrap();
    let path = sample(base.path(), "bc01");
    fs::create_dir(path.join("original")).unwrap();
    let dir = WorkingDirectory::new(path).unwrap();
    let invoker = FakeInvoker::new();

    let err = Stage::Duplex(DuplexStage::new(1, tools()))
        .run(&dir, &invoker)
        .unwrap_err();
    assert!(matches!(err, StageError::ArtifactExists(_)));
    assert!(invoker.calls().is_empty());
}

#[test]
fn test_duplex_requires_reads() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(base.path()).unwrap();
    let err = Stage::Duplex(DuplexStage::new(1, tools()))
        .run(&dir, &FakeInvoker::new())
        .unwrap_err();
    assert!(matches!(err, StageError::MissingArtifact { .. }));
}

#[test]
fn test_filter_requires_concatenated_reads() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(sample(base.path(), "bc02")).unwrap();
    let invoker = FakeInvoker::new();

    let err = Stage::Filter(FilterStage::new(1000, 42_000, tools()))
        .run(&dir, &invoker)
        .unwrap_err();
    match err {
        StageError::MissingArtifact { stage, path } => {
            assert_eq!(stage, "filter");
            assert_eq!(path, dir.concatenated_reads());
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(invoker.calls().is_empty());
}

#[test]
fn test_non_zero_exit_is_a_stage_failure() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(sample(base.path(), "bc03")).unwrap();
    fs::create_dir_all(dir.filtered_dir()).unwrap();
    fs::write(dir.filtered_reads(), "").unwrap();
    let invoker = FakeInvoker::new().failing(Tool::Flye, "bc03");

    let err = Stage::Assemble(AssembleStage::new(2, Flye, tools()))
        .run(&dir, &invoker)
        .unwrap_err();
    match err {
        StageError::ToolFailed {
            tool,
            code,
            stderr_tail,
        } => {
            assert_eq!(tool, "flye");
            assert_eq!(code, 1);
            assert_eq!(stderr_tail, "simulated failure");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_miniasm_without_segments_fails() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(sample(base.path(), "bc04")).unwrap();
    fs::create_dir_all(dir.filtered_dir()).unwrap();
    fs::write(dir.filtered_reads(), "").unwrap();
    let invoker = FakeInvoker::new().with_output(Tool::Miniasm, "H\tVN:Z:1.0\n");

    let err = Stage::Assemble(AssembleStage::new(2, Miniasm, tools()))
        .run(&dir, &invoker)
        .unwrap_err();
    assert!(matches!(err, StageError::InvalidOutput(_)), "{err}");
    assert_eq!(invoker.tools_called(), vec![Tool::Minimap2, Tool::Miniasm]);
}

#[test]
fn test_miniasm_converts_graph_to_fasta() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(sample(base.path(), "bc05")).unwrap();
    fs::create_dir_all(dir.filtered_dir()).unwrap();
    fs::write(dir.filtered_reads(), "").unwrap();

    Stage::Assemble(AssembleStage::new(2, Miniasm, tools()))
        .run(&dir, &FakeInvoker::new())
        .unwrap();

    assert_eq!(
        fs::read_to_string(dir.assembly_fasta(Miniasm)).unwrap(),
        ">utg000001l\nACGTACGT\n"
    );
}

#[test]
fn test_cleanup_of_missing_directory_fails() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(base.path()).unwrap();
    let stage = Stage::CleanFilter(CleanFilterStage);
    assert!(stage.is_cleanup());
    let err = stage.run(&dir, &FakeInvoker::new()).unwrap_err();
    assert!(matches!(err, StageError::MissingArtifact { .. }));
}

#[test]
fn test_clean_assemble_removes_what_it_can() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(sample(base.path(), "bc06")).unwrap();
    fs::create_dir_all(dir.overlap_dir()).unwrap();
    fs::create_dir_all(dir.medaka_dir()).unwrap();

    let result = Stage::CleanAssemble(CleanAssembleStage::new(Miniasm, false))
        .run(&dir, &FakeInvoker::new());

    assert!(result.is_err());
    assert!(!dir.overlap_dir().exists());
    assert!(!dir.medaka_dir().exists());
}

#[test]
fn test_final_clean_restores_originals() {
    let base = tempdir().unwrap();
    let dir = WorkingDirectory::new(base.path().join("bc07")).unwrap();
    fs::create_dir_all(dir.original_dir()).unwrap();
    fs::write(dir.original_dir().join("pass_1.fastq"), common::READS).unwrap();
    fs::write(dir.concatenated_reads(), "").unwrap();

    Stage::FinalClean(FinalCleanStage)
        .run(&dir, &FakeInvoker::new())
        .unwrap();

    assert_eq!(entries(dir.path()), vec!["pass_1.fastq"]);
}
