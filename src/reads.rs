//! Sequencing read files: recognition, concatenation and base counting.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Whether a file name denotes FASTQ reads, plain or gzip-compressed.
pub fn is_read_file_name(name: &str) -> bool {
    name.ends_with(".fastq") || name.ends_with(".fastq.gz")
}

/// Suffix of partially written outputs; never a read file name.
const STAGING_SUFFIX: &str = ".tmp";

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Lists the read files directly inside `dir`, sorted by name.
pub fn read_files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Linked read files count; `DirEntry::file_type` would not follow them.
        if !entry.path().is_file() {
            continue;
        }
        if is_read_file_name(&entry.file_name().to_string_lossy()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Whether `dir` directly contains at least one read file.
///
/// Unreadable directories count as having none.
pub fn has_read_files(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        is_read_file_name(&entry.file_name().to_string_lossy()) && entry.path().is_file()
    })
}

/// Opens a read file, transparently decompressing gzip input.
pub fn open_reads(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Writes the decompressed content of every input into one gzip file.
///
/// Output is staged in a temporary file next to `output` and only moved
/// into place once complete.
pub fn concatenate_gzip(inputs: &[PathBuf], output: &Path) -> io::Result<()> {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".nanoasm_")
        .suffix(STAGING_SUFFIX)
        .tempfile_in(parent)?;

    {
        let mut encoder = GzEncoder::new(staged.as_file(), Compression::default());
        for input in inputs {
            let mut reader = open_reads(input)?;
            io::copy(&mut reader, &mut encoder)?;
        }
        encoder.finish()?.flush()?;
    }

    staged.persist(output).map_err(|e| e.error)?;
    Ok(())
}

/// Counts the sequence bases in a FASTQ file.
///
/// Only the second line of every four-line record is counted.
pub fn count_bases(path: &Path) -> io::Result<u64> {
    let reader = open_reads(path)?;
    let mut bases = 0u64;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if index % 4 == 1 {
            bases += line.trim_end().len() as u64;
        }
    }
    Ok(bases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn write_gz(path: &Path, content: &str) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_read_file_names() {
        assert!(is_read_file_name("reads.fastq"));
        assert!(is_read_file_name("reads.fastq.gz"));
        assert!(!is_read_file_name("reads.fq"));
        assert!(!is_read_file_name("reads.fastq.gz.md5"));
        assert!(!is_read_file_name("reads.fasta"));
    }

    #[test]
    fn test_read_files_in_ignores_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested.fastq")).unwrap();
        std::fs::write(dir.path().join("b.fastq"), "").unwrap();
        std::fs::write(dir.path().join("a.fastq.gz"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = read_files_in(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.fastq.gz", "b.fastq"]);
        assert!(has_read_files(dir.path()));
    }

    #[test]
    fn test_concatenate_mixed_inputs() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.fastq.gz");
        let second = dir.path().join("b.fastq");
        write_gz(&first, "@r1\nACGT\n+\n!!!!\n");
        std::fs::write(&second, "@r2\nGG\n+\n!!\n").unwrap();

        let out = dir.path().join("all.fastq.gz");
        concatenate_gzip(&[first, second], &out).unwrap();

        let mut text = String::new();
        MultiGzDecoder::new(File::open(&out).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "@r1\nACGT\n+\n!!!!\n@r2\nGG\n+\n!!\n");
        assert_eq!(count_bases(&out).unwrap(), 6);
    }

    #[test]
    fn test_staged_output_is_not_a_read_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.fastq");
        std::fs::write(&input, "@r\nACGT\n+\n!!!!\n").unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        // Left behind by an interrupted run.
        std::fs::write(out_dir.join(format!(".nanoasm_x1{STAGING_SUFFIX}")), "").unwrap();
        assert!(!has_read_files(&out_dir));

        concatenate_gzip(&[input], &out_dir.join("all.fastq.gz")).unwrap();
        let files = read_files_in(&out_dir).unwrap();
        assert_eq!(files, vec![out_dir.join("all.fastq.gz")]);
    }

    #[test]
    fn test_count_bases_plain() {
        let dir = tempdir().unwrap();
        let reads = dir.path().join("r.fastq");
        std::fs::write(&reads, "@a\nACGTA\n+\n!!!!!\n@b\nAC\n+\n!!\n").unwrap();
        assert_eq!(count_bases(&reads).unwrap(), 7);
    }
}
