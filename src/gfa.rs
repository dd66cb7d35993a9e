//! Conversion of miniasm's GFA assembly graph into FASTA.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Writes every segment (`S` record) of `gfa` as a FASTA record to `fasta`.
///
/// Segments without inline sequence (`*`) are skipped. Returns the number
/// of records written.
pub fn gfa_to_fasta(gfa: &Path, fasta: &Path) -> io::Result<usize> {
    let reader = BufReader::new(File::open(gfa)?);
    let mut writer = BufWriter::new(File::create(fasta)?);
    let mut written = 0;

    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split('\t');
        if fields.next() != Some("S") {
            continue;
        }
        let (Some(name), Some(sequence)) = (fields.next(), fields.next()) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed segment line in {}: {line}", gfa.display()),
            ));
        };
        if sequence == "*" || sequence.is_empty() {
            continue;
        }
        writeln!(writer, ">{name}")?;
        writeln!(writer, "{sequence}")?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}
