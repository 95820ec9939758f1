//! FASTA reader (C9): streams one or more (optionally gzip-compressed) FASTA files, in the
//! order given, into [`Contig`]s sharing one global coordinate space.

use std::io::BufRead as _;
use std::path::Path;

use genome::{alphabet, Contig, Position};
use located_error::LocatedError;

use crate::error::IoError;
use crate::open_maybe_gzip;

/// Reads every record of every file in `paths`, in file-then-within-file order, validating and
/// upper-casing sequence bytes against `{A,C,G,T,N}`.
///
/// # Errors
/// [`IoError::InvalidBase`] on any byte outside the validated alphabet; I/O errors on a
/// missing or unreadable file.
pub fn read_fasta(paths: &[impl AsRef<Path>], threads: usize) -> anyhow::Result<Vec<Contig>> {
    let mut contigs = Vec::new();
    let mut global_offset = 0u64;
    for path in paths {
        let path = path.as_ref();
        let reader = open_maybe_gzip(path, threads).with_loc(|| format!("While opening FASTA file {}", path.display()))?;
        let mut name: Option<String> = None;
        let mut bytes: Vec<u8> = Vec::new();
        let mut flush = |name: &mut Option<String>, bytes: &mut Vec<u8>, contigs: &mut Vec<Contig>, global_offset: &mut u64| {
            if let Some(n) = name.take() {
                let len = bytes.len() as u64;
                contigs.push(Contig::new(n, std::mem::take(bytes), Position(*global_offset)));
                *global_offset += len;
            }
        };
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_loc(|| format!("While reading line {} of {}", line_no + 1, path.display()))?;
            if let Some(header) = line.strip_prefix('>') {
                flush(&mut name, &mut bytes, &mut contigs, &mut global_offset);
                name = Some(header.split_whitespace().next().unwrap_or_default().to_string());
                continue;
            }
            for b in line.trim_end().bytes() {
                let normalized = alphabet::normalize_base(b).map_err(|bad| IoError::InvalidBase(bad, bytes.len(), path.to_path_buf()))?;
                bytes.push(normalized);
            }
        }
        flush(&mut name, &mut bytes, &mut contigs, &mut global_offset);
    }
    Ok(contigs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_multiple_records_and_upper_cases_bases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">chr1 some description").unwrap();
        writeln!(file, "acgtACGT").unwrap();
        writeln!(file, ">chr2").unwrap();
        writeln!(file, "NNNN").unwrap();
        let contigs = read_fasta(&[file.path()], 1).unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[0].name, "chr1");
        assert_eq!(&*contigs[0].reference, b"ACGTACGT");
        assert_eq!(contigs[1].name, "chr2");
        assert_eq!(contigs[0].global_offset, Position(0));
        assert_eq!(contigs[1].global_offset, Position(8));
    }

    #[test]
    fn rejects_invalid_base() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">chr1").unwrap();
        writeln!(file, "ACGZ").unwrap();
        assert!(read_fasta(&[file.path()], 1).is_err());
    }
}
