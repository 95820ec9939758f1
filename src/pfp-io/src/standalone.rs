//! Standalone sequence modes (C9, supplemented from the original implementation): a sample can
//! also be a pre-materialized sequence with no variant context at all, skipping the haplotype
//! iterator's variation-driven state machine entirely. Two flavors: a second FASTA(.gz) file
//! (one haplotype per record), or a single-sequence plain-text file. Either way the bytes feed
//! straight into the same W/p segmentation and dictionary/parse output as the VCF-driven path.

use std::path::Path;

use located_error::LocatedError;

use crate::fasta::read_fasta;
use crate::open_maybe_gzip;

/// Reads a standalone sample FASTA(.gz) file; each record becomes its own named haplotype.
///
/// # Errors
/// Same as [`read_fasta`].
pub fn read_fasta_samples(path: &Path, threads: usize) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let contigs = read_fasta(&[path], threads)?;
    Ok(contigs.into_iter().map(|c| (c.name, c.reference.to_vec())).collect())
}

/// Reads a plain, uncompressed text file containing exactly one sequence. Bytes are taken
/// verbatim (no `{A,C,G,T,N}` validation) — this mode exists to let the engine build a PFP of
/// an arbitrary byte corpus, not just genomic sequence.
///
/// # Errors
/// I/O errors opening or reading `path`.
pub fn read_text_sample(path: &Path) -> anyhow::Result<Vec<u8>> {
    use std::io::Read;
    let mut reader = open_maybe_gzip(path, 1).with_loc(|| format!("While opening plain-text sample {}", path.display()))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).with_loc(|| format!("While reading plain-text sample {}", path.display()))?;
    while matches!(bytes.last(), Some(b'\n' | b'\r')) {
        bytes.pop();
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_each_fasta_record_as_its_own_haplotype() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">sampleA\nACGT\n>sampleB\nTTTT").unwrap();
        let samples = read_fasta_samples(file.path(), 1).unwrap();
        assert_eq!(samples, vec![("sampleA".to_string(), b"ACGT".to_vec()), ("sampleB".to_string(), b"TTTT".to_vec())]);
    }

    #[test]
    fn plain_text_sample_strips_trailing_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ACGTACGT\n").unwrap();
        assert_eq!(read_text_sample(file.path()).unwrap(), b"ACGTACGT");
    }
}
