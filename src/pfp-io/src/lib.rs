//! Ingestion collaborators (C9) and the output writer (C6) around the PFP core engine.

pub mod error;
pub mod fasta;
pub mod reader;
pub mod sample_list;
pub mod standalone;
pub mod vcf;
pub mod writer;

pub use error::IoError;
pub use fasta::read_fasta;
pub use reader::{read_dictionary, read_parse};
pub use sample_list::read_sample_list;
pub use standalone::{read_fasta_samples, read_text_sample};
pub use vcf::{read_vcf, IngestionSummary, SampleSelections};
pub use writer::{
    lift_from_variations, write_compressed_dictionary, write_dictionary, write_length_index, write_lifting_index, write_occurrences,
    write_parse, Lift, LiftingEntry,
};

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use gzp::deflate::Bgzf;
use gzp::par::decompress::ParDecompressBuilder;
use located_error::LocatedError;

/// Opens `path` for buffered reading, transparently decompressing it if its name ends in
/// `.gz`. Matches the teacher's BGZF-aware reader construction in spirit, minus the
/// VCF-specific parsing it was embedded in.
pub fn open_maybe_gzip(path: &Path, threads: usize) -> anyhow::Result<Box<dyn BufRead>> {
    let loc_msg = || format!("While opening {}", path.display());
    let file = File::open(path).with_loc(loc_msg)?;
    let source: Box<dyn Read> = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        ParDecompressBuilder::<Bgzf>::new().maybe_num_threads(threads).maybe_par_from_reader(file)
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(source)))
}
