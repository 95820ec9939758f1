use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("byte {0:#04x} at position {1} of {2:?} is outside the validated {{A,C,G,T,N}} alphabet")]
    InvalidBase(u8, usize, std::path::PathBuf),
    #[error("VCF record at {0}:{1} names contig {2:?}, which is absent from the loaded reference")]
    UnknownContig(String, u64, String),
    #[error("VCF record at {0}:{1} has a symbolic ALT allele, skipped")]
    SymbolicAllele(String, u64),
    #[error("VCF record at {0}:{1} overlaps an already-retained variation on this contig, later record dropped")]
    OverlappingVariation(String, u64),
    #[error("malformed VCF line: {0}")]
    MalformedLine(String),
    #[error("no header line (starting with #CHROM) found in VCF input")]
    MissingHeader,
}
