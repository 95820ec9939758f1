use thiserror::Error;
use crate::FileEntity;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("{0} {1} does not exist")]
    MissingFileEntity(FileEntity, String),

    #[error("{1} is not a {0}")]
    InvalidFileEntity(FileEntity, String),

    #[error("--window must be at least 1, got {0}")]
    InvalidWindow(usize),

    #[error("--modulus must be at least 1, got {0}")]
    InvalidModulus(u64),

    #[error("{0} already exists. Use --overwrite to force.")]
    CannotOverwrite(String),

    #[error("--aupair-budget requires --aupair")]
    AuPairBudgetWithoutAuPair,

    #[error("Failed to generate an output file prefix from the input reference filename")]
    ParseOutputPrefix,
}
