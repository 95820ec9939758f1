use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to parse position into a valid u64: {0}")]
pub struct ParsePositionError(#[from] std::num::ParseIntError);
