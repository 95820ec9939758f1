//! Readers for the `.dict`/`.parse` files written by [`crate::writer`], used by the standalone
//! AuPair command to reload a previously built dictionary/parse pair (SPEC_FULL.md §4.7).

use std::path::Path;

use genome::alphabet::{ENDOFDICT, ENDOFWORD};
use located_error::LocatedError;

/// Reads a `.dict` file back into its ordered phrase list. The i-th phrase (0-based) has rank
/// id `i + 1`, matching [`crate::writer::write_dictionary`].
///
/// # Errors
/// I/O errors reading `path`.
pub fn read_dictionary(path: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    let bytes = std::fs::read(path).with_loc(|| format!("While reading {}", path.display()))?;
    let body = match bytes.split_last() {
        Some((&ENDOFDICT, rest)) => rest,
        _ => &bytes[..],
    };
    Ok(body.split(|&b| b == ENDOFWORD).filter(|phrase| !phrase.is_empty()).map(<[u8]>::to_vec).collect())
}

/// Reads a `.parse` file back into its ordered rank-id list.
///
/// # Errors
/// I/O errors, or if the file length is not a multiple of 4 bytes.
pub fn read_parse(path: &Path) -> anyhow::Result<Vec<u32>> {
    let bytes = std::fs::read(path).with_loc(|| format!("While reading {}", path.display()))?;
    if bytes.len() % 4 != 0 {
        return Err(anyhow::anyhow!("{} is not a whole number of 4-byte rank ids", path.display()));
    }
    Ok(bytes.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{write_dictionary, write_parse};

    #[test]
    fn dictionary_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dict");
        let phrases = vec![b"ACGT".to_vec(), b"TTTT".to_vec(), b"GGCC".to_vec()];
        write_dictionary(&path, &phrases).unwrap();
        assert_eq!(read_dictionary(&path).unwrap(), phrases);
    }

    #[test]
    fn parse_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parse");
        write_parse(&path, &[1, 2, 300, 70_000]).unwrap();
        assert_eq!(read_parse(&path).unwrap(), vec![1, 2, 300, 70_000]);
    }

    #[test]
    fn malformed_parse_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.parse");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();
        assert!(read_parse(&path).is_err());
    }
}
