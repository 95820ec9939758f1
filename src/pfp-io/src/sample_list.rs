//! Sample allow-list reader (C9): one sample id per line, blank lines ignored.

use std::path::Path;

use located_error::LocatedError;

/// # Errors
/// I/O errors opening or reading `path`.
pub fn read_sample_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path).with_loc(|| format!("While reading sample allow-list {}", path.display()))?;
    Ok(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NA001\n\nNA002\n").unwrap();
        assert_eq!(read_sample_list(file.path()).unwrap(), vec!["NA001", "NA002"]);
    }
}
