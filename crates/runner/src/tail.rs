#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub const DEFAULT_TAIL_BYTES: usize = 512 * 1024;

/// Last `limit` bytes of the file, lossily decoded.
pub fn read_tail(path: &Path, limit: usize) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(limit as u64);
    file.seek(SeekFrom::Start(start))?;
    let mut bytes = Vec::with_capacity((len - start) as usize);
    file.take(limit as u64).read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_end_of_long_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stderr.log");
        std::fs::write(&path, "head-middle-tail").expect("write");
        assert_eq!(read_tail(&path, 4).expect("tail"), "tail");
        assert_eq!(read_tail(&path, 1024).expect("tail"), "head-middle-tail");
        assert_eq!(read_tail(&path, 0).expect("tail"), "");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_tail(&dir.path().join("absent.log"), 10).is_err());
    }
}
