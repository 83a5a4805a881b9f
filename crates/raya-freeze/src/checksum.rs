//! Artifact checksums for review output

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// SHA-256 of a file's contents, hex encoded
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Checksum of a generated artifact, or `None` if it has not been built yet
pub fn artifact_checksum(path: &Path) -> io::Result<Option<String>> {
    match file_checksum(path) {
        Ok(checksum) => Ok(Some(checksum)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checksum_of_known_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.h");
        fs::write(&path, "").unwrap();

        assert_eq!(
            file_checksum(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(file_checksum(&temp.path().join("missing.h")).is_err());
    }

    #[test]
    fn test_artifact_checksum() {
        let temp = TempDir::new().unwrap();
        let built = temp.path().join("os.h");
        fs::write(&built, "").unwrap();

        assert!(artifact_checksum(&built).unwrap().is_some());
        assert_eq!(artifact_checksum(&temp.path().join("missing.h")).unwrap(), None);
        assert!(artifact_checksum(temp.path()).is_err());
    }
}
