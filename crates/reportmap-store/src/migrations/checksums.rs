//! Checksum validation for migrations
//!
//! SHA256 of migration SQL, recorded in `schema_version` and compared on
//! every start to catch edited migrations

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_checksum() {
        let content = "SELECT 1";
        let checksum = compute_checksum(content);
        assert_eq!(checksum.len(), 64); // SHA256 is 64 hex chars
    }

    #[test]
    fn test_checksum_of_empty_input() {
        assert_eq!(
            compute_checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_deterministic() {
        let content = "SELECT 1";
        let checksum1 = compute_checksum(content);
        let checksum2 = compute_checksum(content);
        assert_eq!(checksum1, checksum2);
    }
}
