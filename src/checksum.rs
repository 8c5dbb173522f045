//! Checksums for emitted artifacts
//!
//! Output is deterministic, so two runs over the same source produce the same
//! manifest. Diffing `checksums.sha256` is the cheap reproducibility check.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of an emitted document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &[u8]) -> bool {
        Self::from_bytes(content) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `checksums.sha256` content: one `<sha256>  <file>` line per entry,
/// sorted by file name
pub fn manifest(entries: &[(String, Checksum)]) -> String {
    let mut sorted: Vec<&(String, Checksum)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .into_iter()
        .map(|(file, checksum)| format!("{}  {}\n", checksum, file))
        .collect()
}
