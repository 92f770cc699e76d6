use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest as Sha2Digest, Sha256};
use thiserror::Error;

/// Chunk size for streaming file digests.
const BUF_SIZE: usize = 32 * 1024;

/// SHA-256 digest used as a content signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Compute the digest of a file, reading it in fixed-size chunks.
    pub fn of_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; BUF_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Ok(Self(bytes))
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex().chars().take(12).collect::<String>())
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| DigestError::InvalidHex(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(DigestError::InvalidHex(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Errors from digest parsing.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("invalid digest hex: {0}")]
    InvalidHex(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_display_fromstr_roundtrip() {
        let d = Digest::compute(b"hello world");
        let hex = d.to_string();
        assert_eq!(hex.len(), 64);
        let parsed: Digest = hex.parse().unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn digest_fromstr_invalid_hex() {
        assert!("not-valid-hex".parse::<Digest>().is_err());
    }

    #[test]
    fn digest_fromstr_wrong_length() {
        assert!("abcd".parse::<Digest>().is_err());
    }

    #[test]
    fn digest_deterministic() {
        let a = Digest::compute(b"test data");
        let b = Digest::compute(b"test data");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_different_data_different_hash() {
        let a = Digest::compute(b"data a");
        let b = Digest::compute(b"data b");
        assert_ne!(a, b);
    }

    #[test]
    fn file_digest_matches_in_memory_digest() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        // Larger than one chunk so the streaming path is exercised.
        let data = vec![0x5Au8; BUF_SIZE * 3 + 17];
        tmp.write_all(&data).unwrap();
        tmp.flush().unwrap();

        let from_file = Digest::of_file(tmp.path()).unwrap();
        assert_eq!(from_file, Digest::compute(&data));
    }

    #[test]
    fn file_digest_missing_file() {
        assert!(Digest::of_file("/nonexistent/binary").is_err());
    }
}
