//! File hashing and verification against registry digests.
//!
//! Files are read in fixed-size chunks so memory use stays bounded for
//! large downloads. Registry digests may carry an `<alg>:` prefix; without
//! one the caller's default algorithm applies.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Sha256,
    Sha512,
    Blake3,
}

impl Algorithm {
    /// Name used in registry prefixes and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
            Algorithm::Blake3 => "blake3",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            "blake3" => Ok(Algorithm::Blake3),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registry digest split into algorithm and lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedHash {
    pub algorithm: Algorithm,
    pub hex: String,
}

impl ExpectedHash {
    /// Parse `<alg>:<hex>` or a bare `<hex>` (which uses `default`).
    pub fn parse(raw: &str, default: Algorithm) -> Result<Self> {
        let (algorithm, hex) = match raw.split_once(':') {
            Some((alg, hex)) => (Algorithm::parse(alg)?, hex),
            None => (default, raw),
        };
        Ok(Self {
            algorithm,
            hex: hex.trim().to_ascii_lowercase(),
        })
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            Algorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            Algorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Compute the digest of a file and return it as lowercase hex.
pub fn hash_of(path: &Path, algorithm: Algorithm) -> Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// SHA-256 of a file as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    hash_of(path, Algorithm::Sha256)
}

/// Whether the file at `path` hashes to `expected`.
///
/// `expected` is a registry digest, optionally prefixed with the algorithm.
pub fn verify(path: &Path, expected: &str, default: Algorithm) -> Result<bool> {
    let expected = ExpectedHash::parse(expected, default)?;
    let actual = hash_of(path, expected.algorithm)?;
    Ok(actual == expected.hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_path_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn sha512_and_blake3_have_expected_lengths() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        assert_eq!(hash_of(f.path(), Algorithm::Sha512).unwrap().len(), 128);
        assert_eq!(hash_of(f.path(), Algorithm::Blake3).unwrap().len(), 64);
    }

    #[test]
    fn content_larger_than_one_chunk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let body: Vec<u8> = (0u8..=255).cycle().take(BUF_SIZE * 3 + 17).collect();
        f.write_all(&body).unwrap();
        f.flush().unwrap();
        let expected = hex::encode(Sha256::digest(&body));
        assert_eq!(sha256_path(f.path()).unwrap(), expected);
    }

    #[test]
    fn expected_hash_prefix_and_default() {
        let bare = ExpectedHash::parse("ABCDEF", Algorithm::Sha256).unwrap();
        assert_eq!(bare.algorithm, Algorithm::Sha256);
        assert_eq!(bare.hex, "abcdef");

        let prefixed = ExpectedHash::parse("blake3:00ff", Algorithm::Sha256).unwrap();
        assert_eq!(prefixed.algorithm, Algorithm::Blake3);
        assert_eq!(prefixed.hex, "00ff");

        assert!(matches!(
            ExpectedHash::parse("md4:00", Algorithm::Sha256),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn verify_matches_and_mismatches() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let good = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";
        assert!(verify(f.path(), good, Algorithm::Sha256).unwrap());
        assert!(verify(f.path(), &format!("sha256:{}", good.to_uppercase()), Algorithm::Blake3).unwrap());
        assert!(!verify(f.path(), &"0".repeat(64), Algorithm::Sha256).unwrap());
    }

    #[test]
    fn verify_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify(&dir.path().join("nope"), "00", Algorithm::Sha256).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
