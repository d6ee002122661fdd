//! Checksum command: print the digest of a file.

use anyhow::Result;
use garage_core::checksum;
use garage_core::Algorithm;
use std::path::Path;

/// Print `<digest>  <path>`, prefixed with the algorithm unless it is SHA-256.
pub fn run_checksum(path: &Path, algorithm: Algorithm) -> Result<()> {
    let digest = checksum::hash_of(path, algorithm)?;
    match algorithm {
        Algorithm::Sha256 => println!("{}  {}", digest, path.display()),
        other => println!("{}:{}  {}", other, digest, path.display()),
    }
    Ok(())
}
