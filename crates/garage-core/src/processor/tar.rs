use super::extract::ExtractStrategy;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

/// Outer compression of a tar archive, detected from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Xz,
    Bzip2,
}

impl TarCompression {
    pub fn from_magic(data: &[u8]) -> Self {
        match data {
            [0x1F, 0x8B, ..] => TarCompression::Gzip,
            [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => TarCompression::Xz,
            [b'B', b'Z', b'h', ..] => TarCompression::Bzip2,
            _ => TarCompression::None,
        }
    }

    pub fn detect(path: &Path) -> Result<Self> {
        let mut head = Vec::with_capacity(6);
        File::open(path)?.take(6).read_to_end(&mut head)?;
        Ok(Self::from_magic(&head))
    }

    fn wrap(self, reader: impl Read + 'static) -> Box<dyn Read> {
        match self {
            TarCompression::None => Box::new(reader),
            TarCompression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            TarCompression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
        }
    }
}

/// Tar archives via the `tar` crate, plain or compressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarStrategy;

impl ExtractStrategy for TarStrategy {
    fn verb(&self) -> &'static str {
        "Untarring"
    }

    fn extract(
        &self,
        archive: &Path,
        members: Option<&[String]>,
        destination: &Path,
    ) -> Result<usize> {
        let compression = TarCompression::detect(archive)?;
        tracing::debug!(archive = %archive.display(), ?compression, "opening tar archive");
        let reader = compression.wrap(BufReader::new(File::open(archive)?));
        let mut tar = ::tar::Archive::new(reader);

        let wanted: Option<Vec<String>> =
            members.map(|ms| ms.iter().map(|m| normalize(Path::new(m))).collect());
        let mut found = vec![false; wanted.as_ref().map_or(0, Vec::len)];
        let mut files = 0;

        for entry in tar.entries()? {
            let mut entry = entry?;
            let is_file = entry.header().entry_type().is_file();
            if let Some(wanted) = &wanted {
                let path = normalize(&entry.path()?);
                let Some(index) = wanted.iter().position(|w| *w == path) else {
                    continue;
                };
                found[index] = true;
            }
            if entry.unpack_in(destination)? && is_file {
                files += 1;
            }
        }

        if let Some(members) = members {
            if let Some(i) = found.iter().position(|f| !f) {
                return Err(Error::MemberNotFound {
                    member: members[i].clone(),
                    archive: archive.to_path_buf(),
                });
            }
            return Ok(members.len());
        }
        Ok(files)
    }
}

/// `./a//b` and `a/b` name the same member.
fn normalize(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
