use super::extract::ExtractStrategy;
use crate::error::{Error, Result};
use ::zip::result::ZipError;
use ::zip::ZipArchive;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

/// Zip archives via the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipStrategy;

impl ExtractStrategy for ZipStrategy {
    fn verb(&self) -> &'static str {
        "Unzipping"
    }

    fn extract(
        &self,
        archive: &Path,
        members: Option<&[String]>,
        destination: &Path,
    ) -> Result<usize> {
        let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;

        let Some(members) = members else {
            let files = zip.file_names().filter(|n| !n.ends_with('/')).count();
            zip.extract(destination)?;
            return Ok(files);
        };

        for member in members {
            let mut entry = match zip.by_name(member) {
                Ok(entry) => entry,
                Err(ZipError::FileNotFound) => {
                    return Err(Error::MemberNotFound {
                        member: member.clone(),
                        archive: archive.to_path_buf(),
                    })
                }
                Err(e) => return Err(e.into()),
            };
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| Error::Archive(format!("unsafe member path '{}'", member)))?;
            let target = destination.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }
        Ok(members.len())
    }
}
