//! Archive extraction processor.
//!
//! [`ExtractorProcessor`] owns the parts every archive format shares: the
//! output directory naming, the member filter, staging into a scoped temp
//! directory, the notice and the output listing. The format itself is an
//! [`ExtractStrategy`].

use super::tar::TarStrategy;
use super::zip::ZipStrategy;
use super::{with_suffix, Action, ProcessContext, Processor};
use crate::error::{Error, Result};
use crate::notice::Notice;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Output directory suffix for zip archives.
pub const UNZIP_SUFFIX: &str = ".unzip";
/// Output directory suffix for tar archives.
pub const UNTAR_SUFFIX: &str = ".untar";

/// A concrete archive format.
pub trait ExtractStrategy: Send + Sync {
    /// Verb used in the whole-archive notice, e.g. "Unzipping".
    fn verb(&self) -> &'static str;

    /// Extract `members` (or everything when `None`) from `archive` into
    /// `destination`. Returns the number of files written.
    fn extract(&self, archive: &Path, members: Option<&[String]>, destination: &Path)
        -> Result<usize>;
}

/// Extracts an archive into `<archive><suffix>/` and returns the files.
///
/// `suffix` and the strategy are both required. Without a suffix
/// [`process`](Processor::process) fails with [`Error::NotConfigured`];
/// with a suffix but no strategy it fails with [`Error::NotImplemented`].
#[derive(Default)]
pub struct ExtractorProcessor {
    suffix: Option<String>,
    members: Option<Vec<String>>,
    strategy: Option<Box<dyn ExtractStrategy>>,
}

impl ExtractorProcessor {
    /// A bare processor with neither suffix nor strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip extraction into `<archive>.unzip/`.
    pub fn unzip() -> Self {
        Self::new()
            .with_suffix(UNZIP_SUFFIX)
            .with_strategy(ZipStrategy)
    }

    /// Tar extraction (plain, gzip, xz or bzip2) into `<archive>.untar/`.
    pub fn untar() -> Self {
        Self::new()
            .with_suffix(UNTAR_SUFFIX)
            .with_strategy(TarStrategy)
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn set_suffix(&mut self, suffix: impl Into<String>) {
        self.suffix = Some(suffix.into());
    }

    /// Restrict extraction to these members (paths inside the archive).
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_strategy(mut self, strategy: impl ExtractStrategy + 'static) -> Self {
        self.strategy = Some(Box::new(strategy));
        self
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn members(&self) -> Option<&[String]> {
        self.members.as_deref()
    }

    fn outputs_present(&self, extract_dir: &Path) -> bool {
        if !extract_dir.is_dir() {
            return false;
        }
        match &self.members {
            Some(members) => members.iter().all(|m| extract_dir.join(m).exists()),
            None => true,
        }
    }

    fn extract(
        &self,
        strategy: &dyn ExtractStrategy,
        archive: &Path,
        extract_dir: &Path,
    ) -> Result<usize> {
        let parent = extract_dir.parent().unwrap_or(Path::new("."));
        let staging = tempfile::Builder::new()
            .prefix(".garage-extract-")
            .tempdir_in(parent)?;
        let count = strategy.extract(archive, self.members.as_deref(), staging.path())?;
        move_tree(staging.path(), extract_dir)?;
        Ok(count)
    }

    fn outputs(&self, extract_dir: &Path) -> Result<Vec<PathBuf>> {
        if let Some(members) = &self.members {
            return Ok(members.iter().map(|m| extract_dir.join(m)).collect());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(extract_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl Processor for ExtractorProcessor {
    fn process(&self, ctx: &ProcessContext<'_>) -> Result<Vec<PathBuf>> {
        let suffix = self
            .suffix
            .as_deref()
            .ok_or(Error::NotConfigured { attribute: "suffix" })?;
        let strategy = self
            .strategy
            .as_deref()
            .ok_or_else(|| Error::NotImplemented {
                processor: format!("ExtractorProcessor(suffix = {:?})", suffix),
            })?;

        let extract_dir = with_suffix(ctx.input, suffix);
        let needs_extraction = ctx.action.is_fresh() || !self.outputs_present(&extract_dir);

        if needs_extraction {
            if ctx.action == Action::Update && extract_dir.exists() {
                fs::remove_dir_all(&extract_dir)?;
            }
            let count = self.extract(strategy, ctx.input, &extract_dir)?;
            let notice = match &self.members {
                Some(members) => Notice::ExtractingMembers {
                    members: members.clone(),
                    archive: ctx.input.to_path_buf(),
                    destination: extract_dir.clone(),
                },
                None => Notice::ExtractingAll {
                    verb: strategy.verb(),
                    archive: ctx.input.to_path_buf(),
                    destination: extract_dir.clone(),
                    members: count,
                },
            };
            ctx.notices.notice(&notice);
        } else {
            tracing::debug!(dir = %extract_dir.display(), "reusing extracted files");
        }

        self.outputs(&extract_dir)
    }
}

/// Move every entry below `from` to the same relative place below `to`.
fn move_tree(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(std::io::Error::other)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::RecordingSink;

    struct CopyStrategy;

    impl ExtractStrategy for CopyStrategy {
        fn verb(&self) -> &'static str {
            "Copying"
        }

        fn extract(
            &self,
            archive: &Path,
            _members: Option<&[String]>,
            destination: &Path,
        ) -> Result<usize> {
            fs::create_dir_all(destination.join("inner"))?;
            fs::copy(archive, destination.join("inner").join("copy.txt"))?;
            Ok(1)
        }
    }

    fn context<'a>(input: &'a Path, action: Action, sink: &'a RecordingSink) -> ProcessContext<'a> {
        ProcessContext {
            input,
            action,
            store: input.parent().unwrap(),
            notices: sink,
        }
    }

    #[test]
    fn missing_suffix_then_missing_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tiny-data.tar.gz");
        fs::write(&input, b"x").unwrap();
        let sink = RecordingSink::new();

        let mut processor = ExtractorProcessor::new();
        let err = processor
            .process(&context(&input, Action::Download, &sink))
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured { attribute: "suffix" }));
        assert!(err.to_string().contains("'suffix'"));

        processor.set_suffix("tar.gz");
        let err = processor
            .process(&context(&input, Action::Download, &sink))
            .unwrap_err();
        assert!(matches!(err, Error::NotImplemented { .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn extracts_on_download_and_reuses_on_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.bin");
        fs::write(&input, b"payload").unwrap();
        let sink = RecordingSink::new();
        let processor = ExtractorProcessor::new()
            .with_suffix(".copy")
            .with_strategy(CopyStrategy);

        let out = processor
            .process(&context(&input, Action::Download, &sink))
            .unwrap();
        let expected = dir.path().join("a.bin.copy").join("inner").join("copy.txt");
        assert_eq!(out, vec![expected.clone()]);
        assert_eq!(fs::read(&expected).unwrap(), b"payload");
        assert_eq!(sink.take().len(), 1);

        let again = processor
            .process(&context(&input, Action::Fetch, &sink))
            .unwrap();
        assert_eq!(again, out);
        assert!(sink.is_empty());

        // No staging directories are left behind.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".garage-extract-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn fetch_reextracts_when_outputs_were_removed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.bin");
        fs::write(&input, b"payload").unwrap();
        let sink = RecordingSink::new();
        let processor = ExtractorProcessor::new()
            .with_suffix(".copy")
            .with_strategy(CopyStrategy);
        let out = processor
            .process(&context(&input, Action::Fetch, &sink))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn update_clears_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.bin");
        fs::write(&input, b"payload").unwrap();
        let stale = dir.path().join("a.bin.copy").join("stale.txt");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();
        let sink = RecordingSink::new();
        let processor = ExtractorProcessor::new()
            .with_suffix(".copy")
            .with_strategy(CopyStrategy);
        let out = processor
            .process(&context(&input, Action::Update, &sink))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(!stale.exists());
    }
}
