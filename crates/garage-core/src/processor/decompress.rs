use super::{with_suffix, ProcessContext, Processor};
use crate::error::{Error, Result};
use crate::notice::Notice;
use crate::storage::PartFile;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Compression method for [`Decompress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Pick from the file extension.
    #[default]
    Auto,
    Gzip,
    Xz,
    Lzma,
    Bzip2,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Auto => "auto",
            Method::Gzip => "gzip",
            Method::Xz => "xz",
            Method::Lzma => "lzma",
            Method::Bzip2 => "bzip2",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Method::Auto),
            "gzip" | "gz" => Ok(Method::Gzip),
            "xz" => Ok(Method::Xz),
            "lzma" => Ok(Method::Lzma),
            "bzip2" | "bz2" => Ok(Method::Bzip2),
            other => Err(Error::UnsupportedCompression(other.to_string())),
        }
    }

    /// Method implied by the extension of `path`.
    pub fn from_extension(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "gz" => Ok(Method::Gzip),
            "xz" => Ok(Method::Xz),
            "lzma" => Ok(Method::Lzma),
            "bz2" => Ok(Method::Bzip2),
            "zip" => Err(Error::UnsupportedCompression(
                "zip archives hold several files; use ExtractorProcessor::unzip".to_string(),
            )),
            other => Err(Error::UnsupportedCompression(format!(
                "cannot infer a method from extension '{}'",
                other
            ))),
        }
    }

    fn resolve(self, path: &Path) -> Result<Self> {
        match self {
            Method::Auto => Method::from_extension(path),
            m => Ok(m),
        }
    }

    fn decoder(self, reader: impl Read + 'static) -> Result<Box<dyn Read>> {
        Ok(match self {
            Method::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Method::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Method::Lzma => {
                let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)
                    .map_err(|e| Error::Io(io::Error::other(e)))?;
                Box::new(xz2::read::XzDecoder::new_stream(reader, stream))
            }
            Method::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Method::Auto => return Err(Error::UnsupportedCompression("auto".to_string())),
        })
    }
}

/// Decompresses a single-file download next to it.
///
/// The output is `<file>.decomp` unless a name is given, in which case it
/// is placed in the same directory as the download.
#[derive(Debug, Clone, Default)]
pub struct Decompress {
    method: Method,
    name: Option<String>,
}

impl Decompress {
    pub fn new(method: Method) -> Self {
        Self { method, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    fn output_path(&self, input: &Path) -> PathBuf {
        match (&self.name, input.parent()) {
            (Some(name), Some(parent)) => parent.join(name),
            _ => with_suffix(input, ".decomp"),
        }
    }
}

impl Processor for Decompress {
    fn process(&self, ctx: &ProcessContext<'_>) -> Result<Vec<PathBuf>> {
        let output = self.output_path(ctx.input);
        if !ctx.action.is_fresh() && output.is_file() {
            return Ok(vec![output]);
        }

        let method = self.method.resolve(ctx.input)?;
        let mut decoder = method.decoder(BufReader::new(File::open(ctx.input)?))?;
        let mut part = PartFile::create(&output)?;
        io::copy(&mut decoder, &mut part)?;
        part.finalize()?;

        ctx.notices.notice(&Notice::Decompressing {
            source: ctx.input.to_path_buf(),
            destination: output.clone(),
            method: method.as_str(),
        });
        Ok(vec![output])
    }
}
