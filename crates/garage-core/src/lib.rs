//! Registry-driven download cache for data files.
//!
//! A [`Garage`] maps file names to expected hashes through a [`Registry`],
//! keeps verified copies in a local store and downloads a file again only
//! when it is missing or no longer matches. Archives and compressed files
//! can be post-processed with a [`Processor`].

pub mod checksum;
pub mod config;
pub mod downloader;
pub mod error;
pub mod garage;
pub mod logging;
pub mod notice;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod storage;

pub use checksum::Algorithm;
pub use config::{GarageConfig, MismatchPolicy};
pub use downloader::{CurlDownloader, Downloader};
pub use error::{DownloadError, Error, Result};
pub use garage::Garage;
pub use notice::{Notice, NoticeSink, NullSink, RecordingSink, TracingSink};
pub use processor::{Action, Decompress, ExtractorProcessor, ProcessContext, Processor};
pub use registry::{make_registry, Registry};
pub use resolver::CacheState;
