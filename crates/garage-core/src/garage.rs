//! The user-facing cache handle.

use crate::checksum::Algorithm;
use crate::config::{normalize_base_url, GarageConfig, MismatchPolicy};
use crate::downloader::{CurlDownloader, CurlOptions, Downloader};
use crate::error::Result;
use crate::notice::{NoticeSink, TracingSink};
use crate::processor::Processor;
use crate::registry::Registry;
use crate::resolver::{CacheResolver, CacheState};
use crate::retry::RetryPolicy;
use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Manages a local store of registered data files.
///
/// A `Garage` is `Sync`: share it across threads and call [`fetch`] from
/// each. Fetches of the same name are serialized so only one download runs
/// per file; different names proceed in parallel.
///
/// [`fetch`]: Garage::fetch
pub struct Garage {
    path: PathBuf,
    base_url: String,
    registry: Registry,
    urls: BTreeMap<String, String>,
    algorithm: Algorithm,
    on_mismatch: MismatchPolicy,
    downloader: Box<dyn Downloader>,
    notices: Arc<dyn NoticeSink>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Garage {
    /// A cache rooted at `path` fetching from `base_url`.
    ///
    /// A relative `path` is taken against the current directory. Nothing
    /// is created on disk until the first download.
    pub fn new(path: impl Into<PathBuf>, base_url: &str, registry: Registry) -> Self {
        let path = path.into();
        Self {
            path: std::path::absolute(&path).unwrap_or(path),
            base_url: normalize_base_url(base_url),
            registry,
            urls: BTreeMap::new(),
            algorithm: Algorithm::default(),
            on_mismatch: MismatchPolicy::default(),
            downloader: Box::new(CurlDownloader::default()),
            notices: Arc::new(TracingSink),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Build a cache from a loaded configuration, reading its registry file.
    pub fn from_config(config: &GarageConfig) -> anyhow::Result<Self> {
        let path = config.resolved_store_path()?;
        let mut registry = Registry::new();
        if let Some(file) = &config.registry {
            registry
                .load(file)
                .with_context(|| format!("load registry {}", file.display()))?;
        }

        let retry = config
            .retry
            .as_ref()
            .map(RetryPolicy::try_from)
            .transpose()
            .context("invalid retry settings")?
            .unwrap_or_default();
        let mut options = CurlOptions::default();
        if let Some(secs) = config.connect_timeout_secs {
            options.connect_timeout = Duration::from_secs(secs);
        }

        Ok(Self::new(path, &config.resolved_base_url(), registry)
            .with_urls(config.urls.clone())
            .with_algorithm(config.algorithm)
            .with_mismatch_policy(config.on_mismatch)
            .with_downloader(CurlDownloader::new(options, retry)))
    }

    pub fn with_downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Box::new(downloader);
        self
    }

    pub fn with_notices(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.notices = notices;
        self
    }

    pub fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.on_mismatch = policy;
        self
    }

    /// Default algorithm for registry hashes without a prefix.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Per-file URLs used instead of `base_url + name`.
    pub fn with_urls(mut self, urls: BTreeMap<String, String>) -> Self {
        self.urls = urls;
        self
    }

    /// Absolute path of the store directory.
    pub fn abspath(&self) -> &Path {
        &self.path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Merge entries from a registry file. On error nothing is merged.
    pub fn load_registry(&mut self, file: &Path) -> Result<()> {
        self.registry.load(file)
    }

    /// Remote URL for a registered name.
    pub fn get_url(&self, name: &str) -> Result<String> {
        self.resolver().url_for(name)
    }

    /// State of the local copy of `name`, without downloading.
    pub fn inspect(&self, name: &str) -> Result<CacheState> {
        self.resolver().inspect(name)
    }

    /// Return the path of a verified local copy of `name`, downloading it
    /// when it is missing or does not match the registry.
    pub fn fetch(&self, name: &str) -> Result<PathBuf> {
        self.registry.lookup(name)?;
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.resolver().resolve(name)?.path)
    }

    /// Like [`fetch`](Self::fetch), then return what `processor` produces.
    pub fn fetch_with(&self, name: &str, processor: &dyn Processor) -> Result<Vec<PathBuf>> {
        self.registry.lookup(name)?;
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.resolver().resolve_with(name, processor)
    }

    fn resolver(&self) -> CacheResolver<'_> {
        CacheResolver {
            registry: &self.registry,
            store: &self.path,
            base_url: &self.base_url,
            urls: &self.urls,
            algorithm: self.algorithm,
            on_mismatch: self.on_mismatch,
            downloader: self.downloader.as_ref(),
            notices: self.notices.as_ref(),
        }
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }
}
