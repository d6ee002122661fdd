//! CLI for the garage data-file cache.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use garage_core::config::{self, GarageConfig};
use garage_core::{Algorithm, MismatchPolicy};
use std::path::PathBuf;

use commands::{run_checksum, run_fetch, run_make_registry, run_status};

/// Top-level CLI for the garage cache.
#[derive(Debug, Parser)]
#[command(name = "garage")]
#[command(about = "garage: fetch registered data files into a verified local cache", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Settings that take precedence over the config file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Read configuration from this file instead of ~/.config/garage/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local store directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Base URL that file names are appended to.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Registry file (`<name> <hash>` per line).
    #[arg(long, global = true, value_name = "FILE")]
    pub registry: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, cfg: &mut GarageConfig) {
        if let Some(store) = &self.store {
            cfg.path = Some(store.clone());
            cfg.env = None;
        }
        if let Some(base_url) = &self.base_url {
            cfg.base_url = base_url.clone();
        }
        if let Some(registry) = &self.registry {
            cfg.registry = Some(registry.clone());
        }
    }
}

/// Post-download processing selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProcessKind {
    Unzip,
    Untar,
    Decompress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MismatchArg {
    Keep,
    Delete,
}

impl From<MismatchArg> for MismatchPolicy {
    fn from(arg: MismatchArg) -> Self {
        match arg {
            MismatchArg::Keep => MismatchPolicy::Keep,
            MismatchArg::Delete => MismatchPolicy::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Sha256,
    Sha512,
    Blake3,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha256 => Algorithm::Sha256,
            AlgorithmArg::Sha512 => Algorithm::Sha512,
            AlgorithmArg::Blake3 => Algorithm::Blake3,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch registered files, downloading those missing or out of date.
    Fetch {
        /// Registry names to fetch.
        #[arg(required = true)]
        names: Vec<String>,

        /// Extract as a zip archive into `<file>.unzip/`.
        #[arg(long, conflicts_with_all = ["untar", "decompress"])]
        unzip: bool,

        /// Extract as a tar archive into `<file>.untar/`.
        #[arg(long, conflicts_with = "decompress")]
        untar: bool,

        /// Decompress a .gz/.xz/.bz2 file into `<file>.decomp`.
        #[arg(long)]
        decompress: bool,

        /// Only extract this archive member (repeatable).
        #[arg(long = "member", value_name = "MEMBER")]
        members: Vec<String>,

        /// What to do with a download that fails verification.
        #[arg(long, value_enum, value_name = "POLICY")]
        on_mismatch: Option<MismatchArg>,
    },

    /// Show the cache state of every registered file.
    Status,

    /// Compute the digest of a file (e.g. to add it to a registry).
    Checksum {
        /// Path to the file.
        path: PathBuf,

        #[arg(long = "alg", value_enum, default_value = "sha256")]
        algorithm: AlgorithmArg,
    },

    /// Write a registry file covering every file in a directory.
    MakeRegistry {
        /// Directory to scan.
        dir: PathBuf,
        /// Registry file to write.
        output: PathBuf,
        /// Descend into subdirectories.
        #[arg(long)]
        recursive: bool,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                names,
                unzip,
                untar,
                decompress,
                members,
                on_mismatch,
            } => {
                let mut cfg = load_config(&cli.overrides)?;
                if let Some(policy) = on_mismatch {
                    cfg.on_mismatch = policy.into();
                }
                let process = process_kind(unzip, untar, decompress);
                run_fetch(&cfg, &names, process, &members)?;
            }
            CliCommand::Status => run_status(&load_config(&cli.overrides)?)?,
            CliCommand::Checksum { path, algorithm } => run_checksum(&path, algorithm.into())?,
            CliCommand::MakeRegistry {
                dir,
                output,
                recursive,
            } => run_make_registry(&dir, &output, recursive)?,
        }

        Ok(())
    }
}

fn load_config(overrides: &Overrides) -> Result<GarageConfig> {
    let mut cfg = match &overrides.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    overrides.apply(&mut cfg);
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

pub(crate) fn process_kind(unzip: bool, untar: bool, decompress: bool) -> Option<ProcessKind> {
    if unzip {
        Some(ProcessKind::Unzip)
    } else if untar {
        Some(ProcessKind::Untar)
    } else if decompress {
        Some(ProcessKind::Decompress)
    } else {
        None
    }
}

#[cfg(test)]
mod tests;
