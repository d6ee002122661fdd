//! `garage fetch` – make registered files available locally.

use crate::cli::ProcessKind;
use anyhow::{bail, Context, Result};
use garage_core::processor::Method;
use garage_core::{
    Decompress, ExtractorProcessor, Garage, GarageConfig, Notice, NoticeSink, Processor,
};
use std::sync::Arc;

/// Prints notices to stderr so they do not mix with the printed paths.
struct StderrSink;

impl NoticeSink for StderrSink {
    fn notice(&self, notice: &Notice) {
        tracing::info!(target: "garage::notice", "{}", notice);
        eprintln!("{}", notice);
    }
}

pub(crate) fn build_processor(
    process: Option<ProcessKind>,
    members: &[String],
) -> Result<Option<Box<dyn Processor>>> {
    let processor: Box<dyn Processor> = match process {
        None if members.is_empty() => return Ok(None),
        None => bail!("--member requires --unzip or --untar"),
        Some(ProcessKind::Decompress) if !members.is_empty() => {
            bail!("--member cannot be combined with --decompress")
        }
        Some(ProcessKind::Decompress) => Box::new(Decompress::new(Method::Auto)),
        Some(ProcessKind::Unzip) => Box::new(with_members(ExtractorProcessor::unzip(), members)),
        Some(ProcessKind::Untar) => Box::new(with_members(ExtractorProcessor::untar(), members)),
    };
    Ok(Some(processor))
}

fn with_members(processor: ExtractorProcessor, members: &[String]) -> ExtractorProcessor {
    if members.is_empty() {
        processor
    } else {
        processor.with_members(members.iter().cloned())
    }
}

/// Fetch each name and print the resulting path(s), one per line.
pub fn run_fetch(
    cfg: &GarageConfig,
    names: &[String],
    process: Option<ProcessKind>,
    members: &[String],
) -> Result<()> {
    let processor = build_processor(process, members)?;
    let garage = Garage::from_config(cfg)?.with_notices(Arc::new(StderrSink));

    for name in names {
        let paths = match &processor {
            Some(p) => garage.fetch_with(name, &**p),
            None => garage.fetch(name).map(|p| vec![p]),
        }
        .with_context(|| format!("fetch '{}'", name))?;
        for path in paths {
            println!("{}", path.display());
        }
    }
    Ok(())
}
