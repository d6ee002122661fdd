//! CLI command handlers, one per file.

mod checksum;
mod fetch;
mod make_registry;
mod status;

pub use checksum::run_checksum;
pub use fetch::run_fetch;
#[cfg(test)]
pub(crate) use fetch::build_processor;
pub use make_registry::run_make_registry;
pub use status::run_status;
