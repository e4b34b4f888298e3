use std::path::Path;
use anyhow::{anyhow, Context, Result};
use log::LevelFilter;

/// Installs the logger: `[LEVEL target] message` on stderr, and into `log_file` if given.
pub(crate) fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
	let mut dispatch = fern::Dispatch::new()
		.format(|out, message, record| {
			out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
		})
		.level(level)
		.chain(std::io::stderr());

	if let Some(path) = log_file {
		let file = fern::log_file(path)
			.with_context(|| anyhow!("failed to open log file {path:?}"))?;
		dispatch = dispatch.chain(file);
	}

	dispatch.apply()
		.context("a logger was already installed")
}
