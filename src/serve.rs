use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use scrivener_mappings::remapper::Remapper;
use scrivener_sync::server::{Server, ServerHandle};
use scrivener_sync::Checksum;
use crate::project::Project;

#[derive(Debug, Clone)]
pub(crate) struct ServeSettings {
	pub(crate) port: u16,
	pub(crate) password: String,
	pub(crate) checksum: Checksum,
	pub(crate) login_timeout: Duration,
	/// `None` only saves when stopping.
	pub(crate) autosave: Option<Duration>,
}

/// Runs a server until ctrl-c, then kicks everyone and saves the mappings.
pub(crate) async fn serve(project: &Project, settings: ServeSettings) -> Result<()> {
	let index = Arc::new(project.index()?);
	let mappings = project.read_mappings()?;
	info!("loaded {} mappings", mappings.len());

	let server = Server::new(settings.port, settings.password, settings.checksum)
		.with_login_timeout(settings.login_timeout)
		.start(Remapper::new(index, mappings)).await?;
	info!("listening on port {}, press ctrl-c to stop", server.local_addr().port());

	let mut autosave = settings.autosave.map(|period| {
		let mut interval = tokio::time::interval_at(Instant::now() + period, period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		interval
	});
	let mut unsaved = false;

	loop {
		tokio::select! {
			result = tokio::signal::ctrl_c() => {
				result.context("failed to listen for ctrl-c")?;
				break;
			},
			_ = tick(&mut autosave) => {
				match save_checkpoint(project, &server, unsaved).await {
					Ok(()) => unsaved = false,
					Err(e) => {
						// the next autosave tries again
						error!("autosave failed: {e:?}");
						unsaved = true;
					},
				}
			},
		}
	}

	let remapper = server.stop().await?;
	project.write_mappings(remapper.mappings())?;
	info!("saved {} mappings to {:?}", remapper.mappings().len(), project.mappings_path());
	Ok(())
}

async fn tick(interval: &mut Option<Interval>) {
	match interval {
		Some(interval) => {
			interval.tick().await;
		},
		None => std::future::pending().await,
	}
}

/// Saves the mappings if they changed since the last checkpoint, or if `force` is set.
async fn save_checkpoint(project: &Project, server: &ServerHandle, force: bool) -> Result<()> {
	let checkpoint = server.checkpoint().await?;
	if checkpoint.delta.is_empty() && !force {
		debug!("nothing changed, not saving");
		return Ok(());
	}

	project.write_mappings(&checkpoint.mappings)?;
	info!("autosaved {} changed entries to {:?}", checkpoint.delta.len(), project.mappings_path());
	Ok(())
}
