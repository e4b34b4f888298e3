use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use scrivener_mappings::change::{EntryChange, Tristate};
use scrivener_mappings::mapping::EntryMapping;
use scrivener_mappings::remapper::Remapper;
use scrivener_mappings::tree::EntryTree;
use scrivener_sync::client::{Client, ClientEvent, ClientHandler};
use scrivener_sync::packet::S2CPacket;
use scrivener_sync::Checksum;
use crate::project::Project;

#[derive(Debug, Clone)]
pub(crate) struct ConnectSettings {
	pub(crate) address: String,
	pub(crate) port: u16,
	pub(crate) username: String,
	pub(crate) password: String,
	pub(crate) checksum: Checksum,
	pub(crate) follow: bool,
}

/// Logs what the others do.
#[derive(Debug, Default)]
struct Follower {
	disconnected: Option<String>,
}

impl ClientHandler for Follower {
	fn on_change_received(&mut self, change: &EntryChange) {
		match change.deobf_name() {
			Tristate::Set(name) => info!("{} is now called {name}", change.target()),
			Tristate::Reset => info!("{} lost its name", change.target()),
			Tristate::Unchanged => {},
		}
	}

	fn on_user_list_changed(&mut self, users: &[String]) {
		info!("online: {}", users.join(", "));
	}

	fn on_disconnected(&mut self, reason: &str) {
		self.disconnected = Some(reason.to_owned());
	}
}

/// One line per mapping: the entry, and its name or `-`.
pub(crate) fn format_mappings(mappings: &EntryTree<EntryMapping>) -> Vec<String> {
	mappings.entries().into_iter()
		.map(|(entry, mapping)| {
			let name = mapping.target_name().unwrap_or("-");
			match mapping.javadoc() {
				Some(javadoc) => format!("{entry} -> {name} // {}", javadoc.replace('\n', " ")),
				None => format!("{entry} -> {name}"),
			}
		})
		.collect()
}

/// Connects, prints the mappings of the server, and keeps following the changes if asked to.
pub(crate) async fn connect(project: &Project, settings: ConnectSettings) -> Result<()> {
	let mut remapper = Remapper::empty(Arc::new(project.index()?));
	let mut follower = Follower::default();

	let mut client = Client::new(settings.username);
	client.connect(&settings.address, settings.port, &settings.password, settings.checksum).await
		.with_context(|| anyhow!("failed to connect to {}:{}", settings.address, settings.port))?;

	loop {
		let event = client.recv().await
			.context("the connection ended before the mappings were received")?;
		let synced = matches!(event, ClientEvent::Packet(S2CPacket::SyncMappings(_)));
		client.dispatch(event, &mut remapper, &mut follower);
		if synced {
			break;
		}
	}

	for line in format_mappings(remapper.mappings()) {
		println!("{line}");
	}

	if settings.follow {
		info!("following the changes, press ctrl-c to stop");
		loop {
			tokio::select! {
				result = tokio::signal::ctrl_c() => {
					result.context("failed to listen for ctrl-c")?;
					break;
				},
				event = client.recv() => match event {
					Some(event) => client.dispatch(event, &mut remapper, &mut follower),
					None => break,
				},
			}
		}
	}

	client.disconnect();
	if let Some(reason) = follower.disconnected {
		warn!("disconnected by the server: {reason}");
	}
	Ok(())
}
