//! The client side, used by everyone editing the mappings, including whoever hosts the server.
//!
//! A [`Client`] doesn't own the mappings. Received packets come out of [`Client::recv`] and are applied to the
//! caller's [`Remapper`] by [`Client::dispatch`], on whatever task does all the other edits too.

use anyhow::Result;
use log::{debug, info, warn};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use scrivener_entry::validation::ValidationContext;
use scrivener_mappings::change::EntryChange;
use scrivener_mappings::mapping::EntryMapping;
use scrivener_mappings::remapper::Remapper;
use scrivener_mappings::tree::EntryTree;
use crate::codec::{read_frame, write_frame};
use crate::error::{reason, ProtocolError};
use crate::message::ServerMessage;
use crate::packet::{C2SPacket, S2CPacket};
use crate::server::{Server, ServerHandle};
use crate::{is_username_valid, Checksum, LOGIN_TIMEOUT, MAX_PASSWORD_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
	#[default]
	NotConnected,
	Connecting,
	Connected,
	/// Connected to a server running in this process.
	Hosting,
}

/// Something that happened to the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
	Packet(S2CPacket),
	/// The connection was lost, with the reason to show.
	Closed(String),
}

/// Gets told about what [`Client::dispatch`] did. All methods do nothing by default.
#[allow(unused_variables)]
pub trait ClientHandler {
	/// All mappings were replaced by the ones of the server.
	fn on_mappings_synced(&mut self, remapper: &Remapper) {}

	/// A change of someone else was applied.
	fn on_change_received(&mut self, change: &EntryChange) {}

	fn on_user_list_changed(&mut self, users: &[String]) {}

	fn on_message(&mut self, message: &ServerMessage) {}

	/// The connection ended, for the given [reason][crate::error::reason].
	fn on_disconnected(&mut self, reason: &str) {}
}

impl ClientHandler for () {}

#[derive(Debug)]
pub struct Client {
	username: String,
	state: watch::Sender<ConnectionState>,
	users: Vec<String>,
	outgoing: Option<UnboundedSender<C2SPacket>>,
	incoming: UnboundedReceiver<ClientEvent>,
	cancel: CancellationToken,
	server: Option<ServerHandle>,
}

impl Client {
	pub fn new(username: impl Into<String>) -> Client {
		let (_, incoming) = mpsc::unbounded_channel();
		Client {
			username: username.into(),
			state: watch::channel(ConnectionState::NotConnected).0,
			users: Vec::new(),
			outgoing: None,
			incoming,
			cancel: CancellationToken::new(),
			server: None,
		}
	}

	pub fn username(&self) -> &str {
		&self.username
	}

	pub fn state(&self) -> ConnectionState {
		*self.state.borrow()
	}

	/// Follows the state of the connection from another task.
	pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
		self.state.subscribe()
	}

	pub fn is_connected(&self) -> bool {
		matches!(self.state(), ConnectionState::Connected | ConnectionState::Hosting)
	}

	/// The users on the server, as of the last user list received.
	pub fn users(&self) -> &[String] {
		&self.users
	}

	/// The server this client hosts.
	pub fn server(&self) -> Option<&ServerHandle> {
		self.server.as_ref()
	}

	/// Connects and logs in. The mappings of the server are the first thing [`Client::recv`] returns afterward.
	///
	/// On failure, the client is [not connected][ConnectionState::NotConnected] again. A kick while logging in is
	/// reported as the error matching its reason.
	pub async fn connect(&mut self, address: &str, port: u16, password: &str, checksum: Checksum) -> Result<(), ProtocolError> {
		self.disconnect();

		if password.len() > MAX_PASSWORD_LENGTH {
			return Err(ProtocolError::PasswordTooLong);
		}
		if !is_username_valid(&self.username) {
			return Err(ProtocolError::InvalidUsername);
		}

		self.state.send_replace(ConnectionState::Connecting);
		debug!("connecting to {address}:{port} as {}", self.username);

		let login = tokio::time::timeout(LOGIN_TIMEOUT, self.log_in(address, port, password, checksum)).await
			.unwrap_or_else(|_| Err(ProtocolError::Timeout));

		match login {
			Ok((reader, writer, mappings)) => {
				self.start(reader, writer, mappings);
				self.state.send_replace(ConnectionState::Connected);
				info!("connected to {address}:{port} as {}", self.username);
				Ok(())
			},
			Err(e) => {
				self.state.send_replace(ConnectionState::NotConnected);
				warn!("failed to connect to {address}:{port}: {e}");
				Err(e)
			},
		}
	}

	async fn log_in(&self, address: &str, port: u16, password: &str, checksum: Checksum) -> Result<(OwnedReadHalf, OwnedWriteHalf, EntryTree<EntryMapping>), ProtocolError> {
		let stream = TcpStream::connect((address, port)).await?;
		let (mut reader, mut writer) = stream.into_split();

		let login = C2SPacket::Login { checksum, password: password.to_owned(), username: self.username.clone() };
		write_frame(&mut writer, &login.to_frame()?).await?;

		let frame = read_frame(&mut reader).await?.ok_or(ProtocolError::Closed)?;
		match S2CPacket::from_frame(frame)? {
			S2CPacket::SyncMappings(mappings) => Ok((reader, writer, mappings)),
			S2CPacket::Kick(kick_reason) => Err(ProtocolError::from_kick_reason(&kick_reason)),
			_ => Err(ProtocolError::Malformed("expected the mappings after logging in".to_owned())),
		}
	}

	fn start(&mut self, reader: OwnedReadHalf, writer: OwnedWriteHalf, mappings: EntryTree<EntryMapping>) {
		let (events, incoming) = mpsc::unbounded_channel();
		let (outgoing, packets) = mpsc::unbounded_channel();
		self.cancel = CancellationToken::new();

		let _ = events.send(ClientEvent::Packet(S2CPacket::SyncMappings(mappings)));

		tokio::spawn(read_packets(reader, events.clone(), self.cancel.clone()));
		tokio::spawn(write_packets(writer, packets, events));

		self.incoming = incoming;
		self.outgoing = Some(outgoing);
	}

	/// Starts a server with the mappings of `remapper` and connects to it.
	///
	/// The mappings of the server are then received like on every other client, and changes go through the server
	/// like the ones of every other client.
	pub async fn host(&mut self, port: u16, password: &str, checksum: Checksum, remapper: &Remapper) -> Result<()> {
		self.disconnect();

		let server = Server::new(port, password, checksum).start(remapper.clone()).await?;
		let port = server.local_addr().port();

		if let Err(e) = self.connect("127.0.0.1", port, password, checksum).await {
			server.shutdown();
			return Err(e.into());
		}

		self.server = Some(server);
		self.state.send_replace(ConnectionState::Hosting);
		Ok(())
	}

	/// Waits for the next event. Returns `None` when not connected.
	pub async fn recv(&mut self) -> Option<ClientEvent> {
		if !self.is_connected() {
			return None;
		}
		self.incoming.recv().await
	}

	/// Applies an event to `remapper`, and tells `handler` about it.
	///
	/// Changes of others are validated here as well. Ones that aren't valid here are dropped, and the problems get
	/// logged.
	pub fn dispatch(&mut self, event: ClientEvent, remapper: &mut Remapper, handler: &mut impl ClientHandler) {
		match event {
			ClientEvent::Packet(S2CPacket::SyncMappings(mappings)) => {
				debug!("received {} mappings", mappings.len());
				remapper.set_mappings(mappings);
				handler.on_mappings_synced(remapper);
			},
			ClientEvent::Packet(S2CPacket::EntryChange(change)) => {
				let mut ctx = ValidationContext::default();
				remapper.put_change(&mut ctx, &change);
				if !ctx.can_proceed() {
					warn!("the change of {} from the server is not valid here", change.target());
				}
				handler.on_change_received(&change);
			},
			ClientEvent::Packet(S2CPacket::Message(message)) => {
				info!("{message}");
				handler.on_message(&message);
			},
			ClientEvent::Packet(S2CPacket::UserList(users)) => {
				self.users = users;
				handler.on_user_list_changed(&self.users);
			},
			ClientEvent::Packet(S2CPacket::Kick(kick_reason)) | ClientEvent::Closed(kick_reason) => {
				if self.disconnect() {
					info!("disconnected: {kick_reason}");
					handler.on_disconnected(&kick_reason);
				}
			},
		}
	}

	/// Receives and dispatches events until the connection ends.
	pub async fn run(&mut self, remapper: &mut Remapper, handler: &mut impl ClientHandler) {
		while let Some(event) = self.recv().await {
			self.dispatch(event, remapper, handler);
		}
	}

	/// Applies the change to `remapper`, and sends it to the server if that worked.
	///
	/// Sending doesn't wait for anything. If writing fails, the connection ends with a [`ClientEvent::Closed`].
	pub fn send_change(&mut self, ctx: &mut ValidationContext, remapper: &mut Remapper, change: EntryChange) {
		remapper.put_change(ctx, &change);
		if ctx.can_proceed() {
			self.send(C2SPacket::EntryChange(change));
		}
	}

	pub fn send_message(&mut self, text: impl Into<String>) {
		self.send(C2SPacket::Message(text.into()));
	}

	fn send(&mut self, packet: C2SPacket) {
		if let Some(outgoing) = &self.outgoing {
			if outgoing.send(packet).is_err() {
				debug!("not sending, the connection is closed");
			}
		}
	}

	/// Closes the connection, and stops the server when hosting one.
	///
	/// Returns whether there was a connection. Calling this again does nothing.
	pub fn disconnect(&mut self) -> bool {
		if self.state() == ConnectionState::NotConnected {
			return false;
		}

		self.cancel.cancel();
		// dropping the sender lets the writer send what's queued and close the connection
		self.outgoing = None;
		if let Some(server) = self.server.take() {
			server.shutdown();
		}
		self.users.clear();
		self.state.send_replace(ConnectionState::NotConnected);
		true
	}
}

impl Drop for Client {
	fn drop(&mut self) {
		self.disconnect();
	}
}

async fn read_packets(mut reader: OwnedReadHalf, events: UnboundedSender<ClientEvent>, cancel: CancellationToken) {
	let closed = loop {
		let frame = tokio::select! {
			_ = cancel.cancelled() => return,
			frame = read_frame(&mut reader) => frame,
		};

		match frame.and_then(|frame| frame.map(S2CPacket::from_frame).transpose()) {
			Ok(Some(packet)) => {
				let kick = matches!(packet, S2CPacket::Kick(_));
				if events.send(ClientEvent::Packet(packet)).is_err() || kick {
					return;
				}
			},
			Ok(None) => break reason::DISCONNECTED.to_owned(),
			Err(e) => {
				warn!("failed to read a packet from the server: {e}");
				break e.kick_reason().to_owned();
			},
		}
	};
	let _ = events.send(ClientEvent::Closed(closed));
}

async fn write_packets(mut writer: OwnedWriteHalf, mut packets: UnboundedReceiver<C2SPacket>, events: UnboundedSender<ClientEvent>) {
	while let Some(packet) = packets.recv().await {
		let result = match packet.to_frame() {
			Ok(frame) => write_frame(&mut writer, &frame).await,
			Err(e) => Err(e),
		};

		if let Err(e) = result {
			warn!("failed to send a packet to the server: {e}");
			let _ = events.send(ClientEvent::Closed(e.kick_reason().to_owned()));
			return;
		}
	}
	let _ = tokio::io::AsyncWriteExt::shutdown(&mut writer).await;
}
