//! The server, which owns the mappings everyone edits.
//!
//! Every connection gets a task reading packets and a task writing them. All the reading tasks feed one queue,
//! which a single editing task works through: that task is the only one touching the [`Remapper`], so all changes
//! happen in one order.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use scrivener_entry::validation::ValidationContext;
use scrivener_mappings::change::EntryChange;
use scrivener_mappings::delta::MappingDelta;
use scrivener_mappings::mapping::EntryMapping;
use scrivener_mappings::remapper::Remapper;
use scrivener_mappings::tree::EntryTree;
use crate::codec::{read_frame, write_frame};
use crate::error::{reason, ProtocolError};
use crate::message::ServerMessage;
use crate::packet::{C2SPacket, S2CPacket};
use crate::{is_username_valid, Checksum, LOGIN_TIMEOUT, MAX_PASSWORD_LENGTH};

/// How long closing waits for the last packets to be written.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type ClientId = u64;

enum Event {
	Connected {
		id: ClientId,
		address: SocketAddr,
		sender: UnboundedSender<S2CPacket>,
		cancel: CancellationToken,
		writer: JoinHandle<()>,
	},
	Packet { id: ClientId, packet: C2SPacket },
	Closed { id: ClientId, reason: String },
	Checkpoint(oneshot::Sender<Checkpoint>),
	Users(oneshot::Sender<Vec<String>>),
}

/// The mappings at one point in time, and what changed since the last checkpoint.
#[derive(Debug, Clone)]
pub struct Checkpoint {
	pub delta: MappingDelta<EntryMapping>,
	pub mappings: EntryTree<EntryMapping>,
}

/// The settings of a server, before it's started.
#[derive(Debug, Clone)]
pub struct Server {
	port: u16,
	password: String,
	checksum: Checksum,
	login_timeout: Duration,
}

impl Server {
	/// A server on `port`, port `0` picks a free one.
	///
	/// Clients have to log in with `password` and the same `checksum`.
	pub fn new(port: u16, password: impl Into<String>, checksum: Checksum) -> Server {
		Server { port, password: password.into(), checksum, login_timeout: LOGIN_TIMEOUT }
	}

	/// How long a new connection may take to send its login.
	pub fn with_login_timeout(mut self, login_timeout: Duration) -> Server {
		self.login_timeout = login_timeout;
		self
	}

	pub async fn start(self, remapper: Remapper) -> Result<ServerHandle> {
		let Server { port, password, checksum, login_timeout } = self;
		if password.len() > MAX_PASSWORD_LENGTH {
			bail!("password too long, must be at most {MAX_PASSWORD_LENGTH} bytes");
		}

		let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await
			.with_context(|| anyhow!("failed to listen on port {port}"))?;
		let address = listener.local_addr()?;
		info!("server started on {address}");

		let cancel = CancellationToken::new();
		let (events, receiver) = mpsc::unbounded_channel();

		tokio::spawn(accept_clients(listener, events.clone(), cancel.clone(), login_timeout));

		let state = ServerState {
			password,
			checksum,
			remapper,
			connections: IndexMap::new(),
			closing: Vec::new(),
		};
		let task = tokio::spawn(state.run(receiver, cancel.clone()));

		Ok(ServerHandle { address, events, cancel, task })
	}
}

/// Controls a running server.
#[derive(Debug)]
pub struct ServerHandle {
	address: SocketAddr,
	events: UnboundedSender<Event>,
	cancel: CancellationToken,
	task: JoinHandle<Remapper>,
}

impl ServerHandle {
	pub fn local_addr(&self) -> SocketAddr {
		self.address
	}

	/// Takes the changes since the last checkpoint, together with a copy of all mappings, for saving them.
	pub async fn checkpoint(&self) -> Result<Checkpoint> {
		let (sender, receiver) = oneshot::channel();
		self.events.send(Event::Checkpoint(sender))
			.map_err(|_| anyhow!("the server isn't running anymore"))?;
		receiver.await.context("the server stopped before taking a checkpoint")
	}

	/// The names of everyone logged in, sorted.
	pub async fn users(&self) -> Result<Vec<String>> {
		let (sender, receiver) = oneshot::channel();
		self.events.send(Event::Users(sender))
			.map_err(|_| anyhow!("the server isn't running anymore"))?;
		receiver.await.context("the server stopped before listing the users")
	}

	/// Tells the server to kick everyone and stop, without waiting for it.
	pub fn shutdown(&self) {
		self.cancel.cancel();
	}

	pub fn is_running(&self) -> bool {
		!self.task.is_finished()
	}

	/// Kicks everyone and stops the server, giving back the mappings.
	pub async fn stop(self) -> Result<Remapper> {
		self.cancel.cancel();
		self.task.await.context("the server task failed")
	}
}

async fn accept_clients(listener: TcpListener, events: UnboundedSender<Event>, cancel: CancellationToken, login_timeout: Duration) {
	let mut next_id: ClientId = 0;
	loop {
		let (stream, address) = tokio::select! {
			_ = cancel.cancelled() => break,
			accepted = listener.accept() => match accepted {
				Ok(accepted) => accepted,
				Err(e) => {
					error!("failed to accept a client: {e}");
					continue;
				},
			},
		};

		next_id += 1;
		let id = next_id;

		let (reader, writer) = stream.into_split();
		let (sender, packets) = mpsc::unbounded_channel();
		let client_cancel = cancel.child_token();
		let writer = tokio::spawn(write_packets(id, writer, packets, events.clone()));

		// the editing task must know the client before its first packet
		let connected = Event::Connected { id, address, sender, cancel: client_cancel.clone(), writer };
		if events.send(connected).is_err() {
			break;
		}
		tokio::spawn(read_packets(id, reader, events.clone(), client_cancel, login_timeout));
	}
	debug!("no longer accepting clients");
}

async fn read_packets(id: ClientId, mut reader: OwnedReadHalf, events: UnboundedSender<Event>, cancel: CancellationToken, login_timeout: Duration) {
	let mut logged_in = false;
	let reason = loop {
		let next = async {
			if logged_in {
				read_frame(&mut reader).await
			} else {
				tokio::time::timeout(login_timeout, read_frame(&mut reader)).await
					.unwrap_or_else(|_| Err(ProtocolError::Timeout))
			}
		};
		let frame = tokio::select! {
			_ = cancel.cancelled() => return,
			frame = next => frame,
		};

		match frame.and_then(|frame| frame.map(C2SPacket::from_frame).transpose()) {
			Ok(Some(packet)) => {
				logged_in = true;
				if events.send(Event::Packet { id, packet }).is_err() {
					return;
				}
			},
			Ok(None) => break reason::DISCONNECTED.to_owned(),
			Err(e) => {
				debug!("failed to read a packet from client #{id}: {e}");
				break e.kick_reason().to_owned();
			},
		}
	};
	let _ = events.send(Event::Closed { id, reason });
}

async fn write_packets(id: ClientId, mut writer: OwnedWriteHalf, mut packets: UnboundedReceiver<S2CPacket>, events: UnboundedSender<Event>) {
	while let Some(packet) = packets.recv().await {
		let kick = matches!(packet, S2CPacket::Kick(_));

		let result = match packet.to_frame() {
			Ok(frame) => write_frame(&mut writer, &frame).await,
			Err(e) => Err(e),
		};

		if let Err(e) = result {
			// a kicked client may be gone already
			if !kick {
				warn!("failed to send a packet to client #{id}: {e}");
				let _ = events.send(Event::Closed { id, reason: e.kick_reason().to_owned() });
			}
			break;
		}
	}
	let _ = writer.shutdown().await;
}

struct Connection {
	address: SocketAddr,
	/// Set once logged in.
	username: Option<String>,
	sender: UnboundedSender<S2CPacket>,
	cancel: CancellationToken,
	writer: JoinHandle<()>,
}

struct ServerState {
	password: String,
	checksum: Checksum,
	remapper: Remapper,
	connections: IndexMap<ClientId, Connection>,
	/// Writers of kicked clients, still sending the kick packet.
	closing: Vec<JoinHandle<()>>,
}

impl ServerState {
	async fn run(mut self, mut events: UnboundedReceiver<Event>, cancel: CancellationToken) -> Remapper {
		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				event = events.recv() => match event {
					Some(event) => self.handle(event),
					None => break,
				},
			}
		}

		self.close().await;
		self.remapper
	}

	fn handle(&mut self, event: Event) {
		match event {
			Event::Connected { id, address, sender, cancel, writer } => {
				debug!("client #{id} connected from {address}");
				self.connections.insert(id, Connection { address, username: None, sender, cancel, writer });
			},
			Event::Packet { id, packet } => self.handle_packet(id, packet),
			Event::Closed { id, reason } => self.kick(id, &reason),
			Event::Checkpoint(sender) => {
				let checkpoint = Checkpoint {
					delta: self.remapper.take_mapping_delta(),
					mappings: self.remapper.mappings().clone(),
				};
				let _ = sender.send(checkpoint);
			},
			Event::Users(sender) => {
				let _ = sender.send(self.usernames());
			},
		}
	}

	fn handle_packet(&mut self, id: ClientId, packet: C2SPacket) {
		// packets may still arrive from clients that were kicked
		let Some(connection) = self.connections.get(&id) else {
			return;
		};

		match (connection.username.clone(), packet) {
			(None, C2SPacket::Login { checksum, password, username }) => self.login(id, checksum, &password, username),
			(Some(user), C2SPacket::EntryChange(change)) => self.apply_change(id, &user, change),
			(Some(user), C2SPacket::Message(text)) => self.send_message(ServerMessage::Chat { user, text }),
			(user, _) => {
				warn!("unexpected packet from client #{id}, logged in as {user:?}");
				self.kick(id, reason::PROTOCOL_ERROR);
			},
		}
	}

	fn login(&mut self, id: ClientId, checksum: Checksum, password: &str, username: String) {
		let result = if !is_username_valid(&username) {
			Err(ProtocolError::InvalidUsername)
		} else if password != self.password {
			Err(ProtocolError::WrongPassword)
		} else if self.usernames().contains(&username) {
			Err(ProtocolError::UsernameTaken)
		} else if checksum != self.checksum {
			Err(ProtocolError::WrongJar)
		} else {
			Ok(())
		};

		if let Err(e) = result {
			info!("client #{id} failed to log in as {username:?}: {e}");
			self.kick(id, e.kick_reason());
			return;
		}

		let Some(connection) = self.connections.get_mut(&id) else {
			return;
		};
		info!("{username} logged in from {}", connection.address);
		connection.username = Some(username.clone());

		self.send(id, S2CPacket::SyncMappings(self.remapper.mappings().clone()));
		self.send_user_list();
		self.send_message(ServerMessage::Connect { user: username });
	}

	/// Validates the change again. Accepted changes go to everyone else, rejected ones are dropped.
	fn apply_change(&mut self, id: ClientId, user: &str, change: EntryChange) {
		let mut ctx = ValidationContext::default();
		self.remapper.put_change(&mut ctx, &change);

		if !ctx.can_proceed() {
			let problems: Vec<String> = ctx.messages().iter().map(ToString::to_string).collect();
			warn!("dropping the change of {} by {user}, it's not valid here: {}", change.target(), problems.join(", "));
			return;
		}

		let others: Vec<ClientId> = self.logged_in()
			.filter(|other| *other != id)
			.collect();
		for other in others {
			self.send(other, S2CPacket::EntryChange(change.clone()));
		}

		if let Some(message) = ServerMessage::for_change(user, &change) {
			self.send_message(message);
		}
	}

	fn kick(&mut self, id: ClientId, reason: &str) {
		let Some(connection) = self.connections.shift_remove(&id) else {
			return;
		};

		let _ = connection.sender.send(S2CPacket::Kick(reason.to_owned()));
		connection.cancel.cancel();
		self.closing.retain(|writer| !writer.is_finished());
		self.closing.push(connection.writer);

		match connection.username {
			Some(username) => {
				info!("kicked {username}: {reason}");
				self.send_message(ServerMessage::Disconnect { user: username });
				self.send_user_list();
			},
			None => debug!("kicked client #{id} from {}: {reason}", connection.address),
		}
	}

	/// Kicks everyone, and waits a bit for the kick packets to be sent.
	async fn close(&mut self) {
		info!("stopping the server, kicking {} clients", self.connections.len());
		for (_, connection) in self.connections.drain(..) {
			let _ = connection.sender.send(S2CPacket::Kick(reason::SERVER_CLOSED.to_owned()));
			connection.cancel.cancel();
			self.closing.push(connection.writer);
		}

		for writer in self.closing.drain(..) {
			if tokio::time::timeout(CLOSE_TIMEOUT, writer).await.is_err() {
				debug!("gave up waiting for a client to receive its kick");
			}
		}
	}

	fn logged_in(&self) -> impl Iterator<Item=ClientId> + '_ {
		self.connections.iter()
			.filter(|(_, connection)| connection.username.is_some())
			.map(|(id, _)| *id)
	}

	fn usernames(&self) -> Vec<String> {
		let mut usernames: Vec<String> = self.connections.values()
			.filter_map(|connection| connection.username.clone())
			.collect();
		usernames.sort();
		usernames
	}

	fn send(&self, id: ClientId, packet: S2CPacket) {
		if let Some(connection) = self.connections.get(&id) {
			if connection.sender.send(packet).is_err() {
				debug!("client #{id} isn't receiving packets anymore");
			}
		}
	}

	fn send_to_all(&self, packet: &S2CPacket) {
		for id in self.logged_in() {
			self.send(id, packet.clone());
		}
	}

	fn send_user_list(&self) {
		self.send_to_all(&S2CPacket::UserList(self.usernames()));
	}

	fn send_message(&self, message: ServerMessage) {
		info!("[chat] {message}");
		self.send_to_all(&S2CPacket::Message(message));
	}
}
