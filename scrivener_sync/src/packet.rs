//! The packets, and how they're turned into [frames][Frame].

use anyhow::{anyhow, Context, Result};
use bytes::{Buf, BufMut, BytesMut};
use log::debug;
use scrivener_mappings::change::EntryChange;
use scrivener_mappings::mapping::EntryMapping;
use scrivener_mappings::tree::EntryTree;
use crate::codec::{get_bytes, get_change, get_mappings, get_string, get_u16, get_u32, get_u8, put_change, put_mappings, put_string, Frame};
use crate::error::ProtocolError;
use crate::message::ServerMessage;
use crate::{Checksum, CHECKSUM_SIZE, MAX_PASSWORD_LENGTH, PROTOCOL_VERSION};

/// Packets sent by clients.
#[derive(Debug, Clone, PartialEq)]
pub enum C2SPacket {
	/// The first packet of every connection.
	Login {
		checksum: Checksum,
		password: String,
		username: String,
	},
	EntryChange(EntryChange),
	/// A chat message.
	Message(String),
}

impl C2SPacket {
	const LOGIN: u8 = 0;
	const ENTRY_CHANGE: u8 = 1;
	const MESSAGE: u8 = 2;

	pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
		let mut buf = BytesMut::new();
		let id = match self {
			C2SPacket::Login { checksum, password, username } => {
				if password.len() > MAX_PASSWORD_LENGTH {
					return Err(ProtocolError::PasswordTooLong);
				}
				buf.put_u16(PROTOCOL_VERSION);
				buf.put_slice(checksum);
				buf.put_u8(password.len() as u8);
				buf.put_slice(password.as_bytes());
				put_string(&mut buf, username).map_err(malformed)?;
				C2SPacket::LOGIN
			},
			C2SPacket::EntryChange(change) => {
				put_change(&mut buf, change).map_err(malformed)?;
				C2SPacket::ENTRY_CHANGE
			},
			C2SPacket::Message(text) => {
				put_string(&mut buf, text).map_err(malformed)?;
				C2SPacket::MESSAGE
			},
		};
		Ok(Frame::new(id, buf))
	}

	/// Reads a packet. A login with a different protocol version gives [`ProtocolError::WrongVersion`].
	pub fn from_frame(frame: Frame) -> Result<C2SPacket, ProtocolError> {
		let mut buf = frame.payload;
		let packet = match frame.id {
			C2SPacket::LOGIN => {
				let version = get_u16(&mut buf, "protocol version").map_err(malformed)?;
				if version != PROTOCOL_VERSION {
					debug!("client uses protocol version {version:#06x}, expected {PROTOCOL_VERSION:#06x}");
					return Err(ProtocolError::WrongVersion);
				}
				read_login(&mut buf).map_err(malformed)?
			},
			C2SPacket::ENTRY_CHANGE => C2SPacket::EntryChange(get_change(&mut buf).map_err(malformed)?),
			C2SPacket::MESSAGE => C2SPacket::Message(get_string(&mut buf).map_err(malformed)?),
			id => return Err(ProtocolError::UnknownPacket(id)),
		};
		ensure_consumed(&buf)?;
		Ok(packet)
	}
}

fn read_login(buf: &mut impl Buf) -> Result<C2SPacket> {
	let checksum = get_bytes(buf, CHECKSUM_SIZE, "checksum")?;
	let checksum = Checksum::try_from(checksum.as_slice())
		.with_context(|| anyhow!("checksum must be {CHECKSUM_SIZE} bytes"))?;

	let password_length = get_u8(buf, "password length")? as usize;
	let password = String::from_utf8(get_bytes(buf, password_length, "password")?)
		.context("password is not valid UTF-8")?;

	let username = get_string(buf)?;
	Ok(C2SPacket::Login { checksum, password, username })
}

/// Packets sent by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum S2CPacket {
	/// The last packet a kicked client gets, with the [reason][crate::error::reason].
	Kick(String),
	/// All mappings, sent after logging in.
	SyncMappings(EntryTree<EntryMapping>),
	/// A change some other client made.
	EntryChange(EntryChange),
	Message(ServerMessage),
	/// The names of everyone logged in, sorted.
	UserList(Vec<String>),
}

impl S2CPacket {
	const KICK: u8 = 0;
	const SYNC_MAPPINGS: u8 = 1;
	const ENTRY_CHANGE: u8 = 2;
	const MESSAGE: u8 = 3;
	const USER_LIST: u8 = 4;

	pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
		let mut buf = BytesMut::new();
		let id = match self {
			S2CPacket::Kick(reason) => {
				put_string(&mut buf, reason).map_err(malformed)?;
				S2CPacket::KICK
			},
			S2CPacket::SyncMappings(mappings) => {
				put_mappings(&mut buf, mappings).map_err(malformed)?;
				S2CPacket::SYNC_MAPPINGS
			},
			S2CPacket::EntryChange(change) => {
				put_change(&mut buf, change).map_err(malformed)?;
				S2CPacket::ENTRY_CHANGE
			},
			S2CPacket::Message(message) => {
				message.write(&mut buf).map_err(malformed)?;
				S2CPacket::MESSAGE
			},
			S2CPacket::UserList(users) => {
				write_user_list(&mut buf, users).map_err(malformed)?;
				S2CPacket::USER_LIST
			},
		};
		Ok(Frame::new(id, buf))
	}

	pub fn from_frame(frame: Frame) -> Result<S2CPacket, ProtocolError> {
		let mut buf = frame.payload;
		let packet = match frame.id {
			S2CPacket::KICK => S2CPacket::Kick(get_string(&mut buf).map_err(malformed)?),
			S2CPacket::SYNC_MAPPINGS => S2CPacket::SyncMappings(get_mappings(&mut buf).map_err(malformed)?),
			S2CPacket::ENTRY_CHANGE => S2CPacket::EntryChange(get_change(&mut buf).map_err(malformed)?),
			S2CPacket::MESSAGE => S2CPacket::Message(ServerMessage::read(&mut buf).map_err(malformed)?),
			S2CPacket::USER_LIST => S2CPacket::UserList(read_user_list(&mut buf).map_err(malformed)?),
			id => return Err(ProtocolError::UnknownPacket(id)),
		};
		ensure_consumed(&buf)?;
		Ok(packet)
	}
}

fn write_user_list(buf: &mut impl BufMut, users: &[String]) -> Result<()> {
	buf.put_u32(users.len() as u32);
	for user in users {
		put_string(buf, user)?;
	}
	Ok(())
}

fn read_user_list(buf: &mut impl Buf) -> Result<Vec<String>> {
	let count = get_u32(buf, "user count")?;
	(0..count).map(|_| get_string(buf)).collect()
}

fn ensure_consumed(buf: &impl Buf) -> Result<(), ProtocolError> {
	if buf.has_remaining() {
		return Err(ProtocolError::Malformed(format!("{} bytes left after the packet", buf.remaining())));
	}
	Ok(())
}

fn malformed(error: anyhow::Error) -> ProtocolError {
	ProtocolError::Malformed(format!("{error:#}"))
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use bytes::BufMut;
	use pretty_assertions::assert_eq;
	use scrivener_mappings::change::EntryChange;
	use crate::codec::Frame;
	use crate::error::ProtocolError;
	use crate::message::ServerMessage;
	use crate::packet::{C2SPacket, S2CPacket};
	use crate::CHECKSUM_SIZE;

	fn login(password: &str) -> C2SPacket {
		C2SPacket::Login { checksum: [7; CHECKSUM_SIZE], password: password.to_owned(), username: "alice".to_owned() }
	}

	#[test]
	fn login_packet() -> Result<()> {
		let frame = login("sesame").to_frame()?;
		assert_eq!(frame.id, 0);
		assert_eq!(&frame.payload[..2], &[0x10, 0x02]);
		assert_eq!(C2SPacket::from_frame(frame)?, login("sesame"));

		assert!(matches!(login(&"p".repeat(256)).to_frame(), Err(ProtocolError::PasswordTooLong)));
		Ok(())
	}

	#[test]
	fn other_protocol_versions_are_rejected() -> Result<()> {
		let frame = login("").to_frame()?;
		let mut payload = bytes::BytesMut::new();
		payload.put_u16(0x0f01);
		payload.put_slice(&frame.payload[2..]);

		let result = C2SPacket::from_frame(Frame::new(frame.id, payload));
		assert!(matches!(result, Err(ProtocolError::WrongVersion)));
		Ok(())
	}

	#[test]
	fn unknown_and_trailing() -> Result<()> {
		assert!(matches!(C2SPacket::from_frame(Frame::new(9, Vec::new())), Err(ProtocolError::UnknownPacket(9))));
		assert!(matches!(S2CPacket::from_frame(Frame::new(200, Vec::new())), Err(ProtocolError::UnknownPacket(200))));

		let frame = C2SPacket::Message("hi".to_owned()).to_frame()?;
		let mut payload = frame.payload.to_vec();
		payload.push(0);
		assert!(matches!(C2SPacket::from_frame(Frame::new(frame.id, payload)), Err(ProtocolError::Malformed(_))));
		Ok(())
	}

	#[test]
	fn server_packets() -> Result<()> {
		let packets = [
			S2CPacket::Kick("disconnect.wrong_jar".to_owned()),
			S2CPacket::UserList(vec!["alice".to_owned(), "bob".to_owned()]),
			S2CPacket::EntryChange(EntryChange::modify("a".parse()?).with_deobf_name("Animal")),
			S2CPacket::Message(ServerMessage::Connect { user: "bob".to_owned() }),
			S2CPacket::SyncMappings(Default::default()),
		];
		for packet in packets {
			assert_eq!(S2CPacket::from_frame(packet.to_frame()?)?, packet);
		}
		Ok(())
	}
}
