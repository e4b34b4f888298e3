use std::fmt::{Display, Formatter};
use anyhow::{bail, Result};
use bytes::{Buf, BufMut};
use scrivener_entry::entry::Entry;
use scrivener_mappings::change::{EntryChange, Tristate};
use crate::codec::{get_entry, get_string, get_u8, put_entry, put_string};

/// What the server tells everyone about, shown in the chat of the clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
	Chat { user: String, text: String },
	Connect { user: String },
	Disconnect { user: String },
	EditDocs { user: String, entry: Entry },
	/// The entry was given its obfuscated name, to show that it doesn't need a better one.
	MarkDeobf { user: String, entry: Entry },
	RemoveMapping { user: String, entry: Entry },
	Rename { user: String, entry: Entry, new_name: String },
}

impl ServerMessage {
	/// The message announcing that `user` made `change`. Changes that don't change anything have none.
	pub fn for_change(user: &str, change: &EntryChange) -> Option<ServerMessage> {
		let user = user.to_owned();
		let entry = change.target().clone();

		match change.deobf_name() {
			Tristate::Set(name) if name == entry.name() => return Some(ServerMessage::MarkDeobf { user, entry }),
			Tristate::Set(name) => return Some(ServerMessage::Rename { user, entry, new_name: name.clone() }),
			Tristate::Reset => return Some(ServerMessage::RemoveMapping { user, entry }),
			Tristate::Unchanged => {},
		}

		if change.javadoc().is_unchanged() {
			None
		} else {
			Some(ServerMessage::EditDocs { user, entry })
		}
	}

	pub fn user(&self) -> &str {
		match self {
			ServerMessage::Chat { user, .. }
			| ServerMessage::Connect { user }
			| ServerMessage::Disconnect { user }
			| ServerMessage::EditDocs { user, .. }
			| ServerMessage::MarkDeobf { user, .. }
			| ServerMessage::RemoveMapping { user, .. }
			| ServerMessage::Rename { user, .. } => user,
		}
	}

	fn id(&self) -> u8 {
		match self {
			ServerMessage::Chat { .. } => 0,
			ServerMessage::Connect { .. } => 1,
			ServerMessage::Disconnect { .. } => 2,
			ServerMessage::EditDocs { .. } => 3,
			ServerMessage::MarkDeobf { .. } => 4,
			ServerMessage::RemoveMapping { .. } => 5,
			ServerMessage::Rename { .. } => 6,
		}
	}

	pub(crate) fn write(&self, buf: &mut impl BufMut) -> Result<()> {
		buf.put_u8(self.id());
		put_string(buf, self.user())?;

		match self {
			ServerMessage::Chat { text, .. } => put_string(buf, text),
			ServerMessage::Connect { .. } | ServerMessage::Disconnect { .. } => Ok(()),
			ServerMessage::EditDocs { entry, .. }
			| ServerMessage::MarkDeobf { entry, .. }
			| ServerMessage::RemoveMapping { entry, .. } => put_entry(buf, entry),
			ServerMessage::Rename { entry, new_name, .. } => {
				put_entry(buf, entry)?;
				put_string(buf, new_name)
			},
		}
	}

	pub(crate) fn read(buf: &mut impl Buf) -> Result<ServerMessage> {
		let id = get_u8(buf, "message type")?;
		let user = get_string(buf)?;

		Ok(match id {
			0 => ServerMessage::Chat { user, text: get_string(buf)? },
			1 => ServerMessage::Connect { user },
			2 => ServerMessage::Disconnect { user },
			3 => ServerMessage::EditDocs { user, entry: get_entry(buf)? },
			4 => ServerMessage::MarkDeobf { user, entry: get_entry(buf)? },
			5 => ServerMessage::RemoveMapping { user, entry: get_entry(buf)? },
			6 => ServerMessage::Rename { user, entry: get_entry(buf)?, new_name: get_string(buf)? },
			other => bail!("unknown message type {other}"),
		})
	}
}

impl Display for ServerMessage {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ServerMessage::Chat { user, text } => write!(f, "{user}: {text}"),
			ServerMessage::Connect { user } => write!(f, "{user} joined the server"),
			ServerMessage::Disconnect { user } => write!(f, "{user} left the server"),
			ServerMessage::EditDocs { user, entry } => write!(f, "{user} edited the javadocs of {entry}"),
			ServerMessage::MarkDeobf { user, entry } => write!(f, "{user} marked {entry} as deobfuscated"),
			ServerMessage::RemoveMapping { user, entry } => write!(f, "{user} removed the mapping of {entry}"),
			ServerMessage::Rename { user, entry, new_name } => write!(f, "{user} renamed {entry} to {new_name}"),
		}
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use bytes::BytesMut;
	use pretty_assertions::assert_eq;
	use scrivener_entry::entry::Entry;
	use scrivener_mappings::change::EntryChange;
	use crate::message::ServerMessage;

	fn entry(s: &str) -> Entry {
		s.parse().unwrap()
	}

	#[test]
	fn messages_for_changes() {
		let rename = EntryChange::modify(entry("a.f:I")).with_deobf_name("count").with_javadoc("docs");
		assert_eq!(ServerMessage::for_change("alice", &rename), Some(ServerMessage::Rename {
			user: "alice".to_owned(),
			entry: entry("a.f:I"),
			new_name: "count".to_owned(),
		}));

		let mark = EntryChange::modify(entry("a.f:I")).with_deobf_name("f");
		assert!(matches!(ServerMessage::for_change("alice", &mark), Some(ServerMessage::MarkDeobf { .. })));

		let remove = EntryChange::modify(entry("a")).clear_deobf_name();
		assert!(matches!(ServerMessage::for_change("alice", &remove), Some(ServerMessage::RemoveMapping { .. })));

		let docs = EntryChange::modify(entry("a")).clear_javadoc();
		assert!(matches!(ServerMessage::for_change("alice", &docs), Some(ServerMessage::EditDocs { .. })));

		assert_eq!(ServerMessage::for_change("alice", &EntryChange::modify(entry("a"))), None);
	}

	#[test]
	fn read_what_was_written() -> Result<()> {
		let message = ServerMessage::Rename { user: "bob".to_owned(), entry: entry("a.m(I)V"), new_name: "feed".to_owned() };
		let mut buf = BytesMut::new();
		message.write(&mut buf)?;
		assert_eq!(ServerMessage::read(&mut buf.freeze())?, message);

		assert_eq!(message.to_string(), "bob renamed a.m(I)V to feed");
		Ok(())
	}
}
