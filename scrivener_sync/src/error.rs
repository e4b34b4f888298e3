use crate::MAX_PASSWORD_LENGTH;

/// The reasons the server sends along when it kicks a client.
///
/// Clients translate them for display, so they're keys and not sentences.
pub mod reason {
	pub const INVALID_USERNAME: &str = "disconnect.invalid_username";
	pub const WRONG_PASSWORD: &str = "disconnect.wrong_password";
	pub const USERNAME_TAKEN: &str = "disconnect.username_taken";
	pub const WRONG_JAR: &str = "disconnect.wrong_jar";
	pub const WRONG_VERSION: &str = "disconnect.wrong_version";
	pub const SERVER_CLOSED: &str = "disconnect.server_closed";
	pub const DISCONNECTED: &str = "disconnect.disconnected";
	pub const PROTOCOL_ERROR: &str = "disconnect.protocol_error";
}

/// Everything that ends a connection.
///
/// None of these are fatal for the process: the connection is closed, and the other side learns about it from the
/// [kick reason][ProtocolError::kick_reason].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
	#[error("the server is editing a different jar")]
	WrongJar,

	#[error("wrong password")]
	WrongPassword,

	#[error("password is longer than {MAX_PASSWORD_LENGTH} bytes")]
	PasswordTooLong,

	#[error("invalid username")]
	InvalidUsername,

	#[error("username is already taken")]
	UsernameTaken,

	#[error("protocol version doesn't match")]
	WrongVersion,

	#[error("malformed packet: {0}")]
	Malformed(String),

	#[error("unknown packet id {0}")]
	UnknownPacket(u8),

	#[error("payload too large: {size} bytes exceeds maximum {max}")]
	PayloadTooLarge { size: usize, max: usize },

	#[error("login timed out")]
	Timeout,

	#[error("the server was closed")]
	ServerClosed,

	#[error("kicked: {0}")]
	Kicked(String),

	#[error("connection closed")]
	Closed,

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl ProtocolError {
	/// The reason to send in a kick packet.
	pub fn kick_reason(&self) -> &str {
		match self {
			ProtocolError::WrongJar => reason::WRONG_JAR,
			ProtocolError::WrongPassword | ProtocolError::PasswordTooLong => reason::WRONG_PASSWORD,
			ProtocolError::InvalidUsername => reason::INVALID_USERNAME,
			ProtocolError::UsernameTaken => reason::USERNAME_TAKEN,
			ProtocolError::WrongVersion => reason::WRONG_VERSION,
			ProtocolError::ServerClosed => reason::SERVER_CLOSED,
			ProtocolError::Kicked(kicked) => kicked,
			ProtocolError::Closed | ProtocolError::Io(_) => reason::DISCONNECTED,
			ProtocolError::Malformed(_)
			| ProtocolError::UnknownPacket(_)
			| ProtocolError::PayloadTooLarge { .. }
			| ProtocolError::Timeout => reason::PROTOCOL_ERROR,
		}
	}

	/// The error a client reports after being kicked for `reason`.
	pub fn from_kick_reason(kick_reason: &str) -> ProtocolError {
		match kick_reason {
			reason::WRONG_JAR => ProtocolError::WrongJar,
			reason::WRONG_PASSWORD => ProtocolError::WrongPassword,
			reason::INVALID_USERNAME => ProtocolError::InvalidUsername,
			reason::USERNAME_TAKEN => ProtocolError::UsernameTaken,
			reason::WRONG_VERSION => ProtocolError::WrongVersion,
			reason::SERVER_CLOSED => ProtocolError::ServerClosed,
			reason::DISCONNECTED => ProtocolError::Closed,
			other => ProtocolError::Kicked(other.to_owned()),
		}
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::error::{reason, ProtocolError};

	#[test]
	fn kick_reasons() {
		for kick_reason in [reason::WRONG_JAR, reason::WRONG_PASSWORD, reason::INVALID_USERNAME, reason::USERNAME_TAKEN,
			reason::WRONG_VERSION, reason::SERVER_CLOSED, reason::DISCONNECTED, "custom"] {
			assert_eq!(ProtocolError::from_kick_reason(kick_reason).kick_reason(), kick_reason);
		}

		assert_eq!(ProtocolError::UnknownPacket(9).kick_reason(), reason::PROTOCOL_ERROR);
		assert_eq!(ProtocolError::PasswordTooLong.kick_reason(), reason::WRONG_PASSWORD);
	}
}
