//! Editing the same mappings together over the network.
//!
//! A [`server::Server`] owns the authoritative [`scrivener_mappings::remapper::Remapper`]. Every participant,
//! including the one hosting the server, is a [`client::Client`]: it applies its own changes locally and sends them
//! to the server, which validates them again and passes them on to everyone else.
//!
//! Packets are framed as a packet id byte, a big endian `u32` length and the payload, see [`codec`].

use std::time::Duration;

pub mod client;
pub mod codec;
pub mod error;
pub mod message;
pub mod packet;
pub mod server;

pub const DEFAULT_PORT: u16 = 34712;

/// `0xMmVV`: major (4 bits), minor (4 bits) and sub version (8 bits).
pub const PROTOCOL_VERSION: u16 = 0x1002;

/// Length of a SHA-256 checksum.
pub const CHECKSUM_SIZE: usize = 32;

/// Passwords are sent with a one byte length.
pub const MAX_PASSWORD_LENGTH: usize = 255;

pub const MAX_USERNAME_LENGTH: usize = 32;

/// How long connecting and logging in may take.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The checksum of the program everyone is editing, clients of a different program get kicked.
pub type Checksum = [u8; CHECKSUM_SIZE];

/// Usernames are non-empty, short, and made of letters, digits, `_` and `-`.
pub fn is_username_valid(username: &str) -> bool {
	!username.is_empty()
		&& username.chars().count() <= MAX_USERNAME_LENGTH
		&& username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
