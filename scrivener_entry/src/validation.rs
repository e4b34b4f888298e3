//! Collecting validation messages instead of failing on the first problem.
//!
//! A [`ValidationContext`] is handed to every operation that may reject user input. Problems are
//! [raised][ValidationContext::raise] into it, and the caller checks [`ValidationContext::can_proceed`] before
//! doing any mutation. This way a batch of renames can report every problem at once.

use std::fmt::{Display, Formatter};
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
	Info,
	Warning,
	Error,
}

/// A message template. `{0}`, `{1}`, ... get replaced by the parameters of a [`ParameterizedMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
	pub kind: MessageKind,
	pub key: &'static str,
	pub text: &'static str,
}

const fn message(kind: MessageKind, key: &'static str, text: &'static str) -> Message {
	Message { kind, key, text }
}

impl Message {
	pub const EMPTY_FIELD: Message = message(MessageKind::Error, "empty_field", "Field is required");
	pub const INVALID_IP: Message = message(MessageKind::Error, "invalid_ip", "Invalid IP/Port combination");
	pub const NOT_INT: Message = message(MessageKind::Error, "not_int", "Value must be an integer");
	pub const FIELD_OUT_OF_RANGE_INT: Message = message(MessageKind::Error, "field_out_of_range_int",
		"Value must be an integer between {0} and {1}");
	pub const FIELD_LENGTH_OUT_OF_RANGE: Message = message(MessageKind::Error, "field_length_out_of_range",
		"Value must be less than {0} characters long");
	pub const NON_UNIQUE_NAME_CLASS: Message = message(MessageKind::Error, "non_unique_name_class",
		"Name {0} is not unique in {1}");
	pub const NON_UNIQUE_NAME: Message = message(MessageKind::Error, "non_unique_name",
		"Name {0} is not unique");
	pub const ILLEGAL_IDENTIFIER: Message = message(MessageKind::Error, "illegal_identifier",
		"Identifier {0} contains illegal character {1} at position {2}");
	pub const RESERVED_IDENTIFIER: Message = message(MessageKind::Error, "reserved_identifier",
		"{0} is a reserved identifier");
	pub const ILLEGAL_DOC_COMMENT_END: Message = message(MessageKind::Error, "illegal_doc_comment_end",
		"Javadoc comment cannot contain the character sequence '*/'");
	pub const UNKNOWN_RECORD_GETTER: Message = message(MessageKind::Error, "unknown_record_getter",
		"Could not find a matching record getter for {0}");
	pub const INVALID_PACKAGE_NAME: Message = message(MessageKind::Error, "invalid_package_name",
		"{0} is not a valid package name");

	pub const SHADOWED_NAME_CLASS: Message = message(MessageKind::Warning, "shadowed_name_class",
		"Name {0} shadows a member of {1}");
	pub const SHADOWED_NAME: Message = message(MessageKind::Warning, "shadowed_name",
		"Name {0} shadows a member of a super class");

	pub const SERVER_STARTED: Message = message(MessageKind::Info, "server_started", "Server started on port {0}");
	pub const CONNECTED_TO_SERVER: Message = message(MessageKind::Info, "connected_to_server", "Connected to server as {0}");
	pub const LEFT_SERVER: Message = message(MessageKind::Info, "left_server", "Disconnected from server: {0}");
	pub const USER_CONNECTED: Message = message(MessageKind::Info, "user_connected", "{0} connected");
	pub const USER_LEFT: Message = message(MessageKind::Info, "user_left", "{0} left the server");
	pub const CHAT: Message = message(MessageKind::Info, "chat", "{0}: {1}");
}

/// A [`Message`] together with the values for its placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterizedMessage {
	pub message: Message,
	pub params: Vec<String>,
}

impl ParameterizedMessage {
	pub fn new(message: Message, params: Vec<String>) -> ParameterizedMessage {
		ParameterizedMessage { message, params }
	}

	pub fn kind(&self) -> MessageKind {
		self.message.kind
	}
}

impl Display for ParameterizedMessage {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let mut text = self.message.text.to_owned();
		for (i, param) in self.params.iter().enumerate() {
			text = text.replace(&format!("{{{i}}}"), param);
		}
		f.write_str(&text)
	}
}

/// The sink validation messages are shown in.
pub trait Notifier: Send {
	/// Shows the message to the user.
	fn notify(&mut self, message: &ParameterizedMessage);

	/// Asks the user whether a warning is acceptable, returns `true` to ignore it.
	fn verify_warning(&mut self, message: &ParameterizedMessage) -> bool;
}

/// A [`Notifier`] that logs every message and accepts all warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
	fn notify(&mut self, message: &ParameterizedMessage) {
		match message.kind() {
			MessageKind::Info => info!("{message}"),
			MessageKind::Warning => warn!("{message}"),
			MessageKind::Error => error!("{message}"),
		}
	}

	fn verify_warning(&mut self, _message: &ParameterizedMessage) -> bool {
		true
	}
}

pub struct ValidationContext {
	notifier: Box<dyn Notifier>,
	messages: Vec<ParameterizedMessage>,
}

impl Default for ValidationContext {
	fn default() -> Self {
		ValidationContext::new(Box::new(LogNotifier))
	}
}

impl ValidationContext {
	pub fn new(notifier: Box<dyn Notifier>) -> ValidationContext {
		ValidationContext { notifier, messages: Vec::new() }
	}

	/// Records a message. Raising the same message with the same parameters twice only records it once.
	pub fn raise(&mut self, message: Message, params: impl IntoIterator<Item=impl Into<String>>) {
		let message = ParameterizedMessage::new(message, params.into_iter().map(Into::into).collect());
		if !self.messages.contains(&message) {
			self.notifier.notify(&message);
			self.messages.push(message);
		}
	}

	/// Returns whether the operation the messages were raised for may be executed.
	///
	/// Warnings the notifier accepts are removed. Any error, or a warning the notifier refused, blocks.
	pub fn can_proceed(&mut self) -> bool {
		let notifier = &mut self.notifier;
		self.messages.retain(|message| {
			message.kind() != MessageKind::Warning || !notifier.verify_warning(message)
		});
		self.messages.iter().all(|message| message.kind() == MessageKind::Info)
	}

	pub fn has_errors(&self) -> bool {
		self.messages.iter().any(|message| message.kind() == MessageKind::Error)
	}

	pub fn messages(&self) -> &[ParameterizedMessage] {
		&self.messages
	}

	pub fn contains(&self, message: Message) -> bool {
		self.messages.iter().any(|raised| raised.message == message)
	}

	pub fn clear(&mut self) {
		self.messages.clear();
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::validation::{Message, Notifier, ParameterizedMessage, ValidationContext};

	struct Refusing;

	impl Notifier for Refusing {
		fn notify(&mut self, _message: &ParameterizedMessage) {}
		fn verify_warning(&mut self, _message: &ParameterizedMessage) -> bool {
			false
		}
	}

	#[test]
	fn format() {
		let message = ParameterizedMessage::new(Message::NON_UNIQUE_NAME_CLASS, vec!["foo".to_owned(), "a/B".to_owned()]);
		assert_eq!(message.to_string(), "Name foo is not unique in a/B");
	}

	#[test]
	fn deduplicate_and_proceed() {
		let mut ctx = ValidationContext::default();
		ctx.raise(Message::SHADOWED_NAME, ["x"]);
		ctx.raise(Message::SHADOWED_NAME, ["x"]);
		assert_eq!(ctx.messages().len(), 1);
		assert!(ctx.can_proceed());
		assert!(ctx.messages().is_empty());

		ctx.raise(Message::RESERVED_IDENTIFIER, ["class"]);
		assert!(!ctx.can_proceed());
		assert!(ctx.contains(Message::RESERVED_IDENTIFIER));
	}

	#[test]
	fn refused_warning_blocks() {
		let mut ctx = ValidationContext::new(Box::new(Refusing));
		ctx.raise(Message::SHADOWED_NAME, ["x"]);
		assert!(!ctx.can_proceed());
		assert!(!ctx.has_errors());
		assert_eq!(ctx.messages().len(), 1);
	}
}
