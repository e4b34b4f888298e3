use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use crate::entry::MethodEntry;

/// A local variable or parameter of a method, identified by its slot index.
///
/// The name isn't part of the identity: obfuscated code often has no local variable names at all.
#[derive(Debug, Clone)]
pub struct LocalVariableEntry {
	parent: MethodEntry,
	index: u16,
	name: String,
	is_parameter: bool,
	javadoc: Option<String>,
}

impl PartialEq for LocalVariableEntry {
	fn eq(&self, other: &Self) -> bool {
		self.index == other.index && self.parent == other.parent
	}
}

impl Eq for LocalVariableEntry {}

impl Hash for LocalVariableEntry {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.parent.hash(state);
		self.index.hash(state);
	}
}

impl LocalVariableEntry {
	pub fn new(parent: MethodEntry, index: u16, name: impl Into<String>, is_parameter: bool) -> LocalVariableEntry {
		LocalVariableEntry { parent, index, name: name.into(), is_parameter, javadoc: None }
	}

	/// A parameter without a known name.
	pub fn parameter(parent: MethodEntry, index: u16) -> LocalVariableEntry {
		LocalVariableEntry::new(parent, index, "", true)
	}

	pub fn parent(&self) -> &MethodEntry {
		&self.parent
	}

	pub fn index(&self) -> u16 {
		self.index
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_parameter(&self) -> bool {
		self.is_parameter
	}

	pub fn javadoc(&self) -> Option<&str> {
		self.javadoc.as_deref()
	}

	pub fn with_javadoc(mut self, javadoc: Option<String>) -> LocalVariableEntry {
		self.javadoc = javadoc;
		self
	}

	pub fn with_name(&self, name: impl Into<String>) -> LocalVariableEntry {
		LocalVariableEntry { name: name.into(), ..self.clone() }
	}

	pub fn with_parent(&self, parent: MethodEntry) -> LocalVariableEntry {
		LocalVariableEntry { parent, ..self.clone() }
	}
}

impl Display for LocalVariableEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let separator = if self.is_parameter { '#' } else { '@' };
		write!(f, "{}{separator}{}", self.parent, self.index)
	}
}
