use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use anyhow::{anyhow, Context, Result};
use crate::access::AccessFlags;
use crate::descriptor::{MethodDescriptor, TypeDescriptor};
use crate::entry::{ClassEntry, LocalVariableEntry};

/// A reference to a method, identified by its owner, name and descriptor.
#[derive(Debug, Clone)]
pub struct MethodEntry {
	parent: ClassEntry,
	name: String,
	desc: MethodDescriptor,
	javadoc: Option<String>,
}

impl PartialEq for MethodEntry {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.desc == other.desc && self.parent == other.parent
	}
}

impl Eq for MethodEntry {}

impl Hash for MethodEntry {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.parent.hash(state);
		self.name.hash(state);
		self.desc.hash(state);
	}
}

impl MethodEntry {
	pub const CONSTRUCTOR: &'static str = "<init>";
	pub const STATIC_INITIALIZER: &'static str = "<clinit>";

	pub fn new(parent: ClassEntry, name: impl Into<String>, desc: MethodDescriptor) -> MethodEntry {
		MethodEntry { parent, name: name.into(), desc, javadoc: None }
	}

	/// Creates a method entry, parsing the descriptor.
	pub fn parse(owner: &str, name: &str, desc: &str) -> Result<MethodEntry> {
		let desc = desc.parse()
			.with_context(|| anyhow!("invalid descriptor for method {owner}.{name}"))?;
		Ok(MethodEntry::new(ClassEntry::new(owner), name, desc))
	}

	pub fn parent(&self) -> &ClassEntry {
		&self.parent
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn desc(&self) -> &MethodDescriptor {
		&self.desc
	}

	pub fn javadoc(&self) -> Option<&str> {
		self.javadoc.as_deref()
	}

	pub fn with_javadoc(mut self, javadoc: Option<String>) -> MethodEntry {
		self.javadoc = javadoc;
		self
	}

	pub fn with_name(&self, name: impl Into<String>) -> MethodEntry {
		MethodEntry { parent: self.parent.clone(), name: name.into(), desc: self.desc.clone(), javadoc: self.javadoc.clone() }
	}

	pub fn with_parent(&self, parent: ClassEntry) -> MethodEntry {
		MethodEntry { parent, name: self.name.clone(), desc: self.desc.clone(), javadoc: self.javadoc.clone() }
	}

	pub fn with_desc(&self, desc: MethodDescriptor) -> MethodEntry {
		MethodEntry { parent: self.parent.clone(), name: self.name.clone(), desc, javadoc: self.javadoc.clone() }
	}

	/// Whether this is `<init>` or `<clinit>`.
	pub fn is_constructor(&self) -> bool {
		self.name == Self::CONSTRUCTOR || self.name == Self::STATIC_INITIALIZER
	}

	/// Lists the local variable slots the parameters of this method occupy.
	///
	/// Slot `0` is `this` for non-static methods, and `long`/`double` parameters take up two slots, so the
	/// indices aren't consecutive.
	pub fn parameters(&self, access: AccessFlags) -> Vec<LocalVariableEntry> {
		let mut index = if access.is_static() { 0 } else { 1 };
		let mut parameters = Vec::with_capacity(self.desc.parameters.len());
		for parameter in &self.desc.parameters {
			parameters.push(LocalVariableEntry::parameter(self.clone(), index));
			index += parameter.size();
		}
		parameters
	}
}

impl Display for MethodEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}{}", self.parent, self.name, self.desc)
	}
}

/// A reference to a field, identified by its owner, name and descriptor.
#[derive(Debug, Clone)]
pub struct FieldEntry {
	parent: ClassEntry,
	name: String,
	desc: TypeDescriptor,
	javadoc: Option<String>,
}

impl PartialEq for FieldEntry {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.desc == other.desc && self.parent == other.parent
	}
}

impl Eq for FieldEntry {}

impl Hash for FieldEntry {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.parent.hash(state);
		self.name.hash(state);
		self.desc.hash(state);
	}
}

impl FieldEntry {
	pub fn new(parent: ClassEntry, name: impl Into<String>, desc: TypeDescriptor) -> FieldEntry {
		FieldEntry { parent, name: name.into(), desc, javadoc: None }
	}

	pub fn parse(owner: &str, name: &str, desc: &str) -> Result<FieldEntry> {
		let desc = desc.parse()
			.with_context(|| anyhow!("invalid descriptor for field {owner}.{name}"))?;
		Ok(FieldEntry::new(ClassEntry::new(owner), name, desc))
	}

	pub fn parent(&self) -> &ClassEntry {
		&self.parent
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn desc(&self) -> &TypeDescriptor {
		&self.desc
	}

	pub fn javadoc(&self) -> Option<&str> {
		self.javadoc.as_deref()
	}

	pub fn with_javadoc(mut self, javadoc: Option<String>) -> FieldEntry {
		self.javadoc = javadoc;
		self
	}

	pub fn with_name(&self, name: impl Into<String>) -> FieldEntry {
		FieldEntry { parent: self.parent.clone(), name: name.into(), desc: self.desc.clone(), javadoc: self.javadoc.clone() }
	}

	pub fn with_parent(&self, parent: ClassEntry) -> FieldEntry {
		FieldEntry { parent, name: self.name.clone(), desc: self.desc.clone(), javadoc: self.javadoc.clone() }
	}

	pub fn with_desc(&self, desc: TypeDescriptor) -> FieldEntry {
		FieldEntry { parent: self.parent.clone(), name: self.name.clone(), desc, javadoc: self.javadoc.clone() }
	}
}

impl Display for FieldEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}:{}", self.parent, self.name, self.desc)
	}
}
