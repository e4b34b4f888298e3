//! Definition data for entries that come from an indexed class file.

use crate::access::AccessFlags;
use crate::entry::{ClassEntry, FieldEntry, MethodEntry};

/// A class as it's declared, with its super types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
	pub entry: ClassEntry,
	pub access: AccessFlags,
	pub signature: Option<String>,
	/// `None` only for `java/lang/Object` and for module-info.
	pub super_class: Option<ClassEntry>,
	pub interfaces: Vec<ClassEntry>,
}

impl ClassDef {
	pub fn new(entry: ClassEntry, access: AccessFlags, super_class: Option<ClassEntry>, interfaces: Vec<ClassEntry>) -> ClassDef {
		ClassDef { entry, access, signature: None, super_class, interfaces }
	}

	pub fn with_signature(mut self, signature: Option<String>) -> ClassDef {
		self.signature = signature;
		self
	}

	pub fn is_record(&self) -> bool {
		self.super_class.as_ref().is_some_and(|super_class| super_class.full_name() == ClassEntry::JAVA_LANG_RECORD)
	}

	pub fn is_interface(&self) -> bool {
		self.access.is_interface()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
	pub entry: MethodEntry,
	pub access: AccessFlags,
	pub signature: Option<String>,
}

impl MethodDef {
	pub fn new(entry: MethodEntry, access: AccessFlags) -> MethodDef {
		MethodDef { entry, access, signature: None }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
	pub entry: FieldEntry,
	pub access: AccessFlags,
	pub signature: Option<String>,
}

impl FieldDef {
	pub fn new(entry: FieldEntry, access: AccessFlags) -> FieldDef {
		FieldDef { entry, access, signature: None }
	}
}
