//! The read only view of the program being renamed.
//!
//! Building the index (reading class files) happens elsewhere, this only stores what the indexer found:
//! the declared classes, fields and methods, how classes inherit from each other, and which method calls which.
//! Bridge methods are found from that when the index is [built][JarIndexBuilder::build].

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
use scrivener_entry::entry::{ClassEntry, Entry, MethodEntry};

pub mod bridge;
pub mod entry_index;
pub mod inheritance;
pub mod reference;

use bridge::BridgeMethodIndex;
use entry_index::EntryIndex;
use inheritance::InheritanceIndex;
use reference::ReferenceIndex;

#[derive(Debug, Clone, Default)]
pub struct JarIndex {
	entries: EntryIndex,
	inheritance: InheritanceIndex,
	references: ReferenceIndex,
	bridges: BridgeMethodIndex,
}

impl JarIndex {
	pub fn builder() -> JarIndexBuilder {
		JarIndexBuilder::default()
	}

	pub fn entries(&self) -> &EntryIndex {
		&self.entries
	}

	pub fn inheritance(&self) -> &InheritanceIndex {
		&self.inheritance
	}

	pub fn references(&self) -> &ReferenceIndex {
		&self.references
	}

	pub fn bridges(&self) -> &BridgeMethodIndex {
		&self.bridges
	}

	/// The fields, methods and inner classes declared in `class`.
	pub fn children(&self, class: &ClassEntry) -> &[Entry] {
		self.entries.children(class)
	}
}

#[derive(Debug, Default)]
pub struct JarIndexBuilder {
	entries: EntryIndex,
	inheritance: InheritanceIndex,
	references: ReferenceIndex,
}

impl JarIndexBuilder {
	pub fn add_class(&mut self, def: ClassDef) -> Result<&mut Self> {
		let entry = def.entry.clone();
		let super_class = def.super_class.clone();
		let interfaces = def.interfaces.clone();

		self.entries.add_class(def)
			.with_context(|| anyhow!("failed to index class {entry}"))?;
		self.inheritance.store(&entry, super_class.as_ref(), &interfaces);
		Ok(self)
	}

	pub fn add_method(&mut self, def: MethodDef) -> Result<&mut Self> {
		self.entries.add_method(def)?;
		Ok(self)
	}

	pub fn add_field(&mut self, def: FieldDef) -> Result<&mut Self> {
		self.entries.add_field(def)?;
		Ok(self)
	}

	/// Records that the code of `caller` calls `callee`.
	pub fn add_method_reference(&mut self, caller: MethodEntry, callee: MethodEntry) -> &mut Self {
		self.references.add_method_reference(caller, callee);
		self
	}

	/// Fails if a class inherits from itself, directly or through other classes.
	pub fn build(self) -> Result<JarIndex> {
		if let Some(class) = self.inheritance.find_cycle() {
			bail!("class {class} inherits from itself");
		}

		let bridges = BridgeMethodIndex::find(&self.entries, &self.inheritance, &self.references);
		debug!("indexed {} classes, found {} bridge methods", self.entries.classes().count(), bridges.bridge_to_specialized().len());

		Ok(JarIndex {
			entries: self.entries,
			inheritance: self.inheritance,
			references: self.references,
			bridges,
		})
	}
}
