use anyhow::{bail, Result};
use indexmap::IndexMap;
use scrivener_entry::access::AccessFlags;
use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, MethodEntry};

/// Stores all known entries, with their definitions.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
	classes: IndexMap<ClassEntry, ClassDef>,
	methods: IndexMap<MethodEntry, MethodDef>,
	fields: IndexMap<FieldEntry, FieldDef>,
	/// Members and inner classes, by the class they're declared in.
	children: IndexMap<ClassEntry, Vec<Entry>>,
}

impl EntryIndex {
	pub(crate) fn add_class(&mut self, def: ClassDef) -> Result<()> {
		if self.classes.contains_key(&def.entry) {
			bail!("duplicate class {}", def.entry);
		}
		if let Some(outer) = def.entry.parent() {
			self.children.entry(outer.clone()).or_default().push(def.entry.clone().into());
		}
		self.classes.insert(def.entry.clone(), def);
		Ok(())
	}

	pub(crate) fn add_method(&mut self, def: MethodDef) -> Result<()> {
		if !self.classes.contains_key(def.entry.parent()) {
			bail!("method {} is declared in the unknown class {}", def.entry, def.entry.parent());
		}
		if self.methods.contains_key(&def.entry) {
			bail!("duplicate method {}", def.entry);
		}
		self.children.entry(def.entry.parent().clone()).or_default().push(def.entry.clone().into());
		self.methods.insert(def.entry.clone(), def);
		Ok(())
	}

	pub(crate) fn add_field(&mut self, def: FieldDef) -> Result<()> {
		if !self.classes.contains_key(def.entry.parent()) {
			bail!("field {} is declared in the unknown class {}", def.entry, def.entry.parent());
		}
		if self.fields.contains_key(&def.entry) {
			bail!("duplicate field {}", def.entry);
		}
		self.children.entry(def.entry.parent().clone()).or_default().push(def.entry.clone().into());
		self.fields.insert(def.entry.clone(), def);
		Ok(())
	}

	pub fn has_class(&self, class: &ClassEntry) -> bool {
		self.classes.contains_key(class)
	}

	pub fn has_method(&self, method: &MethodEntry) -> bool {
		self.methods.contains_key(method)
	}

	pub fn has_field(&self, field: &FieldEntry) -> bool {
		self.fields.contains_key(field)
	}

	/// Local variables aren't indexed, they exist if their method does.
	pub fn has_entry(&self, entry: &Entry) -> bool {
		match entry {
			Entry::Class(class) => self.has_class(class),
			Entry::Method(method) => self.has_method(method),
			Entry::Field(field) => self.has_field(field),
			Entry::LocalVariable(local) => self.has_method(local.parent()),
		}
	}

	pub fn class_def(&self, class: &ClassEntry) -> Option<&ClassDef> {
		self.classes.get(class)
	}

	pub fn method_def(&self, method: &MethodEntry) -> Option<&MethodDef> {
		self.methods.get(method)
	}

	pub fn field_def(&self, field: &FieldEntry) -> Option<&FieldDef> {
		self.fields.get(field)
	}

	pub fn method_access(&self, method: &MethodEntry) -> Option<AccessFlags> {
		self.methods.get(method).map(|def| def.access)
	}

	pub fn field_access(&self, field: &FieldEntry) -> Option<AccessFlags> {
		self.fields.get(field).map(|def| def.access)
	}

	pub fn entry_access(&self, entry: &Entry) -> Option<AccessFlags> {
		match entry {
			Entry::Class(class) => self.classes.get(class).map(|def| def.access),
			Entry::Method(method) => self.method_access(method),
			Entry::Field(field) => self.field_access(field),
			Entry::LocalVariable(_) => None,
		}
	}

	pub fn classes(&self) -> impl Iterator<Item=&ClassDef> {
		self.classes.values()
	}

	pub fn methods(&self) -> impl Iterator<Item=&MethodDef> {
		self.methods.values()
	}

	pub fn fields(&self) -> impl Iterator<Item=&FieldDef> {
		self.fields.values()
	}

	/// The fields, methods and inner classes declared in `class`.
	pub fn children(&self, class: &ClassEntry) -> &[Entry] {
		self.children.get(class).map_or(&[], Vec::as_slice)
	}
}
