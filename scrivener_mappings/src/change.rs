use scrivener_entry::entry::Entry;
use crate::mapping::EntryMapping;

/// A change to an optional value: leave it as is, set it, or remove it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Tristate<T> {
	#[default]
	Unchanged,
	Set(T),
	Reset,
}

impl<T> Tristate<T> {
	pub fn is_unchanged(&self) -> bool {
		matches!(self, Tristate::Unchanged)
	}

	pub fn is_set(&self) -> bool {
		matches!(self, Tristate::Set(_))
	}

	pub fn is_reset(&self) -> bool {
		matches!(self, Tristate::Reset)
	}

	pub fn new_value(&self) -> Option<&T> {
		match self {
			Tristate::Set(value) => Some(value),
			_ => None,
		}
	}

	/// Applies the change to `current`.
	pub fn apply(self, current: Option<T>) -> Option<T> {
		match self {
			Tristate::Unchanged => current,
			Tristate::Set(value) => Some(value),
			Tristate::Reset => None,
		}
	}
}

/// A request to change the name and/or javadoc of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryChange {
	target: Entry,
	deobf_name: Tristate<String>,
	javadoc: Tristate<String>,
}

impl EntryChange {
	/// A change that doesn't change anything yet.
	pub fn modify(target: Entry) -> EntryChange {
		EntryChange { target, deobf_name: Tristate::Unchanged, javadoc: Tristate::Unchanged }
	}

	/// The change that turns the default mapping into `mapping`.
	pub fn from_mapping(target: Entry, mapping: &EntryMapping) -> EntryChange {
		let change = EntryChange::modify(target);
		let change = match mapping.target_name() {
			Some(name) => change.with_deobf_name(name),
			None => change.clear_deobf_name(),
		};
		match mapping.javadoc() {
			Some(javadoc) => change.with_javadoc(javadoc),
			None => change.clear_javadoc(),
		}
	}

	pub fn with_deobf_name(self, name: impl Into<String>) -> EntryChange {
		EntryChange { deobf_name: Tristate::Set(name.into()), ..self }
	}

	pub fn clear_deobf_name(self) -> EntryChange {
		EntryChange { deobf_name: Tristate::Reset, ..self }
	}

	pub fn with_javadoc(self, javadoc: impl Into<String>) -> EntryChange {
		EntryChange { javadoc: Tristate::Set(javadoc.into()), ..self }
	}

	pub fn clear_javadoc(self) -> EntryChange {
		EntryChange { javadoc: Tristate::Reset, ..self }
	}

	pub fn target(&self) -> &Entry {
		&self.target
	}

	pub fn deobf_name(&self) -> &Tristate<String> {
		&self.deobf_name
	}

	pub fn javadoc(&self) -> &Tristate<String> {
		&self.javadoc
	}

	/// Builds the mapping this change results in, starting from `mapping`.
	///
	/// Setting a name makes it a [deobfuscated][crate::mapping::TokenType::Deobfuscated] name, even if it was
	/// proposed before. Resetting the name keeps the javadoc.
	pub fn apply_to(&self, mapping: &EntryMapping) -> EntryMapping {
		let mapping = match &self.deobf_name {
			Tristate::Unchanged => mapping.clone(),
			Tristate::Set(name) => mapping.with_name(Some(name.clone())),
			Tristate::Reset => mapping.with_name(None),
		};

		let javadoc = self.javadoc.clone().apply(mapping.javadoc().map(str::to_owned));
		mapping.with_javadoc(javadoc)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use scrivener_entry::entry::Entry;
	use crate::change::{EntryChange, Tristate};
	use crate::mapping::{EntryMapping, TokenType};

	fn target() -> Entry {
		"a.f:I".parse().unwrap()
	}

	#[test]
	fn tristate() {
		assert_eq!(Tristate::Unchanged.apply(Some(1)), Some(1));
		assert_eq!(Tristate::Set(2).apply(Some(1)), Some(2));
		assert_eq!(Tristate::<i32>::Reset.apply(Some(1)), None);
		assert!(Tristate::<i32>::default().is_unchanged());
	}

	#[test]
	fn apply_name_keeps_javadoc() {
		let mapping = EntryMapping::DEFAULT.with_javadoc(Some("docs".to_owned()));

		let renamed = EntryChange::modify(target()).with_deobf_name("count").apply_to(&mapping);
		assert_eq!(renamed.target_name(), Some("count"));
		assert_eq!(renamed.javadoc(), Some("docs"));
		assert_eq!(renamed.token_type(), TokenType::Deobfuscated);

		let reset = EntryChange::modify(target()).clear_deobf_name().apply_to(&renamed);
		assert_eq!(reset.target_name(), None);
		assert_eq!(reset.javadoc(), Some("docs"));
		assert_eq!(reset.token_type(), TokenType::Obfuscated);
	}

	#[test]
	fn apply_javadoc_independently() {
		let mapping = EntryMapping::deobfuscated("count");

		let documented = EntryChange::modify(target()).with_javadoc("the count").apply_to(&mapping);
		assert_eq!(documented.target_name(), Some("count"));
		assert_eq!(documented.javadoc(), Some("the count"));

		let cleared = EntryChange::modify(target()).clear_javadoc().apply_to(&documented);
		assert_eq!(cleared, mapping);
	}

	#[test]
	fn editing_a_proposed_name() {
		let proposed = EntryMapping::proposed("size", TokenType::JarProposed, "plugin").unwrap();
		let edited = EntryChange::modify(target()).with_deobf_name("length").apply_to(&proposed);
		assert_eq!(edited.source_plugin_id(), None);
		assert_eq!(edited.token_type(), TokenType::Deobfuscated);
	}

	#[test]
	fn from_mapping() {
		let mapping = EntryMapping::deobfuscated("count").with_javadoc(Some("docs".to_owned()));
		let change = EntryChange::from_mapping(target(), &mapping);
		assert_eq!(change.apply_to(&EntryMapping::DEFAULT), mapping);

		let change = EntryChange::from_mapping(target(), &EntryMapping::DEFAULT);
		assert!(change.apply_to(&mapping).is_default());
	}
}
