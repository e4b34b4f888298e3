use indexmap::IndexSet;
use scrivener_entry::entry::{ClassEntry, Entry, LocalVariableEntry};
use scrivener_entry::validation::{Message, ValidationContext};
use crate::index::JarIndex;
use crate::mapping::EntryMapping;
use crate::resolver::EntryResolver;
use crate::translator::{MappingTranslator, Translator};
use crate::tree::EntryTree;

/// Checks whether a new name can be given to an entry, given the names everything else currently has.
pub struct MappingValidator<'a, R> {
	index: &'a JarIndex,
	mappings: &'a EntryTree<EntryMapping>,
	resolver: &'a R,
}

impl<'a, R: EntryResolver> MappingValidator<'a, R> {
	pub fn new(index: &'a JarIndex, mappings: &'a EntryTree<EntryMapping>, resolver: &'a R) -> MappingValidator<'a, R> {
		MappingValidator { index, mappings, resolver }
	}

	fn translator(&self) -> MappingTranslator<'a, &'a R> {
		MappingTranslator::new(self.mappings, self.resolver)
	}

	/// Validates renaming `entry`, and with it all equivalent entries, to `name`.
	///
	/// Only the first uniqueness problem is raised, syntax problems are raised for every entry.
	pub fn validate_rename(&self, ctx: &mut ValidationContext, entry: &Entry, name: &str) {
		let equivalent = self.resolver.resolve_equivalent_entries(entry);

		let mut uniqueness_issue = false;
		for equivalent_entry in &equivalent {
			equivalent_entry.validate_name(ctx, name);
			if !uniqueness_issue {
				uniqueness_issue = self.validate_unique(ctx, equivalent_entry, &equivalent, name);
			}
		}
	}

	/// Returns whether a problem was raised.
	fn validate_unique(&self, ctx: &mut ValidationContext, entry: &Entry, equivalent: &IndexSet<Entry>, name: &str) -> bool {
		if let Entry::LocalVariable(local) = entry {
			return self.validate_local_unique(ctx, local, name);
		}

		let translator = self.translator();
		let translated = translator.translate(entry);

		let bridges = self.index.bridges();
		let siblings: Vec<(Entry, Entry)> = self.siblings(entry, name).into_iter()
			.filter(|sibling| !equivalent.contains(sibling))
			// bridges take the name of the method they call
			.filter(|sibling| !sibling.as_method().is_some_and(|method| bridges.is_bridge_method(method)))
			.map(|sibling| {
				let translated = translator.translate(&sibling);
				(sibling, translated)
			})
			.collect();

		if !self.is_unique(&translated, entry, &siblings, name) {
			raise_conflict(ctx, translated.parent().as_ref(), name, false);
			true
		} else if let Some(shadowed) = self.shadowed_entry(&translated, entry, &siblings, name) {
			raise_conflict(ctx, shadowed.parent().as_ref(), name, true);
			true
		} else {
			false
		}
	}

	/// Everything `entry` could clash with. For members these are the members of its class and of all ancestors of
	/// it. For classes, the other classes in the same outer class, or in the old and the new package.
	fn siblings(&self, entry: &Entry, name: &str) -> IndexSet<Entry> {
		match entry {
			Entry::Class(class) => match class.parent() {
				Some(outer) => self.index.children(outer).iter().cloned().collect(),
				None => self.index.entries().classes()
					.map(|def| &def.entry)
					.filter(|other| !other.is_inner_class())
					.filter(|other| other.package_name() == class.package_name() || other.package_name() == package_of(name))
					.map(|other| Entry::Class(other.clone()))
					.collect(),
			},
			_ => {
				let containing_class = entry.containing_class();
				let mut siblings: IndexSet<Entry> = self.index.children(containing_class).iter().cloned().collect();
				for ancestor in self.index.inheritance().ancestors(containing_class) {
					siblings.extend(self.index.children(ancestor).iter().cloned());
				}
				siblings
			},
		}
	}

	fn is_unique(&self, translated: &Entry, entry: &Entry, siblings: &[(Entry, Entry)], name: &str) -> bool {
		let entries = self.index.entries();

		for (sibling, translated_sibling) in siblings {
			let conflicts = [translated_sibling, sibling].into_iter()
				.any(|other| translated.can_conflict_with(other) && other.name() == name && !matches(translated, entry, other, sibling));
			if !conflicts {
				continue;
			}

			if let Entry::Method(_) = entry {
				let same_parent = translated.parent() == translated_sibling.parent();
				let both = entries.entry_access(entry).zip(entries.entry_access(sibling));
				if let Some((access, sibling_access)) = both.filter(|_| !same_parent) {
					// methods in different classes that are both static or both private don't override each other
					if (access.is_static() && sibling_access.is_static()) || (access.is_private() && sibling_access.is_private()) {
						continue;
					}
				}
			}

			return false;
		}

		true
	}

	fn shadowed_entry<'s>(&self, translated: &Entry, entry: &Entry, siblings: &'s [(Entry, Entry)], name: &str) -> Option<&'s Entry> {
		let inheritance = self.index.inheritance();
		let entries = self.index.entries();
		let ancestors = inheritance.ancestors(entry.containing_class());

		siblings.iter()
			.filter(|(sibling, translated_sibling)| translated.can_shadow(translated_sibling) || translated.can_shadow(sibling))
			.filter(|(sibling, _)| ancestors.contains(sibling.containing_class()))
			.filter(|(sibling, _)| !entries.entry_access(sibling).is_some_and(|access| access.is_private()))
			.find(|(_, translated_sibling)| translated_sibling.name() == name)
			.map(|(_, translated_sibling)| translated_sibling)
	}

	/// Locals are unique among the parameters and mapped locals of their method.
	fn validate_local_unique(&self, ctx: &mut ValidationContext, local: &LocalVariableEntry, name: &str) -> bool {
		let method = local.parent();
		let translator = self.translator();

		let parameters = self.index.entries().method_access(method)
			.map(|access| method.parameters(access))
			.unwrap_or_default();
		let method_entry = Entry::Method(method.clone());
		let mapped = self.mappings.children(&method_entry).into_iter()
			.filter_map(|child| child.as_local_variable().cloned());

		let conflict = parameters.into_iter()
			.chain(mapped)
			.filter(|other| other != local)
			.any(|other| translator.translate_local(&other).value.name() == name);

		if conflict {
			let parent = translator.translate(&method_entry);
			raise_conflict(ctx, Some(&parent), name, false);
		}
		conflict
	}
}

fn matches(translated: &Entry, entry: &Entry, other: &Entry, sibling: &Entry) -> bool {
	translated == sibling || translated == other || entry == other || entry == sibling
}

fn raise_conflict(ctx: &mut ValidationContext, parent: Option<&Entry>, name: &str, shadow: bool) {
	match (parent, shadow) {
		(Some(parent), false) => ctx.raise(Message::NON_UNIQUE_NAME_CLASS, [name.to_owned(), parent.to_string()]),
		(Some(parent), true) => ctx.raise(Message::SHADOWED_NAME_CLASS, [name.to_owned(), parent.to_string()]),
		(None, false) => ctx.raise(Message::NON_UNIQUE_NAME, [name]),
		(None, true) => ctx.raise(Message::SHADOWED_NAME, [name]),
	}
}

/// The package a new class name puts the class in, `None` for the default package.
pub fn package_of(name: &str) -> Option<&str> {
	name.rsplit_once('/').map(|(package, _)| package)
}

/// Whether giving `class` the name `name` moves it to another package.
pub fn changes_package(class: &ClassEntry, name: &str) -> bool {
	!class.is_inner_class() && package_of(name) != class.package_name()
}
