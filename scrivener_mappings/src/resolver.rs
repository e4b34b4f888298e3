//! Finding the entries that have to share a name.
//!
//! A method that overrides another one must have the same name, so renaming one of them has to rename the whole
//! group. The resolver answers two questions: where is the declaration an entry refers to (the closest one, or the
//! topmost ones, the roots), and which methods belong to the same group.

use std::collections::VecDeque;
use indexmap::IndexSet;
use log::warn;
use scrivener_entry::access::AccessFlags;
use scrivener_entry::entry::{Entry, FieldEntry, MethodEntry};
use crate::index::JarIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
	/// The topmost declarations, the ones that own the name of the whole group.
	Root,
	/// The nearest declaration, the one a reference actually points to.
	Closest,
}

/// Methods of `java/lang/Object` that can never be renamed, nor can their overrides.
const OBJECT_METHODS: [(&str, &str); 11] = [
	("equals", "(Ljava/lang/Object;)Z"),
	("hashCode", "()I"),
	("toString", "()Ljava/lang/String;"),
	("clone", "()Ljava/lang/Object;"),
	("finalize", "()V"),
	("getClass", "()Ljava/lang/Class;"),
	("notify", "()V"),
	("notifyAll", "()V"),
	("wait", "()V"),
	("wait", "(J)V"),
	("wait", "(JI)V"),
];

pub trait EntryResolver {
	/// Resolves an entry to the declarations it stands for.
	///
	/// An empty set means there's nothing to rename: the entry isn't part of the indexed program, or it can never
	/// be renamed.
	fn resolve_entry(&self, entry: &Entry, strategy: ResolutionStrategy) -> IndexSet<Entry>;

	/// All methods that must have the same name as `method`, including itself. Bridge methods are never part of it.
	fn resolve_equivalent_methods(&self, method: &MethodEntry) -> IndexSet<MethodEntry>;

	/// Resolves to a single entry. If there are multiple (a method implementing methods of several interfaces), the
	/// first one is used.
	fn resolve_first_entry(&self, entry: &Entry, strategy: ResolutionStrategy) -> Option<Entry> {
		let resolved = self.resolve_entry(entry, strategy);
		if resolved.len() > 1 {
			warn!("{entry} resolves to {} entries, using the first one: {resolved:?}", resolved.len());
		}
		resolved.into_iter().next()
	}

	/// Like [`EntryResolver::resolve_equivalent_methods`], but also works for the parameters and local variables of
	/// methods. Other entries are only equivalent to themselves.
	fn resolve_equivalent_entries(&self, entry: &Entry) -> IndexSet<Entry> {
		match entry {
			Entry::Method(method) => self.resolve_equivalent_methods(method).into_iter()
				.map(Entry::Method)
				.collect(),
			Entry::LocalVariable(local) => self.resolve_equivalent_methods(local.parent()).into_iter()
				.map(|method| Entry::LocalVariable(local.with_parent(method)))
				.collect(),
			entry => IndexSet::from([entry.clone()]),
		}
	}
}

impl<R: EntryResolver + ?Sized> EntryResolver for &R {
	fn resolve_entry(&self, entry: &Entry, strategy: ResolutionStrategy) -> IndexSet<Entry> {
		(**self).resolve_entry(entry, strategy)
	}

	fn resolve_equivalent_methods(&self, method: &MethodEntry) -> IndexSet<MethodEntry> {
		(**self).resolve_equivalent_methods(method)
	}
}

/// Resolves every entry to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidEntryResolver;

impl EntryResolver for VoidEntryResolver {
	fn resolve_entry(&self, entry: &Entry, _strategy: ResolutionStrategy) -> IndexSet<Entry> {
		IndexSet::from([entry.clone()])
	}

	fn resolve_equivalent_methods(&self, method: &MethodEntry) -> IndexSet<MethodEntry> {
		IndexSet::from([method.clone()])
	}
}

/// Resolves entries using the inheritance information of a [`JarIndex`].
#[derive(Debug, Clone, Copy)]
pub struct IndexEntryResolver<'a> {
	index: &'a JarIndex,
}

impl<'a> IndexEntryResolver<'a> {
	pub fn new(index: &'a JarIndex) -> IndexEntryResolver<'a> {
		IndexEntryResolver { index }
	}

	fn is_exempt(&self, method: &MethodEntry) -> bool {
		let desc = method.desc().to_string();
		if !OBJECT_METHODS.iter().any(|(name, object_desc)| *name == method.name() && *object_desc == desc) {
			return false;
		}
		// a static or private method with such a name doesn't override anything
		!self.index.entries().method_access(method)
			.is_some_and(|access| access.is_static() || access.is_private())
	}

	fn resolve_field(&self, field: &FieldEntry) -> IndexSet<Entry> {
		let entries = self.index.entries();
		if !entries.has_class(field.parent()) {
			return IndexSet::new();
		}
		if entries.has_field(field) {
			return IndexSet::from([field.clone().into()]);
		}

		// fields aren't inherited in the virtual sense, a reference always means the nearest declaration
		self.index.inheritance().ancestors(field.parent()).into_iter()
			.map(|ancestor| field.with_parent(ancestor.clone()))
			.find(|candidate| entries.has_field(candidate))
			.map(|found| IndexSet::from([found.into()]))
			.unwrap_or_default()
	}

	fn resolve_method(&self, method: &MethodEntry, strategy: ResolutionStrategy) -> IndexSet<MethodEntry> {
		let entries = self.index.entries();
		if self.is_exempt(method) || !entries.has_class(method.parent()) {
			return IndexSet::new();
		}

		// bridges share their name with the method they call
		if let Some(specialized) = self.index.bridges().specialized_from_bridge(method) {
			if specialized != method {
				return self.resolve_method(specialized, strategy);
			}
		}

		let access = entries.method_access(method);
		if let Some(access) = access {
			// If we're looking for the closest and this entry exists, we're done looking
			if strategy == ResolutionStrategy::Closest {
				return IndexSet::from([method.clone()]);
			}
			// Don't search existing private and/or static entries up the hierarchy
			if access.is_private() || access.is_static() {
				return IndexSet::from([method.clone()]);
			}
		}

		// if the method exists we can skip static ones up the hierarchy, since this one isn't static
		let resolved = self.resolve_in_ancestry(method, strategy, access.is_some());
		if !resolved.is_empty() {
			resolved
		} else if access.is_none() {
			IndexSet::new()
		} else {
			IndexSet::from([method.clone()])
		}
	}

	fn resolve_in_ancestry(&self, method: &MethodEntry, strategy: ResolutionStrategy, skip_static: bool) -> IndexSet<MethodEntry> {
		let owner = method.parent();

		// resolve specialized methods using their bridges
		if let Some(bridge) = self.index.bridges().bridge_from_specialized(method) {
			if bridge.parent() == owner && bridge != method {
				return self.resolve_in_ancestry(bridge, strategy, skip_static);
			}
		}

		let mut resolved = IndexSet::new();
		for parent in self.index.inheritance().parents(owner) {
			let candidate = method.with_parent(parent.clone());
			match strategy {
				ResolutionStrategy::Root => resolved.extend(self.resolve_root(candidate, skip_static)),
				ResolutionStrategy::Closest => resolved.extend(self.resolve_closest(candidate, skip_static)),
			}
		}
		resolved
	}

	fn resolve_root(&self, candidate: MethodEntry, skip_static: bool) -> IndexSet<MethodEntry> {
		// look for the topmost declaration first, only then consider this one
		let ancestors = self.resolve_in_ancestry(&candidate, ResolutionStrategy::Root, skip_static);
		if ancestors.is_empty() && self.is_overridable_declaration(&candidate, skip_static) {
			return IndexSet::from([candidate]);
		}
		ancestors
	}

	fn resolve_closest(&self, candidate: MethodEntry, skip_static: bool) -> IndexSet<MethodEntry> {
		if self.is_overridable_declaration(&candidate, skip_static) {
			IndexSet::from([candidate])
		} else {
			self.resolve_in_ancestry(&candidate, ResolutionStrategy::Closest, skip_static)
		}
	}

	fn is_overridable_declaration(&self, method: &MethodEntry, skip_static: bool) -> bool {
		self.index.entries().method_access(method)
			.is_some_and(|access| !access.is_private() && !(skip_static && access.is_static()))
	}
}

fn can_inherit(method: &MethodEntry, access: AccessFlags) -> bool {
	!method.is_constructor() && !access.is_private() && !access.is_static()
}

impl EntryResolver for IndexEntryResolver<'_> {
	fn resolve_entry(&self, entry: &Entry, strategy: ResolutionStrategy) -> IndexSet<Entry> {
		let entries = self.index.entries();
		match entry {
			Entry::Class(class) => {
				if entries.has_class(class) {
					IndexSet::from([entry.clone()])
				} else {
					IndexSet::new()
				}
			},
			Entry::Field(field) => self.resolve_field(field),
			Entry::Method(method) => self.resolve_method(method, strategy).into_iter()
				.map(Entry::Method)
				.collect(),
			Entry::LocalVariable(local) => {
				// locals belong to exactly one method, overrides have their own
				if entries.has_method(local.parent()) {
					IndexSet::from([entry.clone()])
				} else {
					IndexSet::new()
				}
			},
		}
	}

	fn resolve_equivalent_methods(&self, method: &MethodEntry) -> IndexSet<MethodEntry> {
		let entries = self.index.entries();
		let bridges = self.index.bridges();

		match entries.method_access(method) {
			Some(access) if can_inherit(method, access) => {},
			_ => return IndexSet::from([method.clone()]),
		}

		let mut equivalent = IndexSet::new();
		let mut visited = IndexSet::new();
		let mut queue = VecDeque::from([method.clone()]);

		while let Some(next) = queue.pop_front() {
			if !visited.insert(next.clone()) {
				continue;
			}
			match entries.method_access(&next) {
				Some(access) if can_inherit(&next, access) => {},
				_ => continue,
			}

			if !bridges.is_bridge_method(&next) {
				equivalent.insert(next.clone());
			}

			// up to the roots, and from each root down again, to find the siblings
			queue.extend(self.resolve_method(&next, ResolutionStrategy::Root));
			for descendant in self.index.inheritance().descendants(next.parent()) {
				queue.extend(self.resolve_method(&next.with_parent(descendant.clone()), ResolutionStrategy::Closest));
			}

			queue.extend(bridges.bridge_from_specialized(&next).cloned());
			queue.extend(bridges.specialized_from_bridge(&next).cloned());
		}

		if equivalent.is_empty() {
			// only bridges: they're renamed with the method they call
			equivalent.insert(method.clone());
		}
		equivalent
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use indexmap::IndexSet;
	use pretty_assertions::assert_eq;
	use scrivener_entry::access::AccessFlags;
	use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
	use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, MethodEntry};
	use crate::index::JarIndex;
	use crate::resolver::{EntryResolver, IndexEntryResolver, ResolutionStrategy};

	const PUBLIC: AccessFlags = AccessFlags::new(AccessFlags::PUBLIC);

	fn entry(s: &str) -> Entry {
		s.parse().unwrap()
	}

	fn set(entries: &[&str]) -> IndexSet<Entry> {
		entries.iter().map(|s| entry(s)).collect()
	}

	/// ```text
	/// interface i { x() }     interface j { x() }
	/// class a implements i { x() }
	/// class b extends a { x(), private p(), static s() }
	/// class c extends b implements j {}
	/// class d extends a { static s() }
	/// ```
	fn index() -> Result<JarIndex> {
		let mut builder = JarIndex::builder();
		let interface = AccessFlags::new(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT);
		builder
			.add_class(ClassDef::new(ClassEntry::new("i"), interface, Some(ClassEntry::new("java/lang/Object")), vec![]))?
			.add_class(ClassDef::new(ClassEntry::new("j"), interface, Some(ClassEntry::new("java/lang/Object")), vec![]))?
			.add_class(ClassDef::new(ClassEntry::new("a"), PUBLIC, Some(ClassEntry::new("java/lang/Object")), vec![ClassEntry::new("i")]))?
			.add_class(ClassDef::new(ClassEntry::new("b"), PUBLIC, Some(ClassEntry::new("a")), vec![]))?
			.add_class(ClassDef::new(ClassEntry::new("c"), PUBLIC, Some(ClassEntry::new("b")), vec![ClassEntry::new("j")]))?
			.add_class(ClassDef::new(ClassEntry::new("d"), PUBLIC, Some(ClassEntry::new("a")), vec![]))?;

		let abstract_method = AccessFlags::new(AccessFlags::PUBLIC | AccessFlags::ABSTRACT);
		builder
			.add_method(MethodDef::new(MethodEntry::parse("i", "x", "()V")?, abstract_method))?
			.add_method(MethodDef::new(MethodEntry::parse("j", "x", "()V")?, abstract_method))?
			.add_method(MethodDef::new(MethodEntry::parse("a", "x", "()V")?, PUBLIC))?
			.add_method(MethodDef::new(MethodEntry::parse("a", "equals", "(Ljava/lang/Object;)Z")?, PUBLIC))?
			.add_method(MethodDef::new(MethodEntry::parse("b", "x", "()V")?, PUBLIC))?
			.add_method(MethodDef::new(MethodEntry::parse("b", "p", "()V")?, AccessFlags::new(AccessFlags::PRIVATE)))?
			.add_method(MethodDef::new(MethodEntry::parse("b", "s", "()V")?, AccessFlags::new(AccessFlags::STATIC)))?
			.add_method(MethodDef::new(MethodEntry::parse("d", "s", "()V")?, AccessFlags::new(AccessFlags::STATIC)))?
			.add_field(FieldDef::new(FieldEntry::parse("a", "f", "I")?, PUBLIC))?;
		builder.build()
	}

	#[test]
	fn roots() -> Result<()> {
		let index = index()?;
		let resolver = IndexEntryResolver::new(&index);

		assert_eq!(resolver.resolve_entry(&entry("b.x()V"), ResolutionStrategy::Root), set(&["i.x()V"]));
		assert_eq!(resolver.resolve_entry(&entry("a.x()V"), ResolutionStrategy::Root), set(&["i.x()V"]));
		assert_eq!(resolver.resolve_entry(&entry("i.x()V"), ResolutionStrategy::Root), set(&["i.x()V"]));
		// c doesn't declare x, and joins the two interfaces
		assert_eq!(resolver.resolve_entry(&entry("c.x()V"), ResolutionStrategy::Root), set(&["i.x()V", "j.x()V"]));
		Ok(())
	}

	#[test]
	fn closest() -> Result<()> {
		let index = index()?;
		let resolver = IndexEntryResolver::new(&index);

		assert_eq!(resolver.resolve_entry(&entry("b.x()V"), ResolutionStrategy::Closest), set(&["b.x()V"]));
		assert_eq!(resolver.resolve_entry(&entry("c.x()V"), ResolutionStrategy::Closest), set(&["b.x()V", "j.x()V"]));
		assert_eq!(resolver.resolve_entry(&entry("d.x()V"), ResolutionStrategy::Closest), set(&["a.x()V"]));
		Ok(())
	}

	#[test]
	fn private_static_and_fields_resolve_to_themselves() -> Result<()> {
		let index = index()?;
		let resolver = IndexEntryResolver::new(&index);

		assert_eq!(resolver.resolve_entry(&entry("b.p()V"), ResolutionStrategy::Root), set(&["b.p()V"]));
		assert_eq!(resolver.resolve_entry(&entry("d.s()V"), ResolutionStrategy::Root), set(&["d.s()V"]));
		assert_eq!(resolver.resolve_entry(&entry("a.f:I"), ResolutionStrategy::Root), set(&["a.f:I"]));
		assert_eq!(resolver.resolve_entry(&entry("c.f:I"), ResolutionStrategy::Root), set(&["a.f:I"]));
		assert_eq!(resolver.resolve_entry(&entry("a"), ResolutionStrategy::Root), set(&["a"]));
		Ok(())
	}

	#[test]
	fn gaps_resolve_to_nothing() -> Result<()> {
		let index = index()?;
		let resolver = IndexEntryResolver::new(&index);

		assert!(resolver.resolve_entry(&entry("x"), ResolutionStrategy::Root).is_empty());
		assert!(resolver.resolve_entry(&entry("x.m()V"), ResolutionStrategy::Root).is_empty());
		assert!(resolver.resolve_entry(&entry("a.missing()V"), ResolutionStrategy::Root).is_empty());
		assert!(resolver.resolve_entry(&entry("a.missing:I"), ResolutionStrategy::Root).is_empty());
		assert!(resolver.resolve_entry(&entry("x.m()V#1"), ResolutionStrategy::Root).is_empty());
		assert!(resolver.resolve_entry(&entry("a.equals(Ljava/lang/Object;)Z"), ResolutionStrategy::Root).is_empty());
		Ok(())
	}

	#[test]
	fn first_entry() -> Result<()> {
		let index = index()?;
		let resolver = IndexEntryResolver::new(&index);

		assert_eq!(resolver.resolve_first_entry(&entry("c.x()V"), ResolutionStrategy::Root), Some(entry("i.x()V")));
		assert_eq!(resolver.resolve_first_entry(&entry("x"), ResolutionStrategy::Root), None);
		Ok(())
	}

	#[test]
	fn equivalent_methods() -> Result<()> {
		let index = index()?;
		let resolver = IndexEntryResolver::new(&index);

		// set equality, the order doesn't matter
		let group = set(&["i.x()V", "j.x()V", "a.x()V", "b.x()V"]);
		for member in &group {
			assert_eq!(resolver.resolve_equivalent_entries(member), group, "{member}");
		}

		assert_eq!(resolver.resolve_equivalent_entries(&entry("b.p()V")), set(&["b.p()V"]));
		assert_eq!(resolver.resolve_equivalent_entries(&entry("b.s()V")), set(&["b.s()V"]));

		assert_eq!(
			resolver.resolve_equivalent_entries(&entry("b.x()V#1")),
			set(&["a.x()V#1", "b.x()V#1", "i.x()V#1", "j.x()V#1"]),
		);
		Ok(())
	}
}
