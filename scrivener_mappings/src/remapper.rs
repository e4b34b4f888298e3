//! The single place mappings are changed.
//!
//! Every rename goes through [`Remapper::put_mapping`]: it finds the entries that have to carry the new mapping,
//! validates the name for all of them, and only then changes the tree. Changes are tracked, so they can be written
//! out incrementally with [`Remapper::take_mapping_delta`].

use std::sync::Arc;
use indexmap::IndexSet;
use log::{debug, trace};
use scrivener_entry::def::ClassDef;
use scrivener_entry::descriptor::MethodDescriptor;
use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodEntry};
use scrivener_entry::names::validate_javadoc;
use scrivener_entry::validation::{Message, ValidationContext};
use crate::change::EntryChange;
use crate::delta::{DeltaTrackingTree, MappingDelta};
use crate::index::JarIndex;
use crate::mapping::EntryMapping;
use crate::resolver::{EntryResolver, IndexEntryResolver, ResolutionStrategy};
use crate::translator::{lookup_mapping, strip_inherited, MappingTranslator, TranslateResult, Translator};
use crate::tree::EntryTree;
use crate::validator::MappingValidator;

#[derive(Debug, Clone)]
pub struct Remapper {
	index: Arc<JarIndex>,
	mappings: DeltaTrackingTree<EntryMapping>,
}

impl Remapper {
	pub fn new(index: Arc<JarIndex>, mappings: EntryTree<EntryMapping>) -> Remapper {
		Remapper { index, mappings: DeltaTrackingTree::new(mappings) }
	}

	pub fn empty(index: Arc<JarIndex>) -> Remapper {
		Remapper::new(index, EntryTree::new())
	}

	pub fn index(&self) -> &JarIndex {
		&self.index
	}

	pub fn resolver(&self) -> IndexEntryResolver<'_> {
		IndexEntryResolver::new(&self.index)
	}

	pub fn translator(&self) -> MappingTranslator<'_, IndexEntryResolver<'_>> {
		MappingTranslator::new(self.mappings.tree(), self.resolver())
	}

	/// The mapping `entry` effectively has, its own one or the one of its roots.
	///
	/// Entries without any mapping get [`EntryMapping::DEFAULT`].
	pub fn get_mapping(&self, entry: &Entry) -> EntryMapping {
		lookup_mapping(self.mappings.tree(), &self.resolver(), entry)
	}

	pub fn deobfuscate(&self, entry: &Entry) -> Entry {
		self.translator().translate(entry)
	}

	pub fn extended_deobfuscate(&self, entry: &Entry) -> TranslateResult<Entry> {
		self.translator().translate_entry(entry)
	}

	/// Runs the validation [`Remapper::put_mapping`] would, without changing anything.
	pub fn validate_put_mapping(&self, ctx: &mut ValidationContext, entry: &Entry, mapping: EntryMapping) {
		let mut planned = Vec::new();
		self.plan_put_mapping(ctx, entry, mapping, &mut planned);
	}

	/// Gives `entry` the mapping `mapping`, if the validation in `ctx` allows it.
	///
	/// On validation errors the mappings are left as they are, the problems can be read from `ctx`.
	pub fn put_mapping(&mut self, ctx: &mut ValidationContext, entry: &Entry, mapping: EntryMapping) {
		let mut planned = Vec::new();
		self.plan_put_mapping(ctx, entry, mapping, &mut planned);

		if !ctx.can_proceed() {
			debug!("not mapping {entry}, validation failed: {:?}", ctx.messages());
			return;
		}

		for (target, mapping) in planned {
			self.store(&target, mapping);
		}
	}

	/// Applies a change to the current mapping of its target.
	pub fn put_change(&mut self, ctx: &mut ValidationContext, change: &EntryChange) {
		let mapping = change.apply_to(&self.get_mapping(change.target()));
		self.put_mapping(ctx, change.target(), mapping);
	}

	/// Collects the entries to change into `planned`, raising validation problems into `ctx`.
	fn plan_put_mapping(&self, ctx: &mut ValidationContext, entry: &Entry, mapping: EntryMapping, planned: &mut Vec<(Entry, EntryMapping)>) {
		if let Entry::Field(field) = entry {
			self.plan_record_getter(ctx, field, &mapping, planned);
		}

		let old = self.get_mapping(entry);
		let renaming = old.target_name() != mapping.target_name();

		let resolver = self.resolver();
		let targets = if !renaming {
			resolver.resolve_entry(entry, ResolutionStrategy::Closest)
		} else if let Entry::Method(method) = entry {
			self.rename_targets(method)
		} else {
			resolver.resolve_entry(entry, ResolutionStrategy::Root)
		};
		trace!("mapping {entry} to {mapping:?} changes {targets:?}");

		let validator = MappingValidator::new(&self.index, self.mappings.tree(), &resolver);
		if let Some(name) = mapping.target_name().filter(|_| renaming) {
			for target in &targets {
				validator.validate_rename(ctx, target, name);
			}
		}
		if let Some(javadoc) = mapping.javadoc() {
			validate_javadoc(ctx, javadoc);
		}

		if let Entry::LocalVariable(parameter) = entry {
			if parameter.is_parameter() && old.javadoc() != mapping.javadoc() {
				self.plan_parameter_javadoc(parameter, &old, &mapping, planned);
			}
		}

		planned.extend(targets.into_iter().map(|target| (target, mapping.clone())));
	}

	/// The fields of records have a getter with the same name, that gets renamed together with the field.
	fn plan_record_getter(&self, ctx: &mut ValidationContext, field: &FieldEntry, mapping: &EntryMapping, planned: &mut Vec<(Entry, EntryMapping)>) {
		let entries = self.index.entries();
		let is_record = entries.class_def(field.parent()).is_some_and(ClassDef::is_record);
		let is_static = entries.field_access(field).is_some_and(|access| access.is_static());
		if !is_record || is_static {
			return;
		}

		let desc = MethodDescriptor { parameters: Vec::new(), return_type: Some(field.desc().clone()) };
		let getter = MethodEntry::new(field.parent().clone(), field.name(), desc);

		if entries.has_method(&getter) {
			let getter = Entry::Method(getter);
			// the getter keeps its own javadoc
			let getter_mapping = self.get_mapping(&getter).with_name(mapping.target_name().map(str::to_owned));
			self.plan_put_mapping(ctx, &getter, getter_mapping, planned);
		} else if let Some(name) = mapping.target_name() {
			ctx.raise(Message::UNKNOWN_RECORD_GETTER, [name]);
		}
	}

	/// Where a new name of `method` gets stored.
	///
	/// Usually this is the roots of the method, so that the whole group gets the name. An override that is
	/// renamed after its group already has a name (or that already has a name of its own) gets a name of its own.
	fn rename_targets(&self, method: &MethodEntry) -> IndexSet<Entry> {
		// a bridge is renamed through the method it calls
		let method = self.index.bridges().specialized_from_bridge(method).unwrap_or(method);

		let entry = Entry::Method(method.clone());
		let roots = self.resolve_all_roots(method);
		if roots.is_empty() || roots.contains(&entry) {
			return roots;
		}

		let has_name = |entry: &Entry| self.mappings.get(entry).is_some_and(|mapping| mapping.target_name().is_some());
		if has_name(&entry) || roots.iter().any(has_name) {
			IndexSet::from([entry])
		} else {
			roots
		}
	}

	/// The roots of `method`, and the roots of the method seen from any class below it that joins the hierarchy
	/// with other parents. If `c` implements the interfaces `a` and `b` which both declare `m()`, renaming `a.m()`
	/// also has to rename `b.m()`.
	fn resolve_all_roots(&self, method: &MethodEntry) -> IndexSet<Entry> {
		let inheritance = self.index.inheritance();
		let resolver = self.resolver();

		let owner = method.parent();
		let descendants = inheritance.descendants(owner);
		let mut known_parents: IndexSet<&ClassEntry> = inheritance.parents(owner).into_iter().collect();

		let mut joining = Vec::new();
		for &descendant in &descendants {
			let parents = inheritance.parents(descendant);
			if parents.len() < 2 {
				continue;
			}
			let other_parents: Vec<&ClassEntry> = parents.into_iter()
				.filter(|parent| !descendants.contains(*parent) && !known_parents.contains(*parent))
				.collect();
			if !other_parents.is_empty() {
				joining.push(descendant);
				known_parents.extend(other_parents);
			}
		}

		let mut roots = resolver.resolve_entry(&method.clone().into(), ResolutionStrategy::Root);
		for class in joining {
			roots.extend(resolver.resolve_entry(&method.with_parent(class.clone()).into(), ResolutionStrategy::Root));
		}
		roots
	}

	/// Copies the javadoc of a parameter to the same parameter of the overrides, unless they have their own.
	fn plan_parameter_javadoc(&self, parameter: &LocalVariableEntry, old: &EntryMapping, new: &EntryMapping, planned: &mut Vec<(Entry, EntryMapping)>) {
		let method = parameter.parent();
		let descendants = self.index.inheritance().descendants(method.parent());

		for other in self.resolver().resolve_equivalent_methods(method) {
			if !descendants.contains(other.parent()) {
				continue;
			}
			let other = Entry::LocalVariable(parameter.with_parent(other));
			let current = self.get_mapping(&other);
			if current.javadoc().is_none() || current.javadoc() == old.javadoc() {
				let javadoc = current.with_javadoc(new.javadoc().map(str::to_owned));
				planned.push((other, javadoc));
			}
		}
	}

	fn store(&mut self, entry: &Entry, mapping: EntryMapping) {
		let resolver = IndexEntryResolver::new(&self.index);

		// an override only stores what differs from its roots
		let roots = resolver.resolve_entry(entry, ResolutionStrategy::Root);
		let mapping = if roots.contains(entry) {
			mapping
		} else {
			strip_inherited(self.mappings.tree(), &resolver, entry, mapping)
		};

		let value = (!mapping.is_default()).then_some(mapping);
		self.mappings.insert(entry, value);
	}

	/// Takes the changes since the last call, for saving them.
	pub fn take_mapping_delta(&mut self) -> MappingDelta<EntryMapping> {
		self.mappings.take_delta()
	}

	pub fn is_dirty(&self) -> bool {
		self.mappings.is_dirty()
	}

	pub fn mappings(&self) -> &EntryTree<EntryMapping> {
		self.mappings.tree()
	}

	/// Replaces all mappings, for example after loading them again. The new mappings count as saved.
	pub fn set_mappings(&mut self, mappings: EntryTree<EntryMapping>) {
		self.mappings.set_tree(mappings);
	}

	pub fn into_mappings(self) -> EntryTree<EntryMapping> {
		self.mappings.into_tree()
	}

	/// All entries with a mapping.
	pub fn obf_entries(&self) -> Vec<&Entry> {
		self.mappings.entries().into_iter()
			.map(|(entry, _)| entry)
			.collect()
	}

	pub fn obf_children(&self, entry: &Entry) -> Vec<&Entry> {
		self.mappings.children(entry)
	}
}

#[cfg(test)]
mod testing {
	use std::sync::Arc;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use scrivener_entry::access::AccessFlags;
	use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
	use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, MethodEntry};
	use scrivener_entry::validation::{Message, ValidationContext};
	use crate::change::EntryChange;
	use crate::index::JarIndex;
	use crate::mapping::EntryMapping;
	use crate::remapper::Remapper;

	const PUBLIC: AccessFlags = AccessFlags::new(AccessFlags::PUBLIC);

	fn entry(s: &str) -> Entry {
		s.parse().unwrap()
	}

	fn remapper() -> Result<Remapper> {
		let mut builder = JarIndex::builder();
		builder.add_class(ClassDef::new(ClassEntry::new("a"), PUBLIC, Some(ClassEntry::new("java/lang/Object")), Vec::new()))?
			.add_class(ClassDef::new(ClassEntry::new("b"), PUBLIC, Some(ClassEntry::new("a")), Vec::new()))?
			.add_class(ClassDef::new(ClassEntry::new("r"), PUBLIC, Some(ClassEntry::new("java/lang/Record")), Vec::new()))?
			.add_method(MethodDef::new(MethodEntry::parse("a", "x", "()V")?, PUBLIC))?
			.add_method(MethodDef::new(MethodEntry::parse("b", "x", "()V")?, PUBLIC))?
			.add_field(FieldDef::new(FieldEntry::parse("r", "f", "I")?, AccessFlags::new(AccessFlags::PRIVATE | AccessFlags::FINAL)))?
			.add_field(FieldDef::new(FieldEntry::parse("r", "g", "J")?, AccessFlags::new(AccessFlags::PRIVATE | AccessFlags::FINAL)))?
			.add_method(MethodDef::new(MethodEntry::parse("r", "f", "()I")?, PUBLIC))?;
		Ok(Remapper::empty(Arc::new(builder.build()?)))
	}

	#[test]
	fn override_renames_the_root() -> Result<()> {
		let mut remapper = remapper()?;
		let mut ctx = ValidationContext::default();

		remapper.put_mapping(&mut ctx, &entry("b.x()V"), EntryMapping::deobfuscated("run"));
		assert!(!ctx.has_errors());

		assert_eq!(remapper.mappings().get(&entry("a.x()V")), Some(&EntryMapping::deobfuscated("run")));
		assert_eq!(remapper.mappings().get(&entry("b.x()V")), None);
		assert_eq!(remapper.get_mapping(&entry("b.x()V")).target_name(), Some("run"));
		Ok(())
	}

	#[test]
	fn javadoc_of_an_override() -> Result<()> {
		let mut remapper = remapper()?;
		let mut ctx = ValidationContext::default();

		remapper.put_mapping(&mut ctx, &entry("a.x()V"), EntryMapping::deobfuscated("run"));
		remapper.put_change(&mut ctx, &EntryChange::modify(entry("b.x()V")).with_javadoc("Runs b."));
		assert!(!ctx.has_errors());

		// only the javadoc is stored on the override
		let own = remapper.mappings().get(&entry("b.x()V")).cloned();
		assert_eq!(own, Some(EntryMapping::DEFAULT.with_javadoc(Some("Runs b.".to_owned()))));

		let translated = remapper.extended_deobfuscate(&entry("b.x()V"));
		assert_eq!(translated.value.name(), "run");
		assert_eq!(translated.value.javadoc(), Some("Runs b."));
		assert_eq!(remapper.get_mapping(&entry("a.x()V")).javadoc(), None);
		Ok(())
	}

	#[test]
	fn record_getters() -> Result<()> {
		let mut remapper = remapper()?;
		let mut ctx = ValidationContext::default();

		remapper.put_mapping(&mut ctx, &entry("r.f:I"), EntryMapping::deobfuscated("size").with_javadoc(Some("The size.".to_owned())));
		assert!(!ctx.has_errors());
		assert_eq!(remapper.get_mapping(&entry("r.f()I")), EntryMapping::deobfuscated("size"));
		assert_eq!(remapper.get_mapping(&entry("r.f:I")).javadoc(), Some("The size."));

		let mut ctx = ValidationContext::default();
		remapper.put_mapping(&mut ctx, &entry("r.g:J"), EntryMapping::deobfuscated("time"));
		assert!(ctx.contains(Message::UNKNOWN_RECORD_GETTER));
		assert_eq!(remapper.get_mapping(&entry("r.g:J")), EntryMapping::DEFAULT);
		Ok(())
	}

	#[test]
	fn illegal_javadoc() -> Result<()> {
		let mut remapper = remapper()?;
		let mut ctx = ValidationContext::default();

		remapper.put_mapping(&mut ctx, &entry("a"), EntryMapping::DEFAULT.with_javadoc(Some("ends */ early".to_owned())));
		assert!(ctx.contains(Message::ILLEGAL_DOC_COMMENT_END));
		assert!(!remapper.is_dirty());
		Ok(())
	}

	#[test]
	fn unknown_entries_are_ignored() -> Result<()> {
		let mut remapper = remapper()?;
		let mut ctx = ValidationContext::default();

		remapper.put_mapping(&mut ctx, &entry("zz.y()V"), EntryMapping::deobfuscated("nothing"));
		assert!(!ctx.has_errors());
		assert!(!remapper.is_dirty());
		assert!(remapper.obf_entries().is_empty());
		Ok(())
	}

	#[test]
	fn replacing_the_mappings() -> Result<()> {
		let mut remapper = remapper()?;
		let mut ctx = ValidationContext::default();

		remapper.put_mapping(&mut ctx, &entry("a"), EntryMapping::deobfuscated("Base"));
		assert!(remapper.is_dirty());

		remapper.set_mappings([(entry("b"), EntryMapping::deobfuscated("Sub"))].into_iter().collect());
		assert!(!remapper.is_dirty());
		assert_eq!(remapper.get_mapping(&entry("a")), EntryMapping::DEFAULT);
		assert_eq!(remapper.deobfuscate(&entry("b")).to_string(), "Sub");
		assert_eq!(remapper.obf_entries(), vec![&entry("b")]);
		Ok(())
	}
}
