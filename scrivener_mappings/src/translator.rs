use anyhow::{anyhow, Context, Result};
use log::warn;
use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
use scrivener_entry::descriptor::{remap_signature, MethodDescriptor, TypeDescriptor};
use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodEntry};
use crate::mapping::{EntryMapping, TokenType};
use crate::resolver::{EntryResolver, ResolutionStrategy};
use crate::tree::EntryTree;

/// A translated value, together with where its name came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateResult<T> {
	pub value: T,
	pub token_type: TokenType,
}

impl<T> TranslateResult<T> {
	pub fn new(value: T, token_type: TokenType) -> TranslateResult<T> {
		TranslateResult { value, token_type }
	}

	pub fn obfuscated(value: T) -> TranslateResult<T> {
		TranslateResult::new(value, TokenType::Obfuscated)
	}

	pub fn is_obfuscated(&self) -> bool {
		self.token_type.is_obfuscated()
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TranslateResult<U> {
		TranslateResult { value: f(self.value), token_type: self.token_type }
	}
}

/// Turns obfuscated entries into named ones.
///
/// Implementors only need to provide [`Translator::translate_entry`], descriptors, signatures and definitions are
/// translated by replacing the class names in them.
pub trait Translator {
	fn translate_entry(&self, entry: &Entry) -> TranslateResult<Entry>;

	fn translate(&self, entry: &Entry) -> Entry {
		self.translate_entry(entry).value
	}

	/// Translates an internal class name, like `a/b/C$D` or `[La;`.
	fn translate_class_name(&self, name: &str) -> String {
		match self.translate_entry(&ClassEntry::new(name).into()).value {
			Entry::Class(class) => class.full_name(),
			_ => name.to_owned(),
		}
	}

	fn translate_type(&self, desc: &TypeDescriptor) -> TypeDescriptor {
		desc.remap(&mut |name| self.translate_class_name(name))
	}

	fn translate_method_desc(&self, desc: &MethodDescriptor) -> MethodDescriptor {
		desc.remap(&mut |name| self.translate_class_name(name))
	}

	fn translate_signature(&self, signature: &str) -> Result<String> {
		remap_signature(signature, &mut |name| self.translate_class_name(name))
	}

	fn translate_class_def(&self, def: &ClassDef) -> Result<ClassDef> {
		let translate_class = |class: &ClassEntry| ClassEntry::new(self.translate_class_name(&class.full_name()));

		let entry = match self.translate_entry(&def.entry.clone().into()).value {
			Entry::Class(class) => class,
			_ => def.entry.clone(),
		};
		let signature = def.signature.as_deref()
			.map(|signature| self.translate_signature(signature))
			.transpose()
			.with_context(|| anyhow!("failed to translate signature of class {}", def.entry))?;

		Ok(ClassDef {
			entry,
			access: def.access,
			signature,
			super_class: def.super_class.as_ref().map(translate_class),
			interfaces: def.interfaces.iter().map(translate_class).collect(),
		})
	}

	fn translate_method_def(&self, def: &MethodDef) -> Result<MethodDef> {
		let entry = match self.translate_entry(&def.entry.clone().into()).value {
			Entry::Method(method) => method,
			_ => def.entry.clone(),
		};
		let signature = def.signature.as_deref()
			.map(|signature| self.translate_signature(signature))
			.transpose()
			.with_context(|| anyhow!("failed to translate signature of method {}", def.entry))?;
		Ok(MethodDef { entry, access: def.access, signature })
	}

	fn translate_field_def(&self, def: &FieldDef) -> Result<FieldDef> {
		let entry = match self.translate_entry(&def.entry.clone().into()).value {
			Entry::Field(field) => field,
			_ => def.entry.clone(),
		};
		let signature = def.signature.as_deref()
			.map(|signature| self.translate_signature(signature))
			.transpose()
			.with_context(|| anyhow!("failed to translate signature of field {}", def.entry))?;
		Ok(FieldDef { entry, access: def.access, signature })
	}
}

/// Leaves everything as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidTranslator;

impl Translator for VoidTranslator {
	fn translate_entry(&self, entry: &Entry) -> TranslateResult<Entry> {
		TranslateResult::obfuscated(entry.clone())
	}

	fn translate_class_name(&self, name: &str) -> String {
		name.to_owned()
	}
}

/// The first non-default mapping of the roots of `entry`, not counting `entry` itself.
fn inherited_mapping<'m>(mappings: &'m EntryTree<EntryMapping>, resolver: &impl EntryResolver, entry: &Entry) -> Option<&'m EntryMapping> {
	let roots = resolver.resolve_entry(entry, ResolutionStrategy::Root);
	let mut candidates = roots.iter()
		.filter(|root| *root != entry)
		.filter_map(|root| mappings.get(root))
		.filter(|mapping| !mapping.is_default());

	let first = candidates.next()?;
	if candidates.any(|other| other.target_name() != first.target_name()) {
		warn!("{entry} has roots with different names, using the first one: {:?}", first.target_name());
	}
	Some(first)
}

/// Looks up the mapping an entry effectively has.
///
/// An entry can have an explicit mapping of its own, for example an override with a name different from the method
/// it overrides. Entries that aren't declared themselves (like bridges, or a method only inherited by a class) use
/// the one of the closest declaration. Whatever that doesn't set (name or javadoc) comes from the mapping of the roots.
pub fn lookup_mapping(mappings: &EntryTree<EntryMapping>, resolver: &impl EntryResolver, entry: &Entry) -> EntryMapping {
	let own = mappings.get(entry).or_else(|| {
		resolver.resolve_entry(entry, ResolutionStrategy::Closest).iter()
			.filter(|closest| *closest != entry)
			.find_map(|closest| mappings.get(closest))
	});
	let inherited = inherited_mapping(mappings, resolver, entry);

	match (own, inherited) {
		(Some(own), Some(inherited)) => own.merge(inherited),
		(Some(own), None) => own.clone(),
		(None, Some(inherited)) => inherited.clone(),
		(None, None) => EntryMapping::DEFAULT,
	}
}

/// The part of `mapping` that isn't already inherited from the roots of `entry`, to be stored on `entry` itself.
pub(crate) fn strip_inherited(mappings: &EntryTree<EntryMapping>, resolver: &impl EntryResolver, entry: &Entry, mapping: EntryMapping) -> EntryMapping {
	let Some(inherited) = inherited_mapping(mappings, resolver, entry) else {
		return mapping;
	};

	let mapping = if mapping.target_name() == inherited.target_name() {
		mapping.with_name(None)
	} else {
		mapping
	};
	if mapping.javadoc() == inherited.javadoc() {
		mapping.with_javadoc(None)
	} else {
		mapping
	}
}

/// Translates entries using a mapping tree.
///
/// Parents are translated first. Methods and fields take the name of their roots, unless they have an explicit name
/// of their own.
#[derive(Debug, Clone, Copy)]
pub struct MappingTranslator<'a, R> {
	mappings: &'a EntryTree<EntryMapping>,
	resolver: R,
}

impl<'a, R: EntryResolver> MappingTranslator<'a, R> {
	pub fn new(mappings: &'a EntryTree<EntryMapping>, resolver: R) -> MappingTranslator<'a, R> {
		MappingTranslator { mappings, resolver }
	}

	pub fn mapping(&self, entry: &Entry) -> EntryMapping {
		lookup_mapping(self.mappings, &self.resolver, entry)
	}

	pub fn translate_class(&self, class: &ClassEntry) -> TranslateResult<ClassEntry> {
		if class.is_array() {
			// only the element type has a name
			return match class.full_name().parse::<TypeDescriptor>() {
				Ok(desc) => TranslateResult::obfuscated(ClassEntry::new(self.translate_type(&desc).to_string())),
				Err(_) => TranslateResult::obfuscated(class.clone()),
			};
		}

		let parent = class.parent().map(|parent| self.translate_class(parent).value);
		let mapping = self.mapping(&class.clone().into());

		let translated = class.with_parent(parent)
			.with_name(mapping.target_name().unwrap_or(class.name()))
			.with_javadoc(mapping.javadoc().map(str::to_owned));
		TranslateResult::new(translated, mapping.token_type())
	}

	pub fn translate_method(&self, method: &MethodEntry) -> TranslateResult<MethodEntry> {
		let parent = self.translate_class(method.parent()).value;
		let desc = self.translate_method_desc(method.desc());
		let mapping = self.mapping(&method.clone().into());

		let translated = MethodEntry::new(parent, mapping.target_name().unwrap_or(method.name()), desc)
			.with_javadoc(mapping.javadoc().map(str::to_owned));
		TranslateResult::new(translated, mapping.token_type())
	}

	pub fn translate_field(&self, field: &FieldEntry) -> TranslateResult<FieldEntry> {
		let parent = self.translate_class(field.parent()).value;
		let desc = self.translate_type(field.desc());
		let mapping = self.mapping(&field.clone().into());

		let translated = FieldEntry::new(parent, mapping.target_name().unwrap_or(field.name()), desc)
			.with_javadoc(mapping.javadoc().map(str::to_owned));
		TranslateResult::new(translated, mapping.token_type())
	}

	pub fn translate_local(&self, local: &LocalVariableEntry) -> TranslateResult<LocalVariableEntry> {
		let parent = self.translate_method(local.parent()).value;
		let mapping = self.mapping(&local.clone().into());

		let translated = local.with_parent(parent)
			.with_name(mapping.target_name().unwrap_or(local.name()))
			.with_javadoc(mapping.javadoc().map(str::to_owned));
		TranslateResult::new(translated, mapping.token_type())
	}
}

impl<R: EntryResolver> Translator for MappingTranslator<'_, R> {
	fn translate_entry(&self, entry: &Entry) -> TranslateResult<Entry> {
		match entry {
			Entry::Class(class) => self.translate_class(class).map(Entry::Class),
			Entry::Method(method) => self.translate_method(method).map(Entry::Method),
			Entry::Field(field) => self.translate_field(field).map(Entry::Field),
			Entry::LocalVariable(local) => self.translate_local(local).map(Entry::LocalVariable),
		}
	}

	fn translate_class_name(&self, name: &str) -> String {
		self.translate_class(&ClassEntry::new(name)).value.full_name()
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use scrivener_entry::def::ClassDef;
	use scrivener_entry::access::AccessFlags;
	use scrivener_entry::entry::{ClassEntry, Entry};
	use crate::mapping::{EntryMapping, TokenType};
	use crate::resolver::VoidEntryResolver;
	use crate::translator::{MappingTranslator, Translator, VoidTranslator};
	use crate::tree::EntryTree;

	fn entry(s: &str) -> Entry {
		s.parse().unwrap()
	}

	fn mappings() -> EntryTree<EntryMapping> {
		[
			(entry("a"), EntryMapping::deobfuscated("com/example/Outer")),
			(entry("a$b"), EntryMapping::deobfuscated("Inner").with_javadoc(Some("An inner class.".to_owned()))),
			(entry("c"), EntryMapping::deobfuscated("com/example/Other")),
			(entry("a$b.m(Lc;)La;"), EntryMapping::deobfuscated("convert")),
			(entry("a$b.f:[Lc;"), EntryMapping::deobfuscated("others")),
			(entry("a$b.m(Lc;)La;#1"), EntryMapping::deobfuscated("other")),
		].into_iter().collect()
	}

	#[test]
	fn parents_first() {
		let mappings = mappings();
		let translator = MappingTranslator::new(&mappings, VoidEntryResolver);

		let class = translator.translate_entry(&entry("a$b"));
		assert_eq!(class.value.to_string(), "com/example/Outer$Inner");
		assert_eq!(class.value.javadoc(), Some("An inner class."));
		assert_eq!(class.token_type, TokenType::Deobfuscated);

		assert_eq!(translator.translate(&entry("a$b.m(Lc;)La;")).to_string(), "com/example/Outer$Inner.convert(Lcom/example/Other;)Lcom/example/Outer;");
		assert_eq!(translator.translate(&entry("a$b.f:[Lc;")).to_string(), "com/example/Outer$Inner.others:[Lcom/example/Other;");

		let local = translator.translate(&entry("a$b.m(Lc;)La;#1"));
		assert_eq!(local.name(), "other");
	}

	#[test]
	fn unmapped_stays_obfuscated() {
		let mappings = mappings();
		let translator = MappingTranslator::new(&mappings, VoidEntryResolver);

		let result = translator.translate_entry(&entry("a.x()V"));
		assert!(result.is_obfuscated());
		assert_eq!(result.value.to_string(), "com/example/Outer.x()V");

		// idempotent on the same input
		assert_eq!(translator.translate_entry(&entry("a$b.m(Lc;)La;")), translator.translate_entry(&entry("a$b.m(Lc;)La;")));
	}

	#[test]
	fn arrays_translate_the_element() {
		let mappings = mappings();
		let translator = MappingTranslator::new(&mappings, VoidEntryResolver);

		assert_eq!(translator.translate_class_name("[[La$b;"), "[[Lcom/example/Outer$Inner;");
		assert_eq!(translator.translate_class_name("[I"), "[I");
	}

	#[test]
	fn class_defs() {
		let mappings = mappings();
		let translator = MappingTranslator::new(&mappings, VoidEntryResolver);

		let def = ClassDef::new(ClassEntry::new("a$b"), AccessFlags::default(), Some(ClassEntry::new("c")), vec![ClassEntry::new("a")])
			.with_signature(Some("Lc;Ljava/util/List<La;>;".to_owned()));
		let translated = translator.translate_class_def(&def).unwrap();

		assert_eq!(translated.entry.full_name(), "com/example/Outer$Inner");
		assert_eq!(translated.super_class, Some(ClassEntry::new("com/example/Other")));
		assert_eq!(translated.interfaces, vec![ClassEntry::new("com/example/Outer")]);
		assert_eq!(translated.signature.as_deref(), Some("Lcom/example/Other;Ljava/util/List<Lcom/example/Outer;>;"));

		assert_eq!(VoidTranslator.translate_class_def(&def).unwrap(), def);
	}
}
