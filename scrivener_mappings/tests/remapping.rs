use std::sync::Arc;
use anyhow::Result;
use pretty_assertions::assert_eq;
use scrivener_entry::access::AccessFlags;
use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, MethodEntry};
use scrivener_entry::validation::{Message, ValidationContext};
use scrivener_mappings::change::EntryChange;
use scrivener_mappings::delta::ChangeKind;
use scrivener_mappings::index::JarIndex;
use scrivener_mappings::mapping::{EntryMapping, TokenType};
use scrivener_mappings::remapper::Remapper;
use scrivener_mappings::resolver::EntryResolver;

const PUBLIC: AccessFlags = AccessFlags::new(AccessFlags::PUBLIC);
const INTERFACE: AccessFlags = AccessFlags::new(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT);
const ABSTRACT: AccessFlags = AccessFlags::new(AccessFlags::PUBLIC | AccessFlags::ABSTRACT);
const BRIDGE: AccessFlags = AccessFlags::new(AccessFlags::PUBLIC | AccessFlags::SYNTHETIC | AccessFlags::BRIDGE);

fn entry(s: &str) -> Entry {
	s.parse().unwrap()
}

fn class(name: &str, super_class: &str, interfaces: &[&str]) -> ClassDef {
	let access = if name.starts_with('i') || name.starts_with('j') { INTERFACE } else { PUBLIC };
	ClassDef::new(
		ClassEntry::new(name),
		access,
		Some(ClassEntry::new(super_class)),
		interfaces.iter().copied().map(ClassEntry::new).collect(),
	)
}

/// ```text
/// class a { x(), m(int), f, g }
/// class b extends a { x(), m(int) }
/// interface i { run() }    interface j { run() }
/// class c implements i, j { run() }
/// abstract class g { Object get() }
/// class s extends g { String get(), bridge Object get() }
/// ```
fn index() -> Result<JarIndex> {
	let object = ClassEntry::JAVA_LANG_OBJECT;

	let mut builder = JarIndex::builder();
	builder
		.add_class(class("a", object, &[]))?
		.add_class(class("b", "a", &[]))?
		.add_class(class("i", object, &[]))?
		.add_class(class("j", object, &[]))?
		.add_class(class("c", object, &["i", "j"]))?
		.add_class(class("g", object, &[]))?
		.add_class(class("s", "g", &[]))?;

	builder
		.add_method(MethodDef::new(MethodEntry::parse("a", "x", "()V")?, PUBLIC))?
		.add_method(MethodDef::new(MethodEntry::parse("a", "m", "(I)V")?, PUBLIC))?
		.add_field(FieldDef::new(FieldEntry::parse("a", "f", "I")?, PUBLIC))?
		.add_field(FieldDef::new(FieldEntry::parse("a", "g", "I")?, PUBLIC))?
		.add_method(MethodDef::new(MethodEntry::parse("b", "x", "()V")?, PUBLIC))?
		.add_method(MethodDef::new(MethodEntry::parse("b", "m", "(I)V")?, PUBLIC))?
		.add_method(MethodDef::new(MethodEntry::parse("i", "run", "()V")?, ABSTRACT))?
		.add_method(MethodDef::new(MethodEntry::parse("j", "run", "()V")?, ABSTRACT))?
		.add_method(MethodDef::new(MethodEntry::parse("c", "run", "()V")?, PUBLIC))?
		.add_method(MethodDef::new(MethodEntry::parse("g", "get", "()Ljava/lang/Object;")?, ABSTRACT))?
		.add_method(MethodDef::new(MethodEntry::parse("s", "get", "()Ljava/lang/String;")?, PUBLIC))?
		.add_method(MethodDef::new(MethodEntry::parse("s", "get", "()Ljava/lang/Object;")?, BRIDGE))?;

	builder.add_method_reference(
		MethodEntry::parse("s", "get", "()Ljava/lang/Object;")?,
		MethodEntry::parse("s", "get", "()Ljava/lang/String;")?,
	);

	builder.build()
}

fn remapper() -> Result<Remapper> {
	Ok(Remapper::empty(Arc::new(index()?)))
}

fn rename(remapper: &mut Remapper, target: &str, name: &str) -> ValidationContext {
	let mut ctx = ValidationContext::default();
	remapper.put_change(&mut ctx, &EntryChange::modify(entry(target)).with_deobf_name(name));
	ctx
}

#[test]
fn overrides_share_the_name() -> Result<()> {
	let mut remapper = remapper()?;

	let ctx = rename(&mut remapper, "a.x()V", "getName");
	assert!(!ctx.has_errors());

	let translated = remapper.extended_deobfuscate(&entry("b.x()V"));
	assert_eq!(translated.value.name(), "getName");
	assert_eq!(translated.token_type, TokenType::Deobfuscated);
	assert!(!remapper.index().bridges().is_bridge_method(&MethodEntry::parse("b", "x", "()V")?));
	Ok(())
}

#[test]
fn overrides_may_diverge() -> Result<()> {
	let mut remapper = remapper()?;

	assert!(!rename(&mut remapper, "a.x()V", "getName").has_errors());
	assert!(!rename(&mut remapper, "b.x()V", "getLabel").has_errors());

	assert_eq!(remapper.deobfuscate(&entry("b.x()V")).name(), "getLabel");
	assert_eq!(remapper.deobfuscate(&entry("a.x()V")).name(), "getName");
	assert_eq!(remapper.get_mapping(&entry("a.x()V")), EntryMapping::deobfuscated("getName"));

	// renaming the root again keeps the override as it is
	assert!(!rename(&mut remapper, "a.x()V", "getTitle").has_errors());
	assert_eq!(remapper.deobfuscate(&entry("b.x()V")).name(), "getLabel");

	// without its own name, the override follows the root again
	let mut ctx = ValidationContext::default();
	remapper.put_change(&mut ctx, &EntryChange::modify(entry("b.x()V")).clear_deobf_name());
	assert_eq!(remapper.mappings().get(&entry("b.x()V")), None);
	assert_eq!(remapper.deobfuscate(&entry("b.x()V")).name(), "getTitle");
	Ok(())
}

#[test]
fn interfaces_joined_by_a_class_are_renamed_together() -> Result<()> {
	let mut remapper = remapper()?;

	assert!(!rename(&mut remapper, "i.run()V", "execute").has_errors());

	assert_eq!(remapper.deobfuscate(&entry("j.run()V")).name(), "execute");
	assert_eq!(remapper.deobfuscate(&entry("c.run()V")).name(), "execute");
	assert_eq!(remapper.mappings().get(&entry("i.run()V")), Some(&EntryMapping::deobfuscated("execute")));
	assert_eq!(remapper.mappings().get(&entry("j.run()V")), Some(&EntryMapping::deobfuscated("execute")));
	Ok(())
}

#[test]
fn bridges_follow_their_specialized_method() -> Result<()> {
	let mut remapper = remapper()?;
	let bridge = entry("s.get()Ljava/lang/Object;");
	let specialized = entry("s.get()Ljava/lang/String;");

	let group = remapper.resolver().resolve_equivalent_entries(&entry("g.get()Ljava/lang/Object;"));
	assert!(group.contains(&specialized));
	assert!(!group.contains(&bridge));

	assert!(!rename(&mut remapper, "s.get()Ljava/lang/String;", "getValue").has_errors());
	assert_eq!(remapper.deobfuscate(&bridge).name(), "getValue");
	assert_eq!(remapper.deobfuscate(&specialized).name(), "getValue");

	// renaming the bridge renames the group, it never gets a name of its own
	assert!(!rename(&mut remapper, "s.get()Ljava/lang/Object;", "value").has_errors());
	assert_eq!(remapper.mappings().get(&bridge), None);
	assert_eq!(remapper.deobfuscate(&bridge).name(), remapper.deobfuscate(&specialized).name());
	Ok(())
}

#[test]
fn conflicting_field_names_are_rejected() -> Result<()> {
	let mut remapper = remapper()?;
	let before = remapper.mappings().clone();

	let ctx = rename(&mut remapper, "a.f:I", "g");
	assert!(ctx.contains(Message::NON_UNIQUE_NAME_CLASS));
	assert_eq!(remapper.mappings(), &before);
	assert!(!remapper.is_dirty());

	assert!(!rename(&mut remapper, "a.g:I", "count").has_errors());
	let ctx = rename(&mut remapper, "a.f:I", "count");
	assert!(ctx.has_errors());
	assert_eq!(remapper.get_mapping(&entry("a.f:I")), EntryMapping::DEFAULT);
	Ok(())
}

#[test]
fn deltas() -> Result<()> {
	let mut remapper = remapper()?;

	// five calls, three entries
	rename(&mut remapper, "a", "Animal");
	rename(&mut remapper, "a.f:I", "legs");
	rename(&mut remapper, "a.f:I", "paws");
	rename(&mut remapper, "b", "Dog");
	rename(&mut remapper, "b", "Cat");
	assert!(remapper.is_dirty());

	let delta = remapper.take_mapping_delta();
	assert_eq!(delta.len(), 3);
	assert!(delta.iter().all(|(_, change)| change.kind() == ChangeKind::Insert));
	assert!(!remapper.is_dirty());
	assert!(remapper.take_mapping_delta().is_empty());

	// putting the current mapping again changes nothing
	let current = remapper.get_mapping(&entry("a.f:I"));
	let mut ctx = ValidationContext::default();
	remapper.put_mapping(&mut ctx, &entry("a.f:I"), current);
	assert!(remapper.take_mapping_delta().is_empty());

	// neither does an override getting the name it already inherits
	rename(&mut remapper, "a.x()V", "getName");
	remapper.take_mapping_delta();
	let inherited = remapper.get_mapping(&entry("b.x()V"));
	remapper.put_mapping(&mut ctx, &entry("b.x()V"), inherited);
	assert!(remapper.take_mapping_delta().is_empty());
	Ok(())
}

#[test]
fn translating_twice_gives_the_same() -> Result<()> {
	let mut remapper = remapper()?;
	rename(&mut remapper, "a", "net/example/Animal");
	rename(&mut remapper, "a.m(I)V", "feed");

	let first = remapper.extended_deobfuscate(&entry("b.m(I)V"));
	let second = remapper.extended_deobfuscate(&entry("b.m(I)V"));
	assert_eq!(first, second);
	assert_eq!(first.value.to_string(), "b.feed(I)V");
	assert_eq!(remapper.deobfuscate(&entry("a.f:I")).to_string(), "net/example/Animal.f:I");
	Ok(())
}

#[test]
fn parameter_javadoc_reaches_overrides() -> Result<()> {
	let mut remapper = remapper()?;
	let mut ctx = ValidationContext::default();

	remapper.put_change(&mut ctx, &EntryChange::modify(entry("a.m(I)V#1")).with_javadoc("The amount."));
	assert!(!ctx.has_errors());
	assert_eq!(remapper.get_mapping(&entry("b.m(I)V#1")).javadoc(), Some("The amount."));

	remapper.put_change(&mut ctx, &EntryChange::modify(entry("b.m(I)V#1")).with_javadoc("Ignored."));
	remapper.put_change(&mut ctx, &EntryChange::modify(entry("a.m(I)V#1")).with_javadoc("The new amount."));
	assert_eq!(remapper.get_mapping(&entry("a.m(I)V#1")).javadoc(), Some("The new amount."));
	assert_eq!(remapper.get_mapping(&entry("b.m(I)V#1")).javadoc(), Some("Ignored."));
	Ok(())
}

#[test]
fn validation_only() -> Result<()> {
	let remapper = remapper()?;
	let mut ctx = ValidationContext::default();

	remapper.validate_put_mapping(&mut ctx, &entry("a.f:I"), EntryMapping::deobfuscated("class"));
	assert!(ctx.contains(Message::RESERVED_IDENTIFIER));
	assert!(!remapper.is_dirty());
	Ok(())
}
