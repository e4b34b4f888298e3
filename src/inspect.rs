use anyhow::{anyhow, Context, Result};
use scrivener_entry::entry::Entry;
use scrivener_mappings::package::PackageTree;
use scrivener_mappings::remapper::Remapper;

/// Translates each of the given entries, one line each.
pub(crate) fn translate(remapper: &Remapper, entries: &[String]) -> Result<Vec<String>> {
	entries.iter()
		.map(|s| {
			let entry: Entry = s.parse()
				.with_context(|| anyhow!("invalid entry {s:?}"))?;
			let translated = remapper.extended_deobfuscate(&entry);
			let state = if translated.token_type.is_obfuscated() { " (obfuscated)" } else { "" };
			Ok(format!("{entry} -> {}{state}", translated.value))
		})
		.collect()
}

/// The packages and their classes with their deobfuscated names, indented by depth.
pub(crate) fn packages(remapper: &Remapper) -> Vec<String> {
	let classes = remapper.index().entries().classes()
		.map(|def| remapper.deobfuscate(&Entry::Class(def.entry.clone())))
		.filter_map(|entry| match entry {
			Entry::Class(class) => Some(class),
			_ => None,
		});
	let tree = PackageTree::new(classes);

	let mut lines = Vec::new();
	list_package(&tree, None, 0, &mut lines);
	lines
}

fn list_package(tree: &PackageTree, package: Option<&str>, depth: usize, lines: &mut Vec<String>) {
	let indent = "  ".repeat(depth);
	for subpackage in tree.subpackages(package) {
		let name = subpackage.rsplit('/').next().unwrap_or(&subpackage);
		lines.push(format!("{indent}{name}/"));
		list_package(tree, Some(&subpackage), depth + 1, lines);
	}
	for class in tree.classes_in(package) {
		lines.push(format!("{indent}{}", class.simple_name()));
	}
}

#[cfg(test)]
mod testing {
	use std::sync::Arc;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use scrivener_entry::access::AccessFlags;
	use scrivener_entry::def::{ClassDef, FieldDef};
	use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry};
	use scrivener_mappings::index::JarIndex;
	use scrivener_mappings::mapping::EntryMapping;
	use scrivener_mappings::remapper::Remapper;
	use crate::inspect::{packages, translate};

	fn remapper() -> Result<Remapper> {
		let public = AccessFlags::new(AccessFlags::PUBLIC);
		let object = Some(ClassEntry::new(ClassEntry::JAVA_LANG_OBJECT));

		let mut builder = JarIndex::builder();
		builder
			.add_class(ClassDef::new(ClassEntry::new("a"), public, object.clone(), Vec::new()))?
			.add_class(ClassDef::new(ClassEntry::new("b"), public, object.clone(), Vec::new()))?
			.add_class(ClassDef::new(ClassEntry::new("a$c"), public, object, Vec::new()))?
			.add_field(FieldDef::new(FieldEntry::parse("a", "f", "I")?, public))?;

		let mappings = [
			(Entry::from(ClassEntry::new("a")), EntryMapping::deobfuscated("net/example/Animal")),
			("a.f:I".parse()?, EntryMapping::deobfuscated("legs")),
		].into_iter().collect();
		Ok(Remapper::new(Arc::new(builder.build()?), mappings))
	}

	#[test]
	fn translating() -> Result<()> {
		let remapper = remapper()?;
		let lines = translate(&remapper, &["a.f:I".to_owned(), "b".to_owned()])?;
		assert_eq!(lines, vec![
			"a.f:I -> net/example/Animal.legs:I".to_owned(),
			"b -> b (obfuscated)".to_owned(),
		]);

		assert!(translate(&remapper, &["a.".to_owned()]).is_err());
		Ok(())
	}

	#[test]
	fn listing_packages() -> Result<()> {
		assert_eq!(packages(&remapper()?), vec![
			"net/".to_owned(),
			"  example/".to_owned(),
			"    Animal".to_owned(),
			"b".to_owned(),
		]);
		Ok(())
	}
}
