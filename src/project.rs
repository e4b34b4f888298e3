//! The project file, describing the program whose mappings are edited.
//!
//! Reading class files is the job of an external indexer. It writes what it found into the project file, together
//! with where the mappings are kept:
//! ```json
//! {
//!   "jar": "program.jar",
//!   "mappings": "mappings.json",
//!   "classes": [
//!     {
//!       "name": "a", "access": 33, "super": "java/lang/Object", "interfaces": [],
//!       "fields": [{ "name": "f", "desc": "I", "access": 2 }],
//!       "methods": [{ "name": "x", "desc": "()V", "access": 1 }]
//!     }
//!   ],
//!   "method_references": [{ "caller": "s.get()Ljava/lang/Object;", "callee": "s.get()Ljava/lang/String;" }]
//! }
//! ```
//! Paths are relative to the project file.

use std::path::{Path, PathBuf};
use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use scrivener_entry::access::AccessFlags;
use scrivener_entry::def::{ClassDef, FieldDef, MethodDef};
use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, MethodEntry};
use scrivener_mappings::index::JarIndex;
use scrivener_mappings::mapping::EntryMapping;
use scrivener_mappings::tree::EntryTree;
use scrivener_sync::Checksum;
use crate::jar::{checksum_of_bytes, Jar};
use crate::snapshot;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct ProjectFile {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	jar: Option<PathBuf>,
	mappings: PathBuf,
	#[serde(default)]
	classes: Vec<ClassInfo>,
	#[serde(default)]
	method_references: Vec<MethodReference>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct ClassInfo {
	name: String,
	access: u16,
	#[serde(rename = "super", default, skip_serializing_if = "Option::is_none")]
	super_class: Option<String>,
	#[serde(default)]
	interfaces: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	signature: Option<String>,
	#[serde(default)]
	fields: Vec<MemberInfo>,
	#[serde(default)]
	methods: Vec<MemberInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct MemberInfo {
	name: String,
	desc: String,
	access: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct MethodReference {
	caller: String,
	callee: String,
}

fn parse_method(s: &str) -> Result<MethodEntry> {
	match s.parse()? {
		Entry::Method(method) => Ok(method),
		other => bail!("expected a method, got {other}"),
	}
}

/// A loaded project file.
#[derive(Debug, Clone)]
pub(crate) struct Project {
	dir: PathBuf,
	bytes: Vec<u8>,
	file: ProjectFile,
}

impl Project {
	pub(crate) fn read(path: &Path) -> Result<Project> {
		let bytes = std::fs::read(path)
			.with_context(|| anyhow!("failed to read project file {path:?}"))?;
		let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
		Project::from_bytes(dir, bytes)
			.with_context(|| anyhow!("failed to parse project file {path:?}"))
	}

	fn from_bytes(dir: PathBuf, bytes: Vec<u8>) -> Result<Project> {
		let file = serde_json::from_slice(&bytes)?;
		Ok(Project { dir, bytes, file })
	}

	pub(crate) fn mappings_path(&self) -> PathBuf {
		self.dir.join(&self.file.mappings)
	}

	pub(crate) fn jar(&self) -> Option<Jar> {
		self.file.jar.as_ref().map(|jar| Jar::new(self.dir.join(jar)))
	}

	/// The checksum of the jar, `jar` overriding the one of the project file. Without any jar, the checksum is the
	/// one of the project file itself.
	pub(crate) fn checksum(&self, jar: Option<Jar>) -> Result<Checksum> {
		match jar.or_else(|| self.jar()) {
			Some(jar) => jar.checksum(),
			None => Ok(checksum_of_bytes(&self.bytes)),
		}
	}

	pub(crate) fn index(&self) -> Result<JarIndex> {
		let mut builder = JarIndex::builder();

		for class in &self.file.classes {
			let def = ClassDef::new(
				ClassEntry::new(&class.name),
				AccessFlags::new(class.access),
				class.super_class.as_deref().map(ClassEntry::new),
				class.interfaces.iter().map(ClassEntry::new).collect(),
			).with_signature(class.signature.clone());
			builder.add_class(def)?;
		}

		for class in &self.file.classes {
			for field in &class.fields {
				let entry = FieldEntry::parse(&class.name, &field.name, &field.desc)?;
				builder.add_field(FieldDef::new(entry, AccessFlags::new(field.access)))?;
			}
			for method in &class.methods {
				let entry = MethodEntry::parse(&class.name, &method.name, &method.desc)?;
				builder.add_method(MethodDef::new(entry, AccessFlags::new(method.access)))?;
			}
		}

		for reference in &self.file.method_references {
			let caller = parse_method(&reference.caller)
				.with_context(|| anyhow!("invalid method reference caller"))?;
			let callee = parse_method(&reference.callee)
				.with_context(|| anyhow!("invalid method reference callee"))?;
			builder.add_method_reference(caller, callee);
		}

		debug!("indexed {} classes", self.file.classes.len());
		builder.build()
	}

	pub(crate) fn read_mappings(&self) -> Result<EntryTree<EntryMapping>> {
		snapshot::read(&self.mappings_path())
	}

	pub(crate) fn write_mappings(&self, mappings: &EntryTree<EntryMapping>) -> Result<()> {
		snapshot::write(&self.mappings_path(), mappings)
	}
}

#[cfg(test)]
mod testing {
	use std::path::PathBuf;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use scrivener_entry::entry::{ClassEntry, Entry, MethodEntry};
	use crate::project::Project;

	const PROJECT: &str = r#"{
		"mappings": "mappings.json",
		"classes": [
			{ "name": "g", "access": 1025, "super": "java/lang/Object",
				"methods": [{ "name": "get", "desc": "()Ljava/lang/Object;", "access": 1025 }] },
			{ "name": "s", "access": 1, "super": "g", "interfaces": ["i"],
				"fields": [{ "name": "f", "desc": "I", "access": 2 }],
				"methods": [
					{ "name": "get", "desc": "()Ljava/lang/String;", "access": 1 },
					{ "name": "get", "desc": "()Ljava/lang/Object;", "access": 4161 }
				] },
			{ "name": "i", "access": 1537, "super": "java/lang/Object" }
		],
		"method_references": [{ "caller": "s.get()Ljava/lang/Object;", "callee": "s.get()Ljava/lang/String;" }]
	}"#;

	fn project(json: &str) -> Result<Project> {
		Project::from_bytes(PathBuf::from("projects"), json.as_bytes().to_vec())
	}

	#[test]
	fn indexing() -> Result<()> {
		let project = project(PROJECT)?;
		let index = project.index()?;

		let s = ClassEntry::new("s");
		assert!(index.entries().has_class(&s));
		assert!(index.entries().has_entry(&"s.f:I".parse::<Entry>()?));
		let parents = index.inheritance().parents(&s);
		assert_eq!(parents.len(), 2);
		assert!(parents.contains(&&ClassEntry::new("g")) && parents.contains(&&ClassEntry::new("i")));
		assert!(index.bridges().is_bridge_method(&MethodEntry::parse("s", "get", "()Ljava/lang/Object;")?));

		assert_eq!(project.mappings_path(), PathBuf::from("projects/mappings.json"));
		assert!(project.jar().is_none());
		Ok(())
	}

	#[test]
	fn checksum_without_jar() -> Result<()> {
		let a = project(PROJECT)?.checksum(None)?;
		let b = project(&PROJECT.replace("\"f\"", "\"h\""))?.checksum(None)?;
		assert_ne!(a, b);
		assert_eq!(a, project(PROJECT)?.checksum(None)?);
		Ok(())
	}

	#[test]
	fn bad_projects() -> Result<()> {
		// members of unknown classes
		let json = r#"{ "mappings": "m.json", "classes": [], "method_references": [{ "caller": "a", "callee": "b.c()V" }] }"#;
		assert!(project(json)?.index().is_err());

		assert!(project(r#"{ "classes": [] }"#).is_err());
		Ok(())
	}
}
