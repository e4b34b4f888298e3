//! The symbols a name can be given to.
//!
//! Entries are plain values: they're created for every lookup and compared structurally. An [`Entry`] knows its
//! parent, which makes it possible to compute full names and walk up the containment tree
//! (local variable → method → class → outer class).

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use anyhow::{anyhow, bail, Context, Error, Result};
use crate::names;
use crate::validation::ValidationContext;

mod class;
mod local;
mod member;

pub use class::ClassEntry;
pub use local::LocalVariableEntry;
pub use member::{FieldEntry, MethodEntry};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
	Class(ClassEntry),
	Method(MethodEntry),
	Field(FieldEntry),
	LocalVariable(LocalVariableEntry),
}

impl From<ClassEntry> for Entry {
	fn from(value: ClassEntry) -> Self {
		Entry::Class(value)
	}
}

impl From<MethodEntry> for Entry {
	fn from(value: MethodEntry) -> Self {
		Entry::Method(value)
	}
}

impl From<FieldEntry> for Entry {
	fn from(value: FieldEntry) -> Self {
		Entry::Field(value)
	}
}

impl From<LocalVariableEntry> for Entry {
	fn from(value: LocalVariableEntry) -> Self {
		Entry::LocalVariable(value)
	}
}

impl Entry {
	pub fn name(&self) -> &str {
		match self {
			Entry::Class(class) => class.name(),
			Entry::Method(method) => method.name(),
			Entry::Field(field) => field.name(),
			Entry::LocalVariable(local) => local.name(),
		}
	}

	pub fn javadoc(&self) -> Option<&str> {
		match self {
			Entry::Class(class) => class.javadoc(),
			Entry::Method(method) => method.javadoc(),
			Entry::Field(field) => field.javadoc(),
			Entry::LocalVariable(local) => local.javadoc(),
		}
	}

	pub fn with_javadoc(self, javadoc: Option<String>) -> Entry {
		match self {
			Entry::Class(class) => class.with_javadoc(javadoc).into(),
			Entry::Method(method) => method.with_javadoc(javadoc).into(),
			Entry::Field(field) => field.with_javadoc(javadoc).into(),
			Entry::LocalVariable(local) => local.with_javadoc(javadoc).into(),
		}
	}

	pub fn with_name(&self, name: impl Into<String>) -> Entry {
		match self {
			Entry::Class(class) => class.with_name(name).into(),
			Entry::Method(method) => method.with_name(name).into(),
			Entry::Field(field) => field.with_name(name).into(),
			Entry::LocalVariable(local) => local.with_name(name).into(),
		}
	}

	/// Returns the entry this one is contained in.
	pub fn parent(&self) -> Option<Entry> {
		match self {
			Entry::Class(class) => class.parent().cloned().map(Entry::Class),
			Entry::Method(method) => Some(Entry::Class(method.parent().clone())),
			Entry::Field(field) => Some(Entry::Class(field.parent().clone())),
			Entry::LocalVariable(local) => Some(Entry::Method(local.parent().clone())),
		}
	}

	/// Returns a copy with a different parent. The parent must be of the right kind: a class for classes, fields
	/// and methods, a method for local variables.
	pub fn with_parent(&self, parent: Option<Entry>) -> Result<Entry> {
		Ok(match (self, parent) {
			(Entry::Class(class), None) => class.with_parent(None).into(),
			(Entry::Class(class), Some(Entry::Class(parent))) => class.with_parent(Some(parent)).into(),
			(Entry::Method(method), Some(Entry::Class(parent))) => method.with_parent(parent).into(),
			(Entry::Field(field), Some(Entry::Class(parent))) => field.with_parent(parent).into(),
			(Entry::LocalVariable(local), Some(Entry::Method(parent))) => local.with_parent(parent).into(),
			(entry, parent) => bail!("cannot use {parent:?} as parent of {entry:?}"),
		})
	}

	/// The class this entry is declared in, for classes that's the class itself.
	pub fn containing_class(&self) -> &ClassEntry {
		match self {
			Entry::Class(class) => class,
			Entry::Method(method) => method.parent(),
			Entry::Field(field) => field.parent(),
			Entry::LocalVariable(local) => local.parent().parent(),
		}
	}

	/// All entries from the outermost class down to this entry, `self` included as the last element.
	pub fn ancestry(&self) -> Vec<Entry> {
		let mut ancestry = match self.parent() {
			Some(parent) => parent.ancestry(),
			None => Vec::new(),
		};
		ancestry.push(self.clone());
		ancestry
	}

	/// Replaces `target` anywhere in the ancestry of this entry (including the entry itself) with `replacement`.
	pub fn replace_ancestor(&self, target: &Entry, replacement: &Entry) -> Result<Entry> {
		if self == target {
			return Ok(replacement.clone());
		}
		match self.parent() {
			Some(parent) => {
				let new_parent = parent.replace_ancestor(target, replacement)?;
				self.with_parent(Some(new_parent))
			},
			None => Ok(self.clone()),
		}
	}

	/// Whether the entry could be confused with `other` if both had the same name and the same parent.
	///
	/// For methods, only the parameter types matter.
	pub fn can_conflict_with(&self, other: &Entry) -> bool {
		match (self, other) {
			(Entry::Class(_), Entry::Class(_)) => true,
			(Entry::Field(a), Entry::Field(b)) => a.parent() == b.parent(),
			(Entry::Method(a), Entry::Method(b)) => a.desc().can_conflict_with(b.desc()),
			(Entry::LocalVariable(a), Entry::LocalVariable(b)) => a.parent() == b.parent(),
			_ => false,
		}
	}

	/// Whether the entry, declared in a subclass, would hide `other` declared in a super class.
	pub fn can_shadow(&self, other: &Entry) -> bool {
		match (self, other) {
			(Entry::Field(_), Entry::Field(_)) => true,
			(Entry::Method(a), Entry::Method(b)) => a.desc().can_conflict_with(b.desc()),
			_ => false,
		}
	}

	/// Checks the syntax of a new name for this entry, raising problems into `ctx`.
	pub fn validate_name(&self, ctx: &mut ValidationContext, name: &str) {
		match self {
			Entry::Class(class) => names::validate_class_name(ctx, name, class.is_inner_class()),
			_ => names::validate_identifier(ctx, name),
		}
	}

	/// A name unique in the whole program, like `a/b/C.method(I)V`.
	pub fn full_name(&self) -> String {
		self.to_string()
	}

	/// A name without the package, meant to be shown to people.
	pub fn contextual_name(&self) -> String {
		match self {
			Entry::Class(class) => class.contextual_name(),
			Entry::Method(method) => format!("{}.{}", method.parent().contextual_name(), method.name()),
			Entry::Field(field) => format!("{}.{}", field.parent().contextual_name(), field.name()),
			Entry::LocalVariable(local) => format!("{}.{}.{}",
				local.parent().parent().contextual_name(), local.parent().name(), local.name()),
		}
	}

	pub fn as_class(&self) -> Option<&ClassEntry> {
		match self {
			Entry::Class(class) => Some(class),
			_ => None,
		}
	}

	pub fn as_method(&self) -> Option<&MethodEntry> {
		match self {
			Entry::Method(method) => Some(method),
			_ => None,
		}
	}

	pub fn as_field(&self) -> Option<&FieldEntry> {
		match self {
			Entry::Field(field) => Some(field),
			_ => None,
		}
	}

	pub fn as_local_variable(&self) -> Option<&LocalVariableEntry> {
		match self {
			Entry::LocalVariable(local) => Some(local),
			_ => None,
		}
	}
}

impl Display for Entry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Entry::Class(class) => Display::fmt(class, f),
			Entry::Method(method) => Display::fmt(method, f),
			Entry::Field(field) => Display::fmt(field, f),
			Entry::LocalVariable(local) => Display::fmt(local, f),
		}
	}
}

/// Parses the format [`Display`] writes:
/// - `a/b/C$D` for classes,
/// - `a/b/C.name:I` for fields,
/// - `a/b/C.name(I)V` for methods,
/// - `a/b/C.name(I)V#1` for parameters and `a/b/C.name(I)V@3` for other local variables.
impl FromStr for Entry {
	type Err = Error;

	fn from_str(s: &str) -> Result<Entry> {
		let Some((owner, member)) = s.split_once('.') else {
			if s.is_empty() {
				bail!("empty entry");
			}
			return Ok(ClassEntry::new(s).into());
		};

		if let Some(paren) = member.find('(') {
			let name = &member[..paren];
			let rest = &member[paren..];
			let (desc, local) = match rest.find(['#', '@']) {
				Some(i) => (&rest[..i], Some(&rest[i..])),
				None => (rest, None),
			};
			let method = MethodEntry::parse(owner, name, desc)?;
			match local {
				None => Ok(method.into()),
				Some(local) => {
					let is_parameter = local.starts_with('#');
					let index = local[1..].parse()
						.with_context(|| anyhow!("invalid local variable index in {s:?}"))?;
					Ok(LocalVariableEntry::new(method, index, "", is_parameter).into())
				},
			}
		} else if let Some((name, desc)) = member.split_once(':') {
			Ok(FieldEntry::parse(owner, name, desc)?.into())
		} else {
			bail!("entry {s:?} is neither a class, a field (missing ':desc') nor a method (missing '(desc)')")
		}
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::entry::{ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodEntry};
	use crate::validation::{Message, ValidationContext};

	#[test]
	fn parse_and_display() {
		for s in ["a/b/C$D", "a/b/C.f:I", "a/b/C$D.m(ILa;)V", "a.m(I)V#1", "a.m(I)V@3"] {
			let entry: Entry = s.parse().unwrap();
			assert_eq!(entry.to_string(), s);
		}

		let entry: Entry = "a.m(I)V#1".parse().unwrap();
		let local = entry.as_local_variable().unwrap();
		assert!(local.is_parameter());
		assert_eq!(local.index(), 1);

		assert!("".parse::<Entry>().is_err());
		assert!("a.b".parse::<Entry>().is_err());
		assert!("a.b(".parse::<Entry>().is_err());
		assert!("a.b()V#x".parse::<Entry>().is_err());
	}

	#[test]
	fn ancestry() {
		let class = ClassEntry::new("a$b");
		let method = MethodEntry::parse("a$b", "m", "(I)V").unwrap();
		let local = LocalVariableEntry::parameter(method.clone(), 1);
		let entry = Entry::from(local);

		assert_eq!(entry.ancestry(), vec![
			Entry::Class(ClassEntry::new("a")),
			Entry::Class(class.clone()),
			Entry::Method(method.clone()),
			entry.clone(),
		]);
		assert_eq!(entry.containing_class(), &class);
	}

	#[test]
	fn replace_ancestor() {
		let local: Entry = "b.m(I)V#1".parse().unwrap();
		let target: Entry = "b.m(I)V".parse().unwrap();
		let replacement: Entry = "a.m(I)V".parse().unwrap();

		assert_eq!(local.replace_ancestor(&target, &replacement).unwrap(), "a.m(I)V#1".parse().unwrap());

		let field: Entry = "b$c.f:I".parse().unwrap();
		let replaced = field.replace_ancestor(&"b".parse().unwrap(), &"x".parse().unwrap()).unwrap();
		assert_eq!(replaced, "x$c.f:I".parse().unwrap());

		// unrelated target: nothing changes
		assert_eq!(field.replace_ancestor(&target, &replacement).unwrap(), field);
	}

	#[test]
	fn conflicts() {
		let f1: Entry = FieldEntry::parse("a", "x", "I").unwrap().into();
		let f2: Entry = FieldEntry::parse("a", "y", "J").unwrap().into();
		let f3: Entry = FieldEntry::parse("b", "y", "J").unwrap().into();
		assert!(f1.can_conflict_with(&f2));
		assert!(!f1.can_conflict_with(&f3));
		assert!(f1.can_shadow(&f3));

		let m1: Entry = "a.x(I)V".parse().unwrap();
		let m2: Entry = "a.y(I)I".parse().unwrap();
		let m3: Entry = "a.z(J)V".parse().unwrap();
		assert!(m1.can_conflict_with(&m2));
		assert!(!m1.can_conflict_with(&m3));
		assert!(!m1.can_conflict_with(&f1));
	}

	#[test]
	fn validate_names() {
		let mut ctx = ValidationContext::default();
		Entry::from(ClassEntry::new("a$b")).validate_name(&mut ctx, "com/Inner");
		assert!(ctx.contains(Message::INVALID_PACKAGE_NAME));

		let mut ctx = ValidationContext::default();
		Entry::from(ClassEntry::new("a")).validate_name(&mut ctx, "com/example/Outer");
		assert!(!ctx.has_errors());

		let mut ctx = ValidationContext::default();
		"a.f:I".parse::<Entry>().unwrap().validate_name(&mut ctx, "int");
		assert!(ctx.contains(Message::RESERVED_IDENTIFIER));
	}

	#[test]
	fn contextual_names() {
		let entry: Entry = "a/b/C$D.m()V".parse().unwrap();
		assert_eq!(entry.contextual_name(), "C$D.m");
		assert_eq!(entry.full_name(), "a/b/C$D.m()V");
	}
}
