use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use anyhow::{Context, Result};
use crate::descriptor::TypeDescriptor;

/// A reference to a class.
///
/// Inner classes are stored as a chain: the class `a/b/C$D` has the parent `a/b/C` and the name `D`. Only the
/// outermost class has a package in its name.
///
/// Two class entries are equal if their parent chain and name are equal, the javadoc is ignored for that.
#[derive(Debug, Clone)]
pub struct ClassEntry {
	parent: Option<Box<ClassEntry>>,
	name: String,
	javadoc: Option<String>,
}

impl PartialEq for ClassEntry {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.parent == other.parent
	}
}

impl Eq for ClassEntry {}

impl Hash for ClassEntry {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.parent.hash(state);
		self.name.hash(state);
	}
}

impl ClassEntry {
	pub const JAVA_LANG_OBJECT: &'static str = "java/lang/Object";
	pub const JAVA_LANG_RECORD: &'static str = "java/lang/Record";

	/// Creates a class entry from its full name, splitting inner classes at the last `$` of each level.
	///
	/// ```
	/// use scrivener_entry::entry::ClassEntry;
	///
	/// let class = ClassEntry::new("a/b/Outer$Inner");
	/// assert_eq!(class.name(), "Inner");
	/// assert_eq!(class.parent().map(ClassEntry::name), Some("a/b/Outer"));
	/// assert_eq!(class.full_name(), "a/b/Outer$Inner");
	/// ```
	pub fn new(full_name: impl Into<String>) -> ClassEntry {
		let full_name = full_name.into();

		match Self::split_outer(&full_name) {
			Some((outer, inner)) => ClassEntry {
				parent: Some(Box::new(ClassEntry::new(outer))),
				name: inner.to_owned(),
				javadoc: None,
			},
			None => ClassEntry { parent: None, name: full_name, javadoc: None },
		}
	}

	fn split_outer(full_name: &str) -> Option<(&str, &str)> {
		if full_name.starts_with('[') {
			return None;
		}
		let simple_start = full_name.rfind('/').map_or(0, |i| i + 1);
		let (outer, inner) = full_name.rsplit_once('$')?;
		// both sides must be non-empty, and the `$` must not be part of the package
		if outer.len() < simple_start + 1 || inner.is_empty() {
			return None;
		}
		Some((outer, inner))
	}

	/// Creates an inner class of `parent`.
	pub fn inner(parent: ClassEntry, name: impl Into<String>) -> ClassEntry {
		ClassEntry { parent: Some(Box::new(parent)), name: name.into(), javadoc: None }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn parent(&self) -> Option<&ClassEntry> {
		self.parent.as_deref()
	}

	pub fn javadoc(&self) -> Option<&str> {
		self.javadoc.as_deref()
	}

	pub fn with_javadoc(mut self, javadoc: Option<String>) -> ClassEntry {
		self.javadoc = javadoc;
		self
	}

	pub fn with_name(&self, name: impl Into<String>) -> ClassEntry {
		ClassEntry { parent: self.parent.clone(), name: name.into(), javadoc: self.javadoc.clone() }
	}

	pub fn with_parent(&self, parent: Option<ClassEntry>) -> ClassEntry {
		ClassEntry { parent: parent.map(Box::new), name: self.name.clone(), javadoc: self.javadoc.clone() }
	}

	pub fn is_inner_class(&self) -> bool {
		self.parent.is_some()
	}

	pub fn is_array(&self) -> bool {
		self.name.starts_with('[')
	}

	/// Returns the element type of an array class like `[[La;`.
	pub fn array_element(&self) -> Result<Option<TypeDescriptor>> {
		if !self.is_array() {
			return Ok(None);
		}
		let descriptor: TypeDescriptor = self.name.parse()
			.with_context(|| format!("array class {:?} isn't a valid descriptor", self.name))?;
		Ok(match descriptor {
			TypeDescriptor::Array(inner) => Some(*inner),
			_ => None,
		})
	}

	/// The full internal name, like `a/b/C$D`.
	pub fn full_name(&self) -> String {
		match &self.parent {
			Some(parent) => format!("{}${}", parent.full_name(), self.name),
			None => self.name.clone(),
		}
	}

	/// The name without any package and outer classes.
	pub fn simple_name(&self) -> &str {
		match &self.parent {
			Some(_) => &self.name,
			None => self.name.rsplit_once('/').map_or(self.name.as_str(), |(_, simple)| simple),
		}
	}

	/// The full name without the package, like `C$D`.
	pub fn contextual_name(&self) -> String {
		match &self.parent {
			Some(parent) => format!("{}${}", parent.contextual_name(), self.name),
			None => self.simple_name().to_owned(),
		}
	}

	/// The package of the outermost class, `None` for classes in the default package.
	pub fn package_name(&self) -> Option<&str> {
		self.outermost_class().name.rsplit_once('/').map(|(package, _)| package)
	}

	pub fn outermost_class(&self) -> &ClassEntry {
		match &self.parent {
			Some(parent) => parent.outermost_class(),
			None => self,
		}
	}

	pub fn is_in_same_package(&self, other: &ClassEntry) -> bool {
		self.package_name() == other.package_name()
	}

	/// Whether this class belongs to the platform, and can therefore never be renamed.
	pub fn is_jre(&self) -> bool {
		let package = self.package_name().unwrap_or("");
		["java/", "javax/", "jdk/", "sun/"].iter()
			.any(|prefix| package.starts_with(prefix) || format!("{package}/") == *prefix)
	}

	/// Outer classes first, `self` last.
	pub fn class_chain(&self) -> Vec<&ClassEntry> {
		let mut chain = match &self.parent {
			Some(parent) => parent.class_chain(),
			None => Vec::new(),
		};
		chain.push(self);
		chain
	}
}

impl Display for ClassEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.full_name())
	}
}

impl From<&str> for ClassEntry {
	fn from(value: &str) -> Self {
		ClassEntry::new(value)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::descriptor::TypeDescriptor;
	use crate::entry::ClassEntry;

	#[test]
	fn inner_classes() {
		let class = ClassEntry::new("a/b/C$D$E");
		assert_eq!(class.name(), "E");
		assert_eq!(class.full_name(), "a/b/C$D$E");
		assert_eq!(class.contextual_name(), "C$D$E");
		assert_eq!(class.simple_name(), "E");
		assert_eq!(class.package_name(), Some("a/b"));
		assert_eq!(class.outermost_class(), &ClassEntry::new("a/b/C"));
		assert!(class.is_inner_class());
		assert_eq!(class.class_chain().len(), 3);

		assert_eq!(class, ClassEntry::inner(ClassEntry::new("a/b/C$D"), "E"));
	}

	#[test]
	fn not_inner_classes() {
		for name in ["a/b/C", "a$/b", "a/$b", "a/b$", "$a", "[La$b;"] {
			let class = ClassEntry::new(name);
			assert!(!class.is_inner_class(), "{name}");
			assert_eq!(class.full_name(), name);
		}
		assert_eq!(ClassEntry::new("C").package_name(), None);
	}

	#[test]
	fn equality_ignores_javadoc() {
		let a = ClassEntry::new("a");
		let b = ClassEntry::new("a").with_javadoc(Some("docs".to_owned()));
		assert_eq!(a, b);
	}

	#[test]
	fn arrays() {
		let class = ClassEntry::new("[[La;");
		assert!(class.is_array());
		assert_eq!(class.array_element().unwrap(), Some(TypeDescriptor::Array(Box::new(TypeDescriptor::object("a")))));
		assert_eq!(ClassEntry::new("a").array_element().unwrap(), None);
	}

	#[test]
	fn jre() {
		assert!(ClassEntry::new("java/lang/Object").is_jre());
		assert!(ClassEntry::new("javax/swing/JFrame$Foo").is_jre());
		assert!(!ClassEntry::new("javafoo/Bar").is_jre());
		assert!(!ClassEntry::new("a").is_jre());
	}
}
