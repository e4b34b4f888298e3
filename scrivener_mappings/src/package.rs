use indexmap::IndexMap;
use scrivener_entry::entry::ClassEntry;

#[derive(Debug, Clone, Default, PartialEq)]
struct PackageNode {
	classes: Vec<ClassEntry>,
	packages: IndexMap<String, PackageNode>,
}

impl PackageNode {
	fn is_empty(&self) -> bool {
		self.classes.is_empty() && self.packages.is_empty()
	}

	fn sort(&mut self) {
		self.classes.sort_by_key(ClassEntry::full_name);
		self.packages.sort_keys();
		for package in self.packages.values_mut() {
			package.sort();
		}
	}

	fn collect_packages(&self, prefix: Option<&str>, packages: &mut Vec<String>) {
		for (segment, node) in &self.packages {
			let name = join(prefix, segment);
			packages.push(name.clone());
			node.collect_packages(Some(&name), packages);
		}
	}

	/// Removes `class` from the package at `segments`, and all packages that got empty because of that.
	fn remove(&mut self, segments: &[&str], class: &ClassEntry) -> bool {
		match segments.split_first() {
			None => {
				let len = self.classes.len();
				self.classes.retain(|other| other != class);
				self.classes.len() != len
			},
			Some((first, rest)) => {
				let Some(node) = self.packages.get_mut(*first) else {
					return false;
				};
				let removed = node.remove(rest, class);
				if node.is_empty() {
					self.packages.shift_remove(*first);
				}
				removed
			},
		}
	}
}

fn join(prefix: Option<&str>, segment: &str) -> String {
	match prefix {
		Some(prefix) => format!("{prefix}/{segment}"),
		None => segment.to_owned(),
	}
}

fn segments(package: Option<&str>) -> Vec<&str> {
	package.map_or_else(Vec::new, |package| package.split('/').collect())
}

/// Top level classes, ordered by their packages.
///
/// Packages are named like in class names, `a/b/c`. The default package is `None`. Inner classes aren't part of the
/// tree, they're found through their outer class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageTree {
	root: PackageNode,
}

impl PackageTree {
	pub fn new(classes: impl IntoIterator<Item=ClassEntry>) -> PackageTree {
		let mut tree = PackageTree::default();
		for class in classes {
			tree.insert(class);
		}
		tree.root.sort();
		tree
	}

	fn insert(&mut self, class: ClassEntry) {
		if class.is_inner_class() {
			return;
		}
		let mut node = &mut self.root;
		for segment in segments(class.package_name()) {
			node = node.packages.entry(segment.to_owned()).or_default();
		}
		node.classes.push(class);
	}

	fn node(&self, package: Option<&str>) -> Option<&PackageNode> {
		segments(package).into_iter()
			.try_fold(&self.root, |node, segment| node.packages.get(segment))
	}

	/// The classes directly in `package`, sorted by name.
	pub fn classes_in(&self, package: Option<&str>) -> &[ClassEntry] {
		self.node(package).map_or(&[], |node| node.classes.as_slice())
	}

	/// The full names of the packages directly in `package`.
	pub fn subpackages(&self, package: Option<&str>) -> Vec<String> {
		self.node(package)
			.map(|node| node.packages.keys().map(|segment| join(package, segment)).collect())
			.unwrap_or_default()
	}

	/// All packages, parents before their subpackages.
	pub fn packages(&self) -> Vec<String> {
		let mut packages = Vec::new();
		self.root.collect_packages(None, &mut packages);
		packages
	}

	pub fn contains_package(&self, package: &str) -> bool {
		self.node(Some(package)).is_some()
	}

	/// Removes a class, together with the packages that are empty afterwards. Returns whether the class was there.
	pub fn remove(&mut self, class: &ClassEntry) -> bool {
		let segments = segments(class.package_name());
		self.root.remove(&segments, class)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use scrivener_entry::entry::ClassEntry;
	use crate::package::PackageTree;

	fn tree() -> PackageTree {
		PackageTree::new(["net/example/b", "net/example/a", "net/example/util/C", "org/D", "E", "net/example/a$Inner"]
			.into_iter()
			.map(ClassEntry::new))
	}

	#[test]
	fn structure() {
		let tree = tree();

		assert_eq!(tree.packages(), vec!["net", "net/example", "net/example/util", "org"]);
		assert_eq!(tree.subpackages(None), vec!["net", "org"]);
		assert_eq!(tree.subpackages(Some("net/example")), vec!["net/example/util"]);
		assert!(tree.subpackages(Some("com")).is_empty());

		assert_eq!(tree.classes_in(Some("net/example")), &[ClassEntry::new("net/example/a"), ClassEntry::new("net/example/b")]);
		assert_eq!(tree.classes_in(None), &[ClassEntry::new("E")]);
		assert!(tree.classes_in(Some("net")).is_empty());
		assert!(tree.contains_package("net/example/util"));
	}

	#[test]
	fn removing_prunes_empty_packages() {
		let mut tree = tree();

		assert!(tree.remove(&ClassEntry::new("net/example/util/C")));
		assert!(!tree.contains_package("net/example/util"));
		assert!(tree.contains_package("net/example"));

		assert!(tree.remove(&ClassEntry::new("org/D")));
		assert_eq!(tree.packages(), vec!["net", "net/example"]);

		assert!(!tree.remove(&ClassEntry::new("org/D")));
	}
}
