//! A tree of values keyed by [`Entry`], mirroring the containment of entries.
//!
//! Every entry is stored at the end of its [ancestry][Entry::ancestry]: the mapping of a method lives in a node
//! below the node of its class. Nodes without a value of their own only exist as long as one of their descendants
//! has a value, removing the last value below a node removes the node too.

use indexmap::IndexMap;
use scrivener_entry::entry::Entry;

#[derive(Debug, Clone, PartialEq)]
pub struct EntryTreeNode<V> {
	entry: Entry,
	value: Option<V>,
	children: IndexMap<Entry, EntryTreeNode<V>>,
}

impl<V> EntryTreeNode<V> {
	fn new(entry: Entry) -> EntryTreeNode<V> {
		EntryTreeNode { entry, value: None, children: IndexMap::new() }
	}

	pub fn entry(&self) -> &Entry {
		&self.entry
	}

	pub fn value(&self) -> Option<&V> {
		self.value.as_ref()
	}

	pub fn children(&self) -> impl Iterator<Item=&EntryTreeNode<V>> {
		self.children.values()
	}

	pub fn is_empty(&self) -> bool {
		self.value.is_none() && self.children.is_empty()
	}

	fn collect<'a>(&'a self, out: &mut Vec<(&'a Entry, &'a V)>) {
		if let Some(value) = &self.value {
			out.push((&self.entry, value));
		}
		for child in self.children.values() {
			child.collect(out);
		}
	}

	fn count(&self) -> usize {
		usize::from(self.value.is_some()) + self.children.values().map(EntryTreeNode::count).sum::<usize>()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryTree<V> {
	roots: IndexMap<Entry, EntryTreeNode<V>>,
}

impl<V> Default for EntryTree<V> {
	fn default() -> Self {
		EntryTree { roots: IndexMap::new() }
	}
}

impl<V> EntryTree<V> {
	pub fn new() -> EntryTree<V> {
		EntryTree::default()
	}

	/// Sets the value for an entry, returning the old value. Inserting `None` removes the value, and with it all
	/// the nodes that are empty afterward.
	pub fn insert(&mut self, entry: &Entry, value: Option<V>) -> Option<V> {
		let ancestry: Vec<Entry> = entry.ancestry().into_iter()
			.map(|entry| entry.with_javadoc(None))
			.collect();

		match value {
			Some(value) => Self::node_or_insert(&mut self.roots, &ancestry)?.value.replace(value),
			None => Self::remove(&mut self.roots, &ancestry),
		}
	}

	fn node_or_insert<'a>(map: &'a mut IndexMap<Entry, EntryTreeNode<V>>, path: &[Entry]) -> Option<&'a mut EntryTreeNode<V>> {
		let (first, rest) = path.split_first()?;
		let node = map.entry(first.clone()).or_insert_with(|| EntryTreeNode::new(first.clone()));
		if rest.is_empty() {
			Some(node)
		} else {
			Self::node_or_insert(&mut node.children, rest)
		}
	}

	fn remove(map: &mut IndexMap<Entry, EntryTreeNode<V>>, path: &[Entry]) -> Option<V> {
		let (first, rest) = path.split_first()?;
		let node = map.get_mut(first)?;
		let old = if rest.is_empty() {
			node.value.take()
		} else {
			Self::remove(&mut node.children, rest)
		};
		if node.is_empty() {
			map.shift_remove(first);
		}
		old
	}

	pub fn find_node(&self, entry: &Entry) -> Option<&EntryTreeNode<V>> {
		let ancestry = entry.ancestry();
		let (first, rest) = ancestry.split_first()?;
		let mut node = self.roots.get(first)?;
		for entry in rest {
			node = node.children.get(entry)?;
		}
		Some(node)
	}

	pub fn get(&self, entry: &Entry) -> Option<&V> {
		self.find_node(entry)?.value.as_ref()
	}

	pub fn contains(&self, entry: &Entry) -> bool {
		self.get(entry).is_some()
	}

	/// The entries of all nodes directly below the node of `entry`.
	pub fn children(&self, entry: &Entry) -> Vec<&Entry> {
		self.find_node(entry)
			.map(|node| node.children.keys().collect())
			.unwrap_or_default()
	}

	/// The entries of all nodes next to the node of `entry`, with the same parent.
	pub fn siblings(&self, entry: &Entry) -> Vec<&Entry> {
		let map = match entry.parent() {
			Some(parent) => match self.find_node(&parent) {
				Some(node) => &node.children,
				None => return Vec::new(),
			},
			None => &self.roots,
		};
		map.keys().filter(|sibling| *sibling != entry).collect()
	}

	pub fn root_nodes(&self) -> impl Iterator<Item=&EntryTreeNode<V>> {
		self.roots.values()
	}

	pub fn root_entries(&self) -> impl Iterator<Item=&Entry> {
		self.roots.keys()
	}

	/// All entries with a value, parents before their children.
	pub fn entries(&self) -> Vec<(&Entry, &V)> {
		let mut out = Vec::new();
		for root in self.roots.values() {
			root.collect(&mut out);
		}
		out
	}

	/// The entries of all nodes, including the ones without a value.
	pub fn all_entries(&self) -> Vec<&Entry> {
		fn walk<'a, V>(node: &'a EntryTreeNode<V>, out: &mut Vec<&'a Entry>) {
			out.push(&node.entry);
			for child in node.children.values() {
				walk(child, out);
			}
		}
		let mut out = Vec::new();
		for root in self.roots.values() {
			walk(root, &mut out);
		}
		out
	}

	/// The number of entries with a value.
	pub fn len(&self) -> usize {
		self.roots.values().map(EntryTreeNode::count).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.roots.is_empty()
	}
}

impl<V> FromIterator<(Entry, V)> for EntryTree<V> {
	fn from_iter<T: IntoIterator<Item=(Entry, V)>>(iter: T) -> Self {
		let mut tree = EntryTree::new();
		for (entry, value) in iter {
			tree.insert(&entry, Some(value));
		}
		tree
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use scrivener_entry::entry::Entry;
	use crate::tree::EntryTree;

	fn entry(s: &str) -> Entry {
		s.parse().unwrap()
	}

	#[test]
	fn nesting() {
		let mut tree = EntryTree::new();
		tree.insert(&entry("a.m(I)V#1"), Some("param"));
		tree.insert(&entry("a$b.f:I"), Some("field"));
		tree.insert(&entry("a"), Some("class"));

		assert_eq!(tree.len(), 3);
		assert_eq!(tree.get(&entry("a.m(I)V#1")), Some(&"param"));
		assert_eq!(tree.get(&entry("a.m(I)V")), None);
		assert!(tree.find_node(&entry("a.m(I)V")).is_some());
		assert_eq!(tree.root_entries().collect::<Vec<_>>(), vec![&entry("a")]);

		let mut children = tree.children(&entry("a"));
		children.sort_by_key(|e| e.to_string());
		assert_eq!(children, vec![&entry("a$b"), &entry("a.m(I)V")]);

		assert_eq!(tree.siblings(&entry("a$b")), vec![&entry("a.m(I)V")]);
		assert_eq!(tree.entries().len(), 3);
		assert_eq!(tree.all_entries().len(), 5);
	}

	#[test]
	fn removal_prunes_empty_nodes() {
		let mut tree = EntryTree::new();
		tree.insert(&entry("a$b.m()V"), Some(1));
		tree.insert(&entry("a.f:I"), Some(2));

		assert_eq!(tree.insert(&entry("a$b.m()V"), None), Some(1));
		assert!(tree.find_node(&entry("a$b")).is_none());
		assert!(tree.find_node(&entry("a")).is_some());

		assert_eq!(tree.insert(&entry("a.f:I"), None), Some(2));
		assert!(tree.is_empty());
		assert_eq!(tree.len(), 0);

		// removing something that isn't there does nothing
		assert_eq!(tree.insert(&entry("x.y:I"), None), None);
		assert!(tree.is_empty());
	}

	#[test]
	fn replace() {
		let mut tree: EntryTree<&str> = [(entry("a"), "one")].into_iter().collect();
		assert_eq!(tree.insert(&entry("a"), Some("two")), Some("one"));
		assert_eq!(tree.get(&entry("a")), Some(&"two"));
	}
}
