use indexmap::IndexMap;
use scrivener_entry::entry::Entry;
use crate::tree::EntryTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	Insert,
	Update,
	Remove,
}

/// The value an entry had at the last checkpoint, and the one it has now. At least one of them is present.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingChange<V> {
	pub old: Option<V>,
	pub new: Option<V>,
}

impl<V> MappingChange<V> {
	pub fn kind(&self) -> ChangeKind {
		match (&self.old, &self.new) {
			(None, _) => ChangeKind::Insert,
			(Some(_), Some(_)) => ChangeKind::Update,
			(Some(_), None) => ChangeKind::Remove,
		}
	}
}

/// All the changes made to a [`DeltaTrackingTree`] between two checkpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingDelta<V> {
	changes: IndexMap<Entry, MappingChange<V>>,
}

impl<V> Default for MappingDelta<V> {
	fn default() -> Self {
		MappingDelta { changes: IndexMap::new() }
	}
}

impl<V> MappingDelta<V> {
	pub fn get(&self, entry: &Entry) -> Option<&MappingChange<V>> {
		self.changes.get(entry)
	}

	pub fn contains(&self, entry: &Entry) -> bool {
		self.changes.contains_key(entry)
	}

	pub fn iter(&self) -> impl Iterator<Item=(&Entry, &MappingChange<V>)> {
		self.changes.iter()
	}

	pub fn entries(&self) -> impl Iterator<Item=&Entry> {
		self.changes.keys()
	}

	pub fn len(&self) -> usize {
		self.changes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}
}

impl<V> IntoIterator for MappingDelta<V> {
	type Item = (Entry, MappingChange<V>);
	type IntoIter = indexmap::map::IntoIter<Entry, MappingChange<V>>;

	fn into_iter(self) -> Self::IntoIter {
		self.changes.into_iter()
	}
}

/// An [`EntryTree`] that remembers what changed since the last call to [`DeltaTrackingTree::take_delta`].
///
/// For every changed entry the value at the checkpoint is kept. Changing an entry back to that value removes it
/// from the pending changes again.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaTrackingTree<V> {
	tree: EntryTree<V>,
	changes: IndexMap<Entry, Option<V>>,
}

impl<V> Default for DeltaTrackingTree<V> {
	fn default() -> Self {
		DeltaTrackingTree { tree: EntryTree::new(), changes: IndexMap::new() }
	}
}

impl<V: Clone + PartialEq> DeltaTrackingTree<V> {
	/// Wraps a tree. Its current content is the first checkpoint.
	pub fn new(tree: EntryTree<V>) -> DeltaTrackingTree<V> {
		DeltaTrackingTree { tree, changes: IndexMap::new() }
	}

	pub fn insert(&mut self, entry: &Entry, value: Option<V>) -> Option<V> {
		let old = self.tree.insert(entry, value.clone());

		match self.changes.get(entry).map(|checkpoint| *checkpoint == value) {
			Some(true) => {
				self.changes.shift_remove(entry);
			},
			Some(false) => {},
			None => if old != value {
				self.changes.insert(entry.clone().with_javadoc(None), old.clone());
			},
		}

		old
	}

	/// Returns the changes since the last checkpoint and starts a new one.
	pub fn take_delta(&mut self) -> MappingDelta<V> {
		let changes = std::mem::take(&mut self.changes).into_iter()
			.map(|(entry, old)| {
				let new = self.tree.get(&entry).cloned();
				(entry, MappingChange { old, new })
			})
			.collect();
		MappingDelta { changes }
	}

	/// Whether anything differs from the last checkpoint.
	pub fn is_dirty(&self) -> bool {
		!self.changes.is_empty()
	}

	/// Replaces the whole tree, which also becomes the new checkpoint.
	pub fn set_tree(&mut self, tree: EntryTree<V>) {
		self.tree = tree;
		self.changes.clear();
	}

	pub fn tree(&self) -> &EntryTree<V> {
		&self.tree
	}

	pub fn into_tree(self) -> EntryTree<V> {
		self.tree
	}

	pub fn get(&self, entry: &Entry) -> Option<&V> {
		self.tree.get(entry)
	}

	pub fn contains(&self, entry: &Entry) -> bool {
		self.tree.contains(entry)
	}

	pub fn children(&self, entry: &Entry) -> Vec<&Entry> {
		self.tree.children(entry)
	}

	pub fn all_entries(&self) -> Vec<&Entry> {
		self.tree.all_entries()
	}

	pub fn entries(&self) -> Vec<(&Entry, &V)> {
		self.tree.entries()
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use scrivener_entry::entry::Entry;
	use crate::delta::{ChangeKind, DeltaTrackingTree};
	use crate::tree::EntryTree;

	fn entry(s: &str) -> Entry {
		s.parse().unwrap()
	}

	#[test]
	fn delta_counts_distinct_entries() {
		let mut tree = DeltaTrackingTree::default();
		tree.insert(&entry("a"), Some(1));
		tree.insert(&entry("a"), Some(2));
		tree.insert(&entry("a.f:I"), Some(3));
		tree.insert(&entry("b"), Some(4));
		assert!(tree.is_dirty());

		let delta = tree.take_delta();
		assert_eq!(delta.len(), 3);
		assert_eq!(delta.get(&entry("a")).map(|c| (c.old, c.new)), Some((None, Some(2))));
		assert!(delta.iter().all(|(_, change)| change.kind() == ChangeKind::Insert));

		assert!(!tree.is_dirty());
		assert!(tree.take_delta().is_empty());
	}

	#[test]
	fn reverting_drops_the_change() {
		let initial: EntryTree<i32> = [(entry("a"), 1)].into_iter().collect();
		let mut tree = DeltaTrackingTree::new(initial);

		tree.insert(&entry("a"), Some(5));
		tree.insert(&entry("a"), Some(1));
		assert!(!tree.is_dirty());

		// inserting the same value is no change at all
		tree.insert(&entry("a"), Some(1));
		assert!(!tree.is_dirty());

		tree.insert(&entry("a"), None);
		let delta = tree.take_delta();
		let change = delta.get(&entry("a")).unwrap();
		assert_eq!(change.kind(), ChangeKind::Remove);
		assert_eq!(change.old, Some(1));

		tree.insert(&entry("a"), Some(7));
		assert_eq!(tree.take_delta().get(&entry("a")).unwrap().kind(), ChangeKind::Insert);
	}

	#[test]
	fn set_tree_resets_checkpoint() {
		let mut tree = DeltaTrackingTree::default();
		tree.insert(&entry("a"), Some(1));
		tree.set_tree([(entry("b"), 2)].into_iter().collect());
		assert!(!tree.is_dirty());
		assert_eq!(tree.get(&entry("b")), Some(&2));
		assert_eq!(tree.get(&entry("a")), None);
	}
}
