use std::collections::VecDeque;
use indexmap::{IndexMap, IndexSet};
use petgraph::{algo, Direction, Graph};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use scrivener_entry::entry::ClassEntry;
use crate::index::entry_index::EntryIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
	Related,
	Unrelated,
	/// Some class on the way up isn't indexed, so we can't tell.
	Unknown,
}

/// Stores parent and child class information.
///
/// Edges point from a class to its super class and interfaces, in declaration order. `java/lang/Object` is never
/// stored as a parent.
#[derive(Debug, Clone, Default)]
pub struct InheritanceIndex {
	graph: Graph<ClassEntry, ()>,
	nodes: IndexMap<ClassEntry, NodeIndex>,
}

impl InheritanceIndex {
	fn node(&mut self, class: &ClassEntry) -> NodeIndex {
		if let Some(&node) = self.nodes.get(class) {
			return node;
		}
		let node = self.graph.add_node(class.clone());
		self.nodes.insert(class.clone(), node);
		node
	}

	pub(crate) fn store(&mut self, class: &ClassEntry, super_class: Option<&ClassEntry>, interfaces: &[ClassEntry]) {
		let child = self.node(class);

		let parents = super_class.into_iter()
			.filter(|super_class| super_class.full_name() != ClassEntry::JAVA_LANG_OBJECT)
			.chain(interfaces);
		for parent in parents {
			let parent = self.node(parent);
			self.graph.update_edge(child, parent, ());
		}
	}

	/// Some class that is its own ancestor, if there's one.
	pub(crate) fn find_cycle(&self) -> Option<&ClassEntry> {
		algo::toposort(&self.graph, None)
			.err()
			.map(|cycle| &self.graph[cycle.node_id()])
	}

	fn related(&self, class: &ClassEntry, direction: Direction) -> Vec<&ClassEntry> {
		let Some(&node) = self.nodes.get(class) else {
			return Vec::new();
		};
		let mut edges: Vec<_> = self.graph.edges_directed(node, direction).collect();
		edges.sort_by_key(|edge| edge.id());
		edges.into_iter()
			.map(|edge| match direction {
				Direction::Outgoing => &self.graph[edge.target()],
				Direction::Incoming => &self.graph[edge.source()],
			})
			.collect()
	}

	/// The direct super class and interfaces, in the order they were declared.
	pub fn parents(&self, class: &ClassEntry) -> Vec<&ClassEntry> {
		self.related(class, Direction::Outgoing)
	}

	pub fn children(&self, class: &ClassEntry) -> Vec<&ClassEntry> {
		self.related(class, Direction::Incoming)
	}

	pub fn has_parents(&self, class: &ClassEntry) -> bool {
		!self.parents(class).is_empty()
	}

	pub fn is_parent(&self, class: &ClassEntry) -> bool {
		!self.children(class).is_empty()
	}

	fn walk(&self, class: &ClassEntry, direction: Direction) -> IndexSet<&ClassEntry> {
		let mut found = IndexSet::new();
		let mut queue = VecDeque::from([class]);
		while let Some(next) = queue.pop_front() {
			for related in self.related(next, direction) {
				if found.insert(related) {
					queue.push_back(related);
				}
			}
		}
		found
	}

	/// All classes above `class`, breadth first. Each class appears only once.
	pub fn ancestors(&self, class: &ClassEntry) -> IndexSet<&ClassEntry> {
		self.walk(class, Direction::Outgoing)
	}

	/// All classes below `class`, breadth first.
	pub fn descendants(&self, class: &ClassEntry) -> IndexSet<&ClassEntry> {
		self.walk(class, Direction::Incoming)
	}

	pub fn compute_class_relation(&self, entries: &EntryIndex, class: &ClassEntry, potential_ancestor: &ClassEntry) -> Relation {
		if potential_ancestor.full_name() == ClassEntry::JAVA_LANG_OBJECT {
			return Relation::Related;
		}
		if !entries.has_class(class) {
			return Relation::Unknown;
		}

		let ancestors = self.ancestors(class);
		if ancestors.contains(potential_ancestor) {
			Relation::Related
		} else if ancestors.iter().any(|ancestor| !entries.has_class(ancestor)) {
			// an unindexed class could still inherit from it
			Relation::Unknown
		} else {
			Relation::Unrelated
		}
	}
}
