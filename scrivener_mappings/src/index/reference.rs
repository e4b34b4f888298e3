use indexmap::{IndexMap, IndexSet};
use scrivener_entry::entry::MethodEntry;

/// Stores what method refers to what methods, by calling them.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
	method_references: IndexMap<MethodEntry, IndexSet<MethodEntry>>,
}

impl ReferenceIndex {
	pub(crate) fn add_method_reference(&mut self, caller: MethodEntry, callee: MethodEntry) {
		self.method_references.entry(caller).or_default().insert(callee);
	}

	pub fn methods_referenced_by(&self, caller: &MethodEntry) -> impl Iterator<Item=&MethodEntry> {
		self.method_references.get(caller).into_iter().flatten()
	}

	/// Returns the single method `caller` calls, if there's exactly one.
	pub fn single_reference(&self, caller: &MethodEntry) -> Option<&MethodEntry> {
		self.method_references.get(caller)
			.filter(|references| references.len() == 1)
			.and_then(|references| references.first())
	}
}
