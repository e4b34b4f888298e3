use indexmap::IndexMap;
use log::debug;
use scrivener_entry::access::AccessFlags;
use scrivener_entry::descriptor::TypeDescriptor;
use scrivener_entry::entry::{ClassEntry, MethodEntry};
use crate::index::entry_index::EntryIndex;
use crate::index::inheritance::{InheritanceIndex, Relation};
use crate::index::reference::ReferenceIndex;

/// Links compiler generated bridge methods to the methods they call.
///
/// A bridge method is a synthetic method that does nothing but call one other method, the specialized method, with
/// a more specific descriptor. They exist because of generics and covariant return types.
#[derive(Debug, Clone, Default)]
pub struct BridgeMethodIndex {
	bridge_to_specialized: IndexMap<MethodEntry, MethodEntry>,
	specialized_to_bridge: IndexMap<MethodEntry, MethodEntry>,
}

impl BridgeMethodIndex {
	pub(crate) fn find(entries: &EntryIndex, inheritance: &InheritanceIndex, references: &ReferenceIndex) -> BridgeMethodIndex {
		let mut index = BridgeMethodIndex::default();

		for (bridge, specialized) in entries.methods()
			.filter(|def| def.access.is_synthetic())
			.filter_map(|def| {
				references.single_reference(&def.entry)
					.map(|specialized| (def, specialized))
			})
			.filter(|(def, specialized)| {
				def.access.is_bridge() || is_potential_bridge(entries, inheritance, &def.entry, def.access, specialized)
			})
			.map(|(def, specialized)| (&def.entry, specialized))
		{
			match index.specialized_to_bridge.get(specialized) {
				Some(other_bridge) => {
					// keep the bridge higher in the hierarchy, happens when a class inherits from a super class with
					// bridge methods of its own
					let higher = get_higher_method(inheritance, bridge, other_bridge).clone();
					index.specialized_to_bridge.insert(specialized.clone(), higher);
				},
				None => {
					index.specialized_to_bridge.insert(specialized.clone(), bridge.clone());
				},
			}
			index.bridge_to_specialized.insert(bridge.clone(), specialized.clone());
		}

		// A specialized method may have been given the name of its bridge, make that name known too.
		let renamed: Vec<(MethodEntry, MethodEntry)> = index.specialized_to_bridge.iter()
			.filter(|(specialized, bridge)| specialized.name() != bridge.name())
			.map(|(specialized, bridge)| (specialized.with_name(bridge.name()), bridge.clone()))
			.collect();
		for (specialized, bridge) in renamed {
			debug!("specialized method {specialized} has a bridge {bridge} with a different name");
			index.specialized_to_bridge.entry(specialized).or_insert(bridge);
		}

		index
	}

	pub fn is_bridge_method(&self, method: &MethodEntry) -> bool {
		self.bridge_to_specialized.contains_key(method)
	}

	pub fn is_specialized_method(&self, method: &MethodEntry) -> bool {
		self.specialized_to_bridge.contains_key(method)
	}

	pub fn bridge_from_specialized(&self, specialized: &MethodEntry) -> Option<&MethodEntry> {
		self.specialized_to_bridge.get(specialized)
	}

	pub fn specialized_from_bridge(&self, bridge: &MethodEntry) -> Option<&MethodEntry> {
		self.bridge_to_specialized.get(bridge)
	}

	pub fn bridge_to_specialized(&self) -> &IndexMap<MethodEntry, MethodEntry> {
		&self.bridge_to_specialized
	}
}

fn are_types_bridge_compatible(inheritance: &InheritanceIndex, entries: &EntryIndex, bridge: &TypeDescriptor, specialized: &TypeDescriptor) -> bool {
	match (bridge, specialized) {
		(a, b) if a == b => true,
		(TypeDescriptor::Object(bridge), TypeDescriptor::Object(specialized)) => {
			let relation = inheritance.compute_class_relation(entries, &ClassEntry::new(specialized.as_str()), &ClassEntry::new(bridge.as_str()));
			relation != Relation::Unrelated
		},
		_ => false,
	}
}

fn is_potential_bridge(entries: &EntryIndex, inheritance: &InheritanceIndex, bridge: &MethodEntry, access: AccessFlags, specialized: &MethodEntry) -> bool {
	// Bridge methods only exist for inheritance purposes, if we're private, final, or static, we cannot be inherited
	if access.is_private() || access.is_final() || access.is_static() {
		return false;
	}

	let bridge_desc = bridge.desc();
	let specialized_desc = specialized.desc();

	// A bridge method will always have the same number of arguments
	if bridge_desc.parameters.len() != specialized_desc.parameters.len() {
		return false;
	}

	let parameters_compatible = bridge_desc.parameters.iter()
		.zip(&specialized_desc.parameters)
		.all(|(bridge, specialized)| are_types_bridge_compatible(inheritance, entries, bridge, specialized));
	if !parameters_compatible {
		return false;
	}

	match (&bridge_desc.return_type, &specialized_desc.return_type) {
		(Some(bridge), Some(specialized)) => are_types_bridge_compatible(inheritance, entries, bridge, specialized),
		(None, None) => true,
		_ => false,
	}
}

fn get_higher_method<'a>(inheritance: &InheritanceIndex, bridge_1: &'a MethodEntry, bridge_2: &'a MethodEntry) -> &'a MethodEntry {
	if inheritance.descendants(bridge_1.parent()).contains(bridge_2.parent()) {
		bridge_1
	} else {
		bridge_2
	}
}
