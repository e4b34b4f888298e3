use anyhow::{bail, Result};

/// Where a name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenType {
	/// No name was given yet.
	#[default]
	Obfuscated,
	/// A person gave this name.
	Deobfuscated,
	/// Proposed by a plugin looking at the jar, when it was opened.
	JarProposed,
	/// Proposed by a plugin reacting to another rename.
	DynamicProposed,
}

impl TokenType {
	pub fn is_proposed(self) -> bool {
		matches!(self, TokenType::JarProposed | TokenType::DynamicProposed)
	}

	pub fn is_obfuscated(self) -> bool {
		self == TokenType::Obfuscated
	}
}

/// The name and documentation assigned to an entry.
///
/// Mappings are never changed in place, all the `with_*` methods return a new mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryMapping {
	target_name: Option<String>,
	javadoc: Option<String>,
	token_type: TokenType,
	source_plugin_id: Option<String>,
}

impl Default for EntryMapping {
	fn default() -> Self {
		EntryMapping::DEFAULT
	}
}

fn normalize(string: Option<String>) -> Option<String> {
	string.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn normalize_javadoc(javadoc: Option<String>) -> Option<String> {
	javadoc.filter(|s| !s.trim().is_empty())
}

impl EntryMapping {
	/// No name, no javadoc.
	pub const DEFAULT: EntryMapping = EntryMapping {
		target_name: None,
		javadoc: None,
		token_type: TokenType::Obfuscated,
		source_plugin_id: None,
	};

	/// Creates a mapping, checking the relation between the name, the token type and the plugin id:
	/// - a mapping has a name iff it's not [obfuscated][TokenType::Obfuscated],
	/// - proposed mappings need the id of the plugin that proposed them, and other mappings must not have one.
	///
	/// The name gets trimmed, an empty name counts as no name.
	pub fn new(target_name: Option<String>, javadoc: Option<String>, token_type: TokenType, source_plugin_id: Option<String>) -> Result<EntryMapping> {
		let target_name = normalize(target_name);
		let javadoc = normalize_javadoc(javadoc);

		if token_type.is_obfuscated() && target_name.is_some() {
			bail!("obfuscated mapping cannot have a target name, got {target_name:?}");
		}
		if !token_type.is_obfuscated() && target_name.is_none() {
			bail!("{token_type:?} mapping needs a target name");
		}
		if token_type.is_proposed() && source_plugin_id.is_none() {
			bail!("proposed mapping {target_name:?} needs the id of the plugin that proposed it");
		}
		if !token_type.is_proposed() && source_plugin_id.is_some() {
			bail!("only proposed mappings can have a plugin id, got {source_plugin_id:?} for a {token_type:?} mapping");
		}

		Ok(EntryMapping { target_name, javadoc, token_type, source_plugin_id })
	}

	/// A name given by a person. An empty name gives the default mapping.
	pub fn deobfuscated(target_name: impl Into<String>) -> EntryMapping {
		EntryMapping::DEFAULT.with_name(Some(target_name.into()))
	}

	/// A name proposed by the plugin with the given id.
	pub fn proposed(target_name: impl Into<String>, token_type: TokenType, source_plugin_id: impl Into<String>) -> Result<EntryMapping> {
		EntryMapping::new(Some(target_name.into()), None, token_type, Some(source_plugin_id.into()))
	}

	pub fn target_name(&self) -> Option<&str> {
		self.target_name.as_deref()
	}

	pub fn javadoc(&self) -> Option<&str> {
		self.javadoc.as_deref()
	}

	pub fn token_type(&self) -> TokenType {
		self.token_type
	}

	pub fn source_plugin_id(&self) -> Option<&str> {
		self.source_plugin_id.as_deref()
	}

	pub fn is_default(&self) -> bool {
		*self == EntryMapping::DEFAULT
	}

	/// Gives this mapping a new name, which is then a [deobfuscated][TokenType::Deobfuscated] name. Removing the
	/// name makes it [obfuscated][TokenType::Obfuscated]. The javadoc stays in both cases.
	pub fn with_name(&self, target_name: Option<String>) -> EntryMapping {
		match normalize(target_name) {
			Some(name) => EntryMapping {
				target_name: Some(name),
				javadoc: self.javadoc.clone(),
				token_type: TokenType::Deobfuscated,
				source_plugin_id: None,
			},
			None => EntryMapping {
				target_name: None,
				javadoc: self.javadoc.clone(),
				token_type: TokenType::Obfuscated,
				source_plugin_id: None,
			},
		}
	}

	pub fn with_javadoc(&self, javadoc: Option<String>) -> EntryMapping {
		EntryMapping { javadoc: normalize_javadoc(javadoc), ..self.clone() }
	}

	/// Fills in whatever this mapping lacks from `other`. The name (and with it token type and plugin id) are
	/// taken as a whole.
	pub fn merge(&self, other: &EntryMapping) -> EntryMapping {
		let (target_name, token_type, source_plugin_id) = if self.target_name.is_some() {
			(self.target_name.clone(), self.token_type, self.source_plugin_id.clone())
		} else {
			(other.target_name.clone(), other.token_type, other.source_plugin_id.clone())
		};
		EntryMapping {
			target_name,
			javadoc: self.javadoc.clone().or_else(|| other.javadoc.clone()),
			token_type,
			source_plugin_id,
		}
	}
}
