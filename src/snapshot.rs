//! Saving the mappings between sessions.
//!
//! A snapshot is a JSON list of entries with their mapping. Entries are written the way they're displayed, like
//! `a/b/C.name(I)V`.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use scrivener_entry::entry::Entry;
use scrivener_mappings::mapping::{EntryMapping, TokenType};
use scrivener_mappings::tree::EntryTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum Token {
	#[default]
	Obfuscated,
	Deobfuscated,
	JarProposed,
	DynamicProposed,
}

impl From<TokenType> for Token {
	fn from(token_type: TokenType) -> Token {
		match token_type {
			TokenType::Obfuscated => Token::Obfuscated,
			TokenType::Deobfuscated => Token::Deobfuscated,
			TokenType::JarProposed => Token::JarProposed,
			TokenType::DynamicProposed => Token::DynamicProposed,
		}
	}
}

impl From<Token> for TokenType {
	fn from(token: Token) -> TokenType {
		match token {
			Token::Obfuscated => TokenType::Obfuscated,
			Token::Deobfuscated => TokenType::Deobfuscated,
			Token::JarProposed => TokenType::JarProposed,
			Token::DynamicProposed => TokenType::DynamicProposed,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct Mapping {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	javadoc: Option<String>,
	/// Defaults to deobfuscated for mappings with a name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	token_type: Option<Token>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	plugin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct Record {
	entry: String,
	mapping: Mapping,
}

impl Record {
	fn new(entry: &Entry, mapping: &EntryMapping) -> Record {
		let token_type = match mapping.token_type() {
			// implied by the name
			TokenType::Deobfuscated | TokenType::Obfuscated => None,
			proposed => Some(proposed.into()),
		};
		Record {
			entry: entry.to_string(),
			mapping: Mapping {
				name: mapping.target_name().map(str::to_owned),
				javadoc: mapping.javadoc().map(str::to_owned),
				token_type,
				plugin: mapping.source_plugin_id().map(str::to_owned),
			},
		}
	}

	fn into_mapping(self) -> Result<(Entry, EntryMapping)> {
		let entry: Entry = self.entry.parse()?;
		let Mapping { name, javadoc, token_type, plugin } = self.mapping;

		let token_type = token_type.unwrap_or(if name.is_some() { Token::Deobfuscated } else { Token::Obfuscated });
		let mapping = EntryMapping::new(name, javadoc, token_type.into(), plugin)
			.with_context(|| anyhow!("invalid mapping for {entry}"))?;
		Ok((entry, mapping))
	}
}

pub(crate) fn to_json(mappings: &EntryTree<EntryMapping>) -> Result<String> {
	let records: Vec<Record> = mappings.entries().into_iter()
		.map(|(entry, mapping)| Record::new(entry, mapping))
		.collect();
	Ok(serde_json::to_string_pretty(&records)?)
}

pub(crate) fn from_json(data: &str) -> Result<EntryTree<EntryMapping>> {
	let records: Vec<Record> = serde_json::from_str(data)?;
	records.into_iter()
		.map(Record::into_mapping)
		.collect()
}

/// Reads a snapshot. A missing file means there are no mappings yet.
pub(crate) fn read(path: &Path) -> Result<EntryTree<EntryMapping>> {
	let data = match fs::read_to_string(path) {
		Ok(data) => data,
		Err(e) if e.kind() == ErrorKind::NotFound => {
			info!("no mappings at {path:?} yet, starting from scratch");
			return Ok(EntryTree::new());
		},
		Err(e) => return Err(e).with_context(|| anyhow!("failed to open mappings {path:?}")),
	};

	let mappings = from_json(&data)
		.with_context(|| anyhow!("failed to read mappings {path:?}"))?;

	debug!("read {} mappings from {path:?}", mappings.len());
	Ok(mappings)
}

/// Writes a snapshot, replacing the old one only once the new one is complete.
pub(crate) fn write(path: &Path, mappings: &EntryTree<EntryMapping>) -> Result<()> {
	let json = to_json(mappings)?;

	let temp = path.with_extension("json.tmp");
	let mut writer = BufWriter::new(File::create(&temp)
		.with_context(|| anyhow!("failed to create {temp:?}"))?);
	writer.write_all(json.as_bytes())?;
	writer.flush()?;
	drop(writer);

	std::fs::rename(&temp, path)
		.with_context(|| anyhow!("failed to move {temp:?} to {path:?}"))?;
	debug!("wrote {} mappings to {path:?}", mappings.len());
	Ok(())
}
