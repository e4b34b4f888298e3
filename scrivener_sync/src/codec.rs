//! The binary format of packets.
//!
//! A frame is
//! - 1 byte: the packet id,
//! - 4 bytes: the length of the payload (big endian `u32`),
//! - the payload.
//!
//! Inside payloads, strings are a `u16` length followed by UTF-8 bytes, and entries are written recursively with
//! their parents.

use std::io::ErrorKind;
use anyhow::{anyhow, bail, Context, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use scrivener_entry::descriptor::{MethodDescriptor, TypeDescriptor};
use scrivener_entry::entry::{ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodEntry};
use scrivener_mappings::change::{EntryChange, Tristate};
use scrivener_mappings::mapping::{EntryMapping, TokenType};
use scrivener_mappings::tree::{EntryTree, EntryTreeNode};
use crate::error::ProtocolError;

/// 16 MiB, enough for the full mappings of a large program.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// The packet id and the payload length.
pub const HEADER_SIZE: usize = 5;

const MAX_STRING_LENGTH: usize = u16::MAX as usize;

/// How many parents an entry may have when read, counting outer classes, the method of a local, and so on.
pub const MAX_ENTRY_DEPTH: usize = 256;

const ENTRY_CLASS: u8 = 0;
const ENTRY_FIELD: u8 = 1;
const ENTRY_METHOD: u8 = 2;
const ENTRY_LOCAL_VAR: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	pub id: u8,
	pub payload: Bytes,
}

impl Frame {
	pub fn new(id: u8, payload: impl Into<Bytes>) -> Frame {
		Frame { id, payload: payload.into() }
	}

	pub fn encode(&self) -> Result<Bytes, ProtocolError> {
		let length = self.payload.len();
		if length > MAX_PAYLOAD_SIZE {
			return Err(ProtocolError::PayloadTooLarge { size: length, max: MAX_PAYLOAD_SIZE });
		}

		let mut bytes = BytesMut::with_capacity(HEADER_SIZE + length);
		bytes.put_u8(self.id);
		bytes.put_u32(length as u32);
		bytes.put_slice(&self.payload);
		Ok(bytes.freeze())
	}
}

/// Reads the next frame. Returns `None` if the stream ended before it.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Frame>, ProtocolError> {
	let mut header = [0; HEADER_SIZE];
	match reader.read_exact(&mut header).await {
		Ok(_) => {},
		Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
		Err(e) => return Err(e.into()),
	}

	let id = header[0];
	let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
	if length > MAX_PAYLOAD_SIZE {
		return Err(ProtocolError::PayloadTooLarge { size: length, max: MAX_PAYLOAD_SIZE });
	}

	let mut payload = vec![0; length];
	reader.read_exact(&mut payload).await?;
	Ok(Some(Frame::new(id, payload)))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError> {
	let bytes = frame.encode()?;
	writer.write_all(&bytes).await?;
	writer.flush().await?;
	Ok(())
}

fn ensure_remaining(buf: &impl Buf, needed: usize, what: &str) -> Result<()> {
	if buf.remaining() < needed {
		bail!("expected {needed} bytes for {what}, only {} left", buf.remaining());
	}
	Ok(())
}

pub(crate) fn get_u8(buf: &mut impl Buf, what: &str) -> Result<u8> {
	ensure_remaining(buf, 1, what)?;
	Ok(buf.get_u8())
}

pub(crate) fn get_u16(buf: &mut impl Buf, what: &str) -> Result<u16> {
	ensure_remaining(buf, 2, what)?;
	Ok(buf.get_u16())
}

pub(crate) fn get_u32(buf: &mut impl Buf, what: &str) -> Result<u32> {
	ensure_remaining(buf, 4, what)?;
	Ok(buf.get_u32())
}

pub(crate) fn get_bool(buf: &mut impl Buf, what: &str) -> Result<bool> {
	match get_u8(buf, what)? {
		0 => Ok(false),
		1 => Ok(true),
		other => bail!("invalid boolean {other} for {what}"),
	}
}

pub(crate) fn get_bytes(buf: &mut impl Buf, length: usize, what: &str) -> Result<Vec<u8>> {
	ensure_remaining(buf, length, what)?;
	let mut bytes = vec![0; length];
	buf.copy_to_slice(&mut bytes);
	Ok(bytes)
}

pub(crate) fn get_string(buf: &mut impl Buf) -> Result<String> {
	let length = get_u16(buf, "string length")? as usize;
	let bytes = get_bytes(buf, length, "string")?;
	String::from_utf8(bytes).context("string is not valid UTF-8")
}

pub(crate) fn put_string(buf: &mut impl BufMut, string: &str) -> Result<()> {
	let bytes = string.as_bytes();
	if bytes.len() > MAX_STRING_LENGTH {
		bail!("string too long, was {} bytes, max {MAX_STRING_LENGTH} allowed", bytes.len());
	}
	buf.put_u16(bytes.len() as u16);
	buf.put_slice(bytes);
	Ok(())
}

fn get_optional_string(buf: &mut impl Buf, what: &str) -> Result<Option<String>> {
	if get_bool(buf, what)? {
		get_string(buf).map(Some)
	} else {
		Ok(None)
	}
}

fn put_optional_string(buf: &mut impl BufMut, string: Option<&str>) -> Result<()> {
	buf.put_u8(u8::from(string.is_some()));
	match string {
		Some(string) => put_string(buf, string),
		None => Ok(()),
	}
}

pub fn put_entry(buf: &mut impl BufMut, entry: &Entry) -> Result<()> {
	put_entry_with_parent(buf, entry, true)
}

fn put_entry_with_parent(buf: &mut impl BufMut, entry: &Entry, include_parent: bool) -> Result<()> {
	buf.put_u8(match entry {
		Entry::Class(_) => ENTRY_CLASS,
		Entry::Field(_) => ENTRY_FIELD,
		Entry::Method(_) => ENTRY_METHOD,
		Entry::LocalVariable(_) => ENTRY_LOCAL_VAR,
	});

	if include_parent {
		let parent = entry.parent();
		buf.put_u8(u8::from(parent.is_some()));
		if let Some(parent) = parent {
			put_entry_with_parent(buf, &parent, true)?;
		}
	}

	put_string(buf, entry.name())?;
	put_optional_string(buf, entry.javadoc())?;

	match entry {
		Entry::Class(_) => {},
		Entry::Field(field) => put_string(buf, &field.desc().to_string())?,
		Entry::Method(method) => put_string(buf, &method.desc().to_string())?,
		Entry::LocalVariable(local) => {
			buf.put_u16(local.index());
			buf.put_u8(u8::from(local.is_parameter()));
		},
	}
	Ok(())
}

pub fn get_entry(buf: &mut impl Buf) -> Result<Entry> {
	get_entry_with_parent(buf, None, true, 0)
}

/// Reads an entry. Without `include_parent`, the parent isn't read but `parent` is used instead.
///
/// `depth` is the number of entries this one is nested in.
fn get_entry_with_parent(buf: &mut impl Buf, parent: Option<Entry>, include_parent: bool, depth: usize) -> Result<Entry> {
	if depth > MAX_ENTRY_DEPTH {
		bail!("entry is nested deeper than {MAX_ENTRY_DEPTH} levels");
	}
	let kind = get_u8(buf, "entry type")?;

	let parent = if include_parent && get_bool(buf, "entry parent flag")? {
		Some(get_entry_with_parent(buf, None, true, depth + 1)?)
	} else if include_parent {
		None
	} else {
		parent
	};

	let name = get_string(buf).context("entry name")?;
	let javadoc = get_optional_string(buf, "entry javadoc flag")?;

	let entry: Entry = match (kind, parent) {
		(ENTRY_CLASS, None) => ClassEntry::new(name).into(),
		(ENTRY_CLASS, Some(Entry::Class(parent))) => ClassEntry::inner(parent, name).into(),
		(ENTRY_FIELD, Some(Entry::Class(parent))) => {
			let desc = get_string(buf)?;
			let desc = desc.parse::<TypeDescriptor>().with_context(|| anyhow!("invalid descriptor of field {name}"))?;
			FieldEntry::new(parent, name, desc).into()
		},
		(ENTRY_METHOD, Some(Entry::Class(parent))) => {
			let desc = get_string(buf)?;
			let desc = desc.parse::<MethodDescriptor>().with_context(|| anyhow!("invalid descriptor of method {name}"))?;
			MethodEntry::new(parent, name, desc).into()
		},
		(ENTRY_LOCAL_VAR, Some(Entry::Method(parent))) => {
			let index = get_u16(buf, "local variable index")?;
			let is_parameter = get_bool(buf, "parameter flag")?;
			LocalVariableEntry::new(parent, index, name, is_parameter).into()
		},
		(ENTRY_CLASS | ENTRY_FIELD | ENTRY_METHOD | ENTRY_LOCAL_VAR, parent) => {
			bail!("entry {name:?} of type {kind} can't have the parent {parent:?}")
		},
		(kind, _) => bail!("unknown entry type {kind}"),
	};
	Ok(entry.with_javadoc(javadoc))
}

fn tristate_flag<T>(tristate: &Tristate<T>) -> u8 {
	match tristate {
		Tristate::Unchanged => 0,
		Tristate::Set(_) => 1,
		Tristate::Reset => 2,
	}
}

/// Writes the target, a flags byte with two bits for each of name and javadoc, and then the new values.
pub fn put_change(buf: &mut impl BufMut, change: &EntryChange) -> Result<()> {
	put_entry(buf, change.target())?;

	buf.put_u8(tristate_flag(change.deobf_name()) | (tristate_flag(change.javadoc()) << 2));

	if let Some(name) = change.deobf_name().new_value() {
		put_string(buf, name)?;
	}
	if let Some(javadoc) = change.javadoc().new_value() {
		put_string(buf, javadoc)?;
	}
	Ok(())
}

pub fn get_change(buf: &mut impl Buf) -> Result<EntryChange> {
	let target = get_entry(buf)?;
	let flags = get_u8(buf, "change flags")?;

	let change = EntryChange::modify(target);
	let change = match flags & 0x3 {
		0 => change,
		1 => change.with_deobf_name(get_string(buf)?),
		2 => change.clear_deobf_name(),
		other => bail!("invalid name change type {other}"),
	};
	let change = match (flags >> 2) & 0x3 {
		0 => change,
		1 => change.with_javadoc(get_string(buf)?),
		2 => change.clear_javadoc(),
		other => bail!("invalid javadoc change type {other}"),
	};
	Ok(change)
}

fn token_type_id(token_type: TokenType) -> u8 {
	match token_type {
		TokenType::Obfuscated => 0,
		TokenType::Deobfuscated => 1,
		TokenType::JarProposed => 2,
		TokenType::DynamicProposed => 3,
	}
}

fn token_type_from_id(id: u8) -> Result<TokenType> {
	Ok(match id {
		0 => TokenType::Obfuscated,
		1 => TokenType::Deobfuscated,
		2 => TokenType::JarProposed,
		3 => TokenType::DynamicProposed,
		other => bail!("unknown token type {other}"),
	})
}

fn put_mapping(buf: &mut impl BufMut, mapping: &EntryMapping) -> Result<()> {
	put_optional_string(buf, mapping.target_name())?;
	put_optional_string(buf, mapping.javadoc())?;
	buf.put_u8(token_type_id(mapping.token_type()));
	put_optional_string(buf, mapping.source_plugin_id())
}

fn get_mapping(buf: &mut impl Buf) -> Result<EntryMapping> {
	let target_name = get_optional_string(buf, "mapping name flag")?;
	let javadoc = get_optional_string(buf, "mapping javadoc flag")?;
	let token_type = token_type_from_id(get_u8(buf, "token type")?)?;
	let source_plugin_id = get_optional_string(buf, "plugin id flag")?;
	EntryMapping::new(target_name, javadoc, token_type, source_plugin_id)
}

/// Writes the whole tree, node by node. The entries of child nodes are written without their parent.
pub fn put_mappings(buf: &mut impl BufMut, mappings: &EntryTree<EntryMapping>) -> Result<()> {
	let roots: Vec<_> = mappings.root_nodes().collect();
	buf.put_u32(roots.len() as u32);
	for node in roots {
		put_node(buf, node)?;
	}
	Ok(())
}

fn put_node(buf: &mut impl BufMut, node: &EntryTreeNode<EntryMapping>) -> Result<()> {
	put_entry_with_parent(buf, node.entry(), false)?;

	buf.put_u8(u8::from(node.value().is_some()));
	if let Some(mapping) = node.value() {
		put_mapping(buf, mapping)?;
	}

	let children: Vec<_> = node.children().collect();
	buf.put_u32(children.len() as u32);
	for child in children {
		put_node(buf, child)?;
	}
	Ok(())
}

pub fn get_mappings(buf: &mut impl Buf) -> Result<EntryTree<EntryMapping>> {
	let mut tree = EntryTree::new();
	let count = get_u32(buf, "root count")?;
	for _ in 0..count {
		get_node(buf, None, &mut tree, 0)?;
	}
	Ok(tree)
}

fn get_node(buf: &mut impl Buf, parent: Option<&Entry>, tree: &mut EntryTree<EntryMapping>, depth: usize) -> Result<()> {
	let entry = get_entry_with_parent(buf, parent.cloned(), false, depth)?;

	if get_bool(buf, "mapping flag")? {
		let mapping = get_mapping(buf).with_context(|| anyhow!("mapping of {entry}"))?;
		tree.insert(&entry, Some(mapping));
	}

	let count = get_u32(buf, "child count")?;
	for _ in 0..count {
		get_node(buf, Some(&entry), tree, depth + 1)?;
	}
	Ok(())
}
