use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use zip::ZipArchive;
use scrivener_sync::Checksum;

/// The jar the mappings are for.
#[derive(Clone)]
pub(crate) enum Jar {
	File {
		path: PathBuf,
	},
	#[cfg(test)]
	Mem {
		data: Vec<u8>,
	},
}

impl Debug for Jar {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Jar::File { path } => f.debug_struct("Jar::File").field("path", path).finish(),
			#[cfg(test)]
			Jar::Mem { .. } => f.debug_struct("Jar::Mem").finish_non_exhaustive(),
		}
	}
}

impl Jar {
	pub(crate) fn new(path: PathBuf) -> Jar {
		Jar::File { path }
	}

	#[cfg(test)]
	pub(crate) fn new_mem(data: Vec<u8>) -> Jar {
		Jar::Mem { data }
	}

	/// Calls `f` with the name and contents of each class file, sorted by name.
	pub(crate) fn for_each_class(&self, f: impl FnMut(&str, &[u8]) -> Result<()>) -> Result<()> {
		fn action(reader: impl Read + Seek, mut f: impl FnMut(&str, &[u8]) -> Result<()>) -> Result<()> {
			let mut zip = ZipArchive::new(reader)?;

			let mut names: Vec<String> = zip.file_names()
				.filter(|name| name.ends_with(".class"))
				.map(str::to_owned)
				.collect();
			names.sort();

			for name in names {
				let mut file = zip.by_name(&name)?;
				let mut vec = Vec::new();
				file.read_to_end(&mut vec)
					.with_context(|| anyhow!("failed to read {name:?}"))?;

				f(&name, &vec)?;
			}

			Ok(())
		}

		match self {
			Jar::File { path } => {
				let reader = File::open(path)
					.with_context(|| anyhow!("failed to open jar {path:?}"))?;
				action(reader, f)
			},
			#[cfg(test)]
			Jar::Mem { data } => {
				let reader = std::io::Cursor::new(data);
				action(reader, f)
			},
		}
	}

	/// Hashes the names and contents of all class files.
	///
	/// Only the classes matter, so repacking a jar or adding resources keeps the checksum.
	pub(crate) fn checksum(&self) -> Result<Checksum> {
		let mut hasher = Sha256::new();
		self.for_each_class(|name, data| {
			hasher.update(name.as_bytes());
			hasher.update(data);
			Ok(())
		}).with_context(|| anyhow!("failed to compute the checksum of {self:?}"))?;
		Ok(hasher.finalize().into())
	}
}

/// The checksum to use when there's no jar.
pub(crate) fn checksum_of_bytes(data: &[u8]) -> Checksum {
	Sha256::digest(data).into()
}

#[cfg(test)]
mod testing {
	use std::io::{Cursor, Write};
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use zip::write::SimpleFileOptions;
	use zip::ZipWriter;
	use crate::jar::Jar;

	fn jar(files: &[(&str, &[u8])]) -> Result<Jar> {
		let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
		for (name, data) in files {
			zip.start_file(*name, SimpleFileOptions::default())?;
			zip.write_all(data)?;
		}
		Ok(Jar::new_mem(zip.finish()?.into_inner()))
	}

	#[test]
	fn classes_are_sorted() -> Result<()> {
		let jar = jar(&[("b.class", b"B"), ("META-INF/MANIFEST.MF", b"x"), ("a.class", b"A")])?;

		let mut seen = Vec::new();
		jar.for_each_class(|name, data| {
			seen.push((name.to_owned(), data.to_vec()));
			Ok(())
		})?;
		assert_eq!(seen, vec![("a.class".to_owned(), b"A".to_vec()), ("b.class".to_owned(), b"B".to_vec())]);
		Ok(())
	}

	#[test]
	fn checksum_only_depends_on_classes() -> Result<()> {
		let first = jar(&[("a.class", b"A"), ("b.class", b"B")])?.checksum()?;
		let reordered = jar(&[("b.class", b"B"), ("readme.txt", b"hi"), ("a.class", b"A")])?.checksum()?;
		let changed = jar(&[("a.class", b"A"), ("b.class", b"C")])?.checksum()?;

		assert_eq!(first, reordered);
		assert_ne!(first, changed);
		Ok(())
	}
}
