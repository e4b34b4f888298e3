//! Names for the entries of a program, and everything needed to change them consistently.
//!
//! The [`tree::EntryTree`] stores a [`mapping::EntryMapping`] per entry. Renaming goes through the
//! [`remapper::Remapper`], which uses the [`index::JarIndex`] of the program to find all entries that have to share
//! a name, and the [`validator::MappingValidator`] to reject names that would clash.

pub mod change;
pub mod delta;
pub mod index;
pub mod mapping;
pub mod package;
pub mod remapper;
pub mod resolver;
pub mod translator;
pub mod tree;
pub mod validator;
