//! The symbols of a Java program that can be given names: classes, methods, fields and local variables.
//!
//! Also contains the rules for what a valid name is, and the [`validation::ValidationContext`] problems with
//! names are collected in.

pub mod access;
pub mod def;
pub mod descriptor;
pub mod entry;
pub mod names;
pub mod validation;
